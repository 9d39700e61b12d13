use std::{cell::RefCell, io::Write, path::PathBuf, rc::Rc};

use image::{
    Delay, Frame, RgbaImage,
    codecs::gif::{GifEncoder, Repeat},
};

use crate::{
    encode::{
        flatten_to_opaque_rgba8,
        sink::{FrameSink, SinkConfig},
        write_atomic,
    },
    foundation::{
        core::FrameIndex,
        error::{EpicycleError, EpicycleResult},
    },
    render::FrameRGBA,
};

/// NeuQuant speed, 1 (best) to 30 (fastest).
const QUANTIZER_SPEED: i32 = 10;

/// Looping GIF assembled in memory and written in one step by [`FrameSink::end`].
pub struct GifSink {
    out_path: PathBuf,
    state: Option<GifState>,
}

struct GifState {
    cfg: SinkConfig,
    encoder: GifEncoder<SharedBuf>,
    buf: SharedBuf,
    delay: Delay,
    pushed: u32,
}

#[derive(Clone, Default)]
struct SharedBuf(Rc<RefCell<Vec<u8>>>);

impl Write for SharedBuf {
    fn write(&mut self, data: &[u8]) -> std::io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl GifSink {
    pub fn new(out_path: impl Into<PathBuf>) -> Self {
        Self {
            out_path: out_path.into(),
            state: None,
        }
    }
}

impl FrameSink for GifSink {
    fn begin(&mut self, cfg: SinkConfig) -> EpicycleResult<()> {
        if cfg.width > u32::from(u16::MAX) || cfg.height > u32::from(u16::MAX) {
            return Err(EpicycleError::render("gif frames are limited to 65535 px"));
        }
        let buf = SharedBuf::default();
        let mut encoder = GifEncoder::new_with_speed(buf.clone(), QUANTIZER_SPEED);
        encoder
            .set_repeat(Repeat::Infinite)
            .map_err(|e| EpicycleError::render(format!("gif setup: {e}")))?;
        let (numer, denom) = cfg.fps.frame_delay_ms();
        self.state = Some(GifState {
            delay: Delay::from_numer_denom_ms(numer, denom),
            cfg,
            encoder,
            buf,
            pushed: 0,
        });
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameRGBA) -> EpicycleResult<()> {
        let Some(state) = self.state.as_mut() else {
            return Err(EpicycleError::render("gif sink used before begin"));
        };
        if idx.0 != state.pushed {
            return Err(EpicycleError::render(format!(
                "gif frames out of order: got {}, expected {}",
                idx.0, state.pushed
            )));
        }
        if frame.width != state.cfg.width || frame.height != state.cfg.height {
            return Err(EpicycleError::render(format!(
                "frame size mismatch: got {}x{}, expected {}x{}",
                frame.width, frame.height, state.cfg.width, state.cfg.height
            )));
        }

        let mut rgba = vec![0u8; frame.data.len()];
        flatten_to_opaque_rgba8(
            &mut rgba,
            &frame.data,
            frame.premultiplied,
            state.cfg.background.to_array(),
        )?;
        let image = RgbaImage::from_raw(frame.width, frame.height, rgba)
            .ok_or_else(|| EpicycleError::render("frame.data size mismatch with width*height*4"))?;

        state
            .encoder
            .encode_frame(Frame::from_parts(image, 0, 0, state.delay))
            .map_err(|e| EpicycleError::render(format!("gif encode frame {}: {e}", idx.0)))?;
        state.pushed += 1;
        Ok(())
    }

    fn end(&mut self) -> EpicycleResult<Option<PathBuf>> {
        let Some(state) = self.state.take() else {
            return Err(EpicycleError::render("gif sink finished before begin"));
        };
        if state.pushed != state.cfg.frames {
            return Err(EpicycleError::render(format!(
                "gif expected {} frames, got {}",
                state.cfg.frames, state.pushed
            )));
        }

        // Dropping the encoder writes the trailer.
        let GifState { encoder, buf, .. } = state;
        drop(encoder);
        let bytes = std::mem::take(&mut *buf.0.borrow_mut());

        write_atomic(&self.out_path, &bytes)?;
        tracing::info!(path = %self.out_path.display(), bytes = bytes.len(), "gif written");
        Ok(Some(self.out_path.clone()))
    }
}
