use std::path::PathBuf;

use crate::{
    foundation::{
        core::{Fps, FrameIndex, Rgba8},
        error::EpicycleResult,
    },
    render::FrameRGBA,
};

/// Configuration handed to a [`FrameSink`] before the first frame.
#[derive(Clone, Debug)]
pub struct SinkConfig {
    pub width: u32,
    pub height: u32,
    pub fps: Fps,
    /// Total frames that will be pushed.
    pub frames: u32,
    /// Background used when flattening to an opaque format.
    pub background: Rgba8,
}

/// Consumer of rendered frames.
///
/// `push_frame` is called in strictly increasing `FrameIndex` order. Output becomes visible only
/// when `end` succeeds; a sink dropped before `end` leaves nothing behind.
pub trait FrameSink {
    fn begin(&mut self, cfg: SinkConfig) -> EpicycleResult<()>;
    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameRGBA) -> EpicycleResult<()>;
    /// Finalizes the output, returning where it was written, if anywhere.
    fn end(&mut self) -> EpicycleResult<Option<PathBuf>>;
}

/// Keeps frames in memory, for tests.
#[derive(Debug, Default)]
pub struct InMemorySink {
    cfg: Option<SinkConfig>,
    frames: Vec<(FrameIndex, FrameRGBA)>,
    finished: bool,
}

impl InMemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(&self) -> Option<&SinkConfig> {
        self.cfg.as_ref()
    }

    pub fn frames(&self) -> &[(FrameIndex, FrameRGBA)] {
        &self.frames
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

impl FrameSink for InMemorySink {
    fn begin(&mut self, cfg: SinkConfig) -> EpicycleResult<()> {
        self.cfg = Some(cfg);
        self.frames.clear();
        self.finished = false;
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameRGBA) -> EpicycleResult<()> {
        self.frames.push((idx, frame.clone()));
        Ok(())
    }

    fn end(&mut self) -> EpicycleResult<Option<PathBuf>> {
        self.finished = true;
        Ok(None)
    }
}
