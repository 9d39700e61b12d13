use std::{
    io::Write as _,
    path::PathBuf,
    process::{Child, ChildStdin, Command, Stdio},
};

use crate::{
    encode::{
        ensure_parent_dir, flatten_to_opaque_rgba8,
        sink::{FrameSink, SinkConfig},
        temp_sibling,
    },
    foundation::{
        core::FrameIndex,
        error::{EpicycleError, EpicycleResult},
    },
    render::FrameRGBA,
};

pub fn is_ffmpeg_on_path() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// H.264 MP4 through the system `ffmpeg` binary. Frames are piped as raw RGBA into a hidden
/// temp file, which is renamed over the output once ffmpeg exits cleanly.
pub struct FfmpegSink {
    out_path: PathBuf,
    running: Option<Running>,
}

struct Running {
    cfg: SinkConfig,
    tmp_path: PathBuf,
    child: Child,
    stdin: Option<ChildStdin>,
    scratch: Vec<u8>,
    pushed: u32,
}

impl FfmpegSink {
    pub fn new(out_path: impl Into<PathBuf>) -> Self {
        Self {
            out_path: out_path.into(),
            running: None,
        }
    }
}

fn validate(cfg: &SinkConfig) -> EpicycleResult<()> {
    if cfg.width == 0 || cfg.height == 0 {
        return Err(EpicycleError::validation(
            "encode width/height must be non-zero",
        ));
    }
    if !cfg.width.is_multiple_of(2) || !cfg.height.is_multiple_of(2) {
        return Err(EpicycleError::validation(
            "encode width/height must be even (required for yuv420p mp4 output)",
        ));
    }
    Ok(())
}

impl FrameSink for FfmpegSink {
    fn begin(&mut self, cfg: SinkConfig) -> EpicycleResult<()> {
        validate(&cfg)?;
        ensure_parent_dir(&self.out_path)?;

        if !is_ffmpeg_on_path() {
            return Err(EpicycleError::render(
                "ffmpeg is required for MP4 encoding, but was not found on PATH",
            ));
        }

        let tmp_path = temp_sibling(&self.out_path);
        let mut cmd = Command::new("ffmpeg");
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());
        cmd.args([
            "-y",
            "-loglevel",
            "error",
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgba",
            "-s",
            &format!("{}x{}", cfg.width, cfg.height),
            "-r",
            &format!("{}/{}", cfg.fps.num, cfg.fps.den),
            "-i",
            "pipe:0",
            "-an",
            "-c:v",
            "libx264",
            "-pix_fmt",
            "yuv420p",
            "-movflags",
            "+faststart",
            "-f",
            "mp4",
        ])
        .arg(&tmp_path);

        let mut child = cmd.spawn().map_err(|e| {
            EpicycleError::render(format!(
                "failed to spawn ffmpeg (is it installed and on PATH?): {e}"
            ))
        })?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| EpicycleError::render("failed to open ffmpeg stdin"))?;

        tracing::debug!(tmp = %tmp_path.display(), "ffmpeg started");
        self.running = Some(Running {
            scratch: vec![0u8; cfg.width as usize * cfg.height as usize * 4],
            cfg,
            tmp_path,
            child,
            stdin: Some(stdin),
            pushed: 0,
        });
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameRGBA) -> EpicycleResult<()> {
        let Some(run) = self.running.as_mut() else {
            return Err(EpicycleError::render("ffmpeg sink used before begin"));
        };
        if idx.0 != run.pushed {
            return Err(EpicycleError::render(format!(
                "mp4 frames out of order: got {}, expected {}",
                idx.0, run.pushed
            )));
        }
        if frame.width != run.cfg.width || frame.height != run.cfg.height {
            return Err(EpicycleError::render(format!(
                "frame size mismatch: got {}x{}, expected {}x{}",
                frame.width, frame.height, run.cfg.width, run.cfg.height
            )));
        }

        flatten_to_opaque_rgba8(
            &mut run.scratch,
            &frame.data,
            frame.premultiplied,
            run.cfg.background.to_array(),
        )?;

        let Some(stdin) = run.stdin.as_mut() else {
            return Err(EpicycleError::render("ffmpeg encoder is already finalized"));
        };
        stdin.write_all(&run.scratch).map_err(|e| {
            EpicycleError::render(format!("failed to write frame to ffmpeg stdin: {e}"))
        })?;
        run.pushed += 1;
        Ok(())
    }

    fn end(&mut self) -> EpicycleResult<Option<PathBuf>> {
        let Some(mut run) = self.running.take() else {
            return Err(EpicycleError::render("ffmpeg sink finished before begin"));
        };
        drop(run.stdin.take());

        let Running {
            cfg,
            tmp_path,
            child,
            pushed,
            ..
        } = run;
        let fail = |msg: String| -> EpicycleResult<Option<PathBuf>> {
            let _ = std::fs::remove_file(&tmp_path);
            Err(EpicycleError::render(msg))
        };

        let output = match child.wait_with_output() {
            Ok(output) => output,
            Err(e) => return fail(format!("failed to wait for ffmpeg to finish: {e}")),
        };
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return fail(format!(
                "ffmpeg exited with status {}: {}",
                output.status,
                stderr.trim()
            ));
        }
        if pushed != cfg.frames {
            return fail(format!("mp4 expected {} frames, got {pushed}", cfg.frames));
        }

        if let Err(e) = std::fs::rename(&tmp_path, &self.out_path) {
            let _ = std::fs::remove_file(&tmp_path);
            return Err(EpicycleError::io(
                format!("move output to '{}'", self.out_path.display()),
                e,
            ));
        }
        tracing::info!(path = %self.out_path.display(), frames = pushed, "mp4 written");
        Ok(Some(self.out_path.clone()))
    }
}

impl Drop for FfmpegSink {
    fn drop(&mut self) {
        if let Some(mut run) = self.running.take() {
            drop(run.stdin.take());
            let _ = run.child.kill();
            let _ = run.child.wait();
            let _ = std::fs::remove_file(&run.tmp_path);
        }
    }
}
