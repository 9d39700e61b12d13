//! Run configuration.
//!
//! Every tunable of a run lives in [`AnimationConfig`]. Values come from defaults, an optional
//! JSON file (missing keys fall back to defaults), and finally CLI overrides.

use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use crate::foundation::{
    core::{Canvas, Fps},
    error::{EpicycleError, EpicycleResult},
};

/// How the frame is laid out.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Layout {
    /// One chain of complex epicycles drawing the curve directly.
    #[default]
    Complex,
    /// Four quadrants: source, x-signal chain, y-signal chain, and the projected trace.
    Drawer,
}

/// Order in which epicycles are stacked tip-to-tail.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TermOrder {
    /// DC first, then `+1, -1, +2, -2, ...`.
    #[default]
    Frequency,
    /// Largest radius first.
    Amplitude,
}

/// Output container, chosen from the output path's extension.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Gif,
    Mp4,
}

impl OutputFormat {
    pub fn from_path(path: &Path) -> EpicycleResult<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("gif") => Ok(Self::Gif),
            Some("mp4") => Ok(Self::Mp4),
            _ => Err(EpicycleError::validation(format!(
                "output '{}' must end in .gif or .mp4",
                path.display()
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnimationConfig {
    /// Number of points the traced contour is resampled to (M).
    pub samples: usize,
    /// Harmonic pairs kept on each side of DC (N), at most `samples / 2`.
    pub terms: usize,
    /// Number of frames (F) covering one full turn, `t = f / F`.
    pub frames: u32,
    pub fps: Fps,
    pub canvas: Canvas,
    pub out_path: PathBuf,
    pub layout: Layout,
    pub order: TermOrder,
    /// Gray level separating subject from background when tracing a raster.
    pub threshold: u8,
    /// Treat pixels at or below `threshold` as the subject (dark shape on light paper).
    pub invert: bool,
    /// Draw the source outline (or image, in the drawer layout) as a faint guide.
    pub show_source: bool,
}

impl AnimationConfig {
    pub const MAX_SAMPLES: usize = 1 << 16;
    pub const MAX_FRAMES: u32 = 100_000;

    pub fn from_json_file(path: &Path) -> EpicycleResult<Self> {
        let f = File::open(path)
            .map_err(|e| EpicycleError::io(format!("open config '{}'", path.display()), e))?;
        let cfg: Self = serde_json::from_reader(BufReader::new(f)).map_err(|e| {
            EpicycleError::serde(format!("parse config '{}': {e}", path.display()))
        })?;
        Ok(cfg)
    }

    /// Checks every range the pipeline relies on.
    ///
    /// The term count is only bounded here by the sample count; the transform reports the same
    /// violation as [`EpicycleError::InvalidTermCount`].
    pub fn validate(&self) -> EpicycleResult<()> {
        if self.samples == 0 || self.samples > Self::MAX_SAMPLES {
            return Err(EpicycleError::validation(format!(
                "samples must be in 1..={}, got {}",
                Self::MAX_SAMPLES,
                self.samples
            )));
        }
        if self.terms > self.samples / 2 {
            return Err(EpicycleError::InvalidTermCount {
                requested: self.terms,
                samples: self.samples,
                max: self.samples / 2,
            });
        }
        if self.frames < 2 {
            return Err(EpicycleError::InvalidFrameCount(self.frames));
        }
        if self.frames > Self::MAX_FRAMES {
            return Err(EpicycleError::validation(format!(
                "frames must be at most {}, got {}",
                Self::MAX_FRAMES,
                self.frames
            )));
        }
        Fps::new(self.fps.num, self.fps.den)?;
        self.canvas.validate()?;
        OutputFormat::from_path(&self.out_path)?;
        Ok(())
    }

    pub fn output_format(&self) -> EpicycleResult<OutputFormat> {
        OutputFormat::from_path(&self.out_path)
    }
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            samples: 600,
            terms: 100,
            frames: 300,
            fps: Fps::default(),
            canvas: Canvas::default(),
            out_path: PathBuf::from("output").join("epicycles.gif"),
            layout: Layout::Complex,
            order: TermOrder::Frequency,
            threshold: 127,
            invert: true,
            show_source: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        AnimationConfig::default().validate().unwrap();
    }

    #[test]
    fn frame_count_below_two_is_rejected() {
        for frames in [0, 1] {
            let cfg = AnimationConfig {
                frames,
                ..AnimationConfig::default()
            };
            assert!(matches!(
                cfg.validate(),
                Err(EpicycleError::InvalidFrameCount(f)) if f == frames
            ));
        }
    }

    #[test]
    fn terms_bounded_by_half_the_samples() {
        let ok = AnimationConfig {
            samples: 100,
            terms: 50,
            ..AnimationConfig::default()
        };
        assert!(ok.validate().is_ok());

        let bad = AnimationConfig { terms: 51, ..ok };
        assert!(matches!(
            bad.validate(),
            Err(EpicycleError::InvalidTermCount { max: 50, .. })
        ));
    }

    #[test]
    fn output_extension_picks_format() {
        assert_eq!(
            OutputFormat::from_path(Path::new("a/b.GIF")).unwrap(),
            OutputFormat::Gif
        );
        assert_eq!(
            OutputFormat::from_path(Path::new("b.mp4")).unwrap(),
            OutputFormat::Mp4
        );
        assert!(OutputFormat::from_path(Path::new("b.png")).is_err());
        assert!(OutputFormat::from_path(Path::new("noext")).is_err());
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let cfg: AnimationConfig =
            serde_json::from_str(r#"{ "terms": 12, "layout": "drawer" }"#).unwrap();
        assert_eq!(cfg.terms, 12);
        assert_eq!(cfg.layout, Layout::Drawer);
        assert_eq!(cfg.samples, 600);
        assert_eq!(cfg.order, TermOrder::Frequency);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let res = serde_json::from_str::<AnimationConfig>(r#"{ "circles": 3 }"#);
        assert!(res.is_err());
    }
}
