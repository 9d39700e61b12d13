//! Extractor -> transformer -> animator, composed into one run.

use std::path::{Path, PathBuf};

use crate::{
    animate::{RenderContext, render_animation},
    config::{AnimationConfig, Layout, OutputFormat},
    contour::{ExtractOpts, extract_samples},
    encode::{
        ffmpeg::FfmpegSink,
        gif::GifSink,
        sink::FrameSink,
        write_atomic,
    },
    foundation::{
        core::Sample,
        error::{EpicycleError, EpicycleResult},
    },
    fourier::{AxisSpectra, Spectrum},
    input::SourceInput,
};

/// Summary of a finished run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunReport {
    pub frames: u32,
    pub samples: usize,
    pub terms: usize,
    pub out_path: Option<PathBuf>,
}

/// Samples of the traced curve and their complex spectrum.
#[derive(Clone, Debug, PartialEq)]
pub struct Analysis {
    pub samples: Vec<Sample>,
    pub spectrum: Spectrum,
}

/// Runs the whole pipeline, writing the animation to `cfg.out_path`.
#[tracing::instrument(skip_all, fields(out = %cfg.out_path.display()))]
pub fn run(cfg: &AnimationConfig, input: &SourceInput) -> EpicycleResult<RunReport> {
    let mut sink = sink_for(cfg)?;
    run_into(cfg, input, sink.as_mut())
}

/// Same as [`run`], with the caller choosing where frames go.
pub fn run_into(
    cfg: &AnimationConfig,
    input: &SourceInput,
    sink: &mut dyn FrameSink,
) -> EpicycleResult<RunReport> {
    let analysis = analyze(cfg, input)?;
    render_analysis(cfg, input, &analysis, sink)
}

/// The sink matching the output path's extension.
pub fn sink_for(cfg: &AnimationConfig) -> EpicycleResult<Box<dyn FrameSink>> {
    Ok(match cfg.output_format()? {
        OutputFormat::Gif => Box::new(GifSink::new(&cfg.out_path)),
        OutputFormat::Mp4 => Box::new(FfmpegSink::new(&cfg.out_path)),
    })
}

/// Validates `cfg`, then extracts and transforms `input` without rendering.
pub fn analyze(cfg: &AnimationConfig, input: &SourceInput) -> EpicycleResult<Analysis> {
    cfg.validate()?;
    let samples = extract_samples(input, ExtractOpts::from(cfg))?;
    let spectrum = Spectrum::transform(&samples, cfg.terms)?;
    Ok(Analysis { samples, spectrum })
}

/// Animates an earlier [`analyze`] result into `sink`.
pub fn render_analysis(
    cfg: &AnimationConfig,
    input: &SourceInput,
    analysis: &Analysis,
    sink: &mut dyn FrameSink,
) -> EpicycleResult<RunReport> {
    let samples = &analysis.samples;
    let mut ctx = match cfg.layout {
        Layout::Complex => RenderContext::complex(cfg, samples, &analysis.spectrum)?,
        Layout::Drawer => {
            let axes = AxisSpectra::transform(samples, cfg.terms)?;
            let image = input.raster().map(|r| &r.display);
            RenderContext::drawer(cfg, samples, &axes, image)?
        }
    };
    let out_path = render_animation(&mut ctx, sink)?;
    drop(ctx);

    Ok(RunReport {
        frames: cfg.frames,
        samples: samples.len(),
        terms: cfg.terms,
        out_path,
    })
}

/// Writes the coefficient records of `spectrum` as pretty JSON.
pub fn dump_coefficients(spectrum: &Spectrum, path: &Path) -> EpicycleResult<()> {
    let json = serde_json::to_vec_pretty(&spectrum.records())
        .map_err(|e| EpicycleError::serde(format!("encode coefficients: {e}")))?;
    write_atomic(path, &json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{encode::sink::InMemorySink, foundation::core::Point};

    fn square() -> SourceInput {
        SourceInput::Points(vec![
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(1.0, 1.0),
            Point::new(0.0, 1.0),
        ])
    }

    fn cfg() -> AnimationConfig {
        AnimationConfig {
            samples: 100,
            terms: 10,
            frames: 6,
            canvas: crate::foundation::core::Canvas {
                width: 48,
                height: 48,
            },
            ..AnimationConfig::default()
        }
    }

    #[test]
    fn run_into_reports_counts() {
        let mut sink = InMemorySink::new();
        let report = run_into(&cfg(), &square(), &mut sink).unwrap();
        assert_eq!(
            report,
            RunReport {
                frames: 6,
                samples: 100,
                terms: 10,
                out_path: None
            }
        );
        assert_eq!(sink.frames().len(), 6);
    }

    #[test]
    fn drawer_layout_runs_on_point_lists() {
        let cfg = AnimationConfig {
            layout: Layout::Drawer,
            ..cfg()
        };
        let mut sink = InMemorySink::new();
        run_into(&cfg, &square(), &mut sink).unwrap();
        assert_eq!(sink.frames().len(), 6);
    }

    #[test]
    fn empty_points_fail_in_extraction() {
        let mut sink = InMemorySink::new();
        let err = run_into(&cfg(), &SourceInput::Points(Vec::new()), &mut sink).unwrap_err();
        assert!(matches!(err, EpicycleError::Extraction(_)));
        assert!(sink.config().is_none());
    }

    #[test]
    fn coefficient_dump_is_readable_json() {
        let analysis = analyze(&cfg(), &square()).unwrap();
        assert_eq!(analysis.samples.len(), 100);
        let path = PathBuf::from("target").join("pipeline").join("coeffs.json");
        dump_coefficients(&analysis.spectrum, &path).unwrap();
        let back: Vec<crate::fourier::CoefficientRecord> =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(back.len(), 21);
        let dc = back.iter().find(|r| r.freq == 0).unwrap();
        assert!((dc.re - 0.5).abs() < 1e-9 && (dc.im - 0.5).abs() < 1e-9);
    }
}
