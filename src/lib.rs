#![forbid(unsafe_code)]

pub mod animate;
pub mod assets;
pub mod compile;
pub mod config;
pub mod contour;
pub mod encode;
pub mod epicycle;
pub mod foundation;
pub mod fourier;
pub mod input;
pub mod pipeline;
pub mod render;

pub use animate::{Palette, RenderContext, render_animation};
pub use config::{AnimationConfig, Layout, OutputFormat, TermOrder};
pub use contour::{ExtractOpts, extract_samples};
pub use epicycle::{Epicycle, EpicycleChain, TracePrefix};
pub use foundation::core::{Canvas, Complex64, Fps, FrameIndex, Rgba8, Sample};
pub use foundation::error::{EpicycleError, EpicycleResult};
pub use fourier::{AxisSpectra, CoefficientRecord, Spectrum};
pub use input::SourceInput;
pub use pipeline::{
    Analysis, RunReport, analyze, dump_coefficients, render_analysis, run, run_into, sink_for,
};
