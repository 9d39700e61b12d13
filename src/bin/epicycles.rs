use std::path::PathBuf;

use anyhow::Context as _;
use clap::{ArgAction, Parser, ValueEnum};
use tracing::Level;

use epicycles::{AnimationConfig, Canvas, EpicycleError, Fps, Layout, SourceInput, TermOrder};

/// Draw a closed outline with a chain of rotating circles.
#[derive(Parser, Debug)]
#[command(name = "epicycles", version)]
struct Cli {
    /// Input raster image, or a point list (.json, .csv, .txt).
    input: PathBuf,

    /// Harmonic pairs kept on each side of the constant term.
    #[arg(long)]
    terms: Option<usize>,

    /// Frames in one full turn (at least 2).
    #[arg(long)]
    frames: Option<u32>,

    /// Points the outline is resampled to.
    #[arg(long)]
    samples: Option<usize>,

    /// Output path; the extension picks the format (.gif or .mp4).
    #[arg(long)]
    out: Option<PathBuf>,

    /// JSON config file; flags given on the command line override it.
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long, value_enum)]
    layout: Option<LayoutChoice>,

    /// Stacking order of the circles.
    #[arg(long, value_enum)]
    order: Option<OrderChoice>,

    #[arg(long)]
    fps: Option<u32>,

    /// Canvas size as WxH, both even.
    #[arg(long, value_parser = parse_size)]
    size: Option<Canvas>,

    /// Gray level separating the shape from the background.
    #[arg(long)]
    threshold: Option<u8>,

    /// Trace light shapes on a dark background instead.
    #[arg(long)]
    no_invert: bool,

    /// Also write the coefficients as JSON.
    #[arg(long)]
    dump_coeffs: Option<PathBuf>,

    /// More logging (-v info, -vv debug).
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LayoutChoice {
    Complex,
    Drawer,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OrderChoice {
    Frequency,
    Amplitude,
}

fn parse_size(s: &str) -> Result<Canvas, String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WxH, got '{s}'"))?;
    let width = w.trim().parse().map_err(|e| format!("bad width '{w}': {e}"))?;
    let height = h.trim().parse().map_err(|e| format!("bad height '{h}': {e}"))?;
    Ok(Canvas { width, height })
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose)?;

    let cfg = build_config(&cli)?;
    cfg.validate().context("configuration")?;

    let input = SourceInput::load(&cli.input)
        .with_context(|| format!("load input '{}'", cli.input.display()))?;

    let analysis = epicycles::analyze(&cfg, &input).map_err(staged)?;
    if let Some(path) = &cli.dump_coeffs {
        epicycles::dump_coefficients(&analysis.spectrum, path)
            .with_context(|| format!("write coefficients '{}'", path.display()))?;
        eprintln!("wrote {}", path.display());
    }

    let mut sink = epicycles::sink_for(&cfg).map_err(staged)?;
    let report = epicycles::render_analysis(&cfg, &input, &analysis, sink.as_mut())
        .map_err(staged)?;

    let out = report.out_path.unwrap_or(cfg.out_path);
    tracing::info!(
        frames = report.frames,
        samples = report.samples,
        terms = report.terms,
        "done"
    );
    eprintln!("wrote {}", out.display());
    Ok(())
}

/// Names the failing stage in front of the cause.
fn staged(e: EpicycleError) -> anyhow::Error {
    let stage = e.stage();
    anyhow::Error::new(e).context(format!("{stage} failed"))
}

fn build_config(cli: &Cli) -> anyhow::Result<AnimationConfig> {
    let mut cfg = match &cli.config {
        Some(path) => AnimationConfig::from_json_file(path)
            .with_context(|| format!("read config '{}'", path.display()))?,
        None => AnimationConfig::default(),
    };

    if let Some(v) = cli.terms {
        cfg.terms = v;
    }
    if let Some(v) = cli.frames {
        cfg.frames = v;
    }
    if let Some(v) = cli.samples {
        cfg.samples = v;
    }
    if let Some(v) = &cli.out {
        cfg.out_path = v.clone();
    }
    if let Some(v) = cli.layout {
        cfg.layout = match v {
            LayoutChoice::Complex => Layout::Complex,
            LayoutChoice::Drawer => Layout::Drawer,
        };
    }
    if let Some(v) = cli.order {
        cfg.order = match v {
            OrderChoice::Frequency => TermOrder::Frequency,
            OrderChoice::Amplitude => TermOrder::Amplitude,
        };
    }
    if let Some(v) = cli.fps {
        cfg.fps = Fps::new(v, 1)?;
    }
    if let Some(v) = cli.size {
        cfg.canvas = v;
    }
    if let Some(v) = cli.threshold {
        cfg.threshold = v;
    }
    if cli.no_invert {
        cfg.invert = false;
    }
    Ok(cfg)
}

fn init_logging(verbose: u8) -> anyhow::Result<()> {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        _ => Level::DEBUG,
    };
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}
