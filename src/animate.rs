//! Frame compilation and the render loop.
//!
//! A [`RenderContext`] is built once per run. It holds everything that does not change between
//! frames: the world-to-pixel views, the epicycle chains, the precomputed pen trace, and the
//! backend. Each frame is compiled into a [`RenderPlan`], rasterized, and pushed to a sink.

use std::path::PathBuf;

use crate::{
    assets::PreparedImage,
    compile::{RenderPlan, View, square_around, world_bounds},
    config::AnimationConfig,
    encode::sink::{FrameSink, SinkConfig},
    epicycle::{EpicycleChain, TracePrefix},
    foundation::{
        core::{Canvas, Complex64, Fps, FrameIndex, Point, Rect, Rgba8, Sample, sample_to_point},
        error::{EpicycleError, EpicycleResult},
    },
    fourier::{AxisSpectra, Spectrum},
    render::{FrameRGBA, RenderBackend, cpu::CpuBackend},
};

const MARGIN: f64 = 16.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Palette {
    pub background: Rgba8,
    pub guide: Rgba8,
    pub circle: Rgba8,
    pub arm: Rgba8,
    pub trace: Rgba8,
    pub pen: Rgba8,
    pub projection: Rgba8,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            background: Rgba8::opaque(255, 255, 255),
            guide: Rgba8::opaque(200, 200, 200),
            circle: Rgba8::new(70, 110, 200, 90),
            arm: Rgba8::opaque(40, 70, 160),
            trace: Rgba8::opaque(220, 40, 40),
            pen: Rgba8::opaque(20, 20, 20),
            projection: Rgba8::new(120, 120, 120, 160),
        }
    }
}

/// Per-run rendering state. Dropping it releases the backend.
pub struct RenderContext {
    canvas: Canvas,
    fps: Fps,
    frames: u32,
    palette: Palette,
    scene: Scene,
    backend: Box<dyn RenderBackend>,
}

enum Scene {
    Complex(ComplexScene),
    Drawer(Box<DrawerScene>),
}

struct ComplexScene {
    view: View,
    /// The constant term; every other link hangs off it.
    anchor: Complex64,
    chain: EpicycleChain,
    guide: Option<Vec<Point>>,
    trace: TracePrefix,
}

struct DrawerScene {
    source: DrawerSource,
    center: Complex64,
    x_view: View,
    y_view: View,
    pen_view: View,
    x_chain: EpicycleChain,
    y_chain: EpicycleChain,
    trace: TracePrefix,
    quadrants: [Rect; 4],
}

enum DrawerSource {
    Image { image: PreparedImage, dest: Rect },
    Outline(Vec<Point>),
    Hidden,
}

fn check_frames(frames: u32) -> EpicycleResult<()> {
    if frames < 2 {
        return Err(EpicycleError::InvalidFrameCount(frames));
    }
    Ok(())
}

impl RenderContext {
    /// One complex chain drawing the curve directly.
    pub fn complex(
        cfg: &AnimationConfig,
        samples: &[Sample],
        spectrum: &Spectrum,
    ) -> EpicycleResult<Self> {
        check_frames(cfg.frames)?;
        cfg.canvas.validate()?;

        let anchor = spectrum.dc();
        let chain = spectrum.epicycles(cfg.order).without_dc();
        let trace = TracePrefix::precompute(cfg.frames, |t| spectrum.reconstruct(t));

        let world = world_bounds(samples.iter().chain(trace.all()).copied(), 0.0);
        let pad = 0.05 * world.width().max(world.height());
        let frame = cfg.canvas.rect();
        let view = View::fit(world.inflate(pad, pad), frame, margin_for(frame));

        let guide: Option<Vec<Point>> = cfg
            .show_source
            .then(|| samples.iter().map(|&s| view.apply(s)).collect());

        Ok(Self {
            canvas: cfg.canvas,
            fps: cfg.fps,
            frames: cfg.frames,
            palette: Palette::default(),
            scene: Scene::Complex(ComplexScene {
                view,
                anchor,
                chain,
                guide,
                trace,
            }),
            backend: Box::new(CpuBackend::new()),
        })
    }

    /// Four quadrants: source, x chain, y chain and the projected trace.
    pub fn drawer(
        cfg: &AnimationConfig,
        samples: &[Sample],
        axes: &AxisSpectra,
        image: Option<&PreparedImage>,
    ) -> EpicycleResult<Self> {
        check_frames(cfg.frames)?;
        cfg.canvas.validate()?;

        let center = if samples.is_empty() {
            Complex64::new(0.0, 0.0)
        } else {
            samples.iter().sum::<Sample>() / samples.len() as f64
        };
        let x_chain = axes.x.epicycles(cfg.order).without_dc();
        let y_chain = axes.y.epicycles(cfg.order).without_dc();

        let extent = samples
            .iter()
            .map(|s| (s - center).norm())
            .fold(0.0f64, f64::max);
        let half = (1.5 * extent)
            .max(x_chain.reach())
            .max(y_chain.reach())
            .max(f64::EPSILON);
        let world = square_around(sample_to_point(center), half);

        let (w, h) = (f64::from(cfg.canvas.width), f64::from(cfg.canvas.height));
        let (cx, cy) = (w / 2.0, h / 2.0);
        let quadrants = [
            Rect::new(0.0, 0.0, cx, cy),
            Rect::new(cx, 0.0, w, cy),
            Rect::new(0.0, cy, cx, h),
            Rect::new(cx, cy, w, h),
        ];
        let [top_left, top_right, bottom_left, bottom_right] = quadrants;

        // The x chain shares columns with the pen quadrant, the y chain shares rows.
        let x_view = View::fit(world, top_right, margin_for(top_right));
        let y_view = View::fit(world, bottom_left, margin_for(bottom_left));
        let pen_view = View::fit(world, bottom_right, margin_for(bottom_right));

        let source = match (cfg.show_source, image) {
            (false, _) => DrawerSource::Hidden,
            (true, Some(image)) => DrawerSource::Image {
                dest: fit_image(image, shrink(top_left)),
                image: image.clone(),
            },
            (true, None) => {
                let view = View::fit(world, top_left, margin_for(top_left));
                DrawerSource::Outline(samples.iter().map(|&s| view.apply(s)).collect())
            }
        };

        let trace = TracePrefix::precompute(cfg.frames, |t| {
            Complex64::new(axes.x.reconstruct(t).re, axes.y.reconstruct(t).re)
        });

        Ok(Self {
            canvas: cfg.canvas,
            fps: cfg.fps,
            frames: cfg.frames,
            palette: Palette::default(),
            scene: Scene::Drawer(Box::new(DrawerScene {
                source,
                center,
                x_view,
                y_view,
                pen_view,
                x_chain,
                y_chain,
                trace,
                quadrants,
            })),
            backend: Box::new(CpuBackend::new()),
        })
    }

    pub fn frames(&self) -> u32 {
        self.frames
    }

    pub fn sink_config(&self) -> SinkConfig {
        SinkConfig {
            width: self.canvas.width,
            height: self.canvas.height,
            fps: self.fps,
            frames: self.frames,
            background: self.palette.background,
        }
    }

    /// Pen position at frame `f`.
    pub fn pen_at(&self, f: FrameIndex) -> Option<Complex64> {
        let trace = match &self.scene {
            Scene::Complex(s) => &s.trace,
            Scene::Drawer(s) => &s.trace,
        };
        trace.all().get(f.0 as usize).copied()
    }

    pub fn compile_frame(&self, f: FrameIndex) -> RenderPlan {
        let t = f.time(self.frames);
        let mut plan = RenderPlan::new(self.canvas, self.palette.background);
        match &self.scene {
            Scene::Complex(s) => compile_complex(&mut plan, &self.palette, s, f, t),
            Scene::Drawer(s) => compile_drawer(&mut plan, &self.palette, s, f, t),
        }
        plan
    }

    pub fn render_frame(&mut self, f: FrameIndex) -> EpicycleResult<FrameRGBA> {
        let plan = self.compile_frame(f);
        self.backend.render_plan(&plan)
    }
}

fn compile_complex(plan: &mut RenderPlan, pal: &Palette, s: &ComplexScene, f: FrameIndex, t: f64) {
    if let Some(guide) = &s.guide {
        plan.stroke_polygon(guide.iter().copied(), pal.guide, 1.0);
    }
    draw_chain(plan, pal, &s.view, &s.chain, s.anchor, t, |z| z);

    let trace = s.trace.up_to(f);
    plan.stroke_polyline(trace.iter().map(|&z| s.view.apply(z)), pal.trace, 2.0);
    if let Some(&pen) = trace.last() {
        plan.fill_circle(s.view.apply(pen), 3.0, pal.pen);
    }
}

fn compile_drawer(plan: &mut RenderPlan, pal: &Palette, s: &DrawerScene, f: FrameIndex, t: f64) {
    let [top_left, _, _, bottom_right] = s.quadrants;
    let mid_x = top_left.x1;
    let mid_y = top_left.y1;
    plan.stroke_segment(
        Point::new(mid_x, 0.0),
        Point::new(mid_x, bottom_right.y1),
        pal.guide,
        1.0,
    );
    plan.stroke_segment(
        Point::new(0.0, mid_y),
        Point::new(bottom_right.x1, mid_y),
        pal.guide,
        1.0,
    );

    match &s.source {
        DrawerSource::Image { image, dest } => plan.image(image.clone(), *dest, 1.0),
        DrawerSource::Outline(points) => {
            plan.stroke_polygon(points.iter().copied(), pal.trace, 1.5);
        }
        DrawerSource::Hidden => {}
    }

    // The x chain runs horizontally; its tip's real part is x(t).
    let x_tip = draw_chain(plan, pal, &s.x_view, &s.x_chain, s.center, t, |z| z);
    // The y chain is drawn with its real part vertical so the tip's height is y(t).
    let y_tip = draw_chain(plan, pal, &s.y_view, &s.y_chain, s.center, t, |z| {
        Complex64::new(z.im, z.re)
    });

    let trace = s.trace.up_to(f);
    plan.stroke_polyline(trace.iter().map(|&z| s.pen_view.apply(z)), pal.trace, 2.0);
    if let Some(&pen) = trace.last() {
        let pen = s.pen_view.apply(pen);
        plan.stroke_segment(s.x_view.apply(x_tip), pen, pal.projection, 1.0);
        plan.stroke_segment(s.y_view.apply(y_tip), pen, pal.projection, 1.0);
        plan.fill_circle(pen, 3.0, pal.pen);
    }
}

/// Draws circles and arms for `chain` hung from `anchor`; returns the tip in world space.
///
/// `orient` maps each link's offset before it is added, which lets a chain be drawn rotated.
fn draw_chain(
    plan: &mut RenderPlan,
    pal: &Palette,
    view: &View,
    chain: &EpicycleChain,
    anchor: Complex64,
    t: f64,
    orient: impl Fn(Complex64) -> Complex64,
) -> Complex64 {
    let mut joints = Vec::with_capacity(chain.len() + 1);
    let mut acc = anchor;
    joints.push(view.apply(acc));
    for link in chain.links() {
        let r = link.radius * view.scale();
        if r >= 0.5 {
            plan.stroke_circle(view.apply(acc), r, pal.circle, 1.0);
        }
        acc += orient(link.vector_at(t));
        joints.push(view.apply(acc));
    }
    plan.stroke_polyline(joints, pal.arm, 1.5);
    acc
}

/// Margin around a panel; small panels get a proportionally smaller one so they never collapse.
fn margin_for(rect: Rect) -> f64 {
    MARGIN.min(rect.width().min(rect.height()) / 8.0)
}

fn shrink(rect: Rect) -> Rect {
    rect.inset(-margin_for(rect))
}

/// Largest rect with the image's aspect ratio centered inside `target`.
fn fit_image(image: &PreparedImage, target: Rect) -> Rect {
    let (iw, ih) = (f64::from(image.width.max(1)), f64::from(image.height.max(1)));
    let scale = (target.width() / iw).min(target.height() / ih).max(0.0);
    Rect::from_center_size(target.center(), (iw * scale, ih * scale))
}

/// Renders every frame of `ctx` into `sink`, in order.
///
/// The sink only publishes output from [`FrameSink::end`], so an error on any frame leaves no
/// file behind.
#[tracing::instrument(skip_all, fields(frames = ctx.frames()))]
pub fn render_animation(
    ctx: &mut RenderContext,
    sink: &mut dyn FrameSink,
) -> EpicycleResult<Option<PathBuf>> {
    check_frames(ctx.frames())?;
    sink.begin(ctx.sink_config())?;
    for f in 0..ctx.frames() {
        let idx = FrameIndex(f);
        let frame = ctx.render_frame(idx)?;
        sink.push_frame(idx, &frame)?;
        if (f + 1).is_multiple_of(50) {
            tracing::debug!(done = f + 1, "frames rendered");
        }
    }
    let out = sink.end()?;
    tracing::info!(frames = ctx.frames(), "animation rendered");
    Ok(out)
}
