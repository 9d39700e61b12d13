//! Backend-agnostic frame description: a clear color plus draw ops in pixel space.

use kurbo::Shape as _;

use crate::{
    assets::PreparedImage,
    foundation::core::{Affine, BezPath, Canvas, Complex64, Point, Rect, Rgba8},
};

#[derive(Clone, Debug)]
pub enum DrawOp {
    Stroke {
        path: BezPath,
        color: Rgba8,
        width: f64,
    },
    Fill {
        path: BezPath,
        color: Rgba8,
    },
    Image {
        image: PreparedImage,
        dest: Rect,
        opacity: f32,
    },
}

#[derive(Clone, Debug)]
pub struct RenderPlan {
    pub canvas: Canvas,
    pub clear: Rgba8,
    pub ops: Vec<DrawOp>,
}

impl RenderPlan {
    pub fn new(canvas: Canvas, clear: Rgba8) -> Self {
        Self {
            canvas,
            clear,
            ops: Vec::new(),
        }
    }

    /// Open polyline through `points`; nothing is pushed for fewer than two points.
    pub fn stroke_polyline(
        &mut self,
        points: impl IntoIterator<Item = Point>,
        color: Rgba8,
        width: f64,
    ) {
        if let Some(path) = polyline(points, false) {
            self.ops.push(DrawOp::Stroke { path, color, width });
        }
    }

    pub fn stroke_polygon(
        &mut self,
        points: impl IntoIterator<Item = Point>,
        color: Rgba8,
        width: f64,
    ) {
        if let Some(path) = polyline(points, true) {
            self.ops.push(DrawOp::Stroke { path, color, width });
        }
    }

    pub fn stroke_segment(&mut self, a: Point, b: Point, color: Rgba8, width: f64) {
        self.stroke_polyline([a, b], color, width);
    }

    pub fn stroke_circle(&mut self, center: Point, radius: f64, color: Rgba8, width: f64) {
        if radius <= 0.0 || !radius.is_finite() {
            return;
        }
        let path = kurbo::Circle::new(center, radius).to_path(0.1);
        self.ops.push(DrawOp::Stroke { path, color, width });
    }

    pub fn fill_circle(&mut self, center: Point, radius: f64, color: Rgba8) {
        if radius <= 0.0 || !radius.is_finite() {
            return;
        }
        let path = kurbo::Circle::new(center, radius).to_path(0.1);
        self.ops.push(DrawOp::Fill { path, color });
    }

    pub fn image(&mut self, image: PreparedImage, dest: Rect, opacity: f32) {
        self.ops.push(DrawOp::Image {
            image,
            dest,
            opacity,
        });
    }
}

fn polyline(points: impl IntoIterator<Item = Point>, close: bool) -> Option<BezPath> {
    let mut it = points.into_iter();
    let first = it.next()?;
    let mut path = BezPath::new();
    path.move_to(first);
    let mut segments = 0usize;
    for p in it {
        path.line_to(p);
        segments += 1;
    }
    if segments == 0 {
        return None;
    }
    if close {
        path.close_path();
    }
    Some(path)
}

/// Uniform-scale mapping from world space (y up) into a pixel rectangle (y down).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct View {
    affine: Affine,
    scale: f64,
}

impl View {
    /// Fits `world` into `target` leaving `margin` pixels on every side, centered.
    ///
    /// A world with no extent (a single point) is shown as one unit square around it.
    pub fn fit(world: Rect, target: Rect, margin: f64) -> Self {
        let tiny = 1e-9 * world.center().to_vec2().hypot().max(1.0);
        let (ww, wh) = (world.width().abs(), world.height().abs());
        let (ww, wh) = if ww.max(wh) <= tiny {
            (1.0, 1.0)
        } else {
            (ww.max(tiny), wh.max(tiny))
        };
        let tw = (target.width() - 2.0 * margin).max(1.0);
        let th = (target.height() - 2.0 * margin).max(1.0);
        let scale = (tw / ww).min(th / wh);
        let affine = Affine::translate(target.center().to_vec2())
            * Affine::scale_non_uniform(scale, -scale)
            * Affine::translate(-world.center().to_vec2());
        Self { affine, scale }
    }

    pub fn apply(&self, z: Complex64) -> Point {
        self.affine * Point::new(z.re, z.im)
    }

    /// Pixels per world unit.
    pub fn scale(&self) -> f64 {
        self.scale
    }
}

/// Smallest rectangle holding every point, grown by `pad` on each side.
pub fn world_bounds(points: impl IntoIterator<Item = Complex64>, pad: f64) -> Rect {
    let mut it = points.into_iter();
    let Some(first) = it.next() else {
        return Rect::new(-1.0, -1.0, 1.0, 1.0);
    };
    let start = Rect::from_points(Point::new(first.re, first.im), Point::new(first.re, first.im));
    it.fold(start, |r, z| r.union_pt(Point::new(z.re, z.im)))
        .inflate(pad, pad)
}

/// Square rect of half-size `half` around `center`.
pub fn square_around(center: Point, half: f64) -> Rect {
    Rect::from_center_size(center, (2.0 * half, 2.0 * half))
}
