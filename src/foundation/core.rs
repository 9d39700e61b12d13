use crate::foundation::error::{EpicycleError, EpicycleResult};

pub use kurbo::{Affine, BezPath, Point, Rect, Vec2};
pub use num_complex::Complex64;

/// One point of the closed curve, `re = x` and `im = y`.
pub type Sample = Complex64;

pub fn sample_to_point(s: Sample) -> Point {
    Point::new(s.re, s.im)
}

pub fn point_to_sample(p: Point) -> Sample {
    Complex64::new(p.x, p.y)
}

/// 0-based frame index within one animation.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct FrameIndex(pub u32);

impl FrameIndex {
    /// Normalized animation time `f / frames`, in `[0, 1)`.
    pub fn time(self, frames: u32) -> f64 {
        f64::from(self.0) / f64::from(frames)
    }
}

/// Frames-per-second represented as a rational `num/den`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Fps {
    pub num: u32,
    pub den: u32, // must be > 0
}

impl Fps {
    pub fn new(num: u32, den: u32) -> EpicycleResult<Self> {
        if den == 0 {
            return Err(EpicycleError::validation("fps den must be > 0"));
        }
        if num == 0 {
            return Err(EpicycleError::validation("fps num must be > 0"));
        }
        Ok(Self { num, den })
    }

    /// Duration of one frame in milliseconds as a `(numer, denom)` pair.
    pub fn frame_delay_ms(self) -> (u32, u32) {
        (self.den.saturating_mul(1000), self.num)
    }
}

impl Default for Fps {
    fn default() -> Self {
        Self { num: 25, den: 1 }
    }
}

/// Output canvas dimensions in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Canvas {
    pub width: u32,
    pub height: u32,
}

impl Canvas {
    pub const MAX_SIDE: u32 = 8192;

    pub fn validate(self) -> EpicycleResult<()> {
        for (name, v) in [("width", self.width), ("height", self.height)] {
            if !(2..=Self::MAX_SIDE).contains(&v) {
                return Err(EpicycleError::validation(format!(
                    "canvas {name} must be in 2..={}, got {v}",
                    Self::MAX_SIDE
                )));
            }
            if !v.is_multiple_of(2) {
                // yuv420p mp4 output needs even dimensions.
                return Err(EpicycleError::validation(format!(
                    "canvas {name} must be even, got {v}"
                )));
            }
        }
        Ok(())
    }

    pub fn rect(self) -> Rect {
        Rect::new(0.0, 0.0, f64::from(self.width), f64::from(self.height))
    }
}

impl Default for Canvas {
    fn default() -> Self {
        Self {
            width: 800,
            height: 800,
        }
    }
}

/// Straight-alpha RGBA8 color.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Rgba8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba8 {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 255)
    }

    pub fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }

    /// Premultiplied bytes, as stored in rendered pixmaps.
    pub fn premultiplied(self) -> [u8; 4] {
        fn premul(c: u8, a: u8) -> u8 {
            let c = u16::from(c);
            let a = u16::from(a);
            (((c * a) + 127) / 255) as u8
        }
        [
            premul(self.r, self.a),
            premul(self.g, self.a),
            premul(self.b, self.a),
            self.a,
        ]
    }
}
