//! Contour extraction: source input -> ordered, closed, counter-clockwise samples.
//!
//! Rasters are binarized and traced with Suzuki-Abe border following
//! (`imageproc::contours::find_contours`). Of the outer borders found, the one enclosing the
//! largest area is kept, mapped to y-up coordinates, resampled uniformly by arc length and
//! centered on its centroid. Point lists skip tracing and centering.

use image::{GrayImage, Luma};
use imageproc::contours::{BorderType, Contour};

use crate::{
    config::AnimationConfig,
    foundation::{
        core::{Point, Sample, point_to_sample},
        error::{EpicycleError, EpicycleResult},
    },
    input::SourceInput,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExtractOpts {
    /// Resampled point count (M).
    pub samples: usize,
    pub threshold: u8,
    pub invert: bool,
}

impl From<&AnimationConfig> for ExtractOpts {
    fn from(cfg: &AnimationConfig) -> Self {
        Self {
            samples: cfg.samples,
            threshold: cfg.threshold,
            invert: cfg.invert,
        }
    }
}

#[tracing::instrument(skip(input))]
pub fn extract_samples(input: &SourceInput, opts: ExtractOpts) -> EpicycleResult<Vec<Sample>> {
    if opts.samples == 0 {
        return Err(EpicycleError::validation("sample count must be >= 1"));
    }

    let samples = match input {
        SourceInput::Points(points) => samples_from_points(points, opts.samples)?,
        SourceInput::Raster(raster) => {
            let outline = trace_outline(&raster.luma, opts.threshold, opts.invert)?;
            let mut samples: Vec<Sample> = resample_closed(&outline, opts.samples)
                .into_iter()
                .map(point_to_sample)
                .collect();
            center_in_place(&mut samples);
            samples
        }
    };

    tracing::info!(samples = samples.len(), "contour extracted");
    Ok(samples)
}

/// Orders and resamples an explicit point list without moving it.
pub fn samples_from_points(points: &[Point], samples: usize) -> EpicycleResult<Vec<Sample>> {
    if points.is_empty() {
        return Err(EpicycleError::extraction("point list is empty"));
    }
    if let Some(bad) = points.iter().find(|p| !p.x.is_finite() || !p.y.is_finite()) {
        return Err(EpicycleError::extraction(format!(
            "point list contains a non-finite coordinate ({}, {})",
            bad.x, bad.y
        )));
    }

    let mut outline = points.to_vec();
    orient_ccw(&mut outline);
    Ok(resample_closed(&outline, samples)
        .into_iter()
        .map(point_to_sample)
        .collect())
}

/// Traces the dominant closed boundary of `luma`, in y-up coordinates, counter-clockwise.
pub fn trace_outline(luma: &GrayImage, threshold: u8, invert: bool) -> EpicycleResult<Vec<Point>> {
    let binary = binarize(luma, threshold, invert);
    let contours: Vec<Contour<i32>> = imageproc::contours::find_contours(&binary);
    tracing::debug!(found = contours.len(), "traced borders");

    let best = contours
        .into_iter()
        .filter(|c| matches!(c.border_type, BorderType::Outer) && !c.points.is_empty())
        .map(|c| {
            let outline: Vec<Point> = c
                .points
                .iter()
                .map(|p| Point::new(f64::from(p.x), -f64::from(p.y)))
                .collect();
            (signed_area(&outline).abs(), outline)
        })
        .max_by(|a, b| {
            a.0.total_cmp(&b.0)
                .then_with(|| a.1.len().cmp(&b.1.len()))
        });

    let Some((area, mut outline)) = best else {
        return Err(EpicycleError::extraction(format!(
            "no contour found in {}x{} image (threshold {threshold}, invert {invert})",
            luma.width(),
            luma.height()
        )));
    };
    tracing::debug!(area, points = outline.len(), "selected largest outer border");

    orient_ccw(&mut outline);
    Ok(outline)
}

fn binarize(luma: &GrayImage, threshold: u8, invert: bool) -> GrayImage {
    let mut out = GrayImage::new(luma.width(), luma.height());
    for (dst, src) in out.pixels_mut().zip(luma.pixels()) {
        let fg = if invert {
            src.0[0] <= threshold
        } else {
            src.0[0] > threshold
        };
        *dst = Luma([if fg { 255 } else { 0 }]);
    }
    out
}

/// Shoelace area of the closed polygon; positive when counter-clockwise (y up).
pub fn signed_area(points: &[Point]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let n = points.len();
    let twice: f64 = (0..n)
        .map(|i| {
            let a = points[i];
            let b = points[(i + 1) % n];
            a.x * b.y - b.x * a.y
        })
        .sum();
    twice / 2.0
}

/// Reverses clockwise loops while keeping the first point first.
pub fn orient_ccw(points: &mut [Point]) {
    if signed_area(points) < 0.0 {
        points[1..].reverse();
    }
}

/// Uniform arc-length resampling of the closed polyline (last point joins the first).
pub fn resample_closed(points: &[Point], count: usize) -> Vec<Point> {
    let Some(&first) = points.first() else {
        return Vec::new();
    };
    let n = points.len();
    let seg: Vec<f64> = (0..n)
        .map(|i| points[i].distance(points[(i + 1) % n]))
        .collect();
    let total: f64 = seg.iter().sum();
    if n == 1 || total <= f64::EPSILON {
        return vec![first; count];
    }

    let step = total / count as f64;
    let mut out = Vec::with_capacity(count);
    let mut i = 0usize;
    let mut seg_start = 0.0f64;
    for j in 0..count {
        let target = j as f64 * step;
        while i + 1 < n && seg_start + seg[i] < target {
            seg_start += seg[i];
            i += 1;
        }
        let a = points[i];
        let b = points[(i + 1) % n];
        let u = if seg[i] > 0.0 {
            ((target - seg_start) / seg[i]).clamp(0.0, 1.0)
        } else {
            0.0
        };
        out.push(a.lerp(b, u));
    }
    out
}

fn center_in_place(samples: &mut [Sample]) {
    if samples.is_empty() {
        return;
    }
    let mean = samples.iter().sum::<Sample>() / samples.len() as f64;
    for s in samples.iter_mut() {
        *s -= mean;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::decode::prepare_raster;

    fn unit_square() -> Vec<Point> {
        vec![
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(1.0, 1.0),
            Point::new(0.0, 1.0),
        ]
    }

    #[test]
    fn resample_square_is_uniform() {
        let out = resample_closed(&unit_square(), 8);
        assert_eq!(out.len(), 8);
        for (i, p) in out.iter().enumerate() {
            let q = out[(i + 1) % out.len()];
            assert!((p.distance(q) - 0.5).abs() < 1e-12, "{p:?} -> {q:?}");
        }
        assert_eq!(out[0], Point::new(0.0, 0.0));
        assert!((out[1] - Point::new(0.5, 0.0)).hypot() < 1e-12);
    }

    #[test]
    fn degenerate_outline_repeats_the_point() {
        let out = resample_closed(&[Point::new(2.0, 3.0)], 5);
        assert_eq!(out, vec![Point::new(2.0, 3.0); 5]);

        let out = resample_closed(&[Point::new(1.0, 1.0), Point::new(1.0, 1.0)], 3);
        assert_eq!(out.len(), 3);
    }

    #[test]
    fn clockwise_input_is_reversed_keeping_start() {
        let mut cw: Vec<Point> = unit_square();
        cw[1..].reverse();
        assert!(signed_area(&cw) < 0.0);
        orient_ccw(&mut cw);
        assert_eq!(cw, unit_square());
        assert!((signed_area(&cw) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn empty_point_list_is_extraction_error() {
        let err = samples_from_points(&[], 16).unwrap_err();
        assert!(matches!(err, EpicycleError::Extraction(_)));
    }

    #[test]
    fn non_finite_points_are_rejected() {
        let err = samples_from_points(&[Point::new(f64::NAN, 0.0)], 4).unwrap_err();
        assert!(matches!(err, EpicycleError::Extraction(_)));
    }

    #[test]
    fn point_lists_are_not_recentered() {
        let s = samples_from_points(&unit_square(), 100).unwrap();
        assert_eq!(s.len(), 100);
        let mean = s.iter().sum::<Sample>() / 100.0;
        assert!((mean.re - 0.5).abs() < 1e-9);
        assert!((mean.im - 0.5).abs() < 1e-9);
    }

    fn disc_image(invert: bool) -> GrayImage {
        let (bg, fg) = if invert { (255u8, 0u8) } else { (0u8, 255u8) };
        GrayImage::from_fn(64, 48, |x, y| {
            let dx = x as f64 - 30.0;
            let dy = y as f64 - 22.0;
            Luma([if dx * dx + dy * dy <= 15.0 * 15.0 { fg } else { bg }])
        })
    }

    #[test]
    fn traces_dark_disc_on_light_background() {
        let outline = trace_outline(&disc_image(true), 127, true).unwrap();
        assert!(outline.len() > 40);
        let area = signed_area(&outline);
        // Boundary pixel centers enclose slightly less than the disc.
        assert!(area > 500.0 && area < 800.0, "area {area}");
    }

    #[test]
    fn picks_the_largest_of_several_shapes() {
        let mut img = GrayImage::from_pixel(80, 40, Luma([255]));
        for y in 5..10 {
            for x in 5..10 {
                img.put_pixel(x, y, Luma([0]));
            }
        }
        for y in 10..30 {
            for x in 40..70 {
                img.put_pixel(x, y, Luma([0]));
            }
        }
        let outline = trace_outline(&img, 127, true).unwrap();
        let xs = outline.iter().map(|p| p.x);
        let min_x = xs.clone().fold(f64::INFINITY, f64::min);
        let max_x = xs.fold(f64::NEG_INFINITY, f64::max);
        assert_eq!((min_x, max_x), (40.0, 69.0));
    }

    #[test]
    fn blank_image_has_no_contour() {
        let img = GrayImage::from_pixel(16, 16, Luma([255]));
        let err = trace_outline(&img, 127, true).unwrap_err();
        assert!(matches!(err, EpicycleError::Extraction(_)));
    }

    #[test]
    fn raster_samples_are_centered_and_ccw() {
        let raster = prepare_raster(&image::DynamicImage::ImageLuma8(disc_image(false)));
        let input = SourceInput::Raster(raster);
        let opts = ExtractOpts {
            samples: 128,
            threshold: 127,
            invert: false,
        };
        let samples = extract_samples(&input, opts).unwrap();
        assert_eq!(samples.len(), 128);
        let mean = samples.iter().sum::<Sample>() / 128.0;
        assert!(mean.norm() < 1e-9);

        let pts: Vec<Point> = samples.iter().map(|s| Point::new(s.re, s.im)).collect();
        assert!(signed_area(&pts) > 0.0);
    }
}
