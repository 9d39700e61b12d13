//! Rotating vectors built from a [`Spectrum`], and the pen trace they draw.

use std::f64::consts::TAU;

use crate::{
    config::TermOrder,
    foundation::core::{Complex64, FrameIndex},
    fourier::Spectrum,
};

/// One rotating vector: length `radius`, angle `2*pi*freq*t + phase`.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub struct Epicycle {
    pub freq: i64,
    pub radius: f64,
    pub phase: f64,
}

impl Epicycle {
    pub fn from_coefficient(freq: i64, c: Complex64) -> Self {
        Self {
            freq,
            radius: c.norm(),
            phase: c.arg(),
        }
    }

    pub fn vector_at(&self, t: f64) -> Complex64 {
        Complex64::from_polar(self.radius, TAU * self.freq as f64 * t + self.phase)
    }
}

/// Epicycles in stacking order. Order changes the drawing, never the tip.
#[derive(Clone, Debug, PartialEq)]
pub struct EpicycleChain {
    links: Vec<Epicycle>,
}

impl EpicycleChain {
    pub fn from_spectrum(spectrum: &Spectrum, order: TermOrder) -> Self {
        let mut links: Vec<Epicycle> = spectrum
            .iter()
            .map(|(k, c)| Epicycle::from_coefficient(k, c))
            .collect();

        match order {
            // 0, +1, -1, +2, -2, ...
            TermOrder::Frequency => {
                links.sort_by_key(|e| (e.freq.unsigned_abs(), e.freq < 0));
            }
            TermOrder::Amplitude => links.sort_by(|a, b| {
                b.radius
                    .total_cmp(&a.radius)
                    .then_with(|| a.freq.unsigned_abs().cmp(&b.freq.unsigned_abs()))
                    .then_with(|| b.freq.cmp(&a.freq))
            }),
        }
        Self { links }
    }

    /// Same chain without the constant `k = 0` link.
    pub fn without_dc(mut self) -> Self {
        self.links.retain(|e| e.freq != 0);
        self
    }

    pub fn links(&self) -> &[Epicycle] {
        &self.links
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Largest distance the tip can reach from the anchor.
    pub fn reach(&self) -> f64 {
        self.links.iter().map(|e| e.radius).sum()
    }

    /// Joint positions at time `t`: `anchor`, then the tip of each link in turn.
    pub fn joints_at(&self, anchor: Complex64, t: f64) -> Vec<Complex64> {
        let mut out = Vec::with_capacity(self.links.len() + 1);
        let mut acc = anchor;
        out.push(acc);
        for link in &self.links {
            acc += link.vector_at(t);
            out.push(acc);
        }
        out
    }

    pub fn tip_at(&self, anchor: Complex64, t: f64) -> Complex64 {
        self.links
            .iter()
            .fold(anchor, |acc, link| acc + link.vector_at(t))
    }
}

/// Pen positions for every frame, computed once so frame `f` can draw the prefix `0..=f`.
#[derive(Clone, Debug, PartialEq)]
pub struct TracePrefix {
    points: Vec<Complex64>,
}

impl TracePrefix {
    pub fn precompute(frames: u32, mut pen_at: impl FnMut(f64) -> Complex64) -> Self {
        let points = (0..frames)
            .map(|f| pen_at(FrameIndex(f).time(frames)))
            .collect();
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Trace drawn up to and including `frame`.
    pub fn up_to(&self, frame: FrameIndex) -> &[Complex64] {
        let end = (frame.0 as usize + 1).min(self.points.len());
        &self.points[..end]
    }

    pub fn all(&self) -> &[Complex64] {
        &self.points
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::core::Sample;

    fn square_samples() -> Vec<Sample> {
        let pts = [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)];
        crate::contour::resample_closed(
            &pts.map(|(x, y)| kurbo::Point::new(x, y)),
            40,
        )
        .into_iter()
        .map(crate::foundation::core::point_to_sample)
        .collect()
    }

    #[test]
    fn frequency_order_starts_with_dc_and_alternates() {
        let s = Spectrum::transform(&square_samples(), 3).unwrap();
        let chain = EpicycleChain::from_spectrum(&s, TermOrder::Frequency);
        let freqs: Vec<i64> = chain.links().iter().map(|e| e.freq).collect();
        assert_eq!(freqs, vec![0, 1, -1, 2, -2, 3, -3]);
    }

    #[test]
    fn amplitude_order_is_descending() {
        let s = Spectrum::transform(&square_samples(), 5).unwrap();
        let chain = EpicycleChain::from_spectrum(&s, TermOrder::Amplitude);
        for w in chain.links().windows(2) {
            assert!(w[0].radius >= w[1].radius);
        }
    }

    #[test]
    fn tip_is_independent_of_order_and_matches_reconstruction() {
        let s = Spectrum::transform(&square_samples(), 6).unwrap();
        let by_freq = EpicycleChain::from_spectrum(&s, TermOrder::Frequency);
        let by_amp = EpicycleChain::from_spectrum(&s, TermOrder::Amplitude);
        for t in [0.0, 0.1, 0.5, 0.77] {
            let want = s.reconstruct(t);
            let a = by_freq.tip_at(Complex64::new(0.0, 0.0), t);
            let b = by_amp.tip_at(Complex64::new(0.0, 0.0), t);
            assert!((a - want).norm() < 1e-12);
            assert!((b - want).norm() < 1e-12);
            let joints = by_freq.joints_at(Complex64::new(0.0, 0.0), t);
            assert_eq!(joints.len(), by_freq.len() + 1);
            assert!((joints[joints.len() - 1] - a).norm() < 1e-12);
        }
    }

    #[test]
    fn without_dc_drops_only_k_zero() {
        let s = Spectrum::transform(&square_samples(), 2).unwrap();
        let chain = EpicycleChain::from_spectrum(&s, TermOrder::Frequency).without_dc();
        assert_eq!(chain.len(), 4);
        assert!(chain.links().iter().all(|e| e.freq != 0));
    }

    #[test]
    fn trace_prefix_grows_one_point_per_frame() {
        let trace = TracePrefix::precompute(5, |t| Complex64::new(t, 0.0));
        assert_eq!(trace.len(), 5);
        assert_eq!(trace.up_to(FrameIndex(0)).len(), 1);
        assert_eq!(trace.up_to(FrameIndex(4)).len(), 5);
        assert_eq!(trace.up_to(FrameIndex(99)).len(), 5);
        assert_eq!(trace.all()[2], Complex64::new(0.4, 0.0));
    }
}
