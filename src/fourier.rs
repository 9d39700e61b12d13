//! Band-limited discrete Fourier series of a closed sample sequence.
//!
//! `c_k = (1/M) * sum_n s[n] * exp(-2*pi*i*k*n/M)` for `k` in `-N..=N`, computed with one full
//! FFT of length `M` and then narrowed to the band. When `M` is even and `N = M/2` the Nyquist
//! bin is shared by `k = +M/2` and `k = -M/2`, so each side gets half of it; otherwise the band
//! sum would count it twice.

use std::{collections::BTreeMap, f64::consts::TAU};

use rustfft::FftPlanner;

use crate::{
    config::TermOrder,
    epicycle::EpicycleChain,
    foundation::{
        core::{Complex64, Sample},
        error::{EpicycleError, EpicycleResult},
    },
};

/// The coefficient mapping `k -> c_k`, total over `-terms..=terms`.
#[derive(Clone, Debug, PartialEq)]
pub struct Spectrum {
    sample_count: usize,
    terms: usize,
    coeffs: BTreeMap<i64, Complex64>,
}

/// One coefficient in a serializable, human-readable shape.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CoefficientRecord {
    pub freq: i64,
    pub re: f64,
    pub im: f64,
    pub amplitude: f64,
    pub phase: f64,
}

impl Spectrum {
    /// Transforms `samples` (length M >= 1) keeping `terms` (N <= M/2) harmonics per side.
    #[tracing::instrument(skip(samples), fields(samples = samples.len()))]
    pub fn transform(samples: &[Sample], terms: usize) -> EpicycleResult<Self> {
        let m = samples.len();
        if m == 0 {
            return Err(EpicycleError::validation(
                "cannot transform an empty sample sequence",
            ));
        }
        let max = m / 2;
        if terms > max {
            return Err(EpicycleError::InvalidTermCount {
                requested: terms,
                samples: m,
                max,
            });
        }

        let mut bins = samples.to_vec();
        let mut planner = FftPlanner::<f64>::new();
        planner.plan_fft_forward(m).process(&mut bins);

        let scale = 1.0 / m as f64;
        let split_nyquist = m.is_multiple_of(2) && terms == max && max > 0;

        let mut coeffs = BTreeMap::new();
        let n = terms as i64;
        for k in -n..=n {
            let bin = k.rem_euclid(m as i64) as usize;
            let mut c = bins[bin] * scale;
            if split_nyquist && k.unsigned_abs() as usize == max {
                c *= 0.5;
            }
            coeffs.insert(k, c);
        }

        tracing::debug!(coefficients = coeffs.len(), "spectrum computed");
        Ok(Self {
            sample_count: m,
            terms,
            coeffs,
        })
    }

    pub fn sample_count(&self) -> usize {
        self.sample_count
    }

    pub fn terms(&self) -> usize {
        self.terms
    }

    pub fn len(&self) -> usize {
        self.coeffs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coeffs.is_empty()
    }

    pub fn get(&self, k: i64) -> Option<Complex64> {
        self.coeffs.get(&k).copied()
    }

    /// The `k = 0` term, i.e. the centroid of the samples.
    pub fn dc(&self) -> Complex64 {
        self.get(0).unwrap_or_default()
    }

    /// Coefficients in ascending frequency order.
    pub fn iter(&self) -> impl Iterator<Item = (i64, Complex64)> + '_ {
        self.coeffs.iter().map(|(&k, &c)| (k, c))
    }

    /// `P(t) = sum_k c_k * exp(2*pi*i*k*t)`, one turn per unit of `t`.
    pub fn reconstruct(&self, t: f64) -> Complex64 {
        self.coeffs
            .iter()
            .map(|(&k, &c)| c * Complex64::from_polar(1.0, TAU * k as f64 * t))
            .sum()
    }

    /// Evaluates the series at the original sample times `n / M`.
    pub fn reconstruct_samples(&self) -> Vec<Sample> {
        let m = self.sample_count as f64;
        (0..self.sample_count)
            .map(|n| self.reconstruct(n as f64 / m))
            .collect()
    }

    /// The spectrum as rotating vectors, stacked in `order`.
    pub fn epicycles(&self, order: TermOrder) -> EpicycleChain {
        EpicycleChain::from_spectrum(self, order)
    }

    pub fn records(&self) -> Vec<CoefficientRecord> {
        self.iter()
            .map(|(freq, c)| CoefficientRecord {
                freq,
                re: c.re,
                im: c.im,
                amplitude: c.norm(),
                phase: c.arg(),
            })
            .collect()
    }
}

/// Separate spectra of the x and y coordinate signals, each a real sequence.
#[derive(Clone, Debug, PartialEq)]
pub struct AxisSpectra {
    pub x: Spectrum,
    pub y: Spectrum,
}

impl AxisSpectra {
    pub fn transform(samples: &[Sample], terms: usize) -> EpicycleResult<Self> {
        let xs: Vec<Sample> = samples.iter().map(|s| Complex64::new(s.re, 0.0)).collect();
        let ys: Vec<Sample> = samples.iter().map(|s| Complex64::new(s.im, 0.0)).collect();
        Ok(Self {
            x: Spectrum::transform(&xs, terms)?,
            y: Spectrum::transform(&ys, terms)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn circle(m: usize, r: f64) -> Vec<Sample> {
        (0..m)
            .map(|n| Complex64::from_polar(r, TAU * n as f64 / m as f64))
            .collect()
    }

    #[test]
    fn pure_circle_lives_in_k_plus_one() {
        let s = Spectrum::transform(&circle(32, 2.0), 4).unwrap();
        assert_eq!(s.len(), 9);
        assert!((s.get(1).unwrap() - Complex64::new(2.0, 0.0)).norm() < 1e-12);
        for k in [-4, -3, -2, -1, 0, 2, 3, 4] {
            assert!(s.get(k).unwrap().norm() < 1e-12, "k={k}");
        }
    }

    #[test]
    fn band_is_total_and_symmetric() {
        let s = Spectrum::transform(&circle(10, 1.0), 3).unwrap();
        let keys: Vec<i64> = s.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec![-3, -2, -1, 0, 1, 2, 3]);
        assert_eq!(s.terms(), 3);
        assert_eq!(s.sample_count(), 10);
    }

    #[test]
    fn term_count_boundary() {
        let samples = circle(9, 1.0);
        assert!(Spectrum::transform(&samples, 4).is_ok());
        assert!(matches!(
            Spectrum::transform(&samples, 5),
            Err(EpicycleError::InvalidTermCount {
                requested: 5,
                samples: 9,
                max: 4
            })
        ));
    }

    #[test]
    fn empty_samples_are_rejected() {
        assert!(Spectrum::transform(&[], 0).is_err());
    }

    #[test]
    fn single_sample_is_pure_dc() {
        let s = Spectrum::transform(&[Complex64::new(3.0, -1.0)], 0).unwrap();
        assert_eq!(s.len(), 1);
        assert_eq!(s.dc(), Complex64::new(3.0, -1.0));
        assert_eq!(s.reconstruct(0.37), Complex64::new(3.0, -1.0));
    }

    #[test]
    fn even_full_band_splits_nyquist() {
        // Alternating signal is all Nyquist energy.
        let samples: Vec<Sample> = (0..4)
            .map(|n| Complex64::new(if n % 2 == 0 { 1.0 } else { -1.0 }, 0.0))
            .collect();
        let s = Spectrum::transform(&samples, 2).unwrap();
        assert!((s.get(2).unwrap() - Complex64::new(0.5, 0.0)).norm() < 1e-12);
        assert!((s.get(-2).unwrap() - Complex64::new(0.5, 0.0)).norm() < 1e-12);
        for (got, want) in s.reconstruct_samples().iter().zip(&samples) {
            assert!((got - want).norm() < 1e-12);
        }
    }

    #[test]
    fn axis_spectra_reconstruct_real_signals() {
        let samples = circle(16, 1.5);
        let axes = AxisSpectra::transform(&samples, 3).unwrap();
        for (i, s) in samples.iter().enumerate() {
            let t = i as f64 / 16.0;
            let x = axes.x.reconstruct(t);
            let y = axes.y.reconstruct(t);
            assert!((x.re - s.re).abs() < 1e-12);
            assert!((y.re - s.im).abs() < 1e-12);
            assert!(x.im.abs() < 1e-12 && y.im.abs() < 1e-12);
        }
    }

    #[test]
    fn records_carry_polar_form() {
        let s = Spectrum::transform(&circle(8, 1.0), 1).unwrap();
        let rec = s.records();
        assert_eq!(rec.len(), 3);
        let one = rec.iter().find(|r| r.freq == 1).unwrap();
        assert!((one.amplitude - 1.0).abs() < 1e-12);
        assert!(one.phase.abs() < 1e-12);
    }
}
