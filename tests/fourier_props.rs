use std::f64::consts::TAU;

use epicycles::{Complex64, Sample, Spectrum, TermOrder};

/// Deterministic scribble: a few harmonics plus a xorshift jitter.
fn scribble(m: usize, seed: u64) -> Vec<Sample> {
    let mut state = seed.max(1);
    let mut next = || {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        (state % 10_000) as f64 / 10_000.0 - 0.5
    };
    (0..m)
        .map(|n| {
            let a = TAU * n as f64 / m as f64;
            Complex64::new(
                3.0 * a.cos() + 0.7 * (3.0 * a).sin() + next(),
                2.0 * a.sin() - 0.4 * (5.0 * a).cos() + next(),
            )
        })
        .collect()
}

fn assert_close(a: &[Sample], b: &[Sample], tol: f64) {
    assert_eq!(a.len(), b.len());
    let scale = b.iter().map(|z| z.norm()).fold(1.0f64, f64::max);
    for (i, (x, y)) in a.iter().zip(b).enumerate() {
        assert!((x - y).norm() <= tol * scale, "sample {i}: {x} vs {y}");
    }
}

#[test]
fn full_band_reconstruction_reproduces_the_samples() {
    for m in [1usize, 2, 7, 64, 100, 257] {
        let samples = scribble(m, m as u64 * 31 + 7);
        let spectrum = Spectrum::transform(&samples, m / 2).unwrap();
        assert_close(&spectrum.reconstruct_samples(), &samples, 1e-9);
    }
}

#[test]
fn round_trip_is_idempotent() {
    let samples = scribble(96, 11);
    let first = Spectrum::transform(&samples, 48).unwrap();
    let again = Spectrum::transform(&first.reconstruct_samples(), 48).unwrap();
    for ((k1, c1), (k2, c2)) in first.iter().zip(again.iter()) {
        assert_eq!(k1, k2);
        assert!((c1 - c2).norm() < 1e-12, "k={k1}: {c1} vs {c2}");
    }
}

#[test]
fn transform_is_deterministic() {
    let samples = scribble(300, 5);
    let a = Spectrum::transform(&samples, 40).unwrap();
    let b = Spectrum::transform(&samples, 40).unwrap();
    assert_eq!(a, b);
}

#[test]
fn band_limited_series_matches_the_direct_sum() {
    let samples = scribble(50, 3);
    let m = samples.len() as f64;
    let spectrum = Spectrum::transform(&samples, 6).unwrap();
    for k in -6i64..=6 {
        let direct: Complex64 = samples
            .iter()
            .enumerate()
            .map(|(n, s)| s * Complex64::from_polar(1.0, -TAU * k as f64 * n as f64 / m))
            .sum::<Complex64>()
            / m;
        assert!((spectrum.get(k).unwrap() - direct).norm() < 1e-12, "k={k}");
    }
    assert_eq!(spectrum.get(7), None);
}

#[test]
fn chain_order_never_moves_the_tip() {
    let samples = scribble(80, 9);
    let spectrum = Spectrum::transform(&samples, 20).unwrap();
    let by_freq = spectrum.epicycles(TermOrder::Frequency);
    let by_amp = spectrum.epicycles(TermOrder::Amplitude);
    let origin = Complex64::new(0.0, 0.0);
    for f in 0..10 {
        let t = f as f64 / 10.0;
        let want = spectrum.reconstruct(t);
        assert!((by_freq.tip_at(origin, t) - want).norm() < 1e-9);
        assert!((by_amp.tip_at(origin, t) - want).norm() < 1e-9);
    }
}
