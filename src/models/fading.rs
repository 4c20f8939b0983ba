//! Rayleigh フェージング生成
//!
//! 各サンプルは単位平均電力の円対称複素ガウス分布 CN(0, 1) に従います。
//! 実部・虚部はそれぞれ独立な N(0, 1/2) で、振幅はレイリー分布、位相は一様分布になります。

use crate::models::common::Complex;
use crate::models::traits::IFading;
use rand::RngCore;
use rand_distr::{Distribution, StandardNormal};
use std::f64::consts::FRAC_1_SQRT_2;

/// ブロックフェージング（1リンク1サンプル）のレイリー生成器
#[derive(Debug, Clone, Copy, Default)]
pub struct RayleighFading;

impl RayleighFading {
    pub fn new() -> Self {
        Self
    }
}

impl IFading for RayleighFading {
    fn sample(&self, rng: &mut dyn RngCore, count: usize) -> Vec<Complex> {
        (0..count)
            .map(|_| {
                let re: f64 = StandardNormal.sample(&mut *rng);
                let im: f64 = StandardNormal.sample(&mut *rng);
                Complex::new(re, im) * FRAC_1_SQRT_2
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_sample_length() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let fading = RayleighFading::new();
        assert_eq!(fading.sample(&mut rng, 0).len(), 0);
        assert_eq!(fading.sample(&mut rng, 1).len(), 1);
        assert_eq!(fading.sample(&mut rng, 64).len(), 64);
    }

    #[test]
    fn test_unit_average_power() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let samples = RayleighFading::new().sample(&mut rng, 20000);
        let n = samples.len() as f64;

        let power: f64 = samples.iter().map(|h| h.norm_sqr()).sum::<f64>() / n;
        assert!((power - 1.0).abs() < 0.05, "Power {} should be close to 1", power);

        let mean_re: f64 = samples.iter().map(|h| h.re).sum::<f64>() / n;
        let mean_im: f64 = samples.iter().map(|h| h.im).sum::<f64>() / n;
        assert!(mean_re.abs() < 0.03, "Mean I {} should be close to 0", mean_re);
        assert!(mean_im.abs() < 0.03, "Mean Q {} should be close to 0", mean_im);

        let var_re: f64 = samples.iter().map(|h| h.re.powi(2)).sum::<f64>() / n;
        assert!((var_re - 0.5).abs() < 0.03, "I variance {} should be close to 0.5", var_re);
    }

    #[test]
    fn test_deterministic() {
        let mut rng1 = ChaCha8Rng::seed_from_u64(7);
        let mut rng2 = ChaCha8Rng::seed_from_u64(7);
        let fading = RayleighFading::new();

        assert_eq!(fading.sample(&mut rng1, 16), fading.sample(&mut rng2, 16));
    }

    #[test]
    fn test_advances_stream() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let fading = RayleighFading::new();
        let first = fading.sample(&mut rng, 4);
        let second = fading.sample(&mut rng, 4);
        assert_ne!(first, second);
    }
}
