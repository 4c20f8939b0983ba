use crate::models::common::SPEED_OF_LIGHT;
use crate::models::traits::IPathLoss;
use std::f64::consts::PI;

/// 距離の下限 (m)
///
/// 一致点での無限利得を避けるため、これ未満の距離はこの値に置き換えます。
pub const MIN_DISTANCE_M: f64 = 1e-6;

/// 自由空間経路損失モデル
///
/// `L = (4π·d·f / c)²`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FreeSpacePathLoss {
    pub frequency_hz: f64,
}

impl FreeSpacePathLoss {
    pub fn new(frequency_hz: f64) -> Self {
        Self { frequency_hz }
    }
}

impl IPathLoss for FreeSpacePathLoss {
    fn loss(&self, distance_m: f64) -> f64 {
        // NaN も下限に丸める
        let d = if distance_m > MIN_DISTANCE_M { distance_m } else { MIN_DISTANCE_M };
        (4.0 * PI * d * self.frequency_hz / SPEED_OF_LIGHT).powi(2)
    }
}
