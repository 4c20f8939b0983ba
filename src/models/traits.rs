use crate::models::common::Complex;
use rand::RngCore;

/// 大規模減衰（経路損失）モデルのインターフェース
pub trait IPathLoss {
    /// 距離 (m) に対する経路損失（真値、1以上を想定）
    fn loss(&self, distance_m: f64) -> f64;
}

/// 小規模フェージング生成器のインターフェース
///
/// 乱数源は呼び出し側が明示的に渡します。
/// 並列実行時はセルごとに独立したサブストリームを渡してください。
pub trait IFading {
    /// `count` 個の複素利得を生成
    fn sample(&self, rng: &mut dyn RngCore, count: usize) -> Vec<Complex>;
}
