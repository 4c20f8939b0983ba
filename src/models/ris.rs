//! # RIS モジュール
//!
//! UAV に搭載した再構成可能反射面 (RIS) の素子配置と位相制御を提供します。
//!
//! ## 主要機能
//!
//! - **素子配置**: 一辺 `side` 個の正方格子（N = side²）のローカル座標を生成
//! - **座標変換**: ローカル配置を UAV 位置へ平行移動してワールド座標の素子配列を生成
//! - **同相合成**: 各反射経路が目標受信機でゼロ位相になる位相シフトを計算
//!
//! 位相は正規受信機 (Bob) のみを対象に決めており、盗聴者 (Eve) 側の影響は考慮しません。
//! そのため得られる秘匿レートはこの固定位相方式での値であり、
//! 秘匿レートを直接最大化した設計での上限値ではありません。

use crate::error::{ensure_same_len, SimError, SimResult};
use crate::models::common::{Complex, Position3D};

/// 素子ごとの位相シフト（ラジアン、[-π, π]）
pub type PhaseProfile = Vec<f64>;

/// 正方格子のローカル素子配置を生成
///
/// 各軸の座標は `(k - (side - 1) / 2) * spacing`、z = 0 です。
/// 並び順は x が最も速く変化する行優先順です。
///
/// # 引数
///
/// * `elements` - 素子数（正の平方数）
/// * `spacing_m` - 素子間隔 (m)
pub fn square_layout(elements: usize, spacing_m: f64) -> SimResult<Vec<Position3D>> {
    let side = perfect_square_side(elements).ok_or_else(|| {
        SimError::InvalidGeometry(format!("素子数 {} は正の平方数ではありません", elements))
    })?;

    let center = (side as f64 - 1.0) / 2.0;
    let offsets: Vec<f64> = (0..side).map(|k| (k as f64 - center) * spacing_m).collect();

    Ok(offsets
        .iter()
        .flat_map(|&y| offsets.iter().map(move |&x| Position3D::new(x, y, 0.0)))
        .collect())
}

/// ローカル配置を `origin` へ平行移動
pub fn translate(local: &[Position3D], origin: Position3D) -> Vec<Position3D> {
    local.iter().map(|&p| p + origin).collect()
}

/// `n` が正の平方数なら一辺の長さを返す
pub fn perfect_square_side(n: usize) -> Option<usize> {
    if n == 0 {
        return None;
    }
    let side = n.isqrt();
    (side.checked_mul(side) == Some(n)).then_some(side)
}

/// 同相合成のための最適位相
///
/// `phase[i] = -arg(h_forward[i] * h_backward[i])`
pub fn optimal_phase(h_forward: &[Complex], h_backward: &[Complex]) -> SimResult<PhaseProfile> {
    ensure_same_len(h_forward.len(), h_backward.len())?;
    Ok(h_forward
        .iter()
        .zip(h_backward)
        .map(|(f, b)| -(f * b).arg())
        .collect())
}

/// 位相プロファイルを適用した RIS 経由の合成チャネル
///
/// `Σ h_forward[i] · exp(j·phase[i]) · h_backward[i]`
pub fn reflected_channel(
    h_forward: &[Complex],
    h_backward: &[Complex],
    phase: &[f64],
) -> SimResult<Complex> {
    ensure_same_len(h_forward.len(), h_backward.len())?;
    ensure_same_len(h_forward.len(), phase.len())?;
    Ok(h_forward
        .iter()
        .zip(h_backward)
        .zip(phase)
        .map(|((f, b), &theta)| f * Complex::from_polar(1.0, theta) * b)
        .sum())
}
