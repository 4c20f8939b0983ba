use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::ops::{Add, Sub};

/// 光速 (m/s)
pub const SPEED_OF_LIGHT: f64 = 299_792_458.0;

/// ボルツマン定数 (J/K)
pub const BOLTZMANN: f64 = 1.380_648_52e-23;

/// 複素チャネル係数
pub type Complex = Complex64;

/// 3次元位置を表す構造体
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position3D {
    #[serde(rename = "x_m")]
    pub x: f64, // m
    #[serde(rename = "y_m")]
    pub y: f64, // m
    #[serde(rename = "z_m")]
    pub z: f64, // m (altitude)
}

impl Position3D {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// 3次元距離を計算
    pub fn distance_3d(&self, other: &Position3D) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2) + (self.z - other.z).powi(2)).sqrt()
    }

    /// 全成分が有限値かどうか
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl Add for Position3D {
    type Output = Self;

    fn add(self, other: Self) -> Self::Output {
        Self::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }
}

impl Sub for Position3D {
    type Output = Self;

    fn sub(self, other: Self) -> Self::Output {
        Self::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }
}

/// 実行全体で共有する物理パラメータ
///
/// シナリオから一度だけ導出され、各コンポーネントへ参照で渡されます。
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PhysicalParams {
    /// 搬送波周波数 (Hz)
    pub frequency_hz: f64,
    /// 波長 (m)
    pub wavelength_m: f64,
    /// 送信電力 (W)
    pub tx_power_w: f64,
    /// 雑音電力 (W)
    pub noise_power_w: f64,
}

impl PhysicalParams {
    /// 無線設定から導出
    ///
    /// # 引数
    ///
    /// * `frequency_hz` - 搬送波周波数
    /// * `bandwidth_hz` - 帯域幅
    /// * `noise_figure_db` - 雑音指数
    /// * `tx_power_dbm` - 送信電力
    /// * `temperature_k` - 基準温度
    pub fn derive(
        frequency_hz: f64,
        bandwidth_hz: f64,
        noise_figure_db: f64,
        tx_power_dbm: f64,
        temperature_k: f64,
    ) -> Self {
        Self {
            frequency_hz,
            wavelength_m: SPEED_OF_LIGHT / frequency_hz,
            tx_power_w: dbm_to_watts(tx_power_dbm),
            noise_power_w: BOLTZMANN * temperature_k * bandwidth_hz * db_to_linear(noise_figure_db),
        }
    }
}

/// dBm を W に変換
pub fn dbm_to_watts(dbm: f64) -> f64 {
    db_to_linear(dbm - 30.0)
}

/// dB を真値に変換
pub fn db_to_linear(db: f64) -> f64 {
    10f64.powf(db / 10.0)
}

/// 両端を含む等間隔の数列
pub fn linspace(start: f64, stop: f64, count: usize) -> Vec<f64> {
    match count {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (count - 1) as f64;
            (0..count).map(|k| start + step * k as f64).collect()
        }
    }
}
