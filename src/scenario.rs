use crate::models::{linspace, perfect_square_side, PhysicalParams, Position3D};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// シナリオメタデータ
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ScenarioMeta {
    pub version: String,
    pub name: String,
    pub description: String,
}

impl Default for ScenarioMeta {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            name: "uav_ris_baseline".to_string(),
            description: "UAV搭載RISによる秘匿通信の基本シナリオ".to_string(),
        }
    }
}

/// シミュレーション設定
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub seed: u64,
    /// 1セルあたりの独立試行回数（1 = 単一試行）
    pub repetitions: u32,
    pub parallel: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: 2,
            repetitions: 1,
            parallel: false,
        }
    }
}

/// 無線設定
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RadioConfig {
    pub frequency_hz: f64,
    pub bandwidth_hz: f64,
    pub noise_figure_db: f64,
    pub tx_power_dbm: f64,
    pub temperature_k: f64,
}

impl Default for RadioConfig {
    fn default() -> Self {
        Self {
            frequency_hz: 3e9,
            bandwidth_hz: 1e6,
            noise_figure_db: 7.0,
            tx_power_dbm: 30.0,
            temperature_k: 290.0,
        }
    }
}

/// 固定ノード位置
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NodesConfig {
    /// 基地局
    pub alice: Position3D,
    /// 正規受信機
    pub bob: Position3D,
    /// 盗聴者
    pub eve: Position3D,
}

impl Default for NodesConfig {
    fn default() -> Self {
        Self {
            alice: Position3D::new(0.0, 0.0, 10.0),
            bob: Position3D::new(150.0, 0.0, 1.5),
            eve: Position3D::new(120.0, 40.0, 1.5),
        }
    }
}

/// 両端を含む等間隔の座標軸
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GridAxis {
    pub start_m: f64,
    pub stop_m: f64,
    pub count: usize,
}

impl GridAxis {
    pub fn values(&self) -> Vec<f64> {
        linspace(self.start_m, self.stop_m, self.count)
    }
}

/// UAV 探索範囲
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UavConfig {
    pub altitude_m: f64,
    pub x_grid: GridAxis,
    pub y_grid: GridAxis,
}

impl Default for UavConfig {
    fn default() -> Self {
        Self {
            altitude_m: 60.0,
            x_grid: GridAxis { start_m: 20.0, stop_m: 260.0, count: 61 },
            y_grid: GridAxis { start_m: -80.0, stop_m: 80.0, count: 41 },
        }
    }
}

/// RIS 設定
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RisConfig {
    /// 素子数（平方数）
    pub elements: usize,
    /// 素子間隔 (m)。省略時は半波長
    pub spacing_m: Option<f64>,
}

impl Default for RisConfig {
    fn default() -> Self {
        Self {
            elements: 64,
            spacing_m: None,
        }
    }
}

/// 完全なシナリオ設定
///
/// すべてのセクションは省略可能で、省略時は基本シナリオの値になります。
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ScenarioConfig {
    pub meta: ScenarioMeta,
    pub sim: SimulationConfig,
    pub radio: RadioConfig,
    pub nodes: NodesConfig,
    pub uav: UavConfig,
    pub ris: RisConfig,
}

impl ScenarioConfig {
    /// YAMLファイルからシナリオ設定を読み込み
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let path = path.as_ref();

        // ファイル存在チェック
        if !path.exists() {
            return Err(ScenarioError::FileNotFound(path.to_path_buf()));
        }

        // ファイル読み込み
        let contents = fs::read_to_string(path)
            .map_err(|e| ScenarioError::Io(path.to_path_buf(), e))?;

        // YAML解析
        let config: ScenarioConfig = serde_yaml::from_str(&contents)
            .map_err(|e| ScenarioError::Parse(path.to_path_buf(), e))?;

        // 基本的な検証
        config.validate()?;

        Ok(config)
    }

    /// 設定の基本的な検証
    pub fn validate(&self) -> Result<(), ScenarioError> {
        let radio = &self.radio;
        for (name, value) in [
            ("frequency_hz", radio.frequency_hz),
            ("bandwidth_hz", radio.bandwidth_hz),
            ("temperature_k", radio.temperature_k),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ScenarioError::Validation(format!("{} must be positive", name)));
            }
        }
        if !radio.noise_figure_db.is_finite() || !radio.tx_power_dbm.is_finite() {
            return Err(ScenarioError::Validation("radio levels must be finite".to_string()));
        }

        if self.sim.repetitions == 0 {
            return Err(ScenarioError::Validation("repetitions must be at least 1".to_string()));
        }

        // ノード位置の検証
        for (name, pos) in [("alice", &self.nodes.alice), ("bob", &self.nodes.bob), ("eve", &self.nodes.eve)] {
            if !pos.is_finite() {
                return Err(ScenarioError::Validation(format!("{} position must be finite", name)));
            }
        }

        // 探索グリッドの検証
        if !self.uav.altitude_m.is_finite() {
            return Err(ScenarioError::Validation("altitude_m must be finite".to_string()));
        }
        for (name, axis) in [("x_grid", &self.uav.x_grid), ("y_grid", &self.uav.y_grid)] {
            if axis.count == 0 {
                return Err(ScenarioError::Validation(format!("{}.count must be at least 1", name)));
            }
            if !axis.start_m.is_finite() || !axis.stop_m.is_finite() {
                return Err(ScenarioError::Validation(format!("{} bounds must be finite", name)));
            }
        }

        // RIS の検証
        if perfect_square_side(self.ris.elements).is_none() {
            return Err(ScenarioError::Validation(format!(
                "ris.elements {} is not a positive perfect square",
                self.ris.elements
            )));
        }
        if let Some(spacing) = self.ris.spacing_m {
            if !(spacing.is_finite() && spacing > 0.0) {
                return Err(ScenarioError::Validation("ris.spacing_m must be positive".to_string()));
            }
        }

        Ok(())
    }

    /// 実行時の物理パラメータを導出
    pub fn physical_params(&self) -> PhysicalParams {
        PhysicalParams::derive(
            self.radio.frequency_hz,
            self.radio.bandwidth_hz,
            self.radio.noise_figure_db,
            self.radio.tx_power_dbm,
            self.radio.temperature_k,
        )
    }

    /// RIS 素子間隔（省略時は半波長）
    pub fn ris_spacing_m(&self) -> f64 {
        self.ris
            .spacing_m
            .unwrap_or_else(|| self.physical_params().wavelength_m / 2.0)
    }

    /// 探索セル数
    pub fn cell_count(&self) -> usize {
        self.uav.x_grid.count * self.uav.y_grid.count
    }

    /// シナリオの概要を表示
    pub fn print_summary(&self) {
        let params = self.physical_params();

        println!("=== シナリオ情報 ===");
        println!("名前: {}", self.meta.name);
        println!("説明: {}", self.meta.description);
        println!("バージョン: {}", self.meta.version);
        println!();

        println!("=== シミュレーション設定 ===");
        println!("シード値: {}", self.sim.seed);
        println!("セルあたり試行回数: {}", self.sim.repetitions);
        println!("並列実行: {}", if self.sim.parallel { "有効" } else { "無効" });
        println!();

        println!("=== 無線設定 ===");
        println!("周波数: {:.3} GHz (波長 {:.4} m)", self.radio.frequency_hz / 1e9, params.wavelength_m);
        println!("帯域幅: {:.3} MHz", self.radio.bandwidth_hz / 1e6);
        println!("送信電力: {:.1} dBm ({:.3} W)", self.radio.tx_power_dbm, params.tx_power_w);
        println!("雑音指数: {:.1} dB / 雑音電力: {:.3e} W", self.radio.noise_figure_db, params.noise_power_w);
        println!();

        println!("=== ノード配置 ===");
        for (label, p) in [("Alice (基地局)", &self.nodes.alice), ("Bob (正規受信機)", &self.nodes.bob), ("Eve (盗聴者)", &self.nodes.eve)] {
            println!("{}: ({:.1}, {:.1}, {:.1})", label, p.x, p.y, p.z);
        }
        println!();

        println!("=== UAV / RIS ===");
        println!("高度: {:.1} m", self.uav.altitude_m);
        println!(
            "X: {:.1} .. {:.1} m ({}点) / Y: {:.1} .. {:.1} m ({}点) / 総セル数: {}",
            self.uav.x_grid.start_m, self.uav.x_grid.stop_m, self.uav.x_grid.count,
            self.uav.y_grid.start_m, self.uav.y_grid.stop_m, self.uav.y_grid.count,
            self.cell_count()
        );
        println!("RIS素子数: {} (間隔 {:.4} m)", self.ris.elements, self.ris_spacing_m());
    }
}

/// シナリオ読み込みエラー
#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("シナリオファイルが見つかりません: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("ファイル読み込みエラー {}: {}", .0.display(), .1)]
    Io(PathBuf, #[source] std::io::Error),

    #[error("YAML解析エラー {}: {}", .0.display(), .1)]
    Parse(PathBuf, #[source] serde_yaml::Error),

    #[error("設定検証エラー: {0}")]
    Validation(String),
}
