//! # Report モジュール
//!
//! 探索結果を外部の可視化ツール向けに整形・出力します。
//!
//! 出力内容はヒートマップ用の秘匿レートマップ全体、y ≒ 0 の断面、
//! 最適 UAV 位置と固定ノード位置で、JSON として書き出せます。

use crate::error::SimResult;
use crate::models::Position3D;
use crate::scenario::ScenarioConfig;
use crate::simulation::{CandidateGrid, LinkEndpoints, OptimizationOutcome, SearchOutcome};
use serde::Serialize;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path;
use tracing::info;

/// y 方向の断面（x に対する秘匿レート）
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrossSection {
    pub row: usize,
    pub y_m: f64,
    pub rates: Vec<f64>,
}

/// 秘匿レートマップの統計値
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GridStats {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

/// 探索レポート
#[derive(Debug, Clone, Serialize)]
pub struct SearchReport {
    pub scenario: String,
    pub seed: u64,
    pub repetitions: u32,
    pub parallel: bool,
    pub nodes: LinkEndpoints,
    pub altitude_m: f64,
    pub x_values: Vec<f64>,
    pub y_values: Vec<f64>,
    /// rows = y, cols = x
    pub secrecy_map: Vec<Vec<f64>>,
    pub stats: GridStats,
    pub cross_section: CrossSection,
    pub best: OptimizationOutcome,
}

/// y が 0 に最も近い行を選ぶ（同距離なら先の行）
pub fn center_row(y_values: &[f64]) -> usize {
    y_values
        .iter()
        .enumerate()
        .fold((0, f64::INFINITY), |(best, dist), (i, y)| {
            if y.abs() < dist { (i, y.abs()) } else { (best, dist) }
        })
        .0
}

impl SearchReport {
    pub fn new(
        scenario: &ScenarioConfig,
        grid: &CandidateGrid,
        endpoints: &LinkEndpoints,
        outcome: &SearchOutcome,
    ) -> Self {
        let row = center_row(&grid.y_values);
        Self {
            scenario: scenario.meta.name.clone(),
            seed: scenario.sim.seed,
            repetitions: scenario.sim.repetitions,
            parallel: scenario.sim.parallel,
            nodes: *endpoints,
            altitude_m: grid.altitude_m,
            x_values: grid.x_values.clone(),
            y_values: grid.y_values.clone(),
            secrecy_map: outcome.grid.to_rows(),
            stats: GridStats {
                min: outcome.grid.min(),
                max: outcome.grid.max(),
                mean: outcome.grid.mean(),
            },
            cross_section: CrossSection {
                row,
                y_m: grid.y_values.get(row).copied().unwrap_or(0.0),
                rates: outcome.grid.row(row).to_vec(),
            },
            best: outcome.best,
        }
    }

    pub fn best_position(&self) -> Position3D {
        self.best.position
    }

    /// JSON ファイルとして書き出し
    pub fn write_json<P: AsRef<Path>>(&self, path: P) -> SimResult<()> {
        let path = path.as_ref();
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, self)?;
        info!("レポートを出力しました: {}", path.display());
        Ok(())
    }

    /// 結果の概要を表示
    pub fn print_summary(&self) {
        println!("=== 探索結果 ===");
        println!(
            "秘匿レートマップ: {} x {} (y x x)",
            self.y_values.len(),
            self.x_values.len()
        );
        println!(
            "秘匿レート: 最小 {:.4} / 平均 {:.4} / 最大 {:.4} bits/s/Hz",
            self.stats.min, self.stats.mean, self.stats.max
        );

        let section = &self.cross_section;
        if let Some((i, peak)) = section
            .rates
            .iter()
            .copied()
            .enumerate()
            .fold(None, |acc: Option<(usize, f64)>, (i, r)| match acc {
                Some((_, best)) if best >= r => acc,
                _ => Some((i, r)),
            })
        {
            println!(
                "断面 y = {:.1} m のピーク: x = {:.1} m, {:.4} bits/s/Hz",
                section.y_m, self.x_values[i], peak
            );
        }
        println!();

        let p = self.best_position();
        println!("シミュレーション完了");
        println!("最適UAV位置 (x, y, z): ({:.1}, {:.1}, {:.1})", p.x, p.y, p.z);
        println!("最大秘匿レート: {:.4} bits/s/Hz", self.best.rate);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::SecrecyGrid;

    fn fixture() -> (ScenarioConfig, CandidateGrid, LinkEndpoints, SearchOutcome) {
        let scenario = ScenarioConfig::default();
        let grid = CandidateGrid::new(vec![0.0, 10.0, 20.0], vec![-10.0, 0.5, 10.0], 60.0);
        let endpoints = LinkEndpoints {
            alice: scenario.nodes.alice,
            bob: scenario.nodes.bob,
            eve: scenario.nodes.eve,
        };
        let values = vec![0.0, 0.1, 0.2, 0.3, 1.5, 0.4, 0.0, 0.0, 0.0];
        let outcome = SearchOutcome {
            grid: SecrecyGrid::from_values(3, 3, values).unwrap(),
            best: OptimizationOutcome {
                position: grid.position(1, 1),
                rate: 1.5,
                row: 1,
                col: 1,
            },
        };
        (scenario, grid, endpoints, outcome)
    }

    #[test]
    fn test_center_row() {
        assert_eq!(center_row(&[-80.0, -4.0, 0.0, 4.0, 80.0]), 2);
        assert_eq!(center_row(&[-2.0, 2.0]), 0);
        assert_eq!(center_row(&[5.0]), 0);
    }

    #[test]
    fn test_report_contents() {
        let (scenario, grid, endpoints, outcome) = fixture();
        let report = SearchReport::new(&scenario, &grid, &endpoints, &outcome);

        assert_eq!(report.cross_section.row, 1);
        assert_eq!(report.cross_section.y_m, 0.5);
        assert_eq!(report.cross_section.rates, vec![0.3, 1.5, 0.4]);
        assert_eq!(report.secrecy_map.len(), 3);
        assert_eq!(report.stats.max, 1.5);
        assert_eq!(report.best_position(), Position3D::new(10.0, 0.5, 60.0));
    }

    #[test]
    fn test_write_json() {
        let (scenario, grid, endpoints, outcome) = fixture();
        let report = SearchReport::new(&scenario, &grid, &endpoints, &outcome);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("report.json");
        report.write_json(&path).unwrap();

        let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["seed"], 2);
        assert_eq!(json["secrecy_map"].as_array().unwrap().len(), 3);
        assert_eq!(json["best"]["rate"], 1.5);
        assert_eq!(json["best"]["position"]["x_m"], 10.0);
        assert_eq!(json["nodes"]["bob"]["x_m"], 150.0);
    }
}
