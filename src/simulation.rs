//! # Simulation モジュール
//!
//! UAV 位置の格子探索を行うシミュレーションエンジンを提供します。
//!
//! 各候補位置で RIS 素子配列をワールド座標に配置し、5本のリンク
//! （Alice–Bob、Alice–Eve、Alice–RIS、RIS–Bob、RIS–Eve）のチャネルを新たに生成して
//! 秘匿レートを評価します。全セルの値を秘匿レートマップに格納し、
//! 最大値を与える位置を最適位置として記録します。
//!
//! ## 実行モード
//!
//! - **逐次実行**: シードから生成した乱数源1つを行優先順に全セルで共有
//! - **並列実行**: セル番号ごとに独立したストリームを持つ乱数源を使用（rayon）
//!
//! どちらのモードでも同じシードからはビット単位で同一の結果が得られます。
//! ただし両モードは異なる乱数列を使うため、互いの結果は一致しません。
//!
//! ## 既知の制限
//!
//! `repetitions = 1` のとき各セルの値は1回のフェージング実現値であり、期待値ではありません。
//! 最適位置がそのセル固有の乱数に左右される可能性があります。
//!
//! ## 使用例
//!
//! ```no_run
//! use rissim::scenario::ScenarioConfig;
//! use rissim::simulation::SearchEngine;
//!
//! let config = ScenarioConfig::from_file("scenarios/baseline.yaml")?;
//! let mut engine = SearchEngine::new(config, 1);
//! engine.initialize()?;
//! let outcome = engine.run()?;
//! println!("{:.4} bits/s/Hz", outcome.best.rate);
//! # Ok::<(), rissim::error::SimError>(())
//! ```

use crate::error::{SimError, SimResult};
use crate::models::*;
use crate::scenario::ScenarioConfig;
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;
use tracing::{debug, info, trace};

/// 進行状況を出力するセル間隔
pub const PROGRESS_INTERVAL_CELLS: usize = 100;

/// `done` セル目の完了時に進行状況を出力するか（詳細度1以上）
fn reports_progress(verbose_level: u8, done: usize, total: usize) -> bool {
    verbose_level > 0 && (done % PROGRESS_INTERVAL_CELLS == 0 || done == total)
}

/// セルごとの評価結果を trace 出力するか（詳細度3以上）
fn traces_cells(verbose_level: u8) -> bool {
    verbose_level > 2
}

fn log_progress(verbose_level: u8, done: usize, total: usize) {
    if reports_progress(verbose_level, done, total) {
        info!("進行状況: {:.1}% ({}/{}セル)", done as f64 / total as f64 * 100.0, done, total);
    }
}

/// UAV 候補位置の格子
///
/// 行が y、列が x に対応します（shape = (len(y), len(x))）。
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateGrid {
    pub x_values: Vec<f64>,
    pub y_values: Vec<f64>,
    pub altitude_m: f64,
}

impl CandidateGrid {
    pub fn new(x_values: Vec<f64>, y_values: Vec<f64>, altitude_m: f64) -> Self {
        Self { x_values, y_values, altitude_m }
    }

    pub fn rows(&self) -> usize {
        self.y_values.len()
    }

    pub fn cols(&self) -> usize {
        self.x_values.len()
    }

    pub fn len(&self) -> usize {
        self.rows() * self.cols()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn position(&self, row: usize, col: usize) -> Position3D {
        Position3D::new(self.x_values[col], self.y_values[row], self.altitude_m)
    }

    /// 行優先のセル番号を (row, col) に変換
    pub fn cell(&self, index: usize) -> (usize, usize) {
        (index / self.cols(), index % self.cols())
    }
}

/// 固定ノード位置
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LinkEndpoints {
    pub alice: Position3D,
    pub bob: Position3D,
    pub eve: Position3D,
}

/// 秘匿レートマップ (bits/s/Hz)
#[derive(Debug, Clone, PartialEq)]
pub struct SecrecyGrid {
    rows: usize,
    cols: usize,
    values: Vec<f64>,
}

impl SecrecyGrid {
    pub fn from_values(rows: usize, cols: usize, values: Vec<f64>) -> SimResult<Self> {
        if values.len() != rows * cols {
            return Err(SimError::ShapeMismatch {
                expected: rows * cols,
                actual: values.len(),
            });
        }
        Ok(Self { rows, cols, values })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.values[row * self.cols + col]
    }

    pub fn row(&self, row: usize) -> &[f64] {
        &self.values[row * self.cols..(row + 1) * self.cols]
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn to_rows(&self) -> Vec<Vec<f64>> {
        self.values.chunks(self.cols.max(1)).map(|r| r.to_vec()).collect()
    }

    pub fn max(&self) -> f64 {
        self.values.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }

    pub fn min(&self) -> f64 {
        self.values.iter().copied().fold(f64::INFINITY, f64::min)
    }

    pub fn mean(&self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        self.values.iter().sum::<f64>() / self.values.len() as f64
    }
}

/// 最適 UAV 位置
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OptimizationOutcome {
    pub position: Position3D,
    pub rate: f64,
    pub row: usize,
    pub col: usize,
}

/// 探索結果
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOutcome {
    pub grid: SecrecyGrid,
    pub best: OptimizationOutcome,
}

/// 行優先で最初に現れた最大値を選ぶ
fn select_best(grid: &CandidateGrid, values: &[f64]) -> SimResult<OptimizationOutcome> {
    let mut best: Option<OptimizationOutcome> = None;
    for (index, &rate) in values.iter().enumerate() {
        if best.is_none_or(|b| rate > b.rate) {
            let (row, col) = grid.cell(index);
            best = Some(OptimizationOutcome {
                position: grid.position(row, col),
                rate,
                row,
                col,
            });
        }
    }
    best.ok_or_else(|| SimError::InvalidGeometry("探索グリッドが空です".to_string()))
}

/// 格子探索による UAV 位置最適化
pub struct GridSearchOptimizer<P: IPathLoss, F: IFading> {
    channel: ChannelModel<P, F>,
    evaluator: SecrecyRateEvaluator,
    repetitions: u32,
    verbose_level: u8,
}

impl<P: IPathLoss, F: IFading> GridSearchOptimizer<P, F> {
    pub fn new(channel: ChannelModel<P, F>, evaluator: SecrecyRateEvaluator) -> Self {
        Self {
            channel,
            evaluator,
            repetitions: 1,
            verbose_level: 0,
        }
    }

    /// セルあたりの独立試行回数を設定（0 は 1 として扱う）
    pub fn with_repetitions(mut self, repetitions: u32) -> Self {
        self.repetitions = repetitions.max(1);
        self
    }

    /// ログ詳細度を設定
    pub fn with_verbosity(mut self, verbose_level: u8) -> Self {
        self.verbose_level = verbose_level;
        self
    }

    /// 5本のリンクのチャネルを生成
    ///
    /// 乱数の消費順は Alice–Bob、Alice–Eve、Alice–RIS、RIS–Bob、RIS–Eve です。
    pub fn draw_links(
        &self,
        rng: &mut dyn RngCore,
        ris_world: &[Position3D],
        endpoints: &LinkEndpoints,
    ) -> SimResult<LinkChannels> {
        let ch = &self.channel;
        Ok(LinkChannels {
            direct_bob: ch.channel(rng, Some(&endpoints.alice), Some(&endpoints.bob), None)?.into_scalar()?,
            direct_eve: ch.channel(rng, Some(&endpoints.alice), Some(&endpoints.eve), None)?.into_scalar()?,
            tx_ris: ch.channel(rng, Some(&endpoints.alice), None, Some(ris_world))?.into_vector()?,
            ris_bob: ch.channel(rng, None, Some(&endpoints.bob), Some(ris_world))?.into_vector()?,
            ris_eve: ch.channel(rng, None, Some(&endpoints.eve), Some(ris_world))?.into_vector()?,
        })
    }

    /// 1候補位置の秘匿レート（試行回数が2以上なら平均）
    pub fn evaluate_cell(
        &self,
        rng: &mut dyn RngCore,
        uav: Position3D,
        ris_local: &[Position3D],
        endpoints: &LinkEndpoints,
    ) -> SimResult<f64> {
        let ris_world = translate(ris_local, uav);
        let mut total = 0.0;
        for _ in 0..self.repetitions {
            let links = self.draw_links(rng, &ris_world, endpoints)?;
            let result = self.evaluator.rate(&links)?;
            if traces_cells(self.verbose_level) {
                trace!(
                    "UAV ({:.1}, {:.1}): Rs={:.4} SNR_b={:.3e} SNR_e={:.3e}",
                    uav.x, uav.y, result.rate, result.snr_bob, result.snr_eve
                );
            }
            total += result.rate;
        }
        Ok(total / self.repetitions as f64)
    }

    /// 逐次探索
    ///
    /// 全セルを行優先順に評価し、1つの乱数源を共有します。
    /// 同値の最大値は先に評価したセルを採用します。
    pub fn search(
        &self,
        grid: &CandidateGrid,
        ris_local: &[Position3D],
        endpoints: &LinkEndpoints,
        rng: &mut dyn RngCore,
    ) -> SimResult<SearchOutcome> {
        if grid.is_empty() {
            return Err(SimError::InvalidGeometry("探索グリッドが空です".to_string()));
        }

        let total = grid.len();
        let mut values = Vec::with_capacity(total);
        for index in 0..total {
            let (row, col) = grid.cell(index);
            values.push(self.evaluate_cell(rng, grid.position(row, col), ris_local, endpoints)?);
            log_progress(self.verbose_level, index + 1, total);
        }

        let best = select_best(grid, &values)?;
        Ok(SearchOutcome {
            grid: SecrecyGrid::from_values(grid.rows(), grid.cols(), values)?,
            best,
        })
    }

    /// セル番号から独立した乱数ストリームを生成
    pub fn cell_rng(seed: u64, index: usize) -> ChaCha8Rng {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        rng.set_stream(index as u64);
        rng
    }
}

impl<P, F> GridSearchOptimizer<P, F>
where
    P: IPathLoss + Sync,
    F: IFading + Sync,
{
    /// 並列探索
    ///
    /// 各セルは `cell_rng(seed, index)` の乱数源で評価されるため、
    /// スレッドの実行順序によらず結果は再現可能です。
    /// 最大値の選択はセル番号順に行い、同値なら行優先で先のセルを採用します。
    pub fn search_parallel(
        &self,
        grid: &CandidateGrid,
        ris_local: &[Position3D],
        endpoints: &LinkEndpoints,
        seed: u64,
    ) -> SimResult<SearchOutcome> {
        if grid.is_empty() {
            return Err(SimError::InvalidGeometry("探索グリッドが空です".to_string()));
        }

        let total = grid.len();
        let done = AtomicUsize::new(0);
        let values = (0..total)
            .into_par_iter()
            .map(|index| -> SimResult<f64> {
                let (row, col) = grid.cell(index);
                let mut rng = Self::cell_rng(seed, index);
                let rate = self.evaluate_cell(&mut rng, grid.position(row, col), ris_local, endpoints)?;
                log_progress(self.verbose_level, done.fetch_add(1, Ordering::Relaxed) + 1, total);
                Ok(rate)
            })
            .collect::<SimResult<Vec<f64>>>()?;

        let best = select_best(grid, &values)?;
        Ok(SearchOutcome {
            grid: SecrecyGrid::from_values(grid.rows(), grid.cols(), values)?,
            best,
        })
    }
}

/// シナリオから探索を構成・実行するエンジン
pub struct SearchEngine {
    pub scenario_config: ScenarioConfig,
    pub verbose_level: u8,

    pub params: PhysicalParams,
    pub grid: CandidateGrid,
    pub ris_local: Vec<Position3D>,
    pub endpoints: LinkEndpoints,
}

impl SearchEngine {
    pub fn new(scenario: ScenarioConfig, verbose_level: u8) -> Self {
        let params = scenario.physical_params();
        let endpoints = LinkEndpoints {
            alice: scenario.nodes.alice,
            bob: scenario.nodes.bob,
            eve: scenario.nodes.eve,
        };

        Self {
            params,
            grid: CandidateGrid::new(Vec::new(), Vec::new(), scenario.uav.altitude_m),
            ris_local: Vec::new(),
            endpoints,
            scenario_config: scenario,
            verbose_level,
        }
    }

    /// 探索グリッドと RIS 素子配置を構築
    pub fn initialize(&mut self) -> SimResult<()> {
        if self.verbose_level > 0 {
            info!("探索エンジンを初期化中...");
        }

        self.scenario_config.validate()?;

        let uav = &self.scenario_config.uav;
        self.grid = CandidateGrid::new(uav.x_grid.values(), uav.y_grid.values(), uav.altitude_m);

        let spacing = self.scenario_config.ris_spacing_m();
        self.ris_local = square_layout(self.scenario_config.ris.elements, spacing)?;

        if self.verbose_level > 0 {
            info!("初期化完了:");
            info!("  探索セル: {} x {} = {}", self.grid.rows(), self.grid.cols(), self.grid.len());
            info!("  RIS素子: {} (間隔 {:.4} m)", self.ris_local.len(), spacing);
        }
        if self.verbose_level > 1 {
            debug!(
                "送信電力: {:.3} W, 雑音電力: {:.3e} W, 波長: {:.4} m",
                self.params.tx_power_w, self.params.noise_power_w, self.params.wavelength_m
            );
        }

        Ok(())
    }

    fn optimizer(&self) -> GridSearchOptimizer<FreeSpacePathLoss, RayleighFading> {
        let channel = ChannelModel::new(FreeSpacePathLoss::new(self.params.frequency_hz), RayleighFading::new());
        GridSearchOptimizer::new(channel, SecrecyRateEvaluator::new(&self.params))
            .with_repetitions(self.scenario_config.sim.repetitions)
            .with_verbosity(self.verbose_level)
    }

    /// 探索を実行
    pub fn run(&self) -> SimResult<SearchOutcome> {
        if self.ris_local.is_empty() || self.grid.is_empty() {
            return Err(SimError::InvalidGeometry("エンジンが初期化されていません".to_string()));
        }

        let sim = &self.scenario_config.sim;
        info!("=== 探索実行開始 ===");
        info!(
            "シード: {}, 試行回数: {}, 並列: {}",
            sim.seed, sim.repetitions, sim.parallel
        );

        let started = Instant::now();
        let optimizer = self.optimizer();
        let outcome = if sim.parallel {
            optimizer.search_parallel(&self.grid, &self.ris_local, &self.endpoints, sim.seed)?
        } else {
            let mut rng = ChaCha8Rng::seed_from_u64(sim.seed);
            optimizer.search(&self.grid, &self.ris_local, &self.endpoints, &mut rng)?
        };

        info!("=== 探索完了 ===");
        info!("評価セル数: {}", outcome.grid.values().len());
        info!("実行時間: {:.2}秒", started.elapsed().as_secs_f64());
        if self.verbose_level > 0 {
            info!(
                "最適位置: ({:.1}, {:.1}, {:.1}) / 秘匿レート: {:.4} bits/s/Hz",
                outcome.best.position.x, outcome.best.position.y, outcome.best.position.z, outcome.best.rate
            );
        }

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::GridAxis;

    fn small_scenario(parallel: bool) -> ScenarioConfig {
        let mut config = ScenarioConfig::default();
        config.sim.seed = 9;
        config.sim.parallel = parallel;
        config.uav.x_grid = GridAxis { start_m: 20.0, stop_m: 260.0, count: 7 };
        config.uav.y_grid = GridAxis { start_m: -80.0, stop_m: 80.0, count: 5 };
        config.ris.elements = 16;
        config
    }

    fn run(config: ScenarioConfig) -> SearchOutcome {
        let mut engine = SearchEngine::new(config, 0);
        engine.initialize().unwrap();
        engine.run().unwrap()
    }

    fn assert_best_is_grid_max(outcome: &SearchOutcome, grid: &CandidateGrid) {
        let max = outcome.grid.max();
        assert_eq!(outcome.best.rate, max);
        assert_eq!(outcome.grid.get(outcome.best.row, outcome.best.col), max);
        assert_eq!(outcome.best.position, grid.position(outcome.best.row, outcome.best.col));

        // 行優先で最初の最大値
        let first = outcome.grid.values().iter().position(|&v| v == max).unwrap();
        assert_eq!(grid.cell(first), (outcome.best.row, outcome.best.col));
    }

    #[test]
    fn test_grid_shape_and_non_negative() {
        let config = small_scenario(false);
        let mut engine = SearchEngine::new(config, 0);
        engine.initialize().unwrap();
        let outcome = engine.run().unwrap();

        assert_eq!(outcome.grid.rows(), 5);
        assert_eq!(outcome.grid.cols(), 7);
        assert_eq!(outcome.grid.values().len(), 35);
        assert!(outcome.grid.values().iter().all(|&v| v >= 0.0 && v.is_finite()));
        assert_best_is_grid_max(&outcome, &engine.grid);
        assert_eq!(outcome.best.position.z, 60.0);
    }

    #[test]
    fn test_sequential_is_deterministic() {
        let a = run(small_scenario(false));
        let b = run(small_scenario(false));
        assert_eq!(a, b);
    }

    #[test]
    fn test_parallel_is_deterministic() {
        let a = run(small_scenario(true));
        let b = run(small_scenario(true));
        assert_eq!(a, b);

        let mut engine = SearchEngine::new(small_scenario(true), 0);
        engine.initialize().unwrap();
        assert_best_is_grid_max(&a, &engine.grid);
    }

    #[test]
    fn test_different_seed_changes_grid() {
        let a = run(small_scenario(false));
        let mut config = small_scenario(false);
        config.sim.seed = 10;
        let b = run(config);
        assert_ne!(a.grid, b.grid);
    }

    #[test]
    fn test_repetitions_average() {
        let mut config = small_scenario(false);
        config.sim.repetitions = 4;
        let outcome = run(config);
        assert_eq!(outcome.grid.values().len(), 35);
        assert!(outcome.grid.values().iter().all(|&v| v >= 0.0));
    }

    #[test]
    fn test_parallel_matches_per_cell_streams() {
        let mut engine = SearchEngine::new(small_scenario(true), 0);
        engine.initialize().unwrap();
        let outcome = engine.run().unwrap();
        let optimizer = engine.optimizer();

        let index = 12;
        let (row, col) = engine.grid.cell(index);
        let mut rng = GridSearchOptimizer::<FreeSpacePathLoss, RayleighFading>::cell_rng(9, index);
        let rate = optimizer
            .evaluate_cell(&mut rng, engine.grid.position(row, col), &engine.ris_local, &engine.endpoints)
            .unwrap();
        assert_eq!(outcome.grid.get(row, col), rate);
    }

    #[test]
    fn test_tie_breaks_to_first_cell() {
        let grid = CandidateGrid::new(vec![0.0, 1.0], vec![0.0, 1.0], 60.0);
        let best = select_best(&grid, &[0.5, 2.0, 1.0, 2.0]).unwrap();
        assert_eq!((best.row, best.col), (0, 1));
        assert_eq!(best.position, Position3D::new(1.0, 0.0, 60.0));

        let zeros = select_best(&grid, &[0.0; 4]).unwrap();
        assert_eq!((zeros.row, zeros.col), (0, 0));
    }

    #[test]
    fn test_progress_gating() {
        // 詳細度0では出力しない
        assert!(!reports_progress(0, PROGRESS_INTERVAL_CELLS, 1000));
        assert!(!reports_progress(0, 1000, 1000));

        assert!(reports_progress(1, PROGRESS_INTERVAL_CELLS, 1000));
        assert!(reports_progress(1, 3 * PROGRESS_INTERVAL_CELLS, 1000));
        assert!(!reports_progress(1, PROGRESS_INTERVAL_CELLS + 1, 1000));
        assert!(!reports_progress(1, 1, 1000));
        // 最終セルは間隔に関係なく出力
        assert!(reports_progress(1, 35, 35));
        assert!(!reports_progress(1, 34, 35));

        assert!(!traces_cells(0));
        assert!(!traces_cells(2));
        assert!(traces_cells(3));
    }

    #[test]
    fn test_verbosity_does_not_change_results() {
        let quiet = run(small_scenario(false));
        let mut engine = SearchEngine::new(small_scenario(false), 3);
        engine.initialize().unwrap();
        assert_eq!(engine.optimizer().verbose_level, 3);
        assert_eq!(engine.run().unwrap(), quiet);
    }

    #[test]
    fn test_empty_grid_is_rejected() {
        let grid = CandidateGrid::new(Vec::new(), vec![0.0], 60.0);
        let channel = ChannelModel::new(FreeSpacePathLoss::new(3e9), RayleighFading::new());
        let params = PhysicalParams::derive(3e9, 1e6, 7.0, 30.0, 290.0);
        let optimizer = GridSearchOptimizer::new(channel, SecrecyRateEvaluator::new(&params));
        let endpoints = LinkEndpoints {
            alice: Position3D::new(0.0, 0.0, 10.0),
            bob: Position3D::new(150.0, 0.0, 1.5),
            eve: Position3D::new(120.0, 40.0, 1.5),
        };
        let layout = square_layout(4, 0.05).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(0);

        assert!(matches!(
            optimizer.search(&grid, &layout, &endpoints, &mut rng),
            Err(SimError::InvalidGeometry(_))
        ));
        assert!(matches!(
            optimizer.search_parallel(&grid, &layout, &endpoints, 0),
            Err(SimError::InvalidGeometry(_))
        ));
    }

    #[test]
    fn test_run_requires_initialize() {
        let engine = SearchEngine::new(small_scenario(false), 0);
        assert!(matches!(engine.run(), Err(SimError::InvalidGeometry(_))));
    }

    #[test]
    fn test_secrecy_grid_accessors() {
        let grid = SecrecyGrid::from_values(2, 3, vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        assert_eq!(grid.get(1, 2), 5.0);
        assert_eq!(grid.row(1), &[3.0, 4.0, 5.0]);
        assert_eq!(grid.to_rows(), vec![vec![0.0, 1.0, 2.0], vec![3.0, 4.0, 5.0]]);
        assert_eq!(grid.max(), 5.0);
        assert_eq!(grid.min(), 0.0);
        assert_eq!(grid.mean(), 2.5);
        assert!(SecrecyGrid::from_values(2, 2, vec![0.0; 3]).is_err());
    }
}
