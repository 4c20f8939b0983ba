//! UAV 搭載 RIS による秘匿通信レート推定
//!
//! 固定の基地局 (Alice)・正規受信機 (Bob)・盗聴者 (Eve) に対し、
//! RIS を搭載した UAV の水平位置を格子探索して秘匿レートが最大となる位置を求めます。

pub mod error;
pub mod logging;
pub mod models;
pub mod report;
pub mod scenario;
pub mod simulation;
