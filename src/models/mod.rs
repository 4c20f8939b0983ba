// 基本的なデータ型と物理定数
pub mod common;

// 経路損失・フェージングのインターフェース（trait）定義
pub mod traits;

// 各物理モデルの実装
pub mod path_loss;
pub mod fading;
pub mod channel;
pub mod ris;
pub mod secrecy;

// 便利な re-export
pub use common::*;
pub use traits::*;
pub use path_loss::{FreeSpacePathLoss, MIN_DISTANCE_M};
pub use fading::RayleighFading;
pub use channel::{ChannelCoefficient, ChannelModel};
pub use ris::{optimal_phase, perfect_square_side, reflected_channel, square_layout, translate, PhaseProfile};
pub use secrecy::{LinkChannels, SecrecyRateEvaluator, SecrecyResult};
