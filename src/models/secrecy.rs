use crate::error::{ensure_same_len, SimResult};
use crate::models::common::{Complex, PhysicalParams};
use crate::models::ris::{optimal_phase, reflected_channel};
use serde::Serialize;

/// 1候補位置の秘匿レート評価結果
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SecrecyResult {
    /// 秘匿レート (bits/s/Hz)、常に 0 以上
    pub rate: f64,
    /// Bob の受信 SNR（真値）
    pub snr_bob: f64,
    /// Eve の受信 SNR（真値）
    pub snr_eve: f64,
}

/// 1候補位置で必要となる5本のリンク
#[derive(Debug, Clone, PartialEq)]
pub struct LinkChannels {
    /// Alice → Bob 直接波
    pub direct_bob: Complex,
    /// Alice → Eve 直接波
    pub direct_eve: Complex,
    /// Alice → RIS 各素子
    pub tx_ris: Vec<Complex>,
    /// RIS 各素子 → Bob
    pub ris_bob: Vec<Complex>,
    /// RIS 各素子 → Eve
    pub ris_eve: Vec<Complex>,
}

/// 秘匿レート評価器
///
/// RIS 位相を Bob 向けに同相合成し、直接波と合成した上で
/// `max(0, log2(1 + SNR_bob) - log2(1 + SNR_eve))` を計算します。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SecrecyRateEvaluator {
    tx_power_w: f64,
    noise_power_w: f64,
}

impl SecrecyRateEvaluator {
    pub fn new(params: &PhysicalParams) -> Self {
        Self {
            tx_power_w: params.tx_power_w,
            noise_power_w: params.noise_power_w,
        }
    }

    /// 受信 SNR
    pub fn snr(&self, channel: Complex) -> f64 {
        self.tx_power_w * channel.norm_sqr() / self.noise_power_w
    }

    /// 直接波と RIS 経路を合成して秘匿レートを計算
    pub fn rate(&self, links: &LinkChannels) -> SimResult<SecrecyResult> {
        let n = links.tx_ris.len();
        ensure_same_len(n, links.ris_bob.len())?;
        ensure_same_len(n, links.ris_eve.len())?;

        let phase = optimal_phase(&links.tx_ris, &links.ris_bob)?;
        // Eve 側にも Bob 向けの位相をそのまま適用する
        let ris_bob = reflected_channel(&links.tx_ris, &links.ris_bob, &phase)?;
        let ris_eve = reflected_channel(&links.tx_ris, &links.ris_eve, &phase)?;

        Ok(self.direct_rate(links.direct_bob + ris_bob, links.direct_eve + ris_eve))
    }

    /// 合成済みチャネルから秘匿レートを計算
    pub fn direct_rate(&self, h_bob: Complex, h_eve: Complex) -> SecrecyResult {
        let snr_bob = self.snr(h_bob);
        let snr_eve = self.snr(h_eve);
        let rate = ((1.0 + snr_bob).log2() - (1.0 + snr_eve).log2()).max(0.0);
        SecrecyResult { rate, snr_bob, snr_eve }
    }
}
