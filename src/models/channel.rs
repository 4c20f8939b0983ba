use crate::error::{SimError, SimResult};
use crate::models::common::{Complex, Position3D};
use crate::models::traits::{IFading, IPathLoss};
use rand::RngCore;

/// チャネル係数
///
/// 1対1リンクではスカラー、RIS素子配列とのリンクでは素子数と同じ長さのベクトルになります。
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelCoefficient {
    Scalar(Complex),
    Vector(Vec<Complex>),
}

impl ChannelCoefficient {
    pub fn into_scalar(self) -> SimResult<Complex> {
        match self {
            ChannelCoefficient::Scalar(h) => Ok(h),
            ChannelCoefficient::Vector(v) => Err(SimError::InvalidChannelRequest(format!(
                "スカラーを期待しましたが長さ {} のベクトルでした",
                v.len()
            ))),
        }
    }

    pub fn into_vector(self) -> SimResult<Vec<Complex>> {
        match self {
            ChannelCoefficient::Vector(v) => Ok(v),
            ChannelCoefficient::Scalar(_) => Err(SimError::InvalidChannelRequest(
                "ベクトルを期待しましたがスカラーでした".to_string(),
            )),
        }
    }
}

/// 経路損失とフェージングを合成するチャネルモデル
///
/// 各係数は `fading / sqrt(path_loss(d))` です。
#[derive(Debug, Clone)]
pub struct ChannelModel<P: IPathLoss, F: IFading> {
    path_loss: P,
    fading: F,
}

impl<P: IPathLoss, F: IFading> ChannelModel<P, F> {
    pub fn new(path_loss: P, fading: F) -> Self {
        Self { path_loss, fading }
    }

    pub fn path_loss(&self) -> &P {
        &self.path_loss
    }

    /// モードを検証してチャネルを生成
    ///
    /// 有効な組み合わせは次の3つのみです。
    ///
    /// * 送信点 + 受信点 → スカラー
    /// * 送信点 + 素子配列 → 送信点から各素子へのベクトル
    /// * 受信点 + 素子配列 → 各素子から受信点へのベクトル
    ///
    /// それ以外の組み合わせ、または空の素子配列は `InvalidChannelRequest` になります。
    pub fn channel(
        &self,
        rng: &mut dyn RngCore,
        tx: Option<&Position3D>,
        rx: Option<&Position3D>,
        elements: Option<&[Position3D]>,
    ) -> SimResult<ChannelCoefficient> {
        match (tx, rx, elements) {
            (Some(tx), Some(rx), None) => {
                Ok(ChannelCoefficient::Scalar(self.point_to_point(rng, tx, rx)))
            }
            (Some(endpoint), None, Some(elements)) | (None, Some(endpoint), Some(elements)) => {
                if elements.is_empty() {
                    return Err(SimError::InvalidChannelRequest(
                        "素子配列が空です".to_string(),
                    ));
                }
                Ok(ChannelCoefficient::Vector(self.point_to_array(rng, endpoint, elements)))
            }
            (Some(_), Some(_), Some(_)) => Err(SimError::InvalidChannelRequest(
                "送信点・受信点・素子配列を同時に指定することはできません".to_string(),
            )),
            (tx, rx, elements) => Err(SimError::InvalidChannelRequest(format!(
                "チャネルモードを決定できません (tx: {}, rx: {}, elements: {})",
                tx.is_some(),
                rx.is_some(),
                elements.is_some()
            ))),
        }
    }

    /// 1対1リンクのチャネル係数
    pub fn point_to_point(&self, rng: &mut dyn RngCore, tx: &Position3D, rx: &Position3D) -> Complex {
        let gain = self.fading.sample(rng, 1)[0];
        gain / self.path_loss.loss(tx.distance_3d(rx)).sqrt()
    }

    /// 1点と素子配列の間のチャネルベクトル（相反性により方向は問わない）
    pub fn point_to_array(
        &self,
        rng: &mut dyn RngCore,
        endpoint: &Position3D,
        elements: &[Position3D],
    ) -> Vec<Complex> {
        let gains = self.fading.sample(rng, elements.len());
        gains
            .into_iter()
            .zip(elements)
            .map(|(g, e)| g / self.path_loss.loss(endpoint.distance_3d(e)).sqrt())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fading::RayleighFading;
    use crate::models::path_loss::FreeSpacePathLoss;
    use approx::assert_relative_eq;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    /// フェージングを 1+0j に固定したテスト用生成器
    struct UnitFading;

    impl IFading for UnitFading {
        fn sample(&self, _rng: &mut dyn RngCore, count: usize) -> Vec<Complex> {
            vec![Complex::new(1.0, 0.0); count]
        }
    }

    fn model() -> ChannelModel<FreeSpacePathLoss, RayleighFading> {
        ChannelModel::new(FreeSpacePathLoss::new(3e9), RayleighFading::new())
    }

    fn elements(n: usize) -> Vec<Position3D> {
        (0..n).map(|k| Position3D::new(k as f64, 0.0, 60.0)).collect()
    }

    #[test]
    fn test_point_to_point_mode() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let a = Position3D::new(0.0, 0.0, 10.0);
        let b = Position3D::new(150.0, 0.0, 1.5);
        let h = model().channel(&mut rng, Some(&a), Some(&b), None).unwrap();
        assert!(matches!(h, ChannelCoefficient::Scalar(_)));
    }

    #[test]
    fn test_array_mode_length() {
        let a = Position3D::new(0.0, 0.0, 10.0);
        for n in [1, 4, 9, 64] {
            let mut rng = ChaCha8Rng::seed_from_u64(1);
            let els = elements(n);
            let forward = model().channel(&mut rng, Some(&a), None, Some(els.as_slice())).unwrap();
            assert_eq!(forward.into_vector().unwrap().len(), n);
            let backward = model().channel(&mut rng, None, Some(&a), Some(els.as_slice())).unwrap();
            assert_eq!(backward.into_vector().unwrap().len(), n);
        }
    }

    #[test]
    fn test_invalid_combinations_fail_fast() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let a = Position3D::new(0.0, 0.0, 10.0);
        let b = Position3D::new(1.0, 0.0, 10.0);
        let els = elements(4);
        let empty: Vec<Position3D> = Vec::new();
        let m = model();

        let cases: Vec<(Option<&Position3D>, Option<&Position3D>, Option<&[Position3D]>)> = vec![
            (Some(&a), Some(&b), Some(els.as_slice())),
            (None, None, Some(els.as_slice())),
            (None, None, None),
            (Some(&a), None, None),
            (None, Some(&b), None),
            (Some(&a), None, Some(empty.as_slice())),
        ];
        for (tx, rx, e) in cases {
            assert!(matches!(
                m.channel(&mut rng, tx, rx, e),
                Err(SimError::InvalidChannelRequest(_))
            ));
        }
    }

    #[test]
    fn test_amplitude_follows_path_loss_per_element() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let m = ChannelModel::new(FreeSpacePathLoss::new(3e9), UnitFading);
        let origin = Position3D::new(0.0, 0.0, 0.0);
        let els = vec![Position3D::new(10.0, 0.0, 0.0), Position3D::new(100.0, 0.0, 0.0)];
        let h = m.point_to_array(&mut rng, &origin, &els);

        assert_relative_eq!(h[0].norm(), 1.0 / m.path_loss().loss(10.0).sqrt(), max_relative = 1e-12);
        assert_relative_eq!(h[1].norm(), 1.0 / m.path_loss().loss(100.0).sqrt(), max_relative = 1e-12);
        assert_relative_eq!(h[0].norm() / h[1].norm(), 10.0, max_relative = 1e-9);
    }

    #[test]
    fn test_coincident_points_are_finite() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let p = Position3D::new(5.0, 5.0, 5.0);
        let h = model().point_to_point(&mut rng, &p, &p);
        assert!(h.re.is_finite() && h.im.is_finite());
    }

    #[test]
    fn test_coefficient_conversion() {
        assert!(ChannelCoefficient::Scalar(Complex::new(1.0, 0.0)).into_vector().is_err());
        assert!(ChannelCoefficient::Vector(vec![]).into_scalar().is_err());
    }
}
