use anyhow::Result;
use std::time::Duration;

use super::keypoint::PoseResult;

/// 推論1回分の所要時間
#[derive(Debug, Clone, Copy)]
pub struct TimingInfo {
    pub total: Duration,
}

impl TimingInfo {
    pub fn new(total: Duration) -> Self {
        Self { total }
    }

    /// ミリ秒表示用
    pub fn total_ms(&self) -> f64 {
        self.total.as_secs_f64() * 1000.0
    }
}

/// 外部の姿勢推定器の契約
///
/// `I` は画像ペイロードの型（コアは中身に関知しない）。
/// スケジューラが単一ワーカーに直列化するため、同時に複数の
/// `estimate` が走ることはない。Err は推定器内部の障害を表し、
/// そのフレームは破棄されるがセッションは継続する。
pub trait PoseEstimator<I>: Send {
    fn estimate(&mut self, image: &I) -> Result<(PoseResult, TimingInfo)>;
}
