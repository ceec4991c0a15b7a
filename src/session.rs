use anyhow::{Context, Result};
use nalgebra::Vector3;
use serde::Deserialize;
use std::collections::BTreeMap;

use crate::config::{Config, CounterConfig};
use crate::counter::RepCounter;
use crate::pose::{BodyPart, PoseEstimator};
use crate::raycast::RayCaster;
use crate::scheduler::{Admission, Frame, FrameOutcome, FrameScheduler};
use crate::triangulation::{AnchoredPoint, Triangulator};

/// ワールド座標の成分選択
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub fn component(&self, v: &Vector3<f32>) -> f32 {
        match self {
            Axis::X => v.x,
            Axis::Y => v.y,
            Axis::Z => v.z,
        }
    }
}

/// 可視化側の契約
///
/// 処理済みフレームごとに、関節名 → ワールド座標（無ければ None）の
/// マッピングを1回受け取る。描画方法には関知しない。
pub trait VisualizationSink {
    fn present(&mut self, seq: u64, joints: &BTreeMap<BodyPart, Option<AnchoredPoint>>);
}

/// カウンタ1系統の配線（設定から構築）
struct CounterBinding {
    name: String,
    counter: RepCounter,
    input: CounterInput,
}

enum CounterInput {
    Single {
        joint: BodyPart,
        axis: Axis,
    },
    Split {
        arm_joint: BodyPart,
        close_joint: BodyPart,
        axis: Axis,
    },
}

impl CounterBinding {
    fn from_config(config: &CounterConfig) -> Result<Self> {
        match config {
            CounterConfig::Raise {
                name,
                joint,
                axis,
                low,
                high,
            } => Ok(Self {
                name: name.clone(),
                counter: RepCounter::rising(*low, *high)
                    .with_context(|| format!("counter '{name}'"))?,
                input: CounterInput::Single {
                    joint: *joint,
                    axis: *axis,
                },
            }),
            CounterConfig::Sway {
                name,
                arm_joint,
                close_joint,
                axis,
                left_edge,
                right_edge,
            } => Ok(Self {
                name: name.clone(),
                counter: RepCounter::side_to_side(*left_edge, *right_edge)
                    .with_context(|| format!("counter '{name}'"))?,
                input: CounterInput::Split {
                    arm_joint: *arm_joint,
                    close_joint: *close_joint,
                    axis: *axis,
                },
            }),
        }
    }

    /// アンカー済み関節からカウンタを1ステップ進める
    ///
    /// 必要な関節が欠けているフレームでは更新しない（リセットでもない）。
    /// degraded な点はレイ原点（カメラ位置）に退化しており体の位置を
    /// 表さないため、信号としては使わない。
    fn step(&mut self, joints: &BTreeMap<BodyPart, Option<AnchoredPoint>>) {
        let value_of = |part: BodyPart, axis: Axis| -> Option<f32> {
            joints
                .get(&part)
                .and_then(|a| a.as_ref())
                .filter(|a| !a.degraded)
                .map(|a| axis.component(&a.position))
        };

        match &self.input {
            CounterInput::Single { joint, axis } => {
                if let Some(v) = value_of(*joint, *axis) {
                    if self.counter.feed(v) {
                        log::debug!("counter '{}' -> {}", self.name, self.counter.count());
                    }
                }
            }
            CounterInput::Split {
                arm_joint,
                close_joint,
                axis,
            } => {
                if let (Some(arm_v), Some(close_v)) =
                    (value_of(*arm_joint, *axis), value_of(*close_joint, *axis))
                {
                    if self.counter.feed_split(arm_v, close_v) {
                        log::debug!("counter '{}' -> {}", self.name, self.counter.count());
                    }
                }
            }
        }
    }
}

/// セッション統計（ログ・表示用）
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionStats {
    /// 後段まで処理したフレーム数
    pub processed: u64,
    /// スコア不足で弾いたフレーム数
    pub gated: u64,
    pub last_score: Option<f32>,
    pub last_inference_ms: Option<f64>,
}

/// トラッキングセッション本体
///
/// スケジューラ・三角測量・可視化・カウンタを1本に配線する。
/// 「現在の姿勢結果」「実行中フラグ」等の暗黙のグローバルは持たず、
/// 全ての状態をこのオブジェクトが所有する。
pub struct TrackingSession<I> {
    scheduler: FrameScheduler<I>,
    triangulator: Triangulator,
    caster: Box<dyn RayCaster>,
    sink: Box<dyn VisualizationSink>,
    /// アンカー対象 = 設定の tracked + カウンタが参照する関節
    anchor_set: Vec<BodyPart>,
    counters: Vec<CounterBinding>,
    min_score: f32,
    stats: SessionStats,
}

impl<I: Send + 'static> TrackingSession<I> {
    pub fn new(
        config: &Config,
        estimator: Box<dyn PoseEstimator<I>>,
        caster: Box<dyn RayCaster>,
        sink: Box<dyn VisualizationSink>,
        viewport_size: (f32, f32),
    ) -> Result<Self> {
        let mut scheduler = FrameScheduler::new(&config.scheduler)?;
        scheduler.install_estimator(estimator);

        let counters = config
            .counters
            .iter()
            .map(CounterBinding::from_config)
            .collect::<Result<Vec<_>>>()?;

        let mut anchor_set = config.pose.tracked.clone();
        for binding in &counters {
            match &binding.input {
                CounterInput::Single { joint, .. } => anchor_set.push(*joint),
                CounterInput::Split {
                    arm_joint,
                    close_joint,
                    ..
                } => {
                    anchor_set.push(*arm_joint);
                    anchor_set.push(*close_joint);
                }
            }
        }
        anchor_set.sort();
        anchor_set.dedup();

        Ok(Self {
            scheduler,
            triangulator: Triangulator::new(viewport_size.0, viewport_size.1),
            caster,
            sink,
            anchor_set,
            counters,
            min_score: config.pose.min_score,
            stats: SessionStats::default(),
        })
    }

    /// フレームを入場判定にかける
    pub fn push_frame(&mut self, frame: Frame<I>) -> Admission {
        self.scheduler.submit(frame)
    }

    /// 完了済みの推論結果を全て処理する。処理した件数を返す。
    pub fn pump(&mut self) -> usize {
        let mut handled = 0;
        while let Some(outcome) = self.scheduler.poll() {
            self.process_outcome(outcome);
            handled += 1;
        }
        handled
    }

    fn process_outcome(&mut self, outcome: FrameOutcome) {
        self.stats.last_score = Some(outcome.pose.score);
        self.stats.last_inference_ms = Some(outcome.timing.total_ms());

        // スコア不足: このフレームに使える姿勢なし。
        // カウンタは更新されないだけでリセットはされない。
        if outcome.pose.score < self.min_score {
            self.stats.gated += 1;
            log::debug!(
                "frame {} gated: score {:.3} < {:.3}",
                outcome.seq,
                outcome.pose.score,
                self.min_score
            );
            return;
        }

        let mut joints = BTreeMap::new();
        for &part in &self.anchor_set {
            let anchored = outcome.pose.coordinate_of(part).and_then(|pixel| {
                self.triangulator.anchor(
                    self.caster.as_ref(),
                    outcome.depth.as_ref(),
                    pixel,
                    (outcome.width, outcome.height),
                )
            });
            joints.insert(part, anchored);
        }

        self.sink.present(outcome.seq, &joints);

        for binding in &mut self.counters {
            binding.step(&joints);
        }
        self.stats.processed += 1;
    }

    /// モデル切替: 新しい推定器を設置する
    pub fn replace_estimator(&mut self, estimator: Box<dyn PoseEstimator<I>>) {
        self.scheduler.install_estimator(estimator);
    }

    /// モデル切替中の窓: 推定器を外す（以後のフレームは NotReady で破棄）
    pub fn clear_estimator(&mut self) {
        self.scheduler.clear_estimator();
    }

    pub fn count_of(&self, name: &str) -> Option<u32> {
        self.counters
            .iter()
            .find(|b| b.name == name)
            .map(|b| b.counter.count())
    }

    pub fn counts(&self) -> BTreeMap<String, u32> {
        self.counters
            .iter()
            .map(|b| (b.name.clone(), b.counter.count()))
            .collect()
    }

    /// セッション再開: 全カウンタを明示的にリセットする
    pub fn reset_counters(&mut self) {
        for binding in &mut self.counters {
            binding.counter.reset();
        }
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }
}
