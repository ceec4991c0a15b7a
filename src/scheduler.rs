use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender};
use std::sync::Arc;
use std::thread;

use crate::config::SchedulerConfig;
use crate::depth::DepthMap;
use crate::pose::{PoseEstimator, PoseResult, TimingInfo};

/// センサ1フレーム分の入力
///
/// 画像・深度マップ・シーケンス番号は1ユニットとしてパイプラインを流れる。
/// 深度を「最新の深度」のようなグローバルから引き直すことは禁止
/// （ドロップポリシー下でフレーム間の深度/姿勢不一致を起こすため）。
#[derive(Debug)]
pub struct Frame<I> {
    pub image: I,
    /// 画像のピクセル幅（キーポイント正規化に使用）
    pub width: u32,
    pub height: u32,
    pub depth: Option<DepthMap>,
    /// 単調増加のシーケンス番号
    pub seq: u64,
}

/// 提出判定の結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// ワーカーへ引き渡した
    Submitted,
    /// 深度マップなし（カデンスのカウント対象外）
    NoDepth,
    /// 間引き対象（深度フレーム4枚に1枚のみ通す）
    SkippedCadence,
    /// 推論実行中のため破棄（キューには積まない）
    DroppedBusy,
    /// 推定器が未初期化（モデル切替中など）。エラーではない。
    NotReady,
}

/// 推論完了1件分の出力
///
/// 提出時のフレームと同じ深度マップ・シーケンス番号・画像サイズを
/// そのまま持ち帰る。後段の融合は必ずこのペアで行う。
#[derive(Debug)]
pub struct FrameOutcome {
    pub seq: u64,
    pub pose: PoseResult,
    pub timing: TimingInfo,
    pub depth: Option<DepthMap>,
    pub width: u32,
    pub height: u32,
}

struct Job<I> {
    image: I,
    width: u32,
    height: u32,
    depth: Option<DepthMap>,
    seq: u64,
}

/// 推定器を所有する専用ワーカースレッド
///
/// 推論は常にこのスレッド上で直列に走る。in-flight フラグは提出時に
/// 立ち、結果を発行し終えてから降りるため、同時実行は構造上あり得ず、
/// 結果の観測順も生成順と一致する。
pub struct InferenceWorker<I> {
    job_tx: SyncSender<Job<I>>,
    outcome_rx: Receiver<FrameOutcome>,
    busy: Arc<AtomicBool>,
    _handle: thread::JoinHandle<()>,
}

impl<I: Send + 'static> InferenceWorker<I> {
    pub fn spawn(mut estimator: Box<dyn PoseEstimator<I>>) -> Self {
        // busy ゲートが未処理ジョブを常に1件以下に抑えるため容量1で足りる
        let (job_tx, job_rx) = mpsc::sync_channel::<Job<I>>(1);
        let (outcome_tx, outcome_rx) = mpsc::channel::<FrameOutcome>();
        let busy = Arc::new(AtomicBool::new(false));
        let busy_ref = busy.clone();

        let handle = thread::spawn(move || {
            for job in job_rx {
                match estimator.estimate(&job.image) {
                    Ok((pose, timing)) => {
                        // 受信側が先に破棄されていたら捨てるだけ
                        let _ = outcome_tx.send(FrameOutcome {
                            seq: job.seq,
                            pose,
                            timing,
                            depth: job.depth,
                            width: job.width,
                            height: job.height,
                        });
                    }
                    Err(e) => {
                        // フレームは破棄するがワーカーは次のフレームを待つ
                        log::warn!("pose estimation failed at frame {}: {e:#}", job.seq);
                    }
                }
                busy_ref.store(false, Ordering::Release);
            }
        });

        Self {
            job_tx,
            outcome_rx,
            busy,
            _handle: handle,
        }
    }

    fn try_submit(&self, job: Job<I>) -> bool {
        if self.busy.swap(true, Ordering::AcqRel) {
            return false;
        }
        if self.job_tx.try_send(job).is_err() {
            // ワーカースレッド消失。フラグを戻して提出失敗扱い。
            self.busy.store(false, Ordering::Release);
            return false;
        }
        true
    }

    /// 完了済みの結果を1件取り出す（ノンブロッキング）
    pub fn try_recv(&self) -> Option<FrameOutcome> {
        self.outcome_rx.try_recv().ok()
    }
}

/// 推論パイプラインの入場管理
///
/// - カデンス: 深度付きフレームのみカウントし、cadence 枚に1枚を通す。
///   カウンタは counter_wrap（既定60）で0に戻る。
/// - シングルフライト: 推論実行中に適格フレームが来たら破棄する。
///   キューイングしないことで推論が遅くてもレイテンシが伸びない。
pub struct FrameScheduler<I> {
    cadence: u32,
    counter_wrap: u32,
    depth_frames: u32,
    worker: Option<InferenceWorker<I>>,
}

impl<I: Send + 'static> FrameScheduler<I> {
    pub fn new(config: &SchedulerConfig) -> anyhow::Result<Self> {
        if config.cadence == 0 {
            anyhow::bail!("scheduler cadence must be >= 1");
        }
        if config.counter_wrap == 0 || config.counter_wrap % config.cadence != 0 {
            // wrap が cadence の倍数でないと折り返しでカデンス位相がずれる
            anyhow::bail!(
                "counter_wrap ({}) must be a positive multiple of cadence ({})",
                config.counter_wrap,
                config.cadence
            );
        }
        Ok(Self {
            cadence: config.cadence,
            counter_wrap: config.counter_wrap,
            depth_frames: 0,
            worker: None,
        })
    }

    /// 推定器を設置してワーカーを起動する（既存ワーカーは破棄）
    pub fn install_estimator(&mut self, estimator: Box<dyn PoseEstimator<I>>) {
        self.worker = Some(InferenceWorker::spawn(estimator));
    }

    /// モデル切替中などに推定器を外す。以後の適格フレームは NotReady。
    pub fn clear_estimator(&mut self) {
        self.worker = None;
    }

    pub fn has_estimator(&self) -> bool {
        self.worker.is_some()
    }

    /// フレームを1枚判定する
    ///
    /// 適格性はカウンタの現在値（深度フレーム何枚目か）で決まるため、
    /// 深度付き連番 #0, #4, #8, ... が提出候補になる。
    pub fn submit(&mut self, frame: Frame<I>) -> Admission {
        if frame.depth.is_none() {
            return Admission::NoDepth;
        }

        let eligible = self.depth_frames % self.cadence == 0;
        self.depth_frames += 1;
        if self.depth_frames == self.counter_wrap {
            self.depth_frames = 0;
        }

        if !eligible {
            return Admission::SkippedCadence;
        }

        let Some(worker) = &self.worker else {
            log::debug!("frame {} dropped: estimator not ready", frame.seq);
            return Admission::NotReady;
        };

        let submitted = worker.try_submit(Job {
            image: frame.image,
            width: frame.width,
            height: frame.height,
            depth: frame.depth,
            seq: frame.seq,
        });
        if submitted {
            Admission::Submitted
        } else {
            log::debug!("frame dropped: inference in flight");
            Admission::DroppedBusy
        }
    }

    /// 完了済みの推論結果を1件取り出す（ノンブロッキング）
    pub fn poll(&self) -> Option<FrameOutcome> {
        self.worker.as_ref().and_then(|w| w.try_recv())
    }
}
