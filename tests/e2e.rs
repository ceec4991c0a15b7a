use std::collections::BTreeMap;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use taiso_tracker::config::{Config, CounterConfig, SchedulerConfig};
use taiso_tracker::depth::DepthMap;
use taiso_tracker::pose::{BodyPart, Keypoint, PoseEstimator, PoseResult, TimingInfo};
use taiso_tracker::raycast::PinholeRayCaster;
use taiso_tracker::scheduler::{Admission, Frame, FrameScheduler};
use taiso_tracker::session::{Axis, TrackingSession, VisualizationSink};
use taiso_tracker::triangulation::AnchoredPoint;

/// 処理したシーケンス番号を記録し、テスト側の合図で完了する推定器
struct GatedEstimator {
    gate: Receiver<()>,
    seen: Arc<Mutex<Vec<u64>>>,
}

impl PoseEstimator<u64> for GatedEstimator {
    fn estimate(&mut self, image: &u64) -> anyhow::Result<(PoseResult, TimingInfo)> {
        self.seen.lock().unwrap().push(*image);
        self.gate.recv().ok();
        Ok((
            PoseResult::new(Vec::new(), 0.9),
            TimingInfo::new(Duration::from_millis(1)),
        ))
    }
}

fn depth_frame(seq: u64) -> Frame<u64> {
    Frame {
        image: seq,
        width: 1440,
        height: 1920,
        depth: Some(DepthMap::filled(8, 8, 2.0).unwrap()),
        seq,
    }
}

fn wait_outcome(scheduler: &FrameScheduler<u64>) -> u64 {
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        if let Some(outcome) = scheduler.poll() {
            return outcome.seq;
        }
        assert!(Instant::now() < deadline, "no outcome within 5s");
        std::thread::sleep(Duration::from_millis(1));
    }
}

fn submit_retrying_busy(scheduler: &mut FrameScheduler<u64>, seq: u64) -> Admission {
    // busy フラグは結果発行直後に降りるため、その競合だけリトライする。
    // リトライでカウンタが進んだ場合も4回で適格位相に戻る。
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        match scheduler.submit(depth_frame(seq)) {
            Admission::DroppedBusy | Admission::SkippedCadence => {
                assert!(Instant::now() < deadline, "still busy after 5s");
                std::thread::sleep(Duration::from_millis(1));
            }
            other => return other,
        }
    }
}

/// フレーム#0..#15 の入場シナリオ:
/// 深度付き16フレーム、カデンス4、#0 の推論が #4 の適格時点で
/// まだ走っている場合、#4 は破棄され、次の提出は #8。
#[test]
fn frame_scenario_0_to_15_with_slow_inference() {
    let (gate_tx, gate_rx): (Sender<()>, Receiver<()>) = mpsc::channel();
    let seen = Arc::new(Mutex::new(Vec::new()));

    let mut scheduler = FrameScheduler::new(&SchedulerConfig {
        cadence: 4,
        counter_wrap: 60,
    })
    .unwrap();
    scheduler.install_estimator(Box::new(GatedEstimator {
        gate: gate_rx,
        seen: seen.clone(),
    }));

    let mut admissions = Vec::new();

    // #0..#7: #0 の推論はゲートで止まったまま
    for seq in 0..8u64 {
        admissions.push(scheduler.submit(depth_frame(seq)));
    }
    assert_eq!(admissions[0], Admission::Submitted);
    assert_eq!(admissions[4], Admission::DroppedBusy, "#4 must be dropped");
    for seq in [1usize, 2, 3, 5, 6, 7] {
        assert_eq!(admissions[seq], Admission::SkippedCadence, "#{seq}");
    }

    // #0 完了 → #8 が次の提出
    gate_tx.send(()).unwrap();
    assert_eq!(wait_outcome(&scheduler), 0);

    for seq in 8..12u64 {
        let admission = if seq == 8 {
            submit_retrying_busy(&mut scheduler, seq)
        } else {
            scheduler.submit(depth_frame(seq))
        };
        admissions.push(admission);
    }
    assert_eq!(admissions[8], Admission::Submitted, "#8 must be submitted");

    gate_tx.send(()).unwrap();
    assert_eq!(wait_outcome(&scheduler), 8);

    for seq in 12..16u64 {
        let admission = if seq == 12 {
            submit_retrying_busy(&mut scheduler, seq)
        } else {
            scheduler.submit(depth_frame(seq))
        };
        admissions.push(admission);
    }
    assert_eq!(admissions[12], Admission::Submitted, "#12 must be submitted");

    gate_tx.send(()).unwrap();
    assert_eq!(wait_outcome(&scheduler), 12);

    // ワーカーが受け取ったのは #0, #8, #12 だけ（#4 は欠番）
    assert_eq!(*seen.lock().unwrap(), vec![0, 8, 12]);
}

// --- セッション一気通貫 ---

/// 画像ペイロード = 腰のピクセルY座標
struct HipEstimator;

impl PoseEstimator<f32> for HipEstimator {
    fn estimate(&mut self, image: &f32) -> anyhow::Result<(PoseResult, TimingInfo)> {
        let hip_y = *image;
        let keypoints = vec![
            Keypoint::new(BodyPart::Nose, 720.0, 400.0, 0.9),
            Keypoint::new(BodyPart::LeftHip, 660.0, hip_y, 0.9),
            Keypoint::new(BodyPart::RightHip, 780.0, hip_y, 0.9),
        ];
        Ok((
            PoseResult::new(keypoints, 0.85),
            TimingInfo::new(Duration::from_millis(1)),
        ))
    }
}

#[derive(Default)]
struct CountingSink {
    presented: Arc<Mutex<Vec<(u64, bool)>>>,
}

impl VisualizationSink for CountingSink {
    fn present(&mut self, seq: u64, joints: &BTreeMap<BodyPart, Option<AnchoredPoint>>) {
        let hip_anchored = matches!(joints.get(&BodyPart::LeftHip), Some(Some(_)));
        self.presented.lock().unwrap().push((seq, hip_anchored));
    }
}

#[test]
fn squat_reps_counted_through_full_pipeline() {
    let mut config = Config::default();
    config.scheduler = SchedulerConfig {
        cadence: 1,
        counter_wrap: 60,
    };
    config.counters.push(CounterConfig::Raise {
        name: "squats".to_string(),
        joint: BodyPart::LeftHip,
        axis: Axis::Y,
        low: -0.2,
        high: 0.2,
    });

    let sink = CountingSink::default();
    let presented = sink.presented.clone();

    // 画像 1440x1920 / ビューポート 390x844 / 深度一様 2.0m
    let viewport = (390.0, 844.0);
    let caster = PinholeRayCaster::new(60.0, viewport.0, viewport.1);
    let mut session = TrackingSession::new(
        &config,
        Box::new(HipEstimator),
        Box::new(caster),
        Box::new(sink),
        viewport,
    )
    .unwrap();

    // 腰ピクセルY: 960=中立, 1360=しゃがみ（ワールドY≈+0.47）,
    // 560=立ち上がり（ワールドY≈-0.47）
    let script = [960.0f32, 1360.0, 560.0, 1360.0, 560.0];
    let deadline = Instant::now() + Duration::from_secs(5);
    for (seq, hip_y) in script.iter().enumerate() {
        loop {
            let frame = Frame {
                image: *hip_y,
                width: 1440,
                height: 1920,
                depth: Some(DepthMap::filled(8, 8, 2.0).unwrap()),
                seq: seq as u64,
            };
            match session.push_frame(frame) {
                Admission::Submitted => break,
                Admission::DroppedBusy => {
                    assert!(Instant::now() < deadline, "still busy after 5s");
                    std::thread::sleep(Duration::from_millis(1));
                }
                other => panic!("unexpected admission: {other:?}"),
            }
        }
        while session.pump() == 0 {
            assert!(Instant::now() < deadline, "no outcome within 5s");
            std::thread::sleep(Duration::from_millis(1));
        }
    }

    // しゃがむ→立つ ×2 で2回
    assert_eq!(session.count_of("squats"), Some(2));

    // シンクは全5フレームを順番どおり受け取り、腰はアンカー済み
    let guard = presented.lock().unwrap();
    let seqs: Vec<u64> = guard.iter().map(|(s, _)| *s).collect();
    assert_eq!(seqs, vec![0, 1, 2, 3, 4]);
    assert!(guard.iter().all(|(_, anchored)| *anchored));
}
