use anyhow::Result;
use std::time::{Duration, Instant};

use taiso_tracker::config::{Config, CounterConfig};
use taiso_tracker::depth::DepthMap;
use taiso_tracker::pose::{BodyPart, Keypoint, PoseEstimator, PoseResult, TimingInfo};
use taiso_tracker::raycast::PinholeRayCaster;
use taiso_tracker::scheduler::{Admission, Frame};
use taiso_tracker::session::{Axis, TrackingSession, VisualizationSink};
use taiso_tracker::triangulation::AnchoredPoint;

const CONFIG_PATH: &str = "config.toml";
const IMAGE_WIDTH: u32 = 1440;
const IMAGE_HEIGHT: u32 = 1920;
const VIEWPORT: (f32, f32) = (390.0, 844.0);
const TOTAL_FRAMES: u64 = 600;

/// 合成フレーム: 画像ペイロードはシーケンス番号のみ
/// （推定器がそこからスクワット動作を生成する）
struct SyntheticEstimator;

impl PoseEstimator<u64> for SyntheticEstimator {
    fn estimate(&mut self, image: &u64) -> Result<(PoseResult, TimingInfo)> {
        let started = Instant::now();
        // 120フレーム周期（2秒@60fps）で腰が上下する
        let phase = (*image as f32) * std::f32::consts::TAU / 120.0;
        let hip_y = 960.0 + 400.0 * phase.sin();

        let keypoints = vec![
            Keypoint::new(BodyPart::Nose, 720.0, 400.0, 0.9),
            Keypoint::new(BodyPart::LeftShoulder, 600.0, 640.0, 0.9),
            Keypoint::new(BodyPart::RightShoulder, 840.0, 640.0, 0.9),
            Keypoint::new(BodyPart::LeftWrist, 520.0, 1000.0, 0.8),
            Keypoint::new(BodyPart::RightWrist, 920.0, 1000.0, 0.8),
            Keypoint::new(BodyPart::LeftHip, 660.0, hip_y, 0.9),
            Keypoint::new(BodyPart::RightHip, 780.0, hip_y, 0.9),
        ];
        Ok((
            PoseResult::new(keypoints, 0.85),
            TimingInfo::new(started.elapsed()),
        ))
    }
}

struct PrintSink;

impl VisualizationSink for PrintSink {
    fn present(
        &mut self,
        seq: u64,
        joints: &std::collections::BTreeMap<BodyPart, Option<AnchoredPoint>>,
    ) {
        if let Some(Some(hip)) = joints.get(&BodyPart::LeftHip) {
            log::debug!(
                "frame {}: left_hip = [{:.2}, {:.2}, {:.2}]{}",
                seq,
                hip.position.x,
                hip.position.y,
                hip.position.z,
                if hip.degraded { " (degraded)" } else { "" }
            );
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let mut config = Config::load_or_default(CONFIG_PATH);
    if config.counters.is_empty() {
        // 設定ファイルが無い場合のデモ配線: 腰のY座標（カメラ座標: 下が正）
        // が high を越えたらアーム、low を割ったらカウント = スクワット1回
        config.counters.push(CounterConfig::Raise {
            name: "squats".to_string(),
            joint: BodyPart::LeftHip,
            axis: Axis::Y,
            low: -0.2,
            high: 0.2,
        });
    }

    println!("=== taiso-tracker {} - synthetic session ===", env!("BUILD_VERSION"));
    println!("cadence: 1/{} depth frames", config.scheduler.cadence);
    println!("min_score: {}", config.pose.min_score);
    println!("counters: {}", config.counters.len());
    println!();

    let caster = PinholeRayCaster::new(60.0, VIEWPORT.0, VIEWPORT.1);
    let mut session = TrackingSession::new(
        &config,
        Box::new(SyntheticEstimator),
        Box::new(caster),
        Box::new(PrintSink),
        VIEWPORT,
    )?;

    let mut submitted = 0u32;
    let mut dropped = 0u32;
    let mut last_counts = session.counts();
    let depth = DepthMap::filled(64, 48, 2.0)?;

    for seq in 0..TOTAL_FRAMES {
        let frame = Frame {
            image: seq,
            width: IMAGE_WIDTH,
            height: IMAGE_HEIGHT,
            depth: Some(depth.clone()),
            seq,
        };
        match session.push_frame(frame) {
            Admission::Submitted => submitted += 1,
            Admission::DroppedBusy => dropped += 1,
            _ => {}
        }

        session.pump();
        let counts = session.counts();
        for (name, count) in &counts {
            if last_counts.get(name) != Some(count) {
                println!("[frame {seq:4}] {name}: {count}");
            }
        }
        last_counts = counts;

        // 60fps相当のペーシング
        std::thread::sleep(Duration::from_millis(2));
    }

    // 残りの結果を回収
    std::thread::sleep(Duration::from_millis(50));
    session.pump();

    let stats = session.stats();
    println!();
    println!(
        "frames: {TOTAL_FRAMES}  submitted: {submitted}  dropped(busy): {dropped}  processed: {}  gated: {}",
        stats.processed, stats.gated
    );
    if let Some(ms) = stats.last_inference_ms {
        println!("last inference: {ms:.2}ms");
    }
    for (name, count) in session.counts() {
        println!("{name}: {count} reps");
    }

    Ok(())
}
