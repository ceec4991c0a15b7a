use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::pose::BodyPart;
use crate::session::Axis;

#[derive(Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub pose: PoseConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    /// 回数カウンタの配線。どの関節のどの軸をどのカウンタに流すかは
    /// 設定で決める（コアはハードコードしない）。
    #[serde(default, rename = "counter")]
    pub counters: Vec<CounterConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PoseConfig {
    /// 姿勢全体スコアの下限。これ未満の結果は後段に流さない。
    #[serde(default = "default_min_score")]
    pub min_score: f32,
    /// 3Dアンカー対象の関節
    #[serde(default = "default_tracked")]
    pub tracked: Vec<BodyPart>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SchedulerConfig {
    /// 深度フレーム何枚に1枚を推論に回すか
    #[serde(default = "default_cadence")]
    pub cadence: u32,
    /// 深度フレームカウンタの折り返し値
    #[serde(default = "default_counter_wrap")]
    pub counter_wrap: u32,
}

/// 回数カウンタ1系統分の設定
#[derive(Debug, Deserialize, Clone)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CounterConfig {
    /// 単一信号の上昇系（例: ハンズアップ = 手首のY座標）
    Raise {
        name: String,
        joint: BodyPart,
        axis: Axis,
        low: f32,
        high: f32,
    },
    /// 2信号のサイド・トゥ・サイド系（例: 左右ヒップのX座標）
    Sway {
        name: String,
        arm_joint: BodyPart,
        close_joint: BodyPart,
        #[serde(default = "default_sway_axis")]
        axis: Axis,
        left_edge: f32,
        right_edge: f32,
    },
}

fn default_min_score() -> f32 {
    0.2
}
fn default_tracked() -> Vec<BodyPart> {
    vec![
        BodyPart::Nose,
        BodyPart::LeftShoulder,
        BodyPart::RightShoulder,
        BodyPart::LeftWrist,
        BodyPart::RightWrist,
    ]
}
fn default_cadence() -> u32 {
    4
}
fn default_counter_wrap() -> u32 {
    60
}
fn default_sway_axis() -> Axis {
    Axis::X
}

impl Default for PoseConfig {
    fn default() -> Self {
        Self {
            min_score: default_min_score(),
            tracked: default_tracked(),
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            cadence: default_cadence(),
            counter_wrap: default_counter_wrap(),
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("failed to read {}", path.as_ref().display()))?;
        let config: Config = toml::from_str(&content).context("failed to parse config")?;
        Ok(config)
    }

    /// 設定ファイルが無ければデフォルトで起動する
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::load(&path) {
            Ok(config) => config,
            Err(e) => {
                log::debug!("using default config: {e:#}");
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.pose.min_score, 0.2);
        assert_eq!(config.scheduler.cadence, 4);
        assert_eq!(config.scheduler.counter_wrap, 60);
        assert_eq!(config.pose.tracked.len(), 5);
        assert!(config.counters.is_empty());
    }

    #[test]
    fn test_parse_counters() {
        let toml_src = r#"
            [pose]
            min_score = 0.3
            tracked = ["nose", "left_wrist"]

            [[counter]]
            kind = "raise"
            name = "hands_up"
            joint = "left_wrist"
            axis = "y"
            low = 0.0
            high = 1.0

            [[counter]]
            kind = "sway"
            name = "side_sit_ups"
            arm_joint = "left_hip"
            close_joint = "right_hip"
            left_edge = -0.5
            right_edge = 0.5
        "#;
        let config: Config = toml::from_str(toml_src).unwrap();

        assert_eq!(config.pose.min_score, 0.3);
        assert_eq!(
            config.pose.tracked,
            vec![BodyPart::Nose, BodyPart::LeftWrist]
        );
        assert_eq!(config.counters.len(), 2);
        match &config.counters[0] {
            CounterConfig::Raise { name, joint, .. } => {
                assert_eq!(name, "hands_up");
                assert_eq!(*joint, BodyPart::LeftWrist);
            }
            other => panic!("expected raise counter, got {other:?}"),
        }
        match &config.counters[1] {
            CounterConfig::Sway { axis, .. } => assert_eq!(*axis, Axis::X),
            other => panic!("expected sway counter, got {other:?}"),
        }
    }
}
