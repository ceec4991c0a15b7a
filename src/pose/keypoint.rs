use serde::Deserialize;

/// MoveNet の 17 キーポイント識別子
///
/// 推定器の出力契約上のインデックス対応は `from_index` がデータとして持つ。
/// 部位の検索は必ず識別子の一致で行うこと（配列位置に依存しない）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BodyPart {
    Nose,
    LeftEye,
    RightEye,
    LeftEar,
    RightEar,
    LeftShoulder,
    RightShoulder,
    LeftElbow,
    RightElbow,
    LeftWrist,
    RightWrist,
    LeftHip,
    RightHip,
    LeftKnee,
    RightKnee,
    LeftAnkle,
    RightAnkle,
}

impl BodyPart {
    pub const COUNT: usize = 17;

    /// 推定器出力のインデックス → 部位のマッピング
    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Self::Nose),
            1 => Some(Self::LeftEye),
            2 => Some(Self::RightEye),
            3 => Some(Self::LeftEar),
            4 => Some(Self::RightEar),
            5 => Some(Self::LeftShoulder),
            6 => Some(Self::RightShoulder),
            7 => Some(Self::LeftElbow),
            8 => Some(Self::RightElbow),
            9 => Some(Self::LeftWrist),
            10 => Some(Self::RightWrist),
            11 => Some(Self::LeftHip),
            12 => Some(Self::RightHip),
            13 => Some(Self::LeftKnee),
            14 => Some(Self::RightKnee),
            15 => Some(Self::LeftAnkle),
            16 => Some(Self::RightAnkle),
            _ => None,
        }
    }
}

/// 単一キーポイント
///
/// 座標は入力画像のピクセル座標（正規化は三角測量側で行う）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keypoint {
    pub part: BodyPart,
    pub x: f32,
    pub y: f32,
    /// 部位ごとの信頼度スコア (0.0〜1.0)
    pub confidence: f32,
}

impl Keypoint {
    pub fn new(part: BodyPart, x: f32, y: f32, confidence: f32) -> Self {
        Self {
            part,
            x,
            y,
            confidence,
        }
    }
}

/// 1フレーム分の姿勢推定結果
///
/// キーポイント列 + 全体スコア。生成後は不変で、
/// 推論ワーカーから消費側へ一方向に受け渡される。
#[derive(Debug, Clone)]
pub struct PoseResult {
    pub keypoints: Vec<Keypoint>,
    /// 姿勢全体の信頼度スコア
    pub score: f32,
}

impl PoseResult {
    pub fn new(keypoints: Vec<Keypoint>, score: f32) -> Self {
        Self { keypoints, score }
    }

    /// 識別子の一致でキーポイントを検索する
    ///
    /// 固定インデックス（5=左肩 等）への依存は推定器側の出力順が
    /// 変わると壊れるため禁止。見つからなければ None。
    pub fn keypoint(&self, part: BodyPart) -> Option<&Keypoint> {
        self.keypoints.iter().find(|k| k.part == part)
    }

    /// 部位のピクセル座標を返す。部位が存在しなければ None。
    pub fn coordinate_of(&self, part: BodyPart) -> Option<(f32, f32)> {
        self.keypoint(part).map(|k| (k.x, k.y))
    }
}
