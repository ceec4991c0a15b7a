use anyhow::Result;

/// ラッチの状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LatchState {
    Idle,
    Armed,
}

/// しきい値の向き
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Above,
    Below,
}

/// 向き付きしきい値ゲート
#[derive(Debug, Clone, Copy)]
struct Gate {
    threshold: f32,
    direction: Direction,
}

impl Gate {
    fn crossed(&self, v: f32) -> bool {
        match self.direction {
            Direction::Above => v > self.threshold,
            Direction::Below => v < self.threshold,
        }
    }
}

/// 2しきい値ヒステリシス式の回数カウンタ
///
/// Idle でアーム側ゲートを横切ると Armed、Armed でクローズ側ゲートを
/// 横切るとカウント +1 して Idle に戻る。それ以外の入力では状態不変。
/// 単一しきい値だとノイズで二重カウントするため、2しきい値が離れている
/// こと（ヒステリシス）を構築時に強制する。
///
/// サイド・トゥ・サイド型は同じラッチに2本の独立信号を流すだけで、
/// 別アルゴリズムではない（`feed_split` を使う）。
#[derive(Debug, Clone)]
pub struct RepCounter {
    arm: Gate,
    close: Gate,
    state: LatchState,
    count: u32,
}

impl RepCounter {
    /// 上昇系カウンタ（例: ハンズアップ）
    ///
    /// 信号が high を上回るとアーム、low を下回るとカウント。
    pub fn rising(low: f32, high: f32) -> Result<Self> {
        if !(low < high) {
            anyhow::bail!("hysteresis requires low < high (got low={low}, high={high})");
        }
        Ok(Self {
            arm: Gate {
                threshold: high,
                direction: Direction::Above,
            },
            close: Gate {
                threshold: low,
                direction: Direction::Below,
            },
            state: LatchState::Idle,
            count: 0,
        })
    }

    /// サイド・トゥ・サイド型カウンタ（例: 左右ヒップのX座標）
    ///
    /// アーム信号が left_edge を下回るとアーム、
    /// クローズ信号が right_edge を上回るとカウント。
    pub fn side_to_side(left_edge: f32, right_edge: f32) -> Result<Self> {
        if !(left_edge < right_edge) {
            anyhow::bail!(
                "hysteresis requires left_edge < right_edge (got {left_edge}, {right_edge})"
            );
        }
        Ok(Self {
            arm: Gate {
                threshold: left_edge,
                direction: Direction::Below,
            },
            close: Gate {
                threshold: right_edge,
                direction: Direction::Above,
            },
            state: LatchState::Idle,
            count: 0,
        })
    }

    /// 単一信号を1ステップ評価する。カウントが増えたら true。
    pub fn feed(&mut self, v: f32) -> bool {
        self.feed_split(v, v)
    }

    /// アーム用・クローズ用に独立した信号を1ステップ評価する。
    pub fn feed_split(&mut self, arm_v: f32, close_v: f32) -> bool {
        match self.state {
            LatchState::Idle => {
                if self.arm.crossed(arm_v) {
                    self.state = LatchState::Armed;
                }
                false
            }
            LatchState::Armed => {
                if self.close.crossed(close_v) {
                    self.count += 1;
                    self.state = LatchState::Idle;
                    true
                } else {
                    false
                }
            }
        }
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn state(&self) -> LatchState {
        self.state
    }

    /// セッション再開時のみ使用（フレーム単位では呼ばない）
    pub fn reset(&mut self) {
        self.state = LatchState::Idle;
        self.count = 0;
    }
}
