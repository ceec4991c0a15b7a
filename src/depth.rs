use anyhow::Result;

/// フレームに付随する深度マップ
///
/// float32 per texel の固定フォーマット。未定義セルは NaN で表現し、
/// サンプリング時に None として表面化する。キャプチャ後は読み取り専用。
#[derive(Debug, Clone)]
pub struct DepthMap {
    width: usize,
    height: usize,
    data: Vec<f32>,
}

impl DepthMap {
    pub fn new(width: usize, height: usize, data: Vec<f32>) -> Result<Self> {
        if width == 0 || height == 0 {
            anyhow::bail!("depth map dimensions must be nonzero (got {width}x{height})");
        }
        if data.len() != width * height {
            anyhow::bail!(
                "depth buffer size mismatch: {}x{} but {} texels",
                width,
                height,
                data.len()
            );
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// 全セルが同一値の深度マップ（テスト・デモ用）
    pub fn filled(width: usize, height: usize, value: f32) -> Result<Self> {
        Self::new(width, height, vec![value; width * height])
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// (列, 行) で深度値を取得。範囲外と未定義セルは None。
    pub fn get(&self, column: usize, row: usize) -> Option<f32> {
        if column >= self.width || row >= self.height {
            return None;
        }
        let value = self.data[row * self.width + column];
        if value.is_nan() {
            None
        } else {
            Some(value)
        }
    }

    /// 正規化座標 (0..1, 0..1) でサンプリングする
    ///
    /// 原点は左上。座標を格子に落としてから `get` と同じ規則を適用する。
    pub fn sample(&self, x: f32, y: f32) -> Option<f32> {
        if !(0.0..=1.0).contains(&x) || !(0.0..=1.0).contains(&y) {
            return None;
        }
        let column = ((x * self.width as f32) as usize).min(self.width - 1);
        let row = ((y * self.height as f32) as usize).min(self.height - 1);
        self.get(column, row)
    }
}
