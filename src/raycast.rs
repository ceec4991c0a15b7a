use nalgebra::Vector3;

/// ワールド空間のレイ（原点 + 方向）
///
/// スクリーン座標1点につき1本生成される一時値で、フレームを跨いで保持しない。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vector3<f32>,
    pub direction: Vector3<f32>,
}

impl Ray {
    pub fn new(origin: Vector3<f32>, direction: Vector3<f32>) -> Self {
        Self { origin, direction }
    }

    /// レイ上の点: origin + direction * t
    pub fn point_at(&self, t: f32) -> Vector3<f32> {
        self.origin + self.direction * t
    }
}

/// レイキャスト提供側の契約（レンダリング層の注入点）
///
/// ビューポートのピクセル座標を受け取り、対応するワールド空間レイを返す。
/// 点がビューポート外、または交差可能なジオメトリが無い場合は None。
/// None は「このフレームではその関節にワールド座標なし」として伝播し、
/// (0,0,0) 等のダミー原点で埋めてはならない。
pub trait RayCaster {
    fn cast_ray(&self, viewport_point: (f32, f32)) -> Option<Ray>;
}

/// ピンホールカメラモデルによる参照実装（テスト・デモ用）
///
/// カメラ座標系は X右・Y下・Z前方。垂直画角と解像度から
/// 焦点距離を求め、ビューポート点をカメラ原点からのレイに変換する。
#[derive(Debug, Clone)]
pub struct PinholeRayCaster {
    width: f32,
    height: f32,
    fx: f32,
    fy: f32,
    cx: f32,
    cy: f32,
    origin: Vector3<f32>,
}

impl PinholeRayCaster {
    pub fn new(fov_v_deg: f32, width: f32, height: f32) -> Self {
        let fy = height / (2.0 * (fov_v_deg.to_radians() / 2.0).tan());
        let fx = fy; // 正方ピクセルを仮定
        Self {
            width,
            height,
            fx,
            fy,
            cx: width / 2.0,
            cy: height / 2.0,
            origin: Vector3::zeros(),
        }
    }

    /// カメラ位置を設定
    pub fn with_origin(mut self, origin: Vector3<f32>) -> Self {
        self.origin = origin;
        self
    }
}

impl RayCaster for PinholeRayCaster {
    fn cast_ray(&self, viewport_point: (f32, f32)) -> Option<Ray> {
        let (u, v) = viewport_point;
        if !(0.0..=self.width).contains(&u) || !(0.0..=self.height).contains(&v) {
            return None;
        }
        let direction =
            Vector3::new((u - self.cx) / self.fx, (v - self.cy) / self.fy, 1.0).normalize();
        Some(Ray::new(self.origin, direction))
    }
}
