use nalgebra::Vector3;

use crate::depth::DepthMap;
use crate::raycast::RayCaster;

/// 1関節分のアンカー結果（ワールド座標）
///
/// `degraded` は深度未定義により depth=0 として扱い、
/// レイ原点に退化した点であることを示す。シンク側は
/// このフラグを見て描画を抑制してよい。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnchoredPoint {
    pub position: Vector3<f32>,
    pub degraded: bool,
}

/// 2Dキーポイントとレイ・深度を融合して3Dワールド座標を求めるエンジン
///
/// ビューポートサイズ（レイキャスト側の座標系）だけを保持する。
/// `anchor` は (ピクセル座標, 画像サイズ, 深度マップ, レイキャスタ状態)
/// に対して純粋で、同じ入力には常に同じ出力を返す。
#[derive(Debug, Clone, Copy)]
pub struct Triangulator {
    viewport_width: f32,
    viewport_height: f32,
}

impl Triangulator {
    pub fn new(viewport_width: f32, viewport_height: f32) -> Self {
        Self {
            viewport_width,
            viewport_height,
        }
    }

    /// キーポイント1点を3Dへアンカーする
    ///
    /// 1. ピクセル座標を画像サイズで正規化 (0..1, 0..1)
    /// 2. 正規化座標をビューポートのピクセル空間へスケール → レイ要求
    /// 3. 深度は **正規化座標のまま** サンプリング
    ///    （レイキャストと深度サンプリングは座標系が異なる。混同禁止）
    /// 4. world = origin + direction * depth
    ///    深度未定義なら depth=0 でレイ原点に退化（degraded=true）
    ///
    /// レイが得られない場合は None（ワールド座標なし）。
    pub fn anchor(
        &self,
        caster: &dyn RayCaster,
        depth_map: Option<&DepthMap>,
        pixel: (f32, f32),
        image_size: (u32, u32),
    ) -> Option<AnchoredPoint> {
        let (width, height) = image_size;
        if width == 0 || height == 0 {
            return None;
        }
        let normalized = (pixel.0 / width as f32, pixel.1 / height as f32);
        let viewport_point = (
            normalized.0 * self.viewport_width,
            normalized.1 * self.viewport_height,
        );

        let ray = caster.cast_ray(viewport_point)?;
        let depth = depth_map.and_then(|map| map.sample(normalized.0, normalized.1));

        let position = ray.point_at(depth.unwrap_or(0.0));
        Some(AnchoredPoint {
            position,
            degraded: depth.is_none(),
        })
    }
}
