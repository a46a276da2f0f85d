use serde::Serialize;

use super::geometry::Rect;

/// Upper bound on zoom when the content is smaller than the viewport.
pub const MAX_FIT_SCALE: f32 = 1.5;
/// Leaves a margin around fitted content.
pub const FIT_SHRINK: f32 = 0.9;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FitTransform {
    pub scale: f32,
    pub translate_x: f32,
    pub translate_y: f32,
}

impl FitTransform {
    pub const IDENTITY: FitTransform = FitTransform {
        scale: 1.0,
        translate_x: 0.0,
        translate_y: 0.0,
    };

    pub fn to_svg_transform(&self) -> String {
        format!(
            "translate({:.2} {:.2}) scale({:.4})",
            self.translate_x, self.translate_y, self.scale
        )
    }
}

/// Scale and translation that center `bounds` in the viewport.
pub fn compute_fit_transform(bounds: Rect, viewport_width: f32, viewport_height: f32) -> FitTransform {
    if bounds.is_empty() || viewport_width <= 0.0 || viewport_height <= 0.0 {
        return FitTransform::IDENTITY;
    }
    let fit = (viewport_width / bounds.width)
        .min(viewport_height / bounds.height)
        .min(MAX_FIT_SCALE);
    let scale = fit * FIT_SHRINK;
    let center = bounds.center();
    FitTransform {
        scale,
        translate_x: viewport_width / 2.0 - center.x * scale,
        translate_y: viewport_height / 2.0 - center.y * scale,
    }
}
