mod geometry;
mod index;
mod links;
mod session;
mod swimlane;
mod text;
pub(crate) mod types;
mod viewport;

pub use geometry::{
    Curve, DEFAULT_LABEL_T, LABEL_T_MAX, LABEL_T_MIN, Point, Rect, bezier_point, clamp_label_t,
    nearest_t,
};
pub use index::{LinkIndex, MemberIndex};
pub use links::{FastenerAnnotation, is_none_sentinel};
pub use session::{DragUpdate, LabelMove, LayoutSession, SaveReport};
pub use swimlane::compute_layout;
pub use types::*;
pub use viewport::{FIT_SHRINK, FitTransform, MAX_FIT_SCALE, compute_fit_transform};
