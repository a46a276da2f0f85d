#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod edit;
pub mod ir;
pub mod layout;
pub mod layout_dump;
pub mod render;
pub mod store;
pub mod text_metrics;
pub mod theme;

#[cfg(feature = "cli")]
pub use cli::run;
pub use config::{Config, LayoutConfig, LinkMode, RenderConfig, load_config};
pub use edit::Edit;
pub use ir::AssemblyData;
pub use layout::{FitTransform, Layout, LayoutSession, compute_fit_transform, compute_layout};
pub use render::render_svg;
pub use store::{AssemblyStore, JsonStore, StoreError};
pub use theme::Theme;
