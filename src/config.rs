use crate::theme::Theme;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Which relationship records become links.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkMode {
    /// step→group and group→root.
    #[default]
    Hierarchy,
    /// Explicit step→step relationships only.
    Sequence,
    Combined,
}

impl LinkMode {
    pub fn hierarchy(self) -> bool {
        matches!(self, LinkMode::Hierarchy | LinkMode::Combined)
    }

    pub fn sequence(self) -> bool {
        matches!(self, LinkMode::Sequence | LinkMode::Combined)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// Center x shared by every step, whatever its band.
    pub step_column_x: f32,
    pub step_width: f32,
    pub step_height: f32,
    pub group_width: f32,
    pub group_height: f32,
    pub root_width: f32,
    pub root_height: f32,
    /// Step column → group column.
    pub group_gap: f32,
    /// Group column → root.
    pub root_gap: f32,
    /// Vertical spacing unit between ranked steps.
    pub row_spacing: f32,
    pub band_padding: f32,
    pub band_gap: f32,
    pub trailing_margin: f32,
    /// Parts that fit in one row unit when estimating band density.
    pub parts_per_row: usize,
    pub show_parts: bool,
    pub part_width: f32,
    pub part_height: f32,
    /// Gap between a part's right edge and its step's left edge.
    pub part_gap: f32,
    pub part_spacing: f32,
    pub label_padding_x: f32,
    pub label_padding_y: f32,
    pub label_line_height: f32,
    pub max_label_width_chars: usize,
    pub fast_text_metrics: bool,
    pub link_mode: LinkMode,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            step_column_x: 360.0,
            step_width: 180.0,
            step_height: 40.0,
            group_width: 160.0,
            group_height: 48.0,
            root_width: 180.0,
            root_height: 56.0,
            group_gap: 280.0,
            root_gap: 240.0,
            row_spacing: 64.0,
            band_padding: 40.0,
            band_gap: 16.0,
            trailing_margin: 140.0,
            parts_per_row: 2,
            show_parts: true,
            part_width: 120.0,
            part_height: 24.0,
            part_gap: 28.0,
            part_spacing: 28.0,
            label_padding_x: 6.0,
            label_padding_y: 4.0,
            label_line_height: 1.3,
            max_label_width_chars: 24,
            fast_text_metrics: true,
            link_mode: LinkMode::Hierarchy,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    pub width: f32,
    pub height: f32,
    pub background: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 1200.0,
            height: 800.0,
            background: "#FFFFFF".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub theme: Theme,
    pub layout: LayoutConfig,
    pub render: RenderConfig,
}

impl Default for Config {
    fn default() -> Self {
        let theme = Theme::classic();
        let render = RenderConfig {
            background: theme.background.clone(),
            ..Default::default()
        };
        Self {
            theme,
            layout: LayoutConfig::default(),
            render,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    theme: Option<String>,
    theme_variables: Option<ThemeVariables>,
    layout: Option<LayoutConfigFile>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThemeVariables {
    font_family: Option<String>,
    font_size: Option<f32>,
    text_color: Option<String>,
    line_color: Option<String>,
    node_border_color: Option<String>,
    level_palette: Option<Vec<String>>,
    band_fills: Option<Vec<String>>,
    label_background: Option<String>,
    background: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LayoutConfigFile {
    step_column_x: Option<f32>,
    step_width: Option<f32>,
    step_height: Option<f32>,
    group_gap: Option<f32>,
    root_gap: Option<f32>,
    row_spacing: Option<f32>,
    band_padding: Option<f32>,
    band_gap: Option<f32>,
    trailing_margin: Option<f32>,
    parts_per_row: Option<usize>,
    show_parts: Option<bool>,
    part_spacing: Option<f32>,
    fast_text_metrics: Option<bool>,
    link_mode: Option<LinkMode>,
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let mut config = Config::default();
    let Some(path) = path else {
        return Ok(config);
    };

    let contents = std::fs::read_to_string(path)?;
    let parsed: ConfigFile = serde_json::from_str(&contents)?;
    apply_config_file(&mut config, parsed);
    Ok(config)
}

fn apply_config_file(config: &mut Config, parsed: ConfigFile) {
    if let Some(theme_name) = parsed.theme.as_deref() {
        if theme_name == "modern" {
            config.theme = Theme::modern();
        } else if theme_name == "classic" || theme_name == "default" {
            config.theme = Theme::classic();
        }
    }

    if let Some(vars) = parsed.theme_variables {
        if let Some(v) = vars.font_family {
            config.theme.font_family = v;
        }
        if let Some(v) = vars.font_size {
            config.theme.font_size = v;
        }
        if let Some(v) = vars.text_color {
            config.theme.text_color = v;
        }
        if let Some(v) = vars.line_color {
            config.theme.line_color = v;
        }
        if let Some(v) = vars.node_border_color {
            config.theme.node_border_color = v;
        }
        if let Some(v) = vars.level_palette {
            config.theme.level_palette = v;
        }
        if let Some(v) = vars.band_fills {
            config.theme.band_fills = v;
        }
        if let Some(v) = vars.label_background {
            config.theme.label_background = v;
        }
        if let Some(v) = vars.background {
            config.theme.background = v;
        }
    }
    config.render.background = config.theme.background.clone();

    if let Some(layout) = parsed.layout {
        let target = &mut config.layout;
        if let Some(v) = layout.step_column_x {
            target.step_column_x = v;
        }
        if let Some(v) = layout.step_width {
            target.step_width = v;
        }
        if let Some(v) = layout.step_height {
            target.step_height = v;
        }
        if let Some(v) = layout.group_gap {
            target.group_gap = v;
        }
        if let Some(v) = layout.root_gap {
            target.root_gap = v;
        }
        if let Some(v) = layout.row_spacing {
            target.row_spacing = v;
        }
        if let Some(v) = layout.band_padding {
            target.band_padding = v;
        }
        if let Some(v) = layout.band_gap {
            target.band_gap = v;
        }
        if let Some(v) = layout.trailing_margin {
            target.trailing_margin = v;
        }
        if let Some(v) = layout.parts_per_row {
            target.parts_per_row = v.max(1);
        }
        if let Some(v) = layout.show_parts {
            target.show_parts = v;
        }
        if let Some(v) = layout.part_spacing {
            target.part_spacing = v;
        }
        if let Some(v) = layout.fast_text_metrics {
            target.fast_text_metrics = v;
        }
        if let Some(v) = layout.link_mode {
            target.link_mode = v;
        }
    }
}
