use std::collections::BTreeSet;

use assembly_flow::layout::Point;
use assembly_flow::store::parse_snapshot;
use assembly_flow::{LayoutConfig, LayoutSession, LinkMode, Theme, render_svg};
use serde::{Deserialize, Serialize};
use wasm_bindgen::prelude::*;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionOptions {
    theme: Option<String>,
    font_family: Option<String>,
    font_size: Option<f32>,
    link_mode: Option<LinkMode>,
    show_parts: Option<bool>,
}

fn build_options(options: SessionOptions) -> (Theme, LayoutConfig) {
    let mut theme = if options.theme.as_deref() == Some("modern") {
        Theme::modern()
    } else {
        Theme::classic()
    };
    if let Some(font_family) = options.font_family {
        theme.font_family = font_family;
    }
    if let Some(font_size) = options.font_size {
        theme.font_size = font_size;
    }

    let mut config = LayoutConfig::default();
    if let Some(link_mode) = options.link_mode {
        config.link_mode = link_mode;
    }
    if let Some(show_parts) = options.show_parts {
        config.show_parts = show_parts;
    }
    (theme, config)
}

fn to_js<T: Serialize>(value: &T) -> Result<String, JsValue> {
    serde_json::to_string(value).map_err(|error| JsValue::from_str(&error.to_string()))
}

/// Layout session handle for a browser editor. Geometry crosses the
/// boundary as JSON strings.
#[wasm_bindgen]
pub struct WasmLayoutSession {
    inner: LayoutSession,
}

#[wasm_bindgen]
impl WasmLayoutSession {
    #[wasm_bindgen(constructor)]
    pub fn new(snapshot: &str, options_json: Option<String>) -> Result<WasmLayoutSession, JsValue> {
        let data = parse_snapshot(snapshot).map_err(|error| JsValue::from_str(&error.to_string()))?;
        let options = match options_json {
            Some(raw) => serde_json::from_str::<SessionOptions>(&raw)
                .map_err(|error| JsValue::from_str(&error.to_string()))?,
            None => SessionOptions::default(),
        };
        let (theme, config) = build_options(options);
        Ok(Self {
            inner: LayoutSession::new(data, theme, config),
        })
    }

    /// Full layout as JSON, or `null` when nothing is visible.
    pub fn layout_json(&self) -> Result<String, JsValue> {
        to_js(&self.inner.layout())
    }

    pub fn render_svg(&self) -> Option<String> {
        self.inner
            .layout()
            .map(|layout| render_svg(layout, self.inner.theme(), self.inner.config(), None))
    }

    /// Changed nodes and links for one drag frame, or `null` for an unknown step.
    pub fn drag_step(&mut self, step_id: &str, y: f32) -> Result<String, JsValue> {
        to_js(&self.inner.drag_step(step_id, y))
    }

    pub fn drag_label(&mut self, link_id: &str, x: f32, y: f32) -> Result<String, JsValue> {
        to_js(&self.inner.drag_label(link_id, Point::new(x, y)))
    }

    pub fn fit_transform(&self, width: f32, height: f32) -> Result<String, JsValue> {
        to_js(&self.inner.fit_transform(width, height))
    }

    pub fn is_dirty(&self) -> bool {
        self.inner.is_dirty()
    }

    /// Pending step positions as `{ stepId: { x, y } }`.
    pub fn pending_positions(&self) -> Result<String, JsValue> {
        to_js(self.inner.pending_positions())
    }

    /// Comma separated group ids; an empty string shows every group.
    pub fn set_group_filter(&mut self, group_ids: &str) {
        let visible: BTreeSet<String> = group_ids
            .split(',')
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .collect();
        self.inner
            .set_group_filter((!visible.is_empty()).then_some(visible));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SNAPSHOT: &str = r#"{
        assembly: { id: "a", tag: "PUMP-7" },
        groups: [{ id: "g", label: "Body", sortKey: 0 }],
        steps: [
            { id: "s1", groupId: "g", label: "Seat seal", sortKey: 0 },
            { id: "s2", groupId: "g", label: "Close cover", sortKey: 1 },
        ],
    }"#;

    #[test]
    fn drags_through_the_json_surface() {
        let mut session = WasmLayoutSession::new(SNAPSHOT, None).unwrap();
        assert!(!session.is_dirty());
        let update = session.drag_step("s1", 400.0).unwrap();
        assert!(update.contains("step:s1"));
        assert!(session.is_dirty());
        assert!(session.pending_positions().unwrap().contains("s1"));
        assert_eq!(session.drag_step("missing", 1.0).unwrap(), "null");
        assert!(session.render_svg().unwrap().contains("PUMP-7"));
    }

    #[test]
    fn options_pick_theme_and_link_mode() {
        let options: SessionOptions =
            serde_json::from_str(r#"{"theme":"modern","linkMode":"combined","fontSize":12}"#)
                .unwrap();
        let (theme, config) = build_options(options);
        assert_eq!(theme.font_size, 12.0);
        assert_eq!(config.link_mode, LinkMode::Combined);
    }
}
