use serde::{Deserialize, Serialize};

use crate::ir::ChangeMarker;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Theme {
    pub font_family: String,
    pub font_size: f32,
    pub text_color: String,
    pub line_color: String,
    pub node_border_color: String,
    /// Fills by level: root, group, step, part. Deeper levels reuse the last entry.
    pub level_palette: Vec<String>,
    /// Alternating swimlane backgrounds.
    pub band_fills: Vec<String>,
    pub band_label_color: String,
    pub label_background: String,
    pub label_border: String,
    pub ecn_remove: String,
    pub ecn_replace: String,
    pub ecn_add: String,
    pub ecn_modify: String,
    pub background: String,
}

impl Theme {
    pub fn classic() -> Self {
        Self {
            font_family: "\"trebuchet ms\", verdana, arial, sans-serif".to_string(),
            font_size: 14.0,
            text_color: "#333333".to_string(),
            line_color: "#555555".to_string(),
            node_border_color: "#9370DB".to_string(),
            level_palette: vec![
                "#FFE8B3".to_string(),
                "#ECECFF".to_string(),
                "#FFFFDE".to_string(),
                "#F3F3F3".to_string(),
            ],
            band_fills: vec!["#FAFAFF".to_string(), "#F2F2FA".to_string()],
            band_label_color: "#8888AA".to_string(),
            label_background: "#E8E8E8".to_string(),
            label_border: "#AAAAAA".to_string(),
            ecn_remove: "#D9534F".to_string(),
            ecn_replace: "#F0AD4E".to_string(),
            ecn_add: "#5CB85C".to_string(),
            ecn_modify: "#5BC0DE".to_string(),
            background: "#FFFFFF".to_string(),
        }
    }

    pub fn modern() -> Self {
        Self {
            font_family: "Inter, Segoe UI, system-ui, -apple-system, sans-serif".to_string(),
            font_size: 13.0,
            text_color: "#1C2430".to_string(),
            line_color: "#7A8AA6".to_string(),
            node_border_color: "#C7D2E5".to_string(),
            level_palette: vec![
                "#1F3A5F".to_string(),
                "#DCE7F7".to_string(),
                "#F8FAFF".to_string(),
                "#EEF2F8".to_string(),
            ],
            band_fills: vec!["#FFFFFF".to_string(), "#F7FAFF".to_string()],
            band_label_color: "#8A97AD".to_string(),
            label_background: "#FFFFFF".to_string(),
            label_border: "#D7E0F0".to_string(),
            ecn_remove: "#E5484D".to_string(),
            ecn_replace: "#F5A524".to_string(),
            ecn_add: "#30A46C".to_string(),
            ecn_modify: "#0091FF".to_string(),
            background: "#FFFFFF".to_string(),
        }
    }

    pub fn level_color(&self, level: usize) -> String {
        match self.level_palette.get(level).or(self.level_palette.last()) {
            Some(color) => color.clone(),
            None => self.background.clone(),
        }
    }

    pub fn band_fill(&self, index: usize) -> String {
        if self.band_fills.is_empty() {
            return self.background.clone();
        }
        self.band_fills[index % self.band_fills.len()].clone()
    }

    pub fn change_color(&self, marker: ChangeMarker) -> &str {
        match marker {
            ChangeMarker::Remove => &self.ecn_remove,
            ChangeMarker::Replace => &self.ecn_replace,
            ChangeMarker::Add => &self.ecn_add,
            ChangeMarker::Modify => &self.ecn_modify,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_color_clamps_to_last_entry() {
        let theme = Theme::classic();
        assert_eq!(theme.level_color(0), "#FFE8B3");
        assert_eq!(theme.level_color(3), "#F3F3F3");
        assert_eq!(theme.level_color(9), "#F3F3F3");
    }

    #[test]
    fn empty_palette_falls_back_to_background() {
        let mut theme = Theme::modern();
        theme.level_palette.clear();
        assert_eq!(theme.level_color(2), theme.background);
    }
}
