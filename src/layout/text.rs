use crate::config::LayoutConfig;
use crate::text_metrics;
use crate::theme::Theme;

use super::TextBlock;

/// Measures and wraps a node label.
pub(super) fn measure_label(text: &str, theme: &Theme, config: &LayoutConfig) -> TextBlock {
    let max_width = config.max_label_width_chars.max(1) as f32 * theme.font_size * 0.56;
    let mut lines = Vec::new();
    for line in split_lines(text) {
        lines.extend(wrap_line(&line, max_width, theme, config));
    }
    block_from_lines(lines, theme, config)
}

/// Measures pre-split lines without wrapping (annotation blocks).
pub(super) fn measure_lines(lines: Vec<String>, theme: &Theme, config: &LayoutConfig) -> TextBlock {
    block_from_lines(lines, theme, config)
}

fn block_from_lines(mut lines: Vec<String>, theme: &Theme, config: &LayoutConfig) -> TextBlock {
    if lines.is_empty() {
        lines.push(String::new());
    }
    let width = lines
        .iter()
        .map(|line| text_width(line, theme, config))
        .fold(0.0, f32::max);
    let height = lines.len() as f32 * theme.font_size * config.label_line_height;
    TextBlock {
        lines,
        width,
        height,
    }
}

pub(super) fn split_lines(text: &str) -> Vec<String> {
    text.replace("<br/>", "\n")
        .replace("<br>", "\n")
        .split('\n')
        .map(|line| line.trim().to_string())
        .collect()
}

fn wrap_line(line: &str, max_width: f32, theme: &Theme, config: &LayoutConfig) -> Vec<String> {
    if text_width(line, theme, config) <= max_width {
        return vec![line.to_string()];
    }
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in line.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{current} {word}")
        };
        if !current.is_empty() && text_width(&candidate, theme, config) > max_width {
            lines.push(std::mem::take(&mut current));
            current.push_str(word);
        } else {
            current = candidate;
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

pub(super) fn text_width(text: &str, theme: &Theme, config: &LayoutConfig) -> f32 {
    if config.fast_text_metrics {
        return fallback_text_width(text, theme.font_size);
    }
    text_metrics::measure_text_width(text, theme.font_size, &theme.font_family)
        .unwrap_or_else(|| fallback_text_width(text, theme.font_size))
}

fn fallback_text_width(text: &str, font_size: f32) -> f32 {
    text.chars().map(char_width_factor).sum::<f32>() * font_size
}

/// Approximate advance per character class, in ems.
fn char_width_factor(ch: char) -> f32 {
    match ch {
        'i' | 'j' | 'l' | 'I' | '!' | '|' | '.' | ',' | ':' | ';' | '\'' => 0.27,
        ' ' | 'f' | 't' | 'r' | '(' | ')' | '[' | ']' | '-' | '/' => 0.33,
        'm' | 'w' => 0.84,
        'M' | 'W' | '@' | '%' => 0.93,
        '0'..='9' => 0.6,
        'A'..='Z' => 0.66,
        'a'..='z' => 0.56,
        _ => 0.6,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_lines_handles_br_tags() {
        assert_eq!(split_lines("a<br/>b"), vec!["a", "b"]);
        assert_eq!(split_lines(" a \n b "), vec!["a", "b"]);
    }

    #[test]
    fn fallback_width_scales_with_font_size() {
        let w14 = fallback_text_width("M6x1.0", 14.0);
        let w28 = fallback_text_width("M6x1.0", 28.0);
        assert!((w28 - w14 * 2.0).abs() < 0.01);
    }

    #[test]
    fn long_labels_wrap() {
        let theme = Theme::classic();
        let mut config = LayoutConfig::default();
        config.max_label_width_chars = 8;
        let block = measure_label("install the left hinge bracket assembly", &theme, &config);
        assert!(block.lines.len() > 1);
        assert_eq!(
            block.height,
            block.lines.len() as f32 * theme.font_size * config.label_line_height
        );
    }

    #[test]
    fn empty_label_keeps_one_line() {
        let block = measure_lines(Vec::new(), &Theme::classic(), &LayoutConfig::default());
        assert_eq!(block.lines.len(), 1);
        assert_eq!(block.width, 0.0);
    }
}
