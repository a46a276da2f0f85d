use crate::config::{LayoutConfig, RenderConfig};
use crate::ir::ChangeMarker;
use crate::layout::{
    FitTransform, LabelLayout, Layout, LinkKind, NodeKind, NodeLayout, NodeShape, Placed, Rect,
    compute_fit_transform,
};
use crate::theme::Theme;
use anyhow::Result;
use std::fmt::Write as _;
use std::path::Path;

/// Renders the layout as SVG. With a viewport the content is fitted and
/// centered in a canvas of that size; otherwise the canvas is the content box.
pub fn render_svg(
    layout: &Layout,
    theme: &Theme,
    config: &LayoutConfig,
    viewport: Option<(f32, f32)>,
) -> String {
    let content = layout
        .node_bounds()
        .map(|nodes| nodes.union(&layout.bounds))
        .unwrap_or(layout.bounds);
    let (width, height, transform) = match viewport {
        Some((w, h)) => (w, h, compute_fit_transform(content, w, h)),
        None => (
            (content.x + content.width).max(200.0),
            (content.y + content.height).max(200.0),
            FitTransform::IDENTITY,
        ),
    };

    let mut svg = String::new();
    let _ = write!(
        svg,
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width:.0}\" height=\"{height:.0}\" viewBox=\"0 0 {width:.0} {height:.0}\">"
    );
    let _ = write!(
        svg,
        "<rect width=\"100%\" height=\"100%\" fill=\"{}\"/>",
        theme.background
    );
    let _ = write!(svg, "<g transform=\"{}\">", transform.to_svg_transform());

    let band_width = content.x + content.width;
    for band in &layout.bands {
        let _ = write!(
            svg,
            "<rect class=\"band\" x=\"0\" y=\"{:.2}\" width=\"{band_width:.2}\" height=\"{:.2}\" fill=\"{}\"/>",
            band.y, band.height, band.fill
        );
        let _ = write!(
            svg,
            "<text x=\"12\" y=\"{:.2}\" font-family=\"{}\" font-size=\"{}\" fill=\"{}\">{}</text>",
            band.y + theme.font_size + 6.0,
            theme.font_family,
            theme.font_size * 0.85,
            theme.band_label_color,
            escape_xml(&band.label)
        );
    }

    for link in &layout.links {
        let dash = match link.kind {
            LinkKind::PartToStep => " stroke-dasharray=\"4 3\"",
            LinkKind::StepToStep => " marker-end=\"url(#arrow)\"",
            LinkKind::StepToGroup | LinkKind::GroupToRoot => "",
        };
        let _ = write!(
            svg,
            "<path d=\"{}\" fill=\"none\" stroke=\"{}\" stroke-width=\"1.4\"{dash}/>",
            link.curve.to_path_data(),
            theme.line_color
        );
    }

    for node in layout.nodes.values() {
        svg.push_str(&node_svg(node, theme, config));
    }

    for label in layout.links.iter().filter_map(|link| link.label.as_ref()) {
        svg.push_str(&label_svg(label, theme, config));
    }

    svg.push_str("</g>");
    svg.push_str(&format!(
        "<defs><marker id=\"arrow\" viewBox=\"0 0 10 10\" refX=\"10\" refY=\"5\" markerWidth=\"6\" markerHeight=\"6\" orient=\"auto-start-reverse\"><path d=\"M 0 0 L 10 5 L 0 10 z\" fill=\"{}\"/></marker></defs>",
        theme.line_color
    ));
    svg.push_str("</svg>");
    svg
}

fn node_svg(node: &NodeLayout, theme: &Theme, config: &LayoutConfig) -> String {
    let (stroke, stroke_width, dash) = match &node.kind {
        NodeKind::Step {
            change: Some(marker),
            ..
        } => (
            theme.change_color(*marker),
            2.5,
            if *marker == ChangeMarker::Remove {
                " stroke-dasharray=\"6 3\""
            } else {
                ""
            },
        ),
        _ => (theme.node_border_color.as_str(), 1.4, ""),
    };
    let mut out = shape_svg(node.shape, &node.bounds(), &node.fill, stroke, stroke_width, dash);
    out.push_str(&text_block_svg(
        node.x,
        node.y,
        &node.label.lines,
        theme,
        config,
    ));
    if let NodeKind::Step { index_label, .. } = &node.kind {
        let rect = node.bounds();
        let _ = write!(
            out,
            "<text x=\"{:.2}\" y=\"{:.2}\" font-family=\"{}\" font-size=\"{}\" font-weight=\"bold\" fill=\"{}\">{}</text>",
            rect.x + 8.0,
            rect.y + theme.font_size,
            theme.font_family,
            theme.font_size * 0.75,
            theme.text_color,
            escape_xml(index_label)
        );
    }
    out
}

/// Outline for each node shape.
fn shape_svg(
    shape: NodeShape,
    rect: &Rect,
    fill: &str,
    stroke: &str,
    stroke_width: f32,
    extra: &str,
) -> String {
    let Rect {
        x,
        y,
        width: w,
        height: h,
    } = *rect;
    let style = format!("fill=\"{fill}\" stroke=\"{stroke}\" stroke-width=\"{stroke_width}\"{extra}");
    let polygon = |points: &[(f32, f32)]| {
        let joined = points
            .iter()
            .map(|(px, py)| format!("{px:.2},{py:.2}"))
            .collect::<Vec<_>>()
            .join(" ");
        format!("<polygon points=\"{joined}\" {style}/>")
    };
    match shape {
        NodeShape::RoundedRect => format!(
            "<rect x=\"{x:.2}\" y=\"{y:.2}\" width=\"{w:.2}\" height=\"{h:.2}\" rx=\"6\" ry=\"6\" {style}/>"
        ),
        NodeShape::Stadium => {
            let r = h / 2.0;
            format!(
                "<rect x=\"{x:.2}\" y=\"{y:.2}\" width=\"{w:.2}\" height=\"{h:.2}\" rx=\"{r:.2}\" ry=\"{r:.2}\" {style}/>"
            )
        }
        NodeShape::Hexagon => {
            let inset = (h / 2.0).min(w / 4.0);
            let cy = y + h / 2.0;
            polygon(&[
                (x + inset, y),
                (x + w - inset, y),
                (x + w, cy),
                (x + w - inset, y + h),
                (x + inset, y + h),
                (x, cy),
            ])
        }
        NodeShape::Octagon => {
            let c = w.min(h) * 0.29;
            polygon(&[
                (x + c, y),
                (x + w - c, y),
                (x + w, y + c),
                (x + w, y + h - c),
                (x + w - c, y + h),
                (x + c, y + h),
                (x, y + h - c),
                (x, y + c),
            ])
        }
        NodeShape::Diamond => {
            let cx = x + w / 2.0;
            let cy = y + h / 2.0;
            polygon(&[(cx, y), (x + w, cy), (cx, y + h), (x, cy)])
        }
    }
}

fn label_svg(label: &LabelLayout, theme: &Theme, config: &LayoutConfig) -> String {
    let rect = label.bounds();
    let mut out = format!(
        "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" rx=\"4\" ry=\"4\" fill=\"{}\" stroke=\"{}\" stroke-width=\"0.8\"/>",
        rect.x, rect.y, rect.width, rect.height, theme.label_background, theme.label_border
    );
    out.push_str(&text_block_svg(
        label.anchor.x,
        label.anchor.y,
        &label.lines,
        theme,
        config,
    ));
    out
}

fn text_block_svg(x: f32, y: f32, lines: &[String], theme: &Theme, config: &LayoutConfig) -> String {
    let line_height = theme.font_size * config.label_line_height;
    let total_height = lines.len() as f32 * line_height;
    let start_y = y - total_height / 2.0 + theme.font_size;
    let mut text = format!(
        "<text x=\"{x:.2}\" y=\"{start_y:.2}\" text-anchor=\"middle\" font-family=\"{}\" font-size=\"{}\" fill=\"{}\">",
        theme.font_family, theme.font_size, theme.text_color
    );
    for (idx, line) in lines.iter().enumerate() {
        let dy = if idx == 0 { 0.0 } else { line_height };
        let _ = write!(
            text,
            "<tspan x=\"{x:.2}\" dy=\"{dy:.2}\">{}</tspan>",
            escape_xml(line)
        );
    }
    text.push_str("</text>");
    text
}

pub fn write_output_svg(svg: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, svg)?;
        }
        None => {
            print!("{}", svg);
        }
    }
    Ok(())
}

#[cfg(feature = "png")]
pub fn write_output_png(svg: &str, output: &Path, render_cfg: &RenderConfig) -> Result<()> {
    let mut opt = usvg::Options::default();
    opt.fontdb_mut().load_system_fonts();
    if let Some(size) = usvg::Size::from_wh(render_cfg.width, render_cfg.height) {
        opt.default_size = size;
    }

    let tree = usvg::Tree::from_str(svg, &opt)?;
    let size = tree.size().to_int_size();
    let mut pixmap = resvg::tiny_skia::Pixmap::new(size.width(), size.height())
        .ok_or_else(|| anyhow::anyhow!("Failed to allocate pixmap"))?;

    let mut pixmap_mut = pixmap.as_mut();
    resvg::render(&tree, resvg::tiny_skia::Transform::default(), &mut pixmap_mut);
    pixmap.save_png(output)?;
    Ok(())
}

#[cfg(not(feature = "png"))]
pub fn write_output_png(_svg: &str, _output: &Path, _render_cfg: &RenderConfig) -> Result<()> {
    Err(anyhow::anyhow!("PNG output requires the `png` feature"))
}

fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Assembly, AssemblyData, Fastener, Group, Step, StepKind};
    use crate::layout::compute_layout;

    fn data() -> AssemblyData {
        AssemblyData {
            assembly: Assembly {
                id: "a".to_string(),
                tag: "Gearbox <A&B>".to_string(),
            },
            groups: vec![Group {
                id: "g".to_string(),
                label: "Housing".to_string(),
                sort_key: 0,
                color: Some("#FFEEDD".to_string()),
                icon: None,
            }],
            steps: vec![Step {
                id: "s".to_string(),
                group_id: "g".to_string(),
                label: "Press bearing".to_string(),
                kind: StepKind::Note,
                sort_key: 0,
                position: None,
                sequence_tag: None,
                change: Some(ChangeMarker::Remove),
            }],
            fasteners: vec![Fastener {
                id: "f".to_string(),
                step_id: "s".to_string(),
                part_number: "M8x30".to_string(),
                quantity: 6,
                torque: Some("25 Nm".to_string()),
                thread_locker: None,
                sort_key: 0,
                label_t: None,
            }],
            ..Default::default()
        }
    }

    #[test]
    fn render_svg_basic() {
        let theme = Theme::classic();
        let config = LayoutConfig::default();
        let layout = compute_layout(&data(), None, &theme, &config).unwrap();
        let svg = render_svg(&layout, &theme, &config, None);
        assert!(svg.starts_with("<svg"));
        assert!(svg.ends_with("</svg>"));
        assert!(svg.contains("Press bearing"));
        assert!(svg.contains("Gearbox &lt;A&amp;B&gt;"));
        assert!(svg.contains("M8x30 x6"));
        assert!(svg.contains("<polygon"));
        assert!(svg.contains(theme.ecn_remove.as_str()));
        assert!(svg.contains("#FFEEDD"));
    }

    #[test]
    fn viewport_sets_canvas_size() {
        let theme = Theme::modern();
        let config = LayoutConfig::default();
        let layout = compute_layout(&data(), None, &theme, &config).unwrap();
        let svg = render_svg(&layout, &theme, &config, Some((640.0, 480.0)));
        assert!(svg.contains("width=\"640\" height=\"480\""));
        assert!(svg.contains("scale("));
    }

    #[test]
    fn every_shape_renders() {
        let rect = Rect {
            x: 0.0,
            y: 0.0,
            width: 100.0,
            height: 40.0,
        };
        for shape in [
            NodeShape::Stadium,
            NodeShape::Hexagon,
            NodeShape::Octagon,
            NodeShape::Diamond,
            NodeShape::RoundedRect,
        ] {
            let out = shape_svg(shape, &rect, "#fff", "#000", 1.0, "");
            assert!(out.contains("fill=\"#fff\""), "{shape:?}");
        }
    }
}
