use crate::config::{LinkMode, load_config};
use crate::layout::LayoutSession;
use crate::layout_dump::write_layout_dump;
use crate::render::{render_svg, write_output_png, write_output_svg};
use crate::store::{JsonStore, parse_snapshot};
use anyhow::Result;
use clap::{Parser, ValueEnum};
use std::collections::BTreeSet;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing::warn;

#[derive(Parser, Debug)]
#[command(
    name = "asmflow",
    version,
    about = "Swimlane layout and rendering for assembly step diagrams"
)]
pub struct Args {
    /// Assembly snapshot (.json / .json5) or '-' for stdin
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Output file (svg/png). Defaults to stdout for SVG if omitted.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(short = 'e', long = "outputFormat", value_enum, default_value = "svg")]
    pub output_format: OutputFormat,

    /// Config JSON file (themeVariables + layout overrides)
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Viewport width
    #[arg(short = 'w', long = "width", default_value_t = 1200.0)]
    pub width: f32,

    /// Viewport height
    #[arg(short = 'H', long = "height", default_value_t = 800.0)]
    pub height: f32,

    /// Scale the diagram into the viewport instead of drawing at natural size
    #[arg(long = "fit")]
    pub fit: bool,

    /// Only lay out these groups (comma separated ids)
    #[arg(long = "groups", value_delimiter = ',')]
    pub groups: Vec<String>,

    /// Which links to draw
    #[arg(long = "links", value_enum)]
    pub links: Option<LinkModeArg>,

    /// Move a step to a new y before rendering, e.g. --drag step-3=220
    #[arg(long = "drag", value_parser = parse_drag)]
    pub drags: Vec<(String, f32)>,

    /// Generate the default step chain when the assembly has no relationships
    #[arg(long = "auto-link")]
    pub auto_link: bool,

    /// Write dragged positions and generated relationships back to the input
    #[arg(long = "save")]
    pub save: bool,

    /// Write node/link geometry as JSON
    #[arg(long = "dump-layout")]
    pub dump_layout: Option<PathBuf>,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum OutputFormat {
    Svg,
    Png,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkModeArg {
    Hierarchy,
    Sequence,
    Combined,
}

impl From<LinkModeArg> for LinkMode {
    fn from(value: LinkModeArg) -> Self {
        match value {
            LinkModeArg::Hierarchy => LinkMode::Hierarchy,
            LinkModeArg::Sequence => LinkMode::Sequence,
            LinkModeArg::Combined => LinkMode::Combined,
        }
    }
}

pub fn run() -> Result<()> {
    let args = Args::parse();
    let mut config = load_config(args.config.as_deref())?;
    config.render.width = args.width;
    config.render.height = args.height;
    if let Some(mode) = args.links {
        config.layout.link_mode = mode.into();
    }

    let mut store = open_store(args.input.as_deref(), args.save)?;
    let mut session = LayoutSession::from_store(&store, config.theme.clone(), config.layout.clone())?;

    if !args.groups.is_empty() {
        let visible: BTreeSet<String> = args.groups.iter().cloned().collect();
        session.set_group_filter(Some(visible));
    }

    if args.auto_link {
        session.auto_link(&mut store);
    }

    for (step_id, y) in &args.drags {
        if session.drag_step(step_id, *y).is_none() {
            warn!(step = %step_id, "drag ignored; step is not in the current layout");
        }
    }

    if args.save && session.is_dirty() {
        let report = session.save_positions(&mut store)?;
        if !report.is_complete() {
            eprintln!(
                "warning: saved {} of {} step positions",
                report.saved, report.attempted
            );
        }
    }

    let layout = session
        .layout()
        .ok_or_else(|| anyhow::anyhow!("Nothing to lay out: no visible groups with steps"))?;

    if let Some(path) = &args.dump_layout {
        write_layout_dump(path, layout, session.fit_transform(args.width, args.height))?;
    }

    let viewport = args.fit.then_some((args.width, args.height));
    let svg = render_svg(layout, session.theme(), session.config(), viewport);
    match args.output_format {
        OutputFormat::Svg => {
            write_output_svg(&svg, args.output.as_deref())?;
        }
        OutputFormat::Png => {
            let output = ensure_output(&args.output, "png")?;
            write_output_png(&svg, &output, &config.render)?;
        }
    }
    Ok(())
}

/// File-backed store when saving, otherwise an in-memory copy so nothing
/// on disk changes.
fn open_store(path: Option<&Path>, save: bool) -> Result<JsonStore> {
    match path {
        Some(path) if path != Path::new("-") => {
            let store = JsonStore::open(path)?;
            if save {
                Ok(store)
            } else {
                Ok(JsonStore::in_memory(store.data().clone()))
            }
        }
        _ => {
            if save {
                return Err(anyhow::anyhow!("--save requires a snapshot file as input"));
            }
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            Ok(JsonStore::in_memory(parse_snapshot(&buf)?))
        }
    }
}

fn ensure_output(output: &Option<PathBuf>, ext: &str) -> Result<PathBuf> {
    if let Some(path) = output {
        return Ok(path.clone());
    }
    Err(anyhow::anyhow!("Output path required for {} output", ext))
}

fn parse_drag(value: &str) -> Result<(String, f32), String> {
    let (step, y) = value
        .rsplit_once('=')
        .ok_or_else(|| format!("expected STEP=Y, got `{value}`"))?;
    let step = step.trim();
    if step.is_empty() {
        return Err(format!("missing step id in `{value}`"));
    }
    let y: f32 = y
        .trim()
        .parse()
        .map_err(|_| format!("invalid y coordinate in `{value}`"))?;
    if !y.is_finite() {
        return Err(format!("invalid y coordinate in `{value}`"));
    }
    Ok((step.to_string(), y))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_drag_arguments() {
        assert_eq!(parse_drag("s1=120").unwrap(), ("s1".to_string(), 120.0));
        assert_eq!(parse_drag(" a=b = -4.5 ").unwrap(), ("a=b".to_string(), -4.5));
        assert!(parse_drag("s1").is_err());
        assert!(parse_drag("=3").is_err());
        assert!(parse_drag("s1=abc").is_err());
        assert!(parse_drag("s1=inf").is_err());
    }

    #[test]
    fn parses_full_command_line() {
        let args = Args::try_parse_from([
            "asmflow",
            "-i",
            "asm.json",
            "--groups",
            "g1,g2",
            "--links",
            "combined",
            "--drag",
            "s1=10",
            "--drag",
            "s2=20",
            "--auto-link",
        ])
        .unwrap();
        assert_eq!(args.groups, vec!["g1", "g2"]);
        assert_eq!(args.links, Some(LinkModeArg::Combined));
        assert_eq!(args.drags.len(), 2);
        assert!(args.auto_link);
        assert!(!args.save);
        assert_eq!(LinkMode::from(LinkModeArg::Sequence), LinkMode::Sequence);
    }
}
