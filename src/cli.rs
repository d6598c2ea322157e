use crate::audit::audit;
use crate::config::{CanvasConfig, load_config};
use crate::geometry::{Point, Rect};
use crate::interaction::Canvas;
use crate::layout::layout_with_groups;
use crate::model::Workflow;
use crate::ports::PortCatalog;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "wfc", version, about = "Workflow canvas layout and gesture engine")]
pub struct Args {
    /// Config JSON/JSON5 file overriding canvas geometry
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Log engine decisions to stderr (-v debug, -vv trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(clap::Args, Debug, Clone)]
pub struct Io {
    /// Workflow JSON file or '-' for stdin
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Output file. Defaults to stdout.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run automatic layout
    Layout {
        #[command(flatten)]
        io: Io,
        /// Print the updated workflow instead of the layout result
        #[arg(long)]
        apply: bool,
    },
    /// Release a step at a position (group-relative when grouped)
    DragStep {
        #[command(flatten)]
        io: Io,
        #[arg(long)]
        step: String,
        #[arg(long, allow_negative_numbers = true)]
        x: f32,
        #[arg(long, allow_negative_numbers = true)]
        y: f32,
    },
    /// Release a group at a position
    DragGroup {
        #[command(flatten)]
        io: Io,
        #[arg(long)]
        group: String,
        #[arg(long, allow_negative_numbers = true)]
        x: f32,
        #[arg(long, allow_negative_numbers = true)]
        y: f32,
    },
    /// Finish resizing a group to new bounds
    Resize {
        #[command(flatten)]
        io: Io,
        #[arg(long)]
        group: String,
        #[arg(long, allow_negative_numbers = true)]
        x: f32,
        #[arg(long, allow_negative_numbers = true)]
        y: f32,
        #[arg(long)]
        width: f32,
        #[arg(long)]
        height: f32,
    },
    /// Report invariant violations; exits non-zero when any exist
    Audit {
        #[command(flatten)]
        io: Io,
    },
}

pub fn run() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);
    let config = load_config(args.config.as_deref())?;

    match &args.command {
        Command::Layout { io, apply } => {
            let workflow = read_workflow(io)?;
            let result = layout_with_groups(&workflow, PortCatalog::builtin(), &config)?;
            if *apply {
                let mut updated = workflow.clone();
                updated.apply(&result.changeset(&workflow));
                write_json(&updated, io.output.as_deref())
            } else {
                write_json(&result, io.output.as_deref())
            }
        }
        Command::DragStep { io, step, x, y } => {
            let workflow = read_workflow(io)?;
            let changes = Canvas::new(&workflow, &config).drag_step(step, Point::new(*x, *y))?;
            write_json(&changes, io.output.as_deref())
        }
        Command::DragGroup { io, group, x, y } => {
            let workflow = read_workflow(io)?;
            let changes = Canvas::new(&workflow, &config).drag_group(group, Point::new(*x, *y))?;
            write_json(&changes, io.output.as_deref())
        }
        Command::Resize {
            io,
            group,
            x,
            y,
            width,
            height,
        } => {
            let workflow = read_workflow(io)?;
            let bounds = Rect::new(*x, *y, *width, *height);
            let changes = Canvas::new(&workflow, &config).resize_group(group, bounds)?;
            write_json(&changes, io.output.as_deref())
        }
        Command::Audit { io } => run_audit(io, &config),
    }
}

fn run_audit(io: &Io, config: &CanvasConfig) -> Result<()> {
    let workflow = read_workflow(io)?;
    let violations = audit(&workflow, config);
    write_json(&violations, io.output.as_deref())?;
    if violations.is_empty() {
        return Ok(());
    }
    for violation in &violations {
        eprintln!("{violation}");
    }
    Err(anyhow::anyhow!(
        "{} invariant violation(s) found",
        violations.len()
    ))
}

fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("workflow_canvas=debug,warn"),
        _ => EnvFilter::new("trace"),
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}

fn read_workflow(io: &Io) -> Result<Workflow> {
    let input = read_input(io.input.as_deref())?;
    Ok(Workflow::from_json(&input)?)
}

fn read_input(path: Option<&Path>) -> Result<String> {
    if let Some(path) = path {
        if path != Path::new("-") {
            return std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()));
        }
    }
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(buf)
}

fn write_json<T: Serialize>(value: &T, output: Option<&Path>) -> Result<()> {
    let mut json = serde_json::to_string_pretty(value)?;
    json.push('\n');
    match output {
        Some(path) => std::fs::write(path, json)
            .with_context(|| format!("failed to write {}", path.display()))?,
        None => io::stdout().write_all(json.as_bytes())?,
    }
    Ok(())
}
