//! Command line snapping: load a scene, snap one point, print the result.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use kurbo::Point;
use snapwright_core::view::DEFAULT_SCREEN_SIZE;
use snapwright_core::{
    Line, LogIndicator, MemoryDocument, Scene, SnapManager, SnapPreferences, SnapResult, SnapView, SnapperQuery,
};

/// Snap a point against a scene file
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct CliArgs {
    /// Scene JSON (objects, grids, guides, pages)
    #[arg(long)]
    scene: PathBuf,

    #[arg(long, allow_hyphen_values = true)]
    x: f64,

    #[arg(long, allow_hyphen_values = true)]
    y: f64,

    /// Preferences JSON; missing keys keep their defaults
    #[arg(long)]
    prefs: Option<PathBuf>,

    /// Zoom factor used to convert pixel tolerances
    #[arg(long, default_value_t = 1.0)]
    zoom: f64,

    /// Lock the drag to a line through the point at this angle (degrees)
    #[arg(long = "constraint-angle", allow_hyphen_values = true)]
    constraint_angle: Option<f64>,

    /// Switch the preferences to simple mode before snapping
    #[arg(long, default_value_t = false)]
    simple: bool,
}

fn load_preferences(path: Option<&Path>) -> Result<SnapPreferences> {
    match path {
        Some(path) => SnapPreferences::load_from_file(path)
            .with_context(|| format!("failed to load preferences from {}", path.display())),
        None => Ok(SnapPreferences::new()),
    }
}

fn run(args: &CliArgs) -> Result<SnapResult> {
    let json = std::fs::read_to_string(&args.scene)
        .with_context(|| format!("failed to read scene {}", args.scene.display()))?;
    let document = MemoryDocument::from_json(&json).context("invalid scene file")?;

    let mut prefs = load_preferences(args.prefs.as_deref())?;
    if args.simple {
        prefs.transition_to_simple();
    }

    let point = Point::new(args.x, args.y);
    let mut manager = SnapManager::new(prefs.shared())
        .with_view(SnapView::centered_on(point, args.zoom, DEFAULT_SCREEN_SIZE));
    manager.set_indicator(LogIndicator);

    let mut query = SnapperQuery::point(point);
    if let Some(degrees) = args.constraint_angle {
        query = query.constrained(Line::from_angle(point, degrees.to_radians()));
    }
    log::debug!("Snapping ({}, {}) against {}", args.x, args.y, args.scene.display());
    Ok(manager.query(&Scene::of(&document), &query))
}

fn main() -> Result<()> {
    env_logger::init();
    let args = CliArgs::parse();
    let result = run(&args)?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
