use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use image::DynamicImage;
use log::{info, LevelFilter};
use pageview_core::{SyncDriver, Viewer, ViewerConfig};
use pageview_engine::{default_engine, OpenSource, RasterEngine};
use pageview_layout::Rotation;
use serde::Serialize;
use simplelog::{Config, WriteLogger};
use std::ffi::OsString;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::{Duration, Instant};

#[derive(Debug, Parser)]
#[command(name = "pageview")]
#[command(about = "Virtualized page viewer harness")]
pub struct Cli {
    /// Viewer config file (TOML).
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log to stderr. Repeat for more detail.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print machine-readable page geometry.
    Info {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Drive a viewer through scripted steps and report what it shows.
    Simulate {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        #[arg(long, default_value_t = 800.0)]
        viewport: f32,
        /// page:N, scroll:PX, zoom:X, zoom-in, zoom-out, reset-zoom, rotate,
        /// sidebar or wait:MS. Repeatable, applied in order.
        #[arg(long = "step", value_name = "ACTION")]
        steps: Vec<Step>,
    },
    /// Render one page to a PNG or JPEG file.
    Snapshot {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 1.0)]
        scale: f32,
        #[arg(long, default_value_t = 0)]
        rotation: u16,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Print CLI version.
    Version,
}

/// One scripted user action for `simulate`.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Page(u32),
    Scroll(f32),
    Zoom(f32),
    ZoomIn,
    ZoomOut,
    ResetZoom,
    Rotate,
    Sidebar,
    Wait(u64),
}

impl FromStr for Step {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, arg) = match s.split_once(':') {
            Some((name, arg)) => (name, Some(arg)),
            None => (s, None),
        };
        let bad = |arg: &str| format!("invalid argument for {name}: {arg}");

        match (name, arg) {
            ("page", Some(arg)) => arg.parse().map(Step::Page).map_err(|_| bad(arg)),
            ("scroll", Some(arg)) => arg.parse().map(Step::Scroll).map_err(|_| bad(arg)),
            ("zoom", Some(arg)) => arg.parse().map(Step::Zoom).map_err(|_| bad(arg)),
            ("wait", Some(arg)) => arg.parse().map(Step::Wait).map_err(|_| bad(arg)),
            ("zoom-in", None) => Ok(Step::ZoomIn),
            ("zoom-out", None) => Ok(Step::ZoomOut),
            ("reset-zoom", None) => Ok(Step::ResetZoom),
            ("rotate", None) => Ok(Step::Rotate),
            ("sidebar", None) => Ok(Step::Sidebar),
            _ => Err(format!("unknown step: {s}")),
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Page(page) => write!(f, "page:{page}"),
            Step::Scroll(offset) => write!(f, "scroll:{offset}"),
            Step::Zoom(zoom) => write!(f, "zoom:{zoom}"),
            Step::ZoomIn => f.write_str("zoom-in"),
            Step::ZoomOut => f.write_str("zoom-out"),
            Step::ResetZoom => f.write_str("reset-zoom"),
            Step::Rotate => f.write_str("rotate"),
            Step::Sidebar => f.write_str("sidebar"),
            Step::Wait(ms) => write!(f, "wait:{ms}"),
        }
    }
}

#[derive(Debug, Serialize)]
struct InfoOutput {
    path: String,
    page_count: u32,
    pages: Vec<PageSizeOutput>,
}

#[derive(Debug, Serialize)]
struct PageSizeOutput {
    page: u32,
    width: f32,
    height: f32,
}

#[derive(Debug, Serialize)]
struct SimulateOutput {
    path: String,
    page_count: u32,
    steps: Vec<StepOutput>,
    cache: CacheOutput,
    errors: Vec<String>,
}

#[derive(Debug, Serialize)]
struct StepOutput {
    action: String,
    current_page: u32,
    zoom: f32,
    visual_zoom: f32,
    rotation: u16,
    scroll_offset: f32,
    total_extent: f32,
    sidebar_open: bool,
    pages: Vec<PaintOutput>,
}

#[derive(Debug, Serialize)]
struct PaintOutput {
    page: u32,
    state: &'static str,
    face: &'static str,
}

#[derive(Debug, Serialize)]
struct CacheOutput {
    snapshots: usize,
    bytes_used: usize,
    hits: u64,
    misses: u64,
    evictions: u64,
    thumbnails: usize,
}

pub fn run<I, T>(args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = Cli::parse_from(args);
    init_logging(cli.verbose);

    match cli.command {
        Commands::Info { file } => run_info(&file),
        Commands::Simulate { file, viewport, steps } => {
            let config = ViewerConfig::load(cli.config.as_deref()).context("failed to load config")?;
            run_simulate(&file, config, viewport, &steps)
        }
        Commands::Snapshot { file, page, scale, rotation, output } => {
            run_snapshot(&file, page, scale, rotation, output.as_deref())
        }
        Commands::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    // stdout carries JSON, so logs go to stderr
    if WriteLogger::init(level, Config::default(), std::io::stderr()).is_err() {
        log::debug!("logger already installed");
    }
}

fn run_info(file: &Path) -> Result<()> {
    ensure_pdf_exists(file)?;

    let mut engine = default_engine();
    let handle = engine.open(OpenSource::from(file), &mut |_| {}).context("failed to open PDF")?;

    let page_count = engine.page_count(handle)?;
    let pages = (1..=page_count)
        .map(|page| {
            let size = engine.page_size(handle, page)?;
            Ok(PageSizeOutput { page, width: size.width_pt, height: size.height_pt })
        })
        .collect::<Result<Vec<_>>>()?;

    let payload = InfoOutput { path: file.display().to_string(), page_count, pages };
    println!("{}", serde_json::to_string_pretty(&payload)?);

    engine.close(handle)?;
    Ok(())
}

fn run_simulate(file: &Path, config: ViewerConfig, viewport: f32, steps: &[Step]) -> Result<()> {
    ensure_pdf_exists(file)?;

    let mut viewer = Viewer::new(config)?;
    viewer.set_viewport_height(viewport);
    let mut driver = SyncDriver::new(default_engine());

    let mut now = Instant::now();
    if !driver.open(&mut viewer, OpenSource::from(file), now) {
        let reason = viewer
            .take_errors()
            .into_iter()
            .next()
            .map(|err| err.to_string())
            .unwrap_or_else(|| viewer.status().label().to_owned());
        anyhow::bail!("failed to open PDF: {reason}");
    }
    now = driver.settle(&mut viewer, now);
    info!("simulating {} steps on {}", steps.len(), file.display());

    let mut reports = vec![describe(&viewer, "open".to_owned())];
    for step in steps {
        match *step {
            Step::Page(page) => {
                viewer.scroll_to_page(page, now);
            }
            Step::Scroll(offset) => viewer.scroll_to_offset(offset, now),
            Step::Zoom(zoom) => {
                viewer.set_zoom(zoom, now);
            }
            Step::ZoomIn => {
                viewer.zoom_in(now);
            }
            Step::ZoomOut => {
                viewer.zoom_out(now);
            }
            Step::ResetZoom => {
                viewer.reset_zoom(now);
            }
            Step::Rotate => {
                viewer.rotate_clockwise(now);
            }
            Step::Sidebar => {
                viewer.toggle_sidebar();
            }
            Step::Wait(ms) => {
                now += Duration::from_millis(ms);
                viewer.tick(now);
            }
        }
        driver.pump(&mut viewer, now);
        now = driver.settle(&mut viewer, now);
        reports.push(describe(&viewer, step.to_string()));
    }

    let stats = viewer.stats();
    let payload = SimulateOutput {
        path: file.display().to_string(),
        page_count: viewer.page_count(),
        steps: reports,
        cache: CacheOutput {
            snapshots: stats.cache.snapshot_count,
            bytes_used: stats.cache.bytes_used,
            hits: stats.cache.hits,
            misses: stats.cache.misses,
            evictions: stats.cache.evictions,
            thumbnails: stats.thumbnails_cached,
        },
        errors: viewer.take_errors().iter().map(ToString::to_string).collect(),
    };
    println!("{}", serde_json::to_string_pretty(&payload)?);

    driver.close(&mut viewer);
    Ok(())
}

fn describe(viewer: &Viewer, action: String) -> StepOutput {
    StepOutput {
        action,
        current_page: viewer.current_page(),
        zoom: viewer.zoom(),
        visual_zoom: viewer.visual_zoom(),
        rotation: viewer.rotation().degrees(),
        scroll_offset: viewer.scroll_offset(),
        total_extent: viewer.total_extent(),
        sidebar_open: viewer.sidebar().is_open(),
        pages: viewer
            .paint_plan()
            .into_iter()
            .map(|paint| PaintOutput { page: paint.page, state: paint.state.label(), face: paint.face.label() })
            .collect(),
    }
}

fn run_snapshot(file: &Path, page: u32, scale: f32, rotation: u16, output: Option<&Path>) -> Result<()> {
    ensure_pdf_exists(file)?;

    if page == 0 {
        anyhow::bail!("--page is 1-based and must be >= 1");
    }
    let rotation = Rotation::from_degrees(rotation)
        .with_context(|| format!("--rotation must be 0, 90, 180 or 270, got {rotation}"))?;

    let mut engine = default_engine();
    let handle = engine.open(OpenSource::from(file), &mut |_| {}).context("failed to open PDF")?;
    let image = engine.render(handle, page, scale, rotation).context("failed to render page")?;

    let output = output.map(ToOwned::to_owned).unwrap_or_else(|| default_snapshot_output(file, page));
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let is_jpeg = output
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("jpg") || ext.eq_ignore_ascii_case("jpeg"));
    let saved = if is_jpeg {
        DynamicImage::ImageRgba8(image).to_rgb8().save(&output)
    } else {
        image.save(&output)
    };
    saved.with_context(|| format!("failed to write image to {}", output.display()))?;

    println!("{}", output.display());

    engine.close(handle)?;
    Ok(())
}

fn ensure_pdf_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        anyhow::bail!("file does not exist: {}", path.display());
    }

    if !path.is_file() {
        anyhow::bail!("path is not a file: {}", path.display());
    }

    Ok(())
}

fn default_snapshot_output(file: &Path, page: u32) -> PathBuf {
    let stem = file.file_stem().and_then(|name| name.to_str()).unwrap_or("snapshot");

    file.with_file_name(format!("{stem}-page-{page}.png"))
}
