use std::cell::RefCell;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use log::{LevelFilter, debug, info};
use simplelog::{Config, WriteLogger};

use folio::document::{BlankRenderer, Document, DocumentSource, ManifestDocument, open_document};
#[cfg(feature = "pdf")]
use folio::document::{PdfDocument, PdfRenderer};
use folio::frame::Frame;
use folio::localization::Localization;
use folio::panic_handler::initialize_panic_handler;
use folio::plugin::Plugin;
use folio::render::RenderService;
use folio::scheduler::RenderStatus;
use folio::settings::{Settings, load_settings};
use folio::view::{RotateDirection, ScrollMode, Size, ViewMode, ZoomLevel};
use folio::viewer::Viewer;

/// Inspect how documents are laid out and scheduled for rendering
#[derive(Parser, Debug)]
#[command(name = "folio", version, about)]
struct Cli {
    /// Settings file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Write logs to this file instead of stderr
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print title, page count and outline
    Outline {
        /// Document (.yaml/.json manifest, or .pdf with the `pdf` feature)
        document: PathBuf,
    },
    /// Print the visible window and the order pages get rendered in
    Plan(PlanArgs),
}

#[derive(clap::Args, Debug)]
struct PlanArgs {
    document: PathBuf,

    /// Page to jump to (1-based)
    #[arg(long)]
    page: Option<usize>,

    /// Named destination or `page=N&zoom=...` fragment to jump to
    #[arg(long, conflicts_with = "page")]
    destination: Option<String>,

    /// Scale factor, percentage, page-fit, page-width or actual-size
    #[arg(long)]
    zoom: Option<ZoomLevel>,

    /// Rotate the document, repeatable: cw or ccw
    #[arg(long, value_parser = parse_direction)]
    rotate: Vec<RotateDirection>,

    /// vertical, horizontal, wrapped or page
    #[arg(long)]
    scroll_mode: Option<ScrollMode>,

    /// single, dual or cover
    #[arg(long)]
    view_mode: Option<ViewMode>,

    /// Viewport size as WxH
    #[arg(long, value_parser = parse_viewport, default_value = "800x600")]
    viewport: Size,

    /// Print JSON instead of text
    #[arg(long)]
    json: bool,
}

fn parse_direction(s: &str) -> Result<RotateDirection, String> {
    match s.to_ascii_lowercase().as_str() {
        "cw" | "forward" | "right" => Ok(RotateDirection::Forward),
        "ccw" | "backward" | "left" => Ok(RotateDirection::Backward),
        _ => Err(format!("invalid rotation: {s} (expected cw or ccw)")),
    }
}

fn parse_viewport(s: &str) -> Result<Size, String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("invalid viewport: {s} (expected WxH)"))?;
    let width: f32 = w.trim().parse().map_err(|_| format!("invalid width: {w}"))?;
    let height: f32 = h.trim().parse().map_err(|_| format!("invalid height: {h}"))?;
    if width <= 0.0 || height <= 0.0 {
        return Err(format!("viewport must not be empty: {s}"));
    }
    Ok(Size::new(width, height))
}

fn init_logging(log_file: Option<&Path>, level: LevelFilter) -> Result<()> {
    match log_file {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create log file {}", path.display()))?;
            WriteLogger::init(level, Config::default(), file)?;
        }
        None => WriteLogger::init(level, Config::default(), std::io::stderr())?,
    }
    Ok(())
}

fn main() -> Result<()> {
    initialize_panic_handler();
    let cli = Cli::parse();

    // The logger lets everything through; the global max level filters.
    // Settings are loaded after the logger so their messages are kept.
    init_logging(cli.log_file.as_deref(), LevelFilter::Trace)?;
    log::set_max_level(if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    });
    info!("Starting folio");

    let settings = load_settings(cli.config.as_deref());
    if !cli.verbose {
        log::set_max_level(settings.log_level());
    }

    match cli.command {
        Commands::Outline { document } => outline(&document),
        Commands::Plan(args) => plan(&settings, args),
    }
}

fn outline(path: &Path) -> Result<()> {
    let source = DocumentSource::from(path);
    let doc = open_document(&source)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    let info = folio::document::describe(doc.as_ref());

    println!("{}", info.title.as_deref().unwrap_or(&info.name));
    println!("{} pages", info.page_count);
    for entry in &info.outline {
        let target = match (&entry.destination, &entry.uri) {
            (Some(dest), _) => format!("p. {}", dest.page_index + 1),
            (None, Some(uri)) => uri.clone(),
            (None, None) => String::new(),
        };
        println!("{}{}  {target}", "  ".repeat(entry.level), entry.title);
    }
    Ok(())
}

/// Collects the order in which pages finish rendering
struct RenderLog {
    rendered: Rc<RefCell<Vec<usize>>>,
}

impl Plugin for RenderLog {
    fn name(&self) -> &str {
        "render-log"
    }

    fn on_render_status(&mut self, page: usize, status: RenderStatus) {
        if status == RenderStatus::Rendered {
            self.rendered.borrow_mut().push(page);
        }
    }
}

fn open_for_render(
    source: &DocumentSource,
    settings: &Settings,
) -> Result<(Box<dyn Document>, RenderService)> {
    let extension = source.extension().unwrap_or_default();
    match extension.as_str() {
        "yaml" | "yml" | "json" => {
            let doc = ManifestDocument::from_source(source)?;
            let pages = doc.clone();
            let service = RenderService::new(
                move || Ok(BlankRenderer::new(pages.clone())),
                settings.render_workers,
                settings.cache_size,
            );
            Ok((Box::new(doc), service))
        }
        #[cfg(feature = "pdf")]
        "pdf" => {
            let doc = PdfDocument::from_source(source)?;
            let source = source.clone();
            let service = RenderService::new(
                move || PdfRenderer::open(&source),
                settings.render_workers,
                settings.cache_size,
            );
            Ok((Box::new(doc), service))
        }
        other => bail!("Unsupported document type: {other:?}"),
    }
}

fn plan(settings: &Settings, args: PlanArgs) -> Result<()> {
    let source = DocumentSource::from(args.document.as_path());
    let (doc, mut service) = open_for_render(&source, settings)
        .with_context(|| format!("Failed to open {}", args.document.display()))?;

    let mut options = settings.viewer_options(args.viewport);
    if let Some(zoom) = args.zoom {
        options.zoom = zoom;
    }
    if let Some(mode) = args.scroll_mode {
        options.scroll_mode = mode;
    }
    if let Some(mode) = args.view_mode {
        options.view_mode = mode;
    }

    let mut viewer = Viewer::new(doc, options)?;
    if let Some(path) = &settings.locale_file {
        let localization = Localization::load(path)
            .with_context(|| format!("Failed to load locale file {}", path.display()))?;
        viewer = viewer.with_localization(localization);
    }

    let rendered = Rc::new(RefCell::new(Vec::new()));
    viewer.install_plugin(Box::new(RenderLog {
        rendered: rendered.clone(),
    }))?;

    for direction in &args.rotate {
        viewer.rotate(*direction);
    }
    if let Some(page) = args.page {
        if page == 0 {
            bail!("Pages are numbered from 1");
        }
        viewer.jump_to_page(page - 1)?;
    }
    if let Some(dest) = &args.destination {
        viewer.jump_to_named_destination(dest)?;
    }

    let timeout = Duration::from_millis(settings.render_timeout_ms.max(1));
    loop {
        let sent = viewer.drive_render(&mut service, Instant::now());
        debug!("Dispatched {sent} renders, {} pending", service.pending());
        if service.pending() == 0 {
            break;
        }
        match service.wait_response(timeout) {
            Some(response) => {
                viewer.apply_render_response(&response);
            }
            None => bail!("Render timed out after {timeout:?}"),
        }
    }

    let frame = viewer.frame();
    let order = rendered.borrow().clone();
    if args.json {
        print_json(&viewer, &frame, &order)?;
    } else {
        print_text(&viewer, &frame, &order);
    }
    Ok(())
}

fn print_text(viewer: &Viewer, frame: &Frame, order: &[usize]) {
    let snapshot = viewer.snapshot();
    println!(
        "{} ({} pages)",
        if snapshot.document.is_empty() { "<unnamed>" } else { snapshot.document.as_str() },
        snapshot.page_count
    );
    println!(
        "scale {:.3}, rotation {}, scroll mode {}, view mode {}",
        snapshot.scale,
        snapshot.rotation,
        snapshot.scroll_mode.as_str(),
        snapshot.view_mode.as_str()
    );
    println!(
        "viewport {:.0}x{:.0} at {:.0},{:.0} of {:.0}x{:.0}",
        frame.viewport.width,
        frame.viewport.height,
        frame.scroll.main,
        frame.scroll.cross,
        frame.content_size.width,
        frame.content_size.height
    );
    match viewer.visible_pages() {
        Some((first, last)) => println!(
            "visible pages {}-{}, current page {}",
            first + 1,
            last + 1,
            viewer.current_page() + 1
        ),
        None => println!("no visible pages"),
    }

    for slot in &frame.pages {
        println!(
            "  page {:>4}  {:>7.1},{:>7.1}  {:>6.1}x{:<6.1}  {:>3.0}%  {}",
            slot.index + 1,
            slot.rect.x,
            slot.rect.y,
            slot.rect.width,
            slot.rect.height,
            slot.visibility * 100.0,
            slot.status.as_str()
        );
    }

    let order: Vec<String> = order.iter().map(|p| (p + 1).to_string()).collect();
    println!("render order: {}", order.join(", "));
}

fn print_json(viewer: &Viewer, frame: &Frame, order: &[usize]) -> Result<()> {
    let slots: Vec<_> = frame
        .pages
        .iter()
        .map(|slot| {
            serde_json::json!({
                "page": slot.index,
                "rect": [slot.rect.x, slot.rect.y, slot.rect.width, slot.rect.height],
                "rotation": slot.rotation.degrees(),
                "visibility": slot.visibility,
                "status": slot.status.as_str(),
                "attributes": slot.attributes,
            })
        })
        .collect();

    let plan = serde_json::json!({
        "state": viewer.snapshot(),
        "visible_pages": viewer.visible_pages(),
        "content_size": frame.content_size,
        "viewer_attributes": frame.attributes,
        "pages": slots,
        "render_order": order,
    });
    println!("{}", serde_json::to_string_pretty(&plan)?);
    Ok(())
}
