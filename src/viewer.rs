//! The document viewer
//!
//! [`Viewer`] owns the view state, the page layout, the virtualizer and the
//! render queue. Every public operation turns into a [`Command`], the state
//! answers with a list of [`Effect`]s and the viewer carries them out in
//! order.

use std::sync::Arc;
use std::time::{Duration, Instant};

use flume::{Receiver, Sender};
use log::{debug, info, warn};

use crate::attributes::Attributes;
use crate::document::{Destination, Document, DocumentInfo, describe};
use crate::error::{Result, ViewerError};
use crate::frame::{Frame, PageSlot};
use crate::history::JumpHistory;
use crate::localization::Localization;
use crate::plugin::{CommandSender, Plugin, PluginContext, PluginHost, ViewerSnapshot};
use crate::render::{CacheKey, RenderParams, RenderResponse, RenderService};
use crate::scheduler::{RenderQueue, RenderStatus, VirtualRange, Virtualizer};
use crate::view::{
    Command, Effect, LayoutParams, PageLayout, PageMetrics, PageSize, Rect, RotateDirection,
    Rotation, ScrollMode, ScrollPosition, Size, ViewMode, ViewerState, ZoomLevel, map_point,
};

/// Viewer configuration, usually built from [`crate::settings::Settings`]
#[derive(Clone, Debug)]
pub struct ViewerOptions {
    pub container: Size,
    pub zoom: ZoomLevel,
    pub scroll_mode: ScrollMode,
    pub view_mode: ViewMode,
    /// Space between pages and around the content
    pub gap: f32,
    /// Rows kept mounted on each side of the visible ones
    pub overscan: usize,
    pub render_timeout: Duration,
    pub max_renders_in_flight: usize,
    pub history_size: usize,
}

impl Default for ViewerOptions {
    fn default() -> Self {
        Self {
            container: Size::new(800.0, 600.0),
            zoom: ZoomLevel::default(),
            scroll_mode: ScrollMode::default(),
            view_mode: ViewMode::default(),
            gap: 10.0,
            overscan: 1,
            render_timeout: RenderQueue::DEFAULT_TIMEOUT,
            max_renders_in_flight: 1,
            history_size: 50,
        }
    }
}

/// Reading position kept across relayouts
#[derive(Clone, Copy, Debug)]
struct Anchor {
    page: usize,
    /// Scroll offset relative to the page start, in page extents
    main: f32,
    /// Cross-axis scroll, as a fraction of the scrollable cross range
    cross: f32,
}

pub struct Viewer {
    document: Box<dyn Document>,
    info: DocumentInfo,
    base_sizes: Vec<PageSize>,
    state: ViewerState,
    gap: f32,
    overscan: usize,
    layout: PageLayout,
    virtualizer: Virtualizer,
    range: Option<VirtualRange>,
    queue: RenderQueue,
    plugins: PluginHost,
    command_tx: Sender<Command>,
    command_rx: Receiver<Command>,
    localization: Arc<Localization>,
    history: JumpHistory,
    snapshot: ViewerSnapshot,
}

fn load_page_sizes(document: &dyn Document) -> Result<Vec<PageSize>> {
    let count = document.page_count();
    if count == 0 {
        return Err(ViewerError::EmptyDocument);
    }
    (0..count).map(|page| document.page_size(page)).collect()
}

impl Viewer {
    pub fn new(document: Box<dyn Document>, options: ViewerOptions) -> Result<Self> {
        let base_sizes = load_page_sizes(document.as_ref())?;
        let info = describe(document.as_ref());
        info!(
            "Viewing {} ({} pages)",
            if info.name.is_empty() { "<unnamed>" } else { info.name.as_str() },
            info.page_count
        );

        let mut state = ViewerState::new(base_sizes.len(), options.container);
        state.scroll_mode = options.scroll_mode;
        state.view_mode = options.view_mode;
        if state.scroll_mode == ScrollMode::Wrapped && state.view_mode.is_dual() {
            warn!("Wrapped scrolling does not support dual pages, using single page view");
            state.view_mode = ViewMode::SinglePage;
        }
        state.zoom = options.zoom;
        let gap = options.gap.max(0.0);
        state.scale = state.resolve_scale(
            options.zoom,
            &PageMetrics {
                base_sizes: &base_sizes,
                gap,
            },
        );

        let (command_tx, command_rx) = flume::unbounded();
        let snapshot = ViewerSnapshot::capture(&state, &info.name);
        let queue = RenderQueue::new(
            base_sizes.len(),
            options.render_timeout,
            options.max_renders_in_flight,
        );

        let mut viewer = Self {
            document,
            info,
            base_sizes,
            state,
            gap,
            overscan: options.overscan,
            layout: PageLayout::default(),
            virtualizer: Virtualizer::default(),
            range: None,
            queue,
            plugins: PluginHost::new(),
            command_tx,
            command_rx,
            localization: Arc::new(Localization::default()),
            history: JumpHistory::new(options.history_size),
            snapshot,
        };
        viewer.relayout();
        viewer.update_visibility(false);
        Ok(viewer)
    }

    /// Replace the built-in strings; plugins installed later see the new ones
    #[must_use]
    pub fn with_localization(mut self, localization: Localization) -> Self {
        self.localization = Arc::new(localization);
        self
    }

    // ---- accessors ----

    #[must_use]
    pub fn document(&self) -> &dyn Document {
        self.document.as_ref()
    }

    #[must_use]
    pub fn document_info(&self) -> &DocumentInfo {
        &self.info
    }

    #[must_use]
    pub fn state(&self) -> &ViewerState {
        &self.state
    }

    #[must_use]
    pub fn page_count(&self) -> usize {
        self.state.page_count
    }

    #[must_use]
    pub fn current_page(&self) -> usize {
        self.state.current_page
    }

    #[must_use]
    pub fn scale(&self) -> f32 {
        self.state.scale
    }

    #[must_use]
    pub fn zoom_level(&self) -> ZoomLevel {
        self.state.zoom
    }

    #[must_use]
    pub fn rotation(&self) -> Rotation {
        self.state.rotation
    }

    /// Effective rotation of one page
    #[must_use]
    pub fn page_rotation(&self, page: usize) -> Rotation {
        self.state.page_rotation(page)
    }

    #[must_use]
    pub fn scroll_mode(&self) -> ScrollMode {
        self.state.scroll_mode
    }

    #[must_use]
    pub fn view_mode(&self) -> ViewMode {
        self.state.view_mode
    }

    #[must_use]
    pub fn scroll(&self) -> ScrollPosition {
        self.state.scroll
    }

    #[must_use]
    pub fn layout(&self) -> &PageLayout {
        &self.layout
    }

    #[must_use]
    pub fn localization(&self) -> &Localization {
        &self.localization
    }

    /// State as last reported through the plugin chain
    #[must_use]
    pub fn snapshot(&self) -> &ViewerSnapshot {
        &self.snapshot
    }

    /// First and last page intersecting the viewport
    #[must_use]
    pub fn visible_pages(&self) -> Option<(usize, usize)> {
        let range = self.range?;
        let first = self.layout.rows.get(range.start)?.pages.start;
        let last = self.layout.rows.get(range.end)?.pages.end.checked_sub(1)?;
        Some((first, last))
    }

    #[must_use]
    pub fn render_status(&self, page: usize) -> Option<RenderStatus> {
        self.queue.status(page)
    }

    /// Fraction of the page inside the viewport, -1 outside the window
    #[must_use]
    pub fn visibility(&self, page: usize) -> f32 {
        self.queue.visibility(page)
    }

    /// Current reading position, used as a history entry. The in-page
    /// offset is kept as `top` when the scroll axis runs along the page's
    /// own vertical axis; otherwise the entry names the page only.
    #[must_use]
    pub fn current_destination(&self) -> Destination {
        let page = self.state.current_page;
        let dest = Destination::page(page);
        let (Some(rect), Some(base)) = (
            self.layout.page_rects.get(page),
            self.base_sizes.get(page).copied(),
        ) else {
            return dest;
        };
        let offset = (self.state.scroll.main - self.layout.main_start(rect)) / self.state.scale;
        if !offset.is_finite() || offset <= 0.0 {
            return dest;
        }

        // Unrotated y of the viewport's leading edge, top-left origin
        let y = match (self.horizontal(), self.state.page_rotation(page).degrees()) {
            (false, 0) | (true, 270) => offset,
            (false, 180) | (true, 90) => base.height - offset,
            _ => return dest,
        };
        dest.with_position(None, Some((base.height - y).clamp(0.0, base.height)))
    }

    // ---- plugins ----

    pub fn install_plugin(&mut self, plugin: Box<dyn Plugin>) -> Result<()> {
        let ctx = PluginContext {
            commands: CommandSender::new(self.command_tx.clone()),
            localization: self.localization.clone(),
        };
        let plugin = self.plugins.install(plugin, &ctx)?;
        plugin.on_document_load(&self.info);
        self.notify_state_change();
        Ok(())
    }

    /// Returns false if no plugin has this name
    pub fn uninstall_plugin(&mut self, name: &str) -> bool {
        self.plugins.uninstall(name).is_some()
    }

    pub fn plugin_names(&self) -> impl Iterator<Item = &str> {
        self.plugins.names()
    }

    /// Execute commands queued by plugins; returns how many ran
    pub fn drain_plugin_commands(&mut self) -> usize {
        let mut count = 0;
        while let Ok(cmd) = self.command_rx.try_recv() {
            count += 1;
            if let Err(e) = self.dispatch(cmd) {
                warn!("Plugin command failed: {e}");
            }
        }
        count
    }

    // ---- operations ----

    /// Run any command, validating the ones that address a page
    pub fn dispatch(&mut self, cmd: Command) -> Result<()> {
        match cmd {
            Command::JumpToPage(page) => self.jump_to_page(page),
            Command::JumpToDestination(dest) => self.jump_to_destination(dest),
            Command::RotatePage { page, direction } => self.rotate_page(page, direction),
            other => {
                self.run(other);
                Ok(())
            }
        }
    }

    pub fn jump_to_page(&mut self, page: usize) -> Result<()> {
        self.check_page(page)?;
        self.history.push(self.current_destination());
        self.run(Command::JumpToPage(page));
        Ok(())
    }

    pub fn jump_to_destination(&mut self, dest: Destination) -> Result<()> {
        self.check_page(dest.page_index)?;
        self.history.push(self.current_destination());
        self.run(Command::JumpToDestination(dest));
        Ok(())
    }

    /// Resolve a named destination or a `page=N` fragment and jump to it
    pub fn jump_to_named_destination(&mut self, name: &str) -> Result<()> {
        let dest = self.document.resolve_destination(name)?;
        debug!("Resolved destination {name:?} to page {}", dest.page_index);
        self.jump_to_destination(dest)
    }

    /// Go back in the jump history; false if there is nothing to go back to
    pub fn jump_to_previous_destination(&mut self) -> bool {
        let current = self.current_destination();
        self.history_jump(|history| history.back(Some(current)))
    }

    pub fn jump_to_next_destination(&mut self) -> bool {
        self.history_jump(JumpHistory::forward)
    }

    fn history_jump(&mut self, step: impl FnOnce(&mut JumpHistory) -> Option<Destination>) -> bool {
        let Some(dest) = step(&mut self.history) else {
            return false;
        };
        if dest.page_index >= self.state.page_count {
            return false;
        }
        self.run(Command::JumpToDestination(dest));
        true
    }

    pub fn zoom(&mut self, level: ZoomLevel) {
        self.run(Command::Zoom(level));
    }

    pub fn zoom_in(&mut self) {
        self.run(Command::ZoomIn);
    }

    pub fn zoom_out(&mut self) {
        self.run(Command::ZoomOut);
    }

    pub fn rotate(&mut self, direction: RotateDirection) {
        self.run(Command::Rotate(direction));
    }

    pub fn rotate_page(&mut self, page: usize, direction: RotateDirection) -> Result<()> {
        self.check_page(page)?;
        self.run(Command::RotatePage { page, direction });
        Ok(())
    }

    pub fn switch_scroll_mode(&mut self, mode: ScrollMode) {
        self.run(Command::SwitchScrollMode(mode));
    }

    pub fn switch_view_mode(&mut self, mode: ViewMode) {
        self.run(Command::SwitchViewMode(mode));
    }

    /// Scroll to an absolute offset along the main and cross axes
    pub fn scroll_to(&mut self, main: f32, cross: f32) {
        self.run(Command::ScrollTo { main, cross });
    }

    pub fn scroll_by(&mut self, main: f32, cross: f32) {
        let scroll = self.state.scroll;
        if self.state.scroll_mode == ScrollMode::Page && main != 0.0 {
            // Page mode moves a whole row at a time
            let row = self.layout.row_of(self.state.current_page).unwrap_or(0);
            let target = if main > 0.0 {
                (row + 1).min(self.layout.rows.len().saturating_sub(1))
            } else {
                row.saturating_sub(1)
            };
            // Jump to the row itself: near the end several rows share the
            // same clamped offset, so the offset alone can't name the row
            if target != row {
                self.run(Command::JumpToPage(self.layout.rows[target].pages.start));
            }
            if cross != 0.0 {
                self.run(Command::ScrollTo {
                    main: self.state.scroll.main,
                    cross: self.state.scroll.cross + cross,
                });
            }
            return;
        }
        self.run(Command::ScrollTo {
            main: scroll.main + main,
            cross: scroll.cross + cross,
        });
    }

    /// The viewport changed size
    pub fn resize(&mut self, container: Size) {
        self.run(Command::Resize(container));
    }

    /// Swap in a new version of the document, keeping zoom and modes
    pub fn reload(&mut self, document: Box<dyn Document>) -> Result<()> {
        let base_sizes = load_page_sizes(document.as_ref())?;
        let page_count = base_sizes.len();
        let anchor = self.capture_anchor();

        self.document = document;
        self.info = describe(self.document.as_ref());
        self.base_sizes = base_sizes;
        self.queue.resize(page_count);
        self.history.clear();
        info!("Reloaded {} ({page_count} pages)", self.info.name);

        let mut effects = self.state.apply(
            Command::SetPageCount(page_count),
            &PageMetrics {
                base_sizes: &self.base_sizes,
                gap: self.gap,
            },
        );
        if effects.is_empty() {
            effects = vec![
                Effect::Relayout,
                Effect::ResetRenderQueue,
                Effect::ClampScroll,
                Effect::UpdateVisibility,
                Effect::NotifyPlugins,
            ];
        }
        self.plugins.document_loaded(&self.info);
        self.execute_effects(effects, anchor);
        Ok(())
    }

    fn check_page(&self, page: usize) -> Result<()> {
        if page >= self.state.page_count {
            return Err(ViewerError::PageOutOfRange {
                page,
                page_count: self.state.page_count,
            });
        }
        Ok(())
    }

    fn run(&mut self, cmd: Command) {
        let anchor = self.capture_anchor();
        let effects = self.state.apply(
            cmd,
            &PageMetrics {
                base_sizes: &self.base_sizes,
                gap: self.gap,
            },
        );
        self.execute_effects(effects, anchor);
    }

    fn execute_effects(&mut self, effects: Vec<Effect>, anchor: Anchor) {
        let page_before = anchor.page;
        let mut notified = false;
        // After a jump or a relayout the state already names the current page
        let pinned = effects.iter().any(|e| {
            matches!(
                e,
                Effect::ScrollToPage(_) | Effect::ScrollToDestination(_) | Effect::KeepAnchor
            )
        });

        for effect in effects {
            match effect {
                Effect::Relayout => self.relayout(),
                Effect::ResetRenderQueue => self.queue.reset(),
                Effect::ResetPage(page) => self.queue.mark_not_rendered(page),
                Effect::ScrollToPage(page) => self.scroll_to_page(page),
                Effect::ScrollToDestination(dest) => self.scroll_to_destination(&dest),
                Effect::KeepAnchor => self.restore_anchor(anchor),
                Effect::ClampScroll => self.clamp_scroll(true),
                Effect::UpdateVisibility => self.update_visibility(!pinned),
                Effect::NotifyPlugins => {
                    self.notify_state_change();
                    notified = true;
                }
            }
        }

        if self.state.current_page != page_before {
            debug!("Current page {page_before} -> {}", self.state.current_page);
            self.plugins.page_changed(self.state.current_page);
            if !notified {
                self.notify_state_change();
            }
        }
    }

    fn notify_state_change(&mut self) {
        let snapshot = ViewerSnapshot::capture(&self.state, &self.info.name);
        self.snapshot = self.plugins.state_changed(snapshot);
    }

    // ---- layout and scrolling ----

    fn relayout(&mut self) {
        let sizes = self.state.rotated_sizes(&PageMetrics {
            base_sizes: &self.base_sizes,
            gap: self.gap,
        });
        self.layout = PageLayout::compute(&LayoutParams {
            sizes: &sizes,
            scale: self.state.scale,
            gap: self.gap,
            scroll_mode: self.state.scroll_mode,
            view_mode: self.state.view_mode,
            container: self.state.container,
        });

        let extents = self.layout.row_extents();
        self.virtualizer = Virtualizer::new(extents.len(), |row| extents[row])
            .with_gap(self.gap)
            .with_padding(self.gap, self.gap);
        debug!(
            "Layout: {} rows, content {:.0}x{:.0}",
            self.layout.rows.len(),
            self.layout.content_size.width,
            self.layout.content_size.height
        );
    }

    fn horizontal(&self) -> bool {
        self.state.scroll_mode.is_horizontal()
    }

    /// (viewport main, viewport cross)
    fn viewport_extents(&self) -> (f32, f32) {
        let container = self.state.container;
        if self.horizontal() {
            (container.width, container.height)
        } else {
            (container.height, container.width)
        }
    }

    /// (max main offset, max cross offset)
    fn max_scroll(&self) -> (f32, f32) {
        let content = self.layout.content_size;
        let (content_main, content_cross) = if self.horizontal() {
            (content.width, content.height)
        } else {
            (content.height, content.width)
        };
        let (view_main, view_cross) = self.viewport_extents();
        (
            (content_main - view_main).max(0.0),
            (content_cross - view_cross).max(0.0),
        )
    }

    fn viewport_rect(&self) -> Rect {
        let ScrollPosition { main, cross } = self.state.scroll;
        let container = self.state.container;
        if self.horizontal() {
            Rect::new(main, cross, container.width, container.height)
        } else {
            Rect::new(cross, main, container.width, container.height)
        }
    }

    /// Scroll offset that shows a row with the gap above it
    fn row_scroll_offset(&self, row: usize) -> f32 {
        let (max_main, _) = self.max_scroll();
        self.virtualizer
            .item(row)
            .map_or(0.0, |item| (item.start - self.gap).clamp(0.0, max_main))
    }

    fn set_scroll(&mut self, main: f32, cross: f32) {
        self.state.scroll = ScrollPosition { main, cross };
        self.clamp_scroll(false);
    }

    /// Keep the offset inside the content. In page mode the offset snaps to
    /// a row start; `follow` lets the snapped row choose the current page.
    fn clamp_scroll(&mut self, follow: bool) {
        let (max_main, max_cross) = self.max_scroll();
        let main = finite_or_zero(self.state.scroll.main).clamp(0.0, max_main);
        let cross = finite_or_zero(self.state.scroll.cross).clamp(0.0, max_cross);

        if self.state.scroll_mode != ScrollMode::Page || self.layout.rows.is_empty() {
            self.state.scroll = ScrollPosition { main, cross };
            return;
        }

        let current_row = self.layout.row_of(self.state.current_page).unwrap_or(0);
        // Keep the current row while its own offset is the requested one
        let row = if follow && (self.row_scroll_offset(current_row) - main).abs() > 0.5 {
            self.virtualizer.index_at(main + self.gap).unwrap_or(0)
        } else {
            current_row
        };
        if row != current_row {
            self.state.current_page = self.layout.rows[row].pages.start;
        }
        self.state.scroll = ScrollPosition {
            main: self.row_scroll_offset(row),
            cross,
        };
    }

    fn scroll_to_page(&mut self, page: usize) {
        let Some(rect) = self.layout.page_rects.get(page).copied() else {
            return;
        };
        let main = self.layout.main_start(&rect) - self.gap;
        let cross = self.state.scroll.cross;
        self.set_scroll(main, cross);
    }

    /// Put the destination point at the top-left of the viewport. Missing
    /// coordinates keep the page edge (top) or the current cross offset (left).
    fn scroll_to_destination(&mut self, dest: &Destination) {
        let page = dest.page_index;
        let (Some(rect), Some(base)) = (
            self.layout.page_rects.get(page).copied(),
            self.base_sizes.get(page).copied(),
        ) else {
            return;
        };
        if dest.left.is_none() && dest.top.is_none() {
            self.scroll_to_page(page);
            return;
        }

        // PDF space has its origin at the bottom-left
        let x = dest.left.unwrap_or(0.0).clamp(0.0, base.width);
        let y = dest.top.map_or(0.0, |top| (base.height - top).clamp(0.0, base.height));
        let (px, py) = map_point(x, y, base, self.state.page_rotation(page));
        let scale = self.state.scale;
        let point_x = rect.x + px * scale;
        let point_y = rect.y + py * scale;

        let (point_main, point_cross) = if self.horizontal() {
            (point_x, point_y)
        } else {
            (point_y, point_x)
        };
        let main = if dest.top.is_some() {
            point_main
        } else {
            self.layout.main_start(&rect) - self.gap
        };
        let cross = if dest.left.is_some() {
            point_cross
        } else {
            self.state.scroll.cross
        };
        self.set_scroll(main, cross);
    }

    fn capture_anchor(&self) -> Anchor {
        let page = self.state.current_page;
        let (_, max_cross) = self.max_scroll();
        let cross = if max_cross > 0.0 {
            self.state.scroll.cross / max_cross
        } else {
            0.5
        };

        let main = self
            .layout
            .page_rects
            .get(page)
            .map_or(0.0, |rect| {
                let extent = self.layout.main_extent(rect);
                if extent > 0.0 {
                    (self.state.scroll.main - self.layout.main_start(rect)) / extent
                } else {
                    0.0
                }
            });

        Anchor { page, main, cross }
    }

    fn restore_anchor(&mut self, anchor: Anchor) {
        let page = self.state.current_page;
        let Some(rect) = self.layout.page_rects.get(page).copied() else {
            return;
        };
        let fraction = if page == anchor.page { anchor.main } else { 0.0 };
        let main = self.layout.main_start(&rect) + fraction * self.layout.main_extent(&rect);
        let (_, max_cross) = self.max_scroll();
        self.set_scroll(main, anchor.cross.clamp(0.0, 1.0) * max_cross);
    }

    // ---- visibility ----

    fn update_visibility(&mut self, recompute_current: bool) {
        let (view_main, _) = self.viewport_extents();
        self.virtualizer.set_viewport(self.state.scroll.main, view_main);

        self.range = if self.state.scroll_mode == ScrollMode::Page {
            self.layout.row_of(self.state.current_page).map(|row| VirtualRange {
                start: row,
                end: row,
                overscan_start: row.saturating_sub(self.overscan),
                overscan_end: (row + self.overscan).min(self.layout.rows.len().saturating_sub(1)),
            })
        } else {
            self.virtualizer.range(self.overscan)
        };

        let Some(range) = self.range else {
            self.queue.set_range(None);
            return;
        };
        let first = self.layout.rows[range.overscan_start].pages.start;
        let last = self.layout.rows[range.overscan_end].pages.end.saturating_sub(1);
        self.queue.set_range(Some((first, last)));

        let view = self.viewport_rect();
        let mut best: Option<(usize, f32)> = None;
        for page in first..=last {
            let visibility = if range.contains(self.layout.page_rows[page]) {
                visible_fraction(&self.layout.page_rects[page], &view)
            } else {
                0.0
            };
            self.queue.set_visibility(page, visibility);
            if visibility > 0.0 && best.is_none_or(|(_, v)| visibility > v) {
                best = Some((page, visibility));
            }
        }

        if recompute_current && self.state.scroll_mode != ScrollMode::Page {
            if let Some((page, _)) = best {
                self.state.current_page = page;
            }
        }
    }

    // ---- rendering ----

    /// What a render of `page` looks like in the current state
    #[must_use]
    pub fn render_params(&self, page: usize) -> RenderParams {
        RenderParams {
            page,
            scale: self.state.scale,
            rotation: self.state.page_rotation(page),
        }
    }

    /// Next page the scheduler wants rendered, if any
    pub fn next_page_to_render(&mut self, now: Instant) -> Option<usize> {
        self.queue.next_to_render(now)
    }

    pub fn page_render_started(&mut self, page: usize, now: Instant) {
        self.queue.mark_rendering(page, now);
        self.report_status(page);
    }

    pub fn page_rendered(&mut self, page: usize) {
        self.queue.mark_rendered(page);
        self.report_status(page);
    }

    pub fn page_render_failed(&mut self, page: usize) {
        self.queue.mark_failed(page);
        self.report_status(page);
    }

    fn report_status(&mut self, page: usize) {
        if let Some(status) = self.queue.status(page) {
            self.plugins.render_status_changed(page, status);
        }
    }

    /// Apply finished renders, then hand the service every page the
    /// scheduler picks. Cached pages are marked rendered right away, and
    /// stalled ones are requested again. Returns the number of requests sent.
    pub fn drive_render(&mut self, service: &mut RenderService, now: Instant) -> usize {
        for response in service.poll_responses() {
            self.apply_render_response(&response);
        }
        for page in self.queue.reclaim_stalled(now) {
            service.forget(&self.render_params(page));
            self.report_status(page);
        }

        let mut sent = 0;
        while let Some(page) = self.queue.next_to_render(now) {
            let params = self.render_params(page);
            if service.cached(&params).is_some() {
                self.page_rendered(page);
                continue;
            }
            if !service.is_in_flight(&params) {
                service.request(params);
                sent += 1;
            }
            self.page_render_started(page, now);
        }
        sent
    }

    /// Record a finished render. Responses for an outdated scale or rotation
    /// are ignored; returns whether the response was used.
    pub fn apply_render_response(&mut self, response: &RenderResponse) -> bool {
        let params = response.params();
        if params.page >= self.state.page_count {
            return false;
        }
        if CacheKey::from_params(params) != CacheKey::from_params(&self.render_params(params.page))
        {
            debug!("Ignoring stale render of page {}", params.page);
            return false;
        }

        match response {
            RenderResponse::Page { .. } => self.page_rendered(params.page),
            RenderResponse::Error { error, .. } => {
                warn!("Render of page {} failed: {error}", params.page);
                self.page_render_failed(params.page);
            }
        }
        true
    }

    // ---- frame ----

    /// Everything a UI needs to paint the current window
    #[must_use]
    pub fn frame(&self) -> Frame {
        let mut attributes = Attributes::new();
        attributes
            .add_class("folio-viewer")
            .data("testid", "core__viewer")
            .data("scroll-mode", self.state.scroll_mode.as_str())
            .data("view-mode", self.state.view_mode.as_str())
            .aria(
                "label",
                self.localization.text("core.viewer.label", "Document viewer"),
            );
        let mut extra = Attributes::new();
        self.plugins.viewer_attributes(&mut extra);
        attributes.merge(&extra);

        let pages: Vec<PageSlot> = self
            .range
            .map(|range| {
                let first = self.layout.rows[range.overscan_start].pages.start;
                let last = self.layout.rows[range.overscan_end].pages.end;
                (first..last).map(|page| self.page_slot(page)).collect()
            })
            .unwrap_or_default();

        Frame {
            attributes,
            content_size: self.layout.content_size,
            viewport: self.state.container,
            scroll: self.state.scroll,
            pages,
        }
    }

    fn page_slot(&self, page: usize) -> PageSlot {
        let rect = self.layout.page_rects[page];
        let rotation = self.state.page_rotation(page);
        let status = self.queue.status(page).unwrap_or(RenderStatus::NotRendered);

        let mut attributes = Attributes::new();
        attributes.add_class("folio-page");
        if rotation != Rotation::NONE {
            attributes.add_class(&format!("folio-page--rotated-{}", rotation.degrees()));
        }
        attributes
            .data("testid", format!("core__page-layer-{page}"))
            .data("page-index", page)
            .data("render-status", status.as_str())
            .add_style("left", &format!("{:.0}px", rect.x))
            .add_style("top", &format!("{:.0}px", rect.y))
            .add_style("width", &format!("{:.0}px", rect.width))
            .add_style("height", &format!("{:.0}px", rect.height))
            .aria(
                "label",
                self.localization.format(
                    "core.pageLabel",
                    "Page {pageIndex}",
                    &[("pageIndex", (page + 1).to_string())],
                ),
            );

        let mut slot = PageSlot {
            index: page,
            rect,
            rotation,
            scale: self.state.scale,
            status,
            visibility: self.queue.visibility(page).max(0.0),
            attributes,
            layers: Vec::new(),
        };

        let mut extra = Attributes::new();
        self.plugins.page_attributes(&slot, &mut extra);
        slot.attributes.merge(&extra);
        slot.layers = self.plugins.page_layers(&slot);
        slot
    }
}

impl Drop for Viewer {
    fn drop(&mut self) {
        self.plugins.uninstall_all();
    }
}

fn finite_or_zero(value: f32) -> f32 {
    if value.is_finite() { value } else { 0.0 }
}

/// Fraction of `rect`'s area inside `view`
fn visible_fraction(rect: &Rect, view: &Rect) -> f32 {
    let area = rect.width * rect.height;
    if area <= 0.0 {
        return 0.0;
    }
    (rect.intersection_area(view) / area).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::ManifestDocument;
    use crate::view::SpecialZoomLevel;

    fn viewer(pages: usize) -> Viewer {
        let doc = ManifestDocument::uniform(pages, Size::new(100.0, 200.0));
        Viewer::new(
            Box::new(doc),
            ViewerOptions {
                container: Size::new(300.0, 300.0),
                ..ViewerOptions::default()
            },
        )
        .unwrap()
    }

    #[test]
    fn empty_documents_are_rejected() {
        let doc = ManifestDocument::uniform(0, Size::new(100.0, 200.0));
        let err = Viewer::new(Box::new(doc), ViewerOptions::default()).err().unwrap();
        assert!(matches!(err, ViewerError::EmptyDocument));
    }

    #[test]
    fn initial_window_covers_the_top_pages() {
        let v = viewer(10);
        // Rows at 10..210 and 220..420, viewport 0..300
        assert_eq!(v.visible_pages(), Some((0, 1)));
        assert_eq!(v.current_page(), 0);
        assert!((v.visibility(0) - 1.0).abs() < 1e-6);
        assert!((v.visibility(1) - 0.4).abs() < 1e-6);
        // Overscan keeps page 2 mounted but invisible
        assert_eq!(v.visibility(2), 0.0);
        assert_eq!(v.visibility(5), -1.0);
    }

    #[test]
    fn jump_to_page_scrolls_to_the_page_start() {
        let mut v = viewer(10);
        v.jump_to_page(3).unwrap();
        assert_eq!(v.current_page(), 3);
        // Page 3 starts at 10 + 3 * 210, minus the gap
        assert_eq!(v.scroll().main, 630.0);
        assert_eq!(v.visible_pages(), Some((3, 4)));
    }

    #[test]
    fn jump_out_of_range_is_an_error() {
        let mut v = viewer(3);
        let err = v.jump_to_page(3).err().unwrap();
        assert!(matches!(
            err,
            ViewerError::PageOutOfRange {
                page: 3,
                page_count: 3
            }
        ));
        assert_eq!(v.current_page(), 0);
    }

    #[test]
    fn jump_to_last_page_keeps_it_current() {
        let mut v = viewer(10);
        v.jump_to_page(9).unwrap();
        // Scroll is clamped so page 8 is still partly visible, but the jump
        // target stays current
        assert_eq!(v.current_page(), 9);
    }

    #[test]
    fn scrolling_picks_the_most_visible_page() {
        let mut v = viewer(10);
        v.scroll_to(300.0, 0.0);
        // Viewport 300..600: page 1 (220..420) 60%, page 2 (430..630) 85%
        assert_eq!(v.current_page(), 2);
    }

    #[test]
    fn destination_top_is_measured_from_the_bottom() {
        let mut v = viewer(10);
        let dest = Destination::page(2).with_position(None, Some(150.0));
        v.jump_to_destination(dest).unwrap();
        // Page 2 starts at 430; y = 200 - 150 = 50
        assert_eq!(v.scroll().main, 480.0);
        assert_eq!(v.current_page(), 2);
    }

    #[test]
    fn zoom_keeps_the_reading_position() {
        let mut v = viewer(10);
        v.jump_to_page(4).unwrap();
        v.zoom(ZoomLevel::Scale(2.0));
        assert_eq!(v.current_page(), 4);
        let rect = v.layout().page_rects[4];
        // Same 5% of the page above the viewport as before (gap / height)
        assert!((v.scroll().main - (rect.y - 20.0)).abs() < 1e-3);
        assert_eq!(v.render_status(4), Some(RenderStatus::NotRendered));
    }

    #[test]
    fn rotation_swaps_page_dimensions() {
        let mut v = viewer(4);
        v.rotate(RotateDirection::Forward);
        assert_eq!(v.layout().page_rects[0].size(), Size::new(200.0, 100.0));
        v.rotate_page(1, RotateDirection::Forward).unwrap();
        assert_eq!(v.page_rotation(1).degrees(), 180);
        assert_eq!(v.layout().page_rects[1].size(), Size::new(100.0, 200.0));
        assert!(v.rotate_page(9, RotateDirection::Forward).is_err());
    }

    #[test]
    fn page_fit_follows_resizes() {
        let mut v = viewer(4);
        v.zoom(ZoomLevel::Special(SpecialZoomLevel::PageFit));
        // min(280 / 100, 280 / 200)
        assert!((v.scale() - 1.4).abs() < 1e-6);
        v.resize(Size::new(300.0, 420.0));
        assert!((v.scale() - 2.0).abs() < 1e-6);
    }

    #[test]
    fn page_mode_shows_one_row() {
        let mut v = viewer(10);
        v.switch_scroll_mode(ScrollMode::Page);
        v.jump_to_page(5).unwrap();
        assert_eq!(v.visible_pages(), Some((5, 5)));
        assert_eq!(v.visibility(6), 0.0);

        v.scroll_by(1.0, 0.0);
        assert_eq!(v.current_page(), 6);
        v.scroll_by(-1.0, 0.0);
        assert_eq!(v.current_page(), 5);
    }

    #[test]
    fn scheduler_renders_visible_pages_then_neighbours() {
        let mut v = viewer(10);
        let now = Instant::now();

        assert_eq!(v.next_page_to_render(now), Some(0));
        v.page_render_started(0, now);
        // One render at a time by default
        assert_eq!(v.next_page_to_render(now), None);
        v.page_rendered(0);
        assert_eq!(v.next_page_to_render(now), Some(1));
        v.page_render_started(1, now);
        v.page_rendered(1);
        assert_eq!(v.next_page_to_render(now), Some(2));
    }

    #[test]
    fn stale_responses_are_ignored() {
        use std::sync::Arc as StdArc;

        use crate::render::{RenderedPage, RequestId};

        let mut v = viewer(4);
        let old = v.render_params(0);
        v.page_render_started(0, Instant::now());
        v.zoom(ZoomLevel::Scale(2.0));

        let response = RenderResponse::Page {
            id: RequestId::new(1),
            params: old,
            data: StdArc::new(RenderedPage {
                page: 0,
                pixels: Vec::new(),
                width_px: 0,
                height_px: 0,
                scale: old.scale,
                rotation: old.rotation,
            }),
        };
        assert!(!v.apply_render_response(&response));
        assert_eq!(v.render_status(0), Some(RenderStatus::NotRendered));
    }

    #[test]
    fn frame_lists_the_overscanned_window() {
        let v = viewer(10);
        let frame = v.frame();
        assert_eq!(frame.attributes.get("data-testid"), Some("core__viewer"));
        assert_eq!(frame.attributes.get("aria-label"), Some("Document viewer"));

        let indices: Vec<_> = frame.pages.iter().map(|p| p.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
        assert_eq!(frame.visible_pages().count(), 2);

        let slot = frame.page(1).unwrap();
        assert_eq!(slot.attributes.get("data-testid"), Some("core__page-layer-1"));
        assert_eq!(slot.attributes.get("aria-label"), Some("Page 2"));
        assert_eq!(slot.attributes.get("data-render-status"), Some("not-rendered"));
    }

    #[test]
    fn history_walks_back_and_forward() {
        let mut v = viewer(10);
        v.jump_to_page(3).unwrap();
        v.jump_to_page(7).unwrap();

        assert!(v.jump_to_previous_destination());
        assert_eq!(v.current_page(), 3);
        assert!(v.jump_to_previous_destination());
        assert_eq!(v.current_page(), 0);
        assert!(!v.jump_to_previous_destination());

        assert!(v.jump_to_next_destination());
        assert_eq!(v.current_page(), 3);
        assert!(v.jump_to_next_destination());
        assert_eq!(v.current_page(), 7);
    }
}
