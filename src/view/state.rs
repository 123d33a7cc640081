//! Viewer state management

use std::collections::BTreeMap;

use crate::document::Destination;

use super::geometry::{PageSize, RotateDirection, Rotation, Size};
use super::layout::{ScrollMode, ViewMode};
use super::zoom::{Zoom, ZoomLevel};

/// Page geometry the state machine needs to resolve special zoom levels
#[derive(Clone, Copy, Debug)]
pub struct PageMetrics<'a> {
    /// Page sizes at scale 1 with their intrinsic rotation applied
    pub base_sizes: &'a [PageSize],
    pub gap: f32,
}

/// Scroll offset along the layout's main and cross axes
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ScrollPosition {
    pub main: f32,
    pub cross: f32,
}

/// Zoom, rotation, mode and position of the viewer
#[derive(Clone, Debug)]
pub struct ViewerState {
    pub page_count: usize,

    /// Page the reader is on (0-indexed)
    pub current_page: usize,

    /// Resolved scale factor
    pub scale: f32,

    /// Requested zoom, possibly a special level re-resolved on resize
    pub zoom: ZoomLevel,

    /// Rotation of the whole document
    pub rotation: Rotation,

    /// Extra rotation of single pages, on top of `rotation`
    pub page_rotations: BTreeMap<usize, Rotation>,

    pub scroll_mode: ScrollMode,
    pub view_mode: ViewMode,
    pub scroll: ScrollPosition,

    /// Viewport size
    pub container: Size,
}

impl ViewerState {
    #[must_use]
    pub fn new(page_count: usize, container: Size) -> Self {
        Self {
            page_count,
            current_page: 0,
            scale: 1.0,
            zoom: ZoomLevel::default(),
            rotation: Rotation::NONE,
            page_rotations: BTreeMap::new(),
            scroll_mode: ScrollMode::default(),
            view_mode: ViewMode::default(),
            scroll: ScrollPosition::default(),
            container,
        }
    }

    /// Document rotation combined with the page's own extra rotation
    #[must_use]
    pub fn page_rotation(&self, page: usize) -> Rotation {
        self.page_rotations
            .get(&page)
            .map_or(self.rotation, |r| self.rotation.combine(*r))
    }

    /// Page sizes at scale 1 as displayed
    #[must_use]
    pub fn rotated_sizes(&self, metrics: &PageMetrics<'_>) -> Vec<PageSize> {
        metrics
            .base_sizes
            .iter()
            .enumerate()
            .map(|(page, size)| size.rotated(self.page_rotation(page)))
            .collect()
    }

    /// Size special zoom levels fit into the container
    #[must_use]
    pub fn reference_size(&self, metrics: &PageMetrics<'_>) -> PageSize {
        let Some(base) = metrics.base_sizes.get(self.current_page) else {
            return Size::default();
        };
        let size = base.rotated(self.page_rotation(self.current_page));
        if self.view_mode.is_dual() {
            Size::new(2.0 * size.width + metrics.gap, size.height)
        } else {
            size
        }
    }

    /// Scale `level` resolves to in the current state
    #[must_use]
    pub fn resolve_scale(&self, level: ZoomLevel, metrics: &PageMetrics<'_>) -> f32 {
        Zoom::resolve(level, self.container, self.reference_size(metrics), metrics.gap)
    }

    /// Re-resolve the active zoom; true if the scale changed
    fn refresh_scale(&mut self, metrics: &PageMetrics<'_>) -> bool {
        let scale = self.resolve_scale(self.zoom, metrics);
        if (scale - self.scale).abs() <= f32::EPSILON {
            return false;
        }
        self.scale = scale;
        true
    }

    /// Apply a command and return resulting effects
    #[must_use]
    pub fn apply(&mut self, cmd: Command, metrics: &PageMetrics<'_>) -> Vec<Effect> {
        match cmd {
            Command::JumpToPage(page) => {
                if page >= self.page_count {
                    return vec![];
                }
                self.current_page = page;
                vec![
                    Effect::ScrollToPage(page),
                    Effect::UpdateVisibility,
                    Effect::NotifyPlugins,
                ]
            }
            Command::JumpToDestination(dest) => {
                if dest.page_index >= self.page_count {
                    return vec![];
                }
                self.current_page = dest.page_index;

                let mut effects = vec![];
                if let Some(level) = dest.zoom {
                    self.zoom = level;
                    if self.refresh_scale(metrics) {
                        effects.extend([Effect::Relayout, Effect::ResetRenderQueue]);
                    }
                }
                effects.extend([
                    Effect::ScrollToDestination(dest),
                    Effect::UpdateVisibility,
                    Effect::NotifyPlugins,
                ]);
                effects
            }
            Command::Zoom(level) => {
                let level = match level {
                    ZoomLevel::Scale(factor) => ZoomLevel::Scale(Zoom::clamp_factor(factor)),
                    special => special,
                };
                let scale = self.resolve_scale(level, metrics);
                if level == self.zoom && (scale - self.scale).abs() <= f32::EPSILON {
                    return vec![];
                }
                self.zoom = level;
                self.scale = scale;
                vec![
                    Effect::Relayout,
                    Effect::ResetRenderQueue,
                    Effect::KeepAnchor,
                    Effect::UpdateVisibility,
                    Effect::NotifyPlugins,
                ]
            }
            Command::ZoomIn => {
                let factor = Zoom::step_in(self.scale);
                self.apply(Command::Zoom(ZoomLevel::Scale(factor)), metrics)
            }
            Command::ZoomOut => {
                let factor = Zoom::step_out(self.scale);
                self.apply(Command::Zoom(ZoomLevel::Scale(factor)), metrics)
            }
            Command::Rotate(direction) => {
                self.rotation = self.rotation.rotated(direction);
                self.refresh_scale(metrics);
                vec![
                    Effect::Relayout,
                    Effect::ResetRenderQueue,
                    Effect::KeepAnchor,
                    Effect::UpdateVisibility,
                    Effect::NotifyPlugins,
                ]
            }
            Command::RotatePage { page, direction } => {
                if page >= self.page_count {
                    return vec![];
                }
                let rotation = self
                    .page_rotations
                    .get(&page)
                    .copied()
                    .unwrap_or(Rotation::NONE)
                    .rotated(direction);
                if rotation == Rotation::NONE {
                    self.page_rotations.remove(&page);
                } else {
                    self.page_rotations.insert(page, rotation);
                }

                let mut effects = vec![Effect::Relayout];
                if page == self.current_page && self.refresh_scale(metrics) {
                    effects.push(Effect::ResetRenderQueue);
                } else {
                    effects.push(Effect::ResetPage(page));
                }
                effects.extend([
                    Effect::KeepAnchor,
                    Effect::UpdateVisibility,
                    Effect::NotifyPlugins,
                ]);
                effects
            }
            Command::SwitchScrollMode(mode) => {
                if mode == self.scroll_mode {
                    return vec![];
                }
                self.scroll_mode = mode;
                if mode == ScrollMode::Wrapped {
                    self.view_mode = ViewMode::SinglePage;
                }
                self.mode_switch_effects(metrics)
            }
            Command::SwitchViewMode(mode) => {
                if mode == self.view_mode {
                    return vec![];
                }
                self.view_mode = mode;
                if mode.is_dual() && self.scroll_mode == ScrollMode::Wrapped {
                    self.scroll_mode = ScrollMode::Vertical;
                }
                self.mode_switch_effects(metrics)
            }
            Command::ScrollTo { main, cross } => {
                let target = ScrollPosition { main, cross };
                if target == self.scroll {
                    return vec![];
                }
                self.scroll = target;
                vec![Effect::ClampScroll, Effect::UpdateVisibility]
            }
            Command::Resize(container) => {
                if container == self.container {
                    return vec![];
                }
                self.container = container;
                let mut effects = vec![Effect::Relayout];
                let rescaled = self.refresh_scale(metrics);
                if rescaled {
                    effects.push(Effect::ResetRenderQueue);
                }
                effects.extend([Effect::KeepAnchor, Effect::UpdateVisibility]);
                if rescaled {
                    effects.push(Effect::NotifyPlugins);
                }
                effects
            }
            Command::SetPageCount(count) => {
                if count == self.page_count {
                    return vec![];
                }
                self.page_count = count;
                self.current_page = self.current_page.min(count.saturating_sub(1));
                self.page_rotations.retain(|page, _| *page < count);
                self.refresh_scale(metrics);
                vec![
                    Effect::Relayout,
                    Effect::ResetRenderQueue,
                    Effect::ClampScroll,
                    Effect::UpdateVisibility,
                    Effect::NotifyPlugins,
                ]
            }
        }
    }

    fn mode_switch_effects(&mut self, metrics: &PageMetrics<'_>) -> Vec<Effect> {
        let mut effects = vec![Effect::Relayout];
        if self.refresh_scale(metrics) {
            effects.push(Effect::ResetRenderQueue);
        }
        effects.extend([
            Effect::KeepAnchor,
            Effect::UpdateVisibility,
            Effect::NotifyPlugins,
        ]);
        effects
    }
}

/// Commands that modify viewer state
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Go to a specific page
    JumpToPage(usize),
    /// Go to a point inside a page
    JumpToDestination(Destination),
    /// Set the zoom level
    Zoom(ZoomLevel),
    ZoomIn,
    ZoomOut,
    /// Rotate every page
    Rotate(RotateDirection),
    /// Rotate a single page
    RotatePage {
        page: usize,
        direction: RotateDirection,
    },
    SwitchScrollMode(ScrollMode),
    SwitchViewMode(ViewMode),
    /// Scroll to an absolute offset
    ScrollTo { main: f32, cross: f32 },
    /// Set the viewport size
    Resize(Size),
    /// Update the page count
    SetPageCount(usize),
}

/// Effects produced by state changes
#[derive(Clone, Debug, PartialEq)]
pub enum Effect {
    /// Recompute page rects and row sizes
    Relayout,
    /// Every rendered page is stale
    ResetRenderQueue,
    /// One page is stale
    ResetPage(usize),
    /// Scroll so the page starts at the top of the viewport
    ScrollToPage(usize),
    /// Scroll so the destination point sits at the viewport's top-left
    ScrollToDestination(Destination),
    /// Restore the reading position captured before the command
    KeepAnchor,
    /// Keep the scroll offset inside the content
    ClampScroll,
    /// Recompute the visible range and page visibilities
    UpdateVisibility,
    /// Tell plugins the state changed
    NotifyPlugins,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::SpecialZoomLevel;

    const PORTRAIT: Size = Size {
        width: 100.0,
        height: 200.0,
    };

    fn sizes() -> Vec<PageSize> {
        vec![PORTRAIT; 10]
    }

    fn metrics(sizes: &[PageSize]) -> PageMetrics<'_> {
        PageMetrics {
            base_sizes: sizes,
            gap: 10.0,
        }
    }

    fn test_state() -> ViewerState {
        ViewerState::new(10, Size::new(420.0, 620.0))
    }

    #[test]
    fn jump_to_page_scrolls_and_notifies() {
        let sizes = sizes();
        let mut state = test_state();

        let effects = state.apply(Command::JumpToPage(4), &metrics(&sizes));
        assert_eq!(state.current_page, 4);
        assert_eq!(
            effects,
            vec![
                Effect::ScrollToPage(4),
                Effect::UpdateVisibility,
                Effect::NotifyPlugins
            ]
        );
    }

    #[test]
    fn jump_past_last_page_is_ignored() {
        let sizes = sizes();
        let mut state = test_state();

        assert!(state.apply(Command::JumpToPage(10), &metrics(&sizes)).is_empty());
        assert_eq!(state.current_page, 0);
    }

    #[test]
    fn jump_to_destination_with_zoom_relayouts_first() {
        let sizes = sizes();
        let mut state = test_state();
        let dest = Destination::page(2).with_zoom(ZoomLevel::Scale(2.0));

        let effects = state.apply(Command::JumpToDestination(dest.clone()), &metrics(&sizes));
        assert_eq!(state.scale, 2.0);
        assert_eq!(
            effects,
            vec![
                Effect::Relayout,
                Effect::ResetRenderQueue,
                Effect::ScrollToDestination(dest),
                Effect::UpdateVisibility,
                Effect::NotifyPlugins
            ]
        );
    }

    #[test]
    fn zoom_to_same_level_returns_empty() {
        let sizes = sizes();
        let mut state = test_state();

        let effects = state.apply(Command::Zoom(ZoomLevel::Scale(1.0)), &metrics(&sizes));
        assert!(effects.is_empty());
    }

    #[test]
    fn zoom_resolves_special_levels() {
        let sizes = sizes();
        let mut state = test_state();

        let level = ZoomLevel::Special(SpecialZoomLevel::PageWidth);
        let effects = state.apply(Command::Zoom(level), &metrics(&sizes));
        // (420 - 2 * 10) / 100
        assert_eq!(state.scale, 4.0);
        assert_eq!(state.zoom, level);
        assert!(effects.contains(&Effect::KeepAnchor));
        assert!(effects.contains(&Effect::ResetRenderQueue));

        state.apply(
            Command::Zoom(ZoomLevel::Special(SpecialZoomLevel::PageFit)),
            &metrics(&sizes),
        );
        // min(4.0, (620 - 20) / 200)
        assert_eq!(state.scale, 3.0);
    }

    #[test]
    fn zoom_in_and_out_step_the_scale() {
        let sizes = sizes();
        let mut state = test_state();

        state.apply(Command::ZoomIn, &metrics(&sizes));
        assert!((state.scale - 1.1).abs() < 1e-6);
        state.apply(Command::ZoomOut, &metrics(&sizes));
        assert!((state.scale - 1.1 / 1.05).abs() < 1e-6);
    }

    #[test]
    fn zoom_factor_is_clamped() {
        let sizes = sizes();
        let mut state = test_state();

        state.apply(Command::Zoom(ZoomLevel::Scale(50.0)), &metrics(&sizes));
        assert_eq!(state.scale, Zoom::MAX_SCALE);
    }

    #[test]
    fn rotate_resets_renders_and_keeps_anchor() {
        let sizes = sizes();
        let mut state = test_state();

        let effects = state.apply(Command::Rotate(RotateDirection::Forward), &metrics(&sizes));
        assert_eq!(state.rotation.degrees(), 90);
        assert_eq!(
            effects,
            vec![
                Effect::Relayout,
                Effect::ResetRenderQueue,
                Effect::KeepAnchor,
                Effect::UpdateVisibility,
                Effect::NotifyPlugins
            ]
        );
        assert_eq!(state.rotated_sizes(&metrics(&sizes))[0], Size::new(200.0, 100.0));
    }

    #[test]
    fn rotate_with_page_fit_rescales() {
        let sizes = sizes();
        let mut state = test_state();
        state.apply(
            Command::Zoom(ZoomLevel::Special(SpecialZoomLevel::PageFit)),
            &metrics(&sizes),
        );
        assert_eq!(state.scale, 3.0);

        state.apply(Command::Rotate(RotateDirection::Backward), &metrics(&sizes));
        // Landscape 200x100: min(400 / 200, 600 / 100)
        assert_eq!(state.scale, 2.0);
    }

    #[test]
    fn rotate_page_only_resets_that_page() {
        let sizes = sizes();
        let mut state = test_state();

        let effects = state.apply(
            Command::RotatePage {
                page: 3,
                direction: RotateDirection::Forward,
            },
            &metrics(&sizes),
        );
        assert_eq!(state.page_rotation(3).degrees(), 90);
        assert_eq!(state.page_rotation(2).degrees(), 0);
        assert!(effects.contains(&Effect::ResetPage(3)));
        assert!(!effects.contains(&Effect::ResetRenderQueue));

        // Combined with the document rotation
        state.apply(Command::Rotate(RotateDirection::Forward), &metrics(&sizes));
        assert_eq!(state.page_rotation(3).degrees(), 180);

        // Back to upright drops the override
        state.apply(
            Command::RotatePage {
                page: 3,
                direction: RotateDirection::Backward,
            },
            &metrics(&sizes),
        );
        assert!(state.page_rotations.is_empty());
    }

    #[test]
    fn rotate_missing_page_is_ignored() {
        let sizes = sizes();
        let mut state = test_state();

        let effects = state.apply(
            Command::RotatePage {
                page: 99,
                direction: RotateDirection::Forward,
            },
            &metrics(&sizes),
        );
        assert!(effects.is_empty());
    }

    #[test]
    fn wrapped_scroll_mode_forces_single_page_view() {
        let sizes = sizes();
        let mut state = test_state();
        state.view_mode = ViewMode::DualPage;

        let effects = state.apply(Command::SwitchScrollMode(ScrollMode::Wrapped), &metrics(&sizes));
        assert_eq!(state.view_mode, ViewMode::SinglePage);
        assert!(effects.contains(&Effect::KeepAnchor));

        state.apply(Command::SwitchViewMode(ViewMode::DualPageWithCover), &metrics(&sizes));
        assert_eq!(state.scroll_mode, ScrollMode::Vertical);
    }

    #[test]
    fn switching_to_current_mode_returns_empty() {
        let sizes = sizes();
        let mut state = test_state();

        assert!(
            state
                .apply(Command::SwitchScrollMode(ScrollMode::Vertical), &metrics(&sizes))
                .is_empty()
        );
        assert!(
            state
                .apply(Command::SwitchViewMode(ViewMode::SinglePage), &metrics(&sizes))
                .is_empty()
        );
    }

    #[test]
    fn dual_view_widens_the_fit_reference() {
        let sizes = sizes();
        let mut state = test_state();
        state.apply(
            Command::Zoom(ZoomLevel::Special(SpecialZoomLevel::PageWidth)),
            &metrics(&sizes),
        );

        let effects = state.apply(Command::SwitchViewMode(ViewMode::DualPage), &metrics(&sizes));
        // (420 - 20) / (2 * 100 + 10)
        assert!((state.scale - 400.0 / 210.0).abs() < 1e-6);
        assert!(effects.contains(&Effect::ResetRenderQueue));
    }

    #[test]
    fn resize_rescales_special_zoom_only() {
        let sizes = sizes();
        let mut state = test_state();

        let effects = state.apply(Command::Resize(Size::new(820.0, 620.0)), &metrics(&sizes));
        assert_eq!(state.scale, 1.0);
        assert!(!effects.contains(&Effect::ResetRenderQueue));

        state.apply(
            Command::Zoom(ZoomLevel::Special(SpecialZoomLevel::PageWidth)),
            &metrics(&sizes),
        );
        let effects = state.apply(Command::Resize(Size::new(420.0, 620.0)), &metrics(&sizes));
        assert_eq!(state.scale, 4.0);
        assert!(effects.contains(&Effect::ResetRenderQueue));
    }

    #[test]
    fn scroll_to_same_position_returns_empty() {
        let sizes = sizes();
        let mut state = test_state();

        assert!(
            state
                .apply(Command::ScrollTo { main: 0.0, cross: 0.0 }, &metrics(&sizes))
                .is_empty()
        );
        let effects = state.apply(Command::ScrollTo { main: 50.0, cross: 0.0 }, &metrics(&sizes));
        assert_eq!(effects, vec![Effect::ClampScroll, Effect::UpdateVisibility]);
    }

    #[test]
    fn shrinking_page_count_clamps_current_page() {
        let sizes = sizes();
        let mut state = test_state();
        state.apply(Command::JumpToPage(9), &metrics(&sizes));
        state.apply(
            Command::RotatePage {
                page: 8,
                direction: RotateDirection::Forward,
            },
            &metrics(&sizes),
        );

        let smaller = &sizes[..5];
        state.apply(Command::SetPageCount(5), &metrics(smaller));
        assert_eq!(state.current_page, 4);
        assert!(state.page_rotations.is_empty());
    }
}
