//! Render-priority queue
//!
//! Tracks the render lifecycle of every page and picks which one to render
//! next: the most visible page that has not been rendered yet, then the
//! neighbours of the visible window once everything on screen is done.

use std::time::{Duration, Instant};

use log::{debug, warn};

/// Visibility of a page outside the current range
const OUT_OF_RANGE: f32 = -1.0;

/// Timed out renders retried before a page is given up on
const MAX_STALLS: u8 = 1;

/// Lifecycle of a single page render
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenderStatus {
    NotRendered,
    Rendering { since: Instant },
    Rendered,
    /// The renderer gave up on this page; it is not retried until reset
    Failed,
}

impl RenderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RenderStatus::NotRendered => "not-rendered",
            RenderStatus::Rendering { .. } => "rendering",
            RenderStatus::Rendered => "rendered",
            RenderStatus::Failed => "failed",
        }
    }

    /// Rendered or failed: nothing left to do for this page
    #[must_use]
    pub fn is_settled(&self) -> bool {
        matches!(self, RenderStatus::Rendered | RenderStatus::Failed)
    }

    #[must_use]
    pub fn is_rendering(&self) -> bool {
        matches!(self, RenderStatus::Rendering { .. })
    }
}

#[derive(Clone, Copy, Debug)]
struct Slot {
    status: RenderStatus,
    visibility: f32,
    /// Renders of this page that timed out since the last reset
    stalls: u8,
}

impl Default for Slot {
    fn default() -> Self {
        Self {
            status: RenderStatus::NotRendered,
            visibility: OUT_OF_RANGE,
            stalls: 0,
        }
    }
}

/// Per-page render bookkeeping and next-page selection
#[derive(Debug)]
pub struct RenderQueue {
    slots: Vec<Slot>,
    range: Option<(usize, usize)>,
    timeout: Duration,
    max_in_flight: usize,
}

impl RenderQueue {
    /// Default time after which a page stuck in `Rendering` is retried
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

    #[must_use]
    pub fn new(page_count: usize, timeout: Duration, max_in_flight: usize) -> Self {
        Self {
            slots: vec![Slot::default(); page_count],
            range: None,
            timeout,
            max_in_flight: max_in_flight.max(1),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Change the page count, forgetting every status
    pub fn resize(&mut self, page_count: usize) {
        self.slots.clear();
        self.slots.resize(page_count, Slot::default());
        self.range = None;
    }

    /// Every page goes back to `NotRendered`; visibilities are kept
    pub fn reset(&mut self) {
        for slot in &mut self.slots {
            slot.status = RenderStatus::NotRendered;
            slot.stalls = 0;
        }
    }

    #[must_use]
    pub fn range(&self) -> Option<(usize, usize)> {
        self.range
    }

    /// Set the window of pages considered for rendering (inclusive)
    pub fn set_range(&mut self, range: Option<(usize, usize)>) {
        let range = range
            .filter(|_| !self.slots.is_empty())
            .map(|(start, end)| (start.min(end), end.max(start).min(self.slots.len() - 1)));
        self.range = range;

        for (idx, slot) in self.slots.iter_mut().enumerate() {
            let inside = range.is_some_and(|(start, end)| (start..=end).contains(&idx));
            if !inside {
                slot.visibility = OUT_OF_RANGE;
            } else if slot.visibility < 0.0 {
                slot.visibility = 0.0;
            }
        }
    }

    pub fn set_visibility(&mut self, page: usize, visibility: f32) {
        let in_range = self.in_range(page);
        if let Some(slot) = self.slots.get_mut(page) {
            slot.visibility = if in_range {
                visibility.clamp(0.0, 1.0)
            } else {
                OUT_OF_RANGE
            };
        }
    }

    #[must_use]
    pub fn visibility(&self, page: usize) -> f32 {
        self.slots.get(page).map_or(OUT_OF_RANGE, |s| s.visibility)
    }

    #[must_use]
    pub fn status(&self, page: usize) -> Option<RenderStatus> {
        self.slots.get(page).map(|s| s.status)
    }

    pub fn mark_rendering(&mut self, page: usize, now: Instant) {
        self.set_status(page, RenderStatus::Rendering { since: now });
    }

    pub fn mark_rendered(&mut self, page: usize) {
        self.set_status(page, RenderStatus::Rendered);
    }

    pub fn mark_failed(&mut self, page: usize) {
        self.set_status(page, RenderStatus::Failed);
    }

    pub fn mark_not_rendered(&mut self, page: usize) {
        self.set_status(page, RenderStatus::NotRendered);
        if let Some(slot) = self.slots.get_mut(page) {
            slot.stalls = 0;
        }
    }

    fn set_status(&mut self, page: usize, status: RenderStatus) {
        if let Some(slot) = self.slots.get_mut(page) {
            slot.status = status;
        }
    }

    /// Number of pages currently marked as rendering
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.slots.iter().filter(|s| s.status.is_rendering()).count()
    }

    fn in_range(&self, page: usize) -> bool {
        self.range
            .is_some_and(|(start, end)| (start..=end).contains(&page))
    }

    /// Put pages stuck in `Rendering` longer than the timeout back in line
    /// and return them. A page that stalls a second time is marked failed
    /// so it cannot hold the render slots forever.
    pub fn reclaim_stalled(&mut self, now: Instant) -> Vec<usize> {
        let timeout = self.timeout;
        let mut reclaimed = Vec::new();
        for (idx, slot) in self.slots.iter_mut().enumerate() {
            let RenderStatus::Rendering { since } = slot.status else {
                continue;
            };
            if now.saturating_duration_since(since) < timeout {
                continue;
            }
            slot.stalls = slot.stalls.saturating_add(1);
            if slot.stalls > MAX_STALLS {
                warn!("Render of page {idx} stalled again, giving up");
                slot.status = RenderStatus::Failed;
            } else {
                warn!("Render of page {idx} stalled for {timeout:?}, requeueing");
                slot.status = RenderStatus::NotRendered;
            }
            reclaimed.push(idx);
        }
        reclaimed
    }

    /// Pick the next page to render, if any
    pub fn next_to_render(&mut self, now: Instant) -> Option<usize> {
        self.reclaim_stalled(now);

        if self.in_flight() >= self.max_in_flight {
            return None;
        }

        let (start, end) = self.range?;
        let visible: Vec<usize> = (start..=end)
            .filter(|&idx| self.slots[idx].visibility > 0.0)
            .collect();
        let (&first_visible, &last_visible) = (visible.first()?, visible.last()?);

        let mut best: Option<(usize, f32)> = None;
        for &idx in &visible {
            let slot = &self.slots[idx];
            if slot.status != RenderStatus::NotRendered {
                continue;
            }
            if best.is_none_or(|(_, vis)| slot.visibility > vis) {
                best = Some((idx, slot.visibility));
            }
        }
        if let Some((page, visibility)) = best {
            debug!("Next render: page {page} (visibility {visibility:.2})");
            return Some(page);
        }

        let all_visible_settled = visible.iter().all(|&idx| self.slots[idx].status.is_settled());
        if !all_visible_settled {
            return None;
        }

        let after = last_visible + 1;
        if after < self.slots.len() && self.slots[after].status == RenderStatus::NotRendered {
            debug!("Next render: pre-rendering page {after} after the visible window");
            return Some(after);
        }
        if let Some(before) = first_visible.checked_sub(1) {
            if self.slots[before].status == RenderStatus::NotRendered {
                debug!("Next render: pre-rendering page {before} before the visible window");
                return Some(before);
            }
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn queue(pages: usize) -> RenderQueue {
        RenderQueue::new(pages, Duration::from_secs(5), 1)
    }

    fn show(q: &mut RenderQueue, start: usize, visibilities: &[f32]) {
        q.set_range(Some((start, start + visibilities.len() - 1)));
        for (i, v) in visibilities.iter().enumerate() {
            q.set_visibility(start + i, *v);
        }
    }

    #[test]
    fn picks_most_visible_page_first() {
        let mut q = queue(10);
        show(&mut q, 2, &[0.2, 1.0, 0.6]);
        assert_eq!(q.next_to_render(Instant::now()), Some(3));
    }

    #[test]
    fn ties_go_to_the_lower_index() {
        let mut q = queue(10);
        show(&mut q, 2, &[0.5, 0.5]);
        assert_eq!(q.next_to_render(Instant::now()), Some(2));
    }

    #[test]
    fn waits_while_a_render_is_in_flight() {
        let mut q = queue(10);
        let now = Instant::now();
        show(&mut q, 0, &[1.0, 0.5]);
        q.mark_rendering(0, now);
        assert_eq!(q.next_to_render(now), None);

        q.mark_rendered(0);
        assert_eq!(q.next_to_render(now), Some(1));
    }

    #[test]
    fn allows_several_renders_when_configured() {
        let mut q = RenderQueue::new(10, Duration::from_secs(5), 2);
        let now = Instant::now();
        show(&mut q, 0, &[1.0, 0.5, 0.1]);
        q.mark_rendering(0, now);
        assert_eq!(q.next_to_render(now), Some(1));
        q.mark_rendering(1, now);
        assert_eq!(q.next_to_render(now), None);
    }

    #[test]
    fn partially_visible_pages_are_still_rendered() {
        let mut q = queue(10);
        let now = Instant::now();
        show(&mut q, 4, &[1.0, 0.01]);
        q.mark_rendered(4);
        assert_eq!(q.next_to_render(now), Some(5));
    }

    #[test]
    fn prerenders_neighbours_after_visible_pages() {
        let mut q = queue(10);
        let now = Instant::now();
        show(&mut q, 4, &[1.0, 0.3]);
        q.mark_rendered(4);
        q.mark_rendered(5);
        assert_eq!(q.next_to_render(now), Some(6));

        q.mark_rendered(6);
        assert_eq!(q.next_to_render(now), Some(3));

        q.mark_rendered(3);
        assert_eq!(q.next_to_render(now), None);
    }

    #[test]
    fn prerender_stays_inside_document_bounds() {
        let mut q = queue(2);
        let now = Instant::now();
        show(&mut q, 0, &[1.0, 1.0]);
        q.mark_rendered(0);
        q.mark_rendered(1);
        assert_eq!(q.next_to_render(now), None);
    }

    #[test]
    fn stalled_render_is_reclaimed_after_timeout() {
        let mut q = queue(3);
        let start = Instant::now();
        show(&mut q, 0, &[1.0]);
        q.mark_rendering(0, start);

        assert_eq!(q.next_to_render(start + Duration::from_secs(1)), None);
        assert_eq!(q.next_to_render(start + Duration::from_secs(5)), Some(0));
        assert_eq!(q.status(0), Some(RenderStatus::NotRendered));
    }

    #[test]
    fn page_stalling_twice_is_given_up() {
        let mut q = queue(3);
        let start = Instant::now();
        show(&mut q, 0, &[1.0, 0.5]);
        q.mark_rendering(0, start);

        let retry = start + Duration::from_secs(5);
        assert_eq!(q.reclaim_stalled(retry), vec![0]);
        assert_eq!(q.next_to_render(retry), Some(0));
        q.mark_rendering(0, retry);

        let again = retry + Duration::from_secs(5);
        assert_eq!(q.reclaim_stalled(again), vec![0]);
        assert_eq!(q.status(0), Some(RenderStatus::Failed));
        // The slot is free for the next visible page
        assert_eq!(q.next_to_render(again), Some(1));

        q.reset();
        assert_eq!(q.next_to_render(again), Some(0));
    }

    #[test]
    fn failed_pages_are_not_retried_until_reset() {
        let mut q = queue(1);
        let now = Instant::now();
        show(&mut q, 0, &[1.0]);
        q.mark_failed(0);
        assert_eq!(q.next_to_render(now), None);

        q.reset();
        assert_eq!(q.next_to_render(now), Some(0));
    }

    #[test]
    fn pages_outside_range_are_ignored() {
        let mut q = queue(10);
        show(&mut q, 0, &[1.0]);
        q.set_visibility(7, 1.0);
        assert_eq!(q.visibility(7), OUT_OF_RANGE);

        q.set_range(Some((5, 6)));
        assert_eq!(q.visibility(0), OUT_OF_RANGE);
        assert_eq!(q.next_to_render(Instant::now()), None);
    }

    #[test]
    fn no_range_means_nothing_to_render() {
        let mut q = queue(3);
        assert_eq!(q.next_to_render(Instant::now()), None);
        q.set_range(None);
        assert_eq!(q.next_to_render(Instant::now()), None);
    }

    #[test]
    fn range_is_clamped_to_page_count() {
        let mut q = queue(3);
        q.set_range(Some((1, 10)));
        assert_eq!(q.range(), Some((1, 2)));
    }
}
