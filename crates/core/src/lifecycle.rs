//! Per-page render lifecycle
//!
//! Pages move `Unseen -> Loaded -> Rendering -> Rendered`. A page that enters
//! the window without a fresh render for the current target is put into
//! `Rendering` and a ticket is issued; only the completion carrying that
//! ticket's generation can move it to `Rendered`. Anything else is stale.
//!
//! The same controller drives the main column and the thumbnail strip.

use log::{debug, warn};
use pageview_engine::RgbaImage;
use pageview_layout::Rotation;
use pageview_scheduler::{CancellationRegistry, Ticket};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PageState {
    /// Never seen by the window, size unknown
    #[default]
    Unseen,
    /// Size known, nothing live
    Loaded,
    /// A render for the current target is in flight or failed and awaits retry
    Rendering,
    /// Live surface matches the current target
    Rendered,
}

impl PageState {
    pub fn label(self) -> &'static str {
        match self {
            PageState::Unseen => "unseen",
            PageState::Loaded => "loaded",
            PageState::Rendering => "rendering",
            PageState::Rendered => "rendered",
        }
    }
}

/// Scale and rotation a render is made for.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderTarget {
    pub scale: f32,
    pub rotation: Rotation,
}

impl RenderTarget {
    pub fn new(scale: f32, rotation: Rotation) -> Self {
        Self { scale, rotation }
    }

    /// Same target, comparing scales at 1/1000 resolution.
    pub fn matches(&self, other: &RenderTarget) -> bool {
        self.rotation == other.rotation && (self.scale * 1000.0).round() == (other.scale * 1000.0).round()
    }
}

/// A page's current rendered surface.
#[derive(Debug, Clone)]
pub struct LiveSurface {
    pub image: Arc<RgbaImage>,
    pub target: RenderTarget,
    pub generation: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// The completion was current and the page is now rendered
    Applied,
    /// Superseded, cancelled or released; the result was discarded
    Stale,
}

/// Pages currently showing a stand-in while they re-render.
///
/// Copy-on-write: [`RenderingSet::snapshot`] handles never change.
#[derive(Debug, Clone, Default)]
pub struct RenderingSet {
    pages: Arc<BTreeSet<u32>>,
}

impl RenderingSet {
    pub fn contains(&self, page: u32) -> bool {
        self.pages.contains(&page)
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn pages(&self) -> impl Iterator<Item = u32> + '_ {
        self.pages.iter().copied()
    }

    pub fn snapshot(&self) -> Arc<BTreeSet<u32>> {
        Arc::clone(&self.pages)
    }

    fn insert_all(&mut self, pages: impl IntoIterator<Item = u32>) {
        let mut next = BTreeSet::clone(&self.pages);
        let before = next.len();
        next.extend(pages);
        if next.len() != before {
            self.pages = Arc::new(next);
        }
    }

    fn remove(&mut self, page: u32) {
        self.remove_all(&[page]);
    }

    fn remove_all(&mut self, pages: &[u32]) {
        if pages.iter().any(|page| self.pages.contains(page)) {
            let mut next = BTreeSet::clone(&self.pages);
            for page in pages {
                next.remove(page);
            }
            self.pages = Arc::new(next);
        }
    }

    fn clear(&mut self) {
        self.pages = Arc::new(BTreeSet::new());
    }
}

#[derive(Debug, Clone, Default)]
struct PageRecord {
    state: PageState,
    in_flight: Option<(u64, RenderTarget)>,
    surface: Option<LiveSurface>,
    failures: u32,
}

/// Render lifecycle for every page of one window
#[derive(Debug, Default)]
pub struct PageLifecycle {
    records: HashMap<u32, PageRecord>,
    rendering: RenderingSet,
    tickets: CancellationRegistry<u32>,
}

impl PageLifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self, page: u32) -> PageState {
        self.records.get(&page).map(|r| r.state).unwrap_or_default()
    }

    pub fn surface(&self, page: u32) -> Option<&LiveSurface> {
        self.records.get(&page)?.surface.as_ref()
    }

    /// Consecutive failed renders of `page`.
    pub fn failures(&self, page: u32) -> u32 {
        self.records.get(&page).map_or(0, |r| r.failures)
    }

    pub fn rendering_set(&self) -> &RenderingSet {
        &self.rendering
    }

    /// Number of issued tickets that have not completed.
    pub fn in_flight(&self) -> usize {
        self.tickets.len()
    }

    /// Whether `generation` is the live render of `page`.
    pub fn is_current(&self, page: u32, generation: u64) -> bool {
        self.tickets.is_current(page, generation)
    }

    /// Record that the size of `page` is known.
    pub fn mark_loaded(&mut self, page: u32) {
        let record = self.records.entry(page).or_default();
        if record.state == PageState::Unseen {
            record.state = PageState::Loaded;
        }
    }

    /// Whether `page` has neither a surface nor an in-flight render for `target`.
    pub fn needs_render(&self, page: u32, target: RenderTarget) -> bool {
        let Some(record) = self.records.get(&page) else {
            return true;
        };
        let fresh = record.surface.as_ref().is_some_and(|s| s.target.matches(&target));
        let pending = record.in_flight.is_some_and(|(_, t)| t.matches(&target));
        !fresh && !pending
    }

    /// Issue a render ticket for `page`, superseding any in-flight one.
    pub fn begin(&mut self, page: u32, target: RenderTarget) -> Ticket {
        let ticket = self.tickets.register(page);
        let record = self.records.entry(page).or_default();
        record.state = PageState::Rendering;
        record.in_flight = Some((ticket.generation, target));
        debug!(
            "page {page}: rendering at scale {:.3}, {} (generation {})",
            target.scale, target.rotation, ticket.generation
        );
        ticket
    }

    /// Apply a finished render if it is still current.
    pub fn complete(&mut self, page: u32, generation: u64, image: RgbaImage, target: RenderTarget) -> Completion {
        if !self.tickets.complete(page, generation) {
            debug!("page {page}: discarding stale render (generation {generation})");
            return Completion::Stale;
        }

        let record = self.records.entry(page).or_default();
        record.state = PageState::Rendered;
        record.in_flight = None;
        record.failures = 0;
        record.surface = Some(LiveSurface { image: Arc::new(image), target, generation });
        self.rendering.remove(page);
        debug!("page {page}: rendered (generation {generation})");
        Completion::Applied
    }

    /// Record a failed render. The page stays `Rendering` and is retried on
    /// the next window pass. Returns `false` if the render was already stale.
    pub fn fail(&mut self, page: u32, generation: u64) -> bool {
        if !self.tickets.complete(page, generation) {
            return false;
        }
        let record = self.records.entry(page).or_default();
        record.in_flight = None;
        record.failures += 1;
        record.state = PageState::Rendering;
        warn!("page {page}: render failed ({} in a row)", record.failures);
        true
    }

    /// Flag pages as stale: their surface is hidden until they re-render.
    pub fn mark_stale(&mut self, pages: &[u32]) {
        for &page in pages {
            let record = self.records.entry(page).or_default();
            if record.state == PageState::Rendered {
                record.state = PageState::Rendering;
            }
        }
        self.rendering.insert_all(pages.iter().copied());
    }

    /// Release every page outside `window`: cancel its render, drop its
    /// surface and take it out of the rendering set. Returns the released pages.
    pub fn retain_window(&mut self, window: &BTreeSet<u32>, size_known: impl Fn(u32) -> bool) -> Vec<u32> {
        let mut released = Vec::new();
        for (&page, record) in self.records.iter_mut() {
            let idle = matches!(record.state, PageState::Unseen | PageState::Loaded);
            if window.contains(&page) || (idle && record.surface.is_none() && record.in_flight.is_none()) {
                continue;
            }
            record.surface = None;
            record.in_flight = None;
            record.state = if size_known(page) { PageState::Loaded } else { PageState::Unseen };
            released.push(page);
        }
        for &page in &released {
            self.tickets.cancel(page);
        }
        self.rendering.remove_all(&released);
        released.sort_unstable();
        if !released.is_empty() {
            debug!("released pages {released:?}");
        }
        released
    }

    /// Cancel everything and forget all pages.
    pub fn clear(&mut self) {
        let cancelled = self.tickets.cancel_all();
        if cancelled > 0 {
            debug!("cancelled {cancelled} in-flight renders");
        }
        self.records.clear();
        self.rendering.clear();
    }
}
