//! Geometric mapping of detections onto a rescaled, possibly offset image.
//!
//! Detections live in the natural pixel space of the source radiograph;
//! the viewer displays that image rescaled by CSS-style layout and maybe
//! letterboxed inside its container. `project_detections` is the pure
//! bridge between the two spaces; `OverlayPlanner` handles the
//! recomputation triggers (image load, viewport resize, new detections)
//! with a short debounce so layout can settle first.

use std::time::{Duration, Instant};

use crate::models::Detection;

/// Settling delay between a layout-affecting event and reprojection.
pub const SETTLE_DELAY: Duration = Duration::from_millis(100);

/// On-screen geometry of the displayed image, relative to its container.
///
/// Derived and ephemeral: recomputed from the live layout on demand,
/// never persisted. `offset_x`/`offset_y` are the image's top-left
/// position inside the container (non-zero when centered or letterboxed).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RenderGeometry {
    /// Unscaled pixel size of the source image; 0.0 while unknown.
    pub natural_width: f32,
    pub natural_height: f32,
    /// Current rendered size on screen.
    pub display_width: f32,
    pub display_height: f32,
    pub offset_x: f32,
    pub offset_y: f32,
}

impl RenderGeometry {
    /// The image's natural size is known and usable for scaling.
    pub fn is_measurable(&self) -> bool {
        self.natural_width > 0.0 && self.natural_height > 0.0
    }

    fn scale(&self) -> (f32, f32) {
        (
            self.display_width / self.natural_width,
            self.display_height / self.natural_height,
        )
    }
}

/// Screen-space rectangle, top-left anchored, container-relative.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenRect {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

/// Project center-anchored natural-pixel detections into screen space.
///
/// Pure and deterministic: identical inputs always yield bit-identical
/// rectangles. Produces nothing while the image's natural size is
/// unknown, so there is no division by zero before the image loads.
pub fn project_detections(detections: &[Detection], geometry: &RenderGeometry) -> Vec<ScreenRect> {
    if !geometry.is_measurable() {
        return Vec::new();
    }
    let (scale_x, scale_y) = geometry.scale();

    detections
        .iter()
        .map(|det| {
            let width = det.width * scale_x;
            let height = det.height * scale_y;
            ScreenRect {
                left: geometry.offset_x + det.center_x * scale_x - width / 2.0,
                top: geometry.offset_y + det.center_y * scale_y - height / 2.0,
                width,
                height,
            }
        })
        .collect()
}

/// Layout events that invalidate the current projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewEvent {
    /// The image finished loading; its natural size is known only now.
    ImageLoaded,
    ViewportResized,
    DetectionsChanged,
}

/// Cancellable timer-based deferral.
///
/// Each `schedule` pushes the deadline out again, so a burst of resize
/// events collapses into a single recomputation once the burst stops.
#[derive(Debug, Clone)]
pub struct Debounce {
    delay: Duration,
    deadline: Option<Instant>,
}

impl Debounce {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
        }
    }

    pub fn schedule(&mut self, now: Instant) {
        self.deadline = Some(now + self.delay);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// Consume the deadline if it has passed.
    pub fn fire(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

/// Turns layout events into debounced reprojections.
///
/// The planner only remembers the latest geometry and whether a
/// recomputation is due; it caches nothing across triggers, so the
/// rectangles it hands out are always a pure function of the final
/// geometry and detection set.
#[derive(Debug, Clone)]
pub struct OverlayPlanner {
    geometry: RenderGeometry,
    debounce: Debounce,
}

impl OverlayPlanner {
    pub fn new() -> Self {
        Self::with_delay(SETTLE_DELAY)
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            geometry: RenderGeometry::default(),
            debounce: Debounce::new(delay),
        }
    }

    pub fn geometry(&self) -> &RenderGeometry {
        &self.geometry
    }

    /// Record an event and the geometry measured alongside it.
    pub fn note(&mut self, _event: ViewEvent, geometry: RenderGeometry, now: Instant) {
        self.geometry = geometry;
        self.debounce.schedule(now);
    }

    /// Reproject if a scheduled recomputation has come due. Returns
    /// `None` while the debounce window is still open or nothing is
    /// scheduled.
    pub fn poll(&mut self, detections: &[Detection], now: Instant) -> Option<Vec<ScreenRect>> {
        if self.debounce.fire(now) {
            Some(project_detections(detections, &self.geometry))
        } else {
            None
        }
    }

    /// Reproject immediately from the latest geometry, bypassing the
    /// debounce (used when the caller has already waited for layout).
    pub fn project_now(&mut self, detections: &[Detection]) -> Vec<ScreenRect> {
        self.debounce.cancel();
        project_detections(detections, &self.geometry)
    }
}

impl Default for OverlayPlanner {
    fn default() -> Self {
        Self::new()
    }
}
