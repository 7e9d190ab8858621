use crate::canvas::{CHANNELS, PixelBuffer};

// ============================================================================
// ERASER — circular destination-out stamping with a stroke tracker
// ============================================================================

/// Default eraser radius in pixels.
pub const DEFAULT_ERASE_RADIUS: f32 = 10.0;
/// Radius range offered to users. Not enforced by [`EraseMask`].
pub const ERASE_RADIUS_RANGE: (f32, f32) = (5.0, 50.0);

/// How paint operations combine with existing pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EraseMode {
    /// Source-over; `erase` does nothing.
    #[default]
    Normal,
    /// Destination-out; `erase` clears alpha under the circle.
    Erasing,
}

/// Inclusive pixel bounds `(min_x, min_y, max_x, max_y)`.
pub type PixelBounds = (u32, u32, u32, u32);

fn union_bounds(a: Option<PixelBounds>, b: PixelBounds) -> PixelBounds {
    match a {
        Some((x0, y0, x1, y1)) => (x0.min(b.0), y0.min(b.1), x1.max(b.2), y1.max(b.3)),
        None => b,
    }
}

/// What a finished stroke did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StrokeSummary {
    /// Union of all changed pixels, or `None` if nothing changed.
    pub bounds: Option<PixelBounds>,
}

impl StrokeSummary {
    pub fn changed(&self) -> bool {
        self.bounds.is_some()
    }
}

/// Circular alpha eraser. Holds only its mode, radius and the bounds of the
/// current stroke; the buffer is passed in on every call.
#[derive(Clone, Debug)]
pub struct EraseMask {
    mode: EraseMode,
    radius: f32,
    /// Accumulated bounds of pixels changed during the current stroke.
    stroke_bounds: Option<PixelBounds>,
}

impl Default for EraseMask {
    fn default() -> Self {
        Self::new(DEFAULT_ERASE_RADIUS)
    }
}

impl EraseMask {
    pub fn new(radius: f32) -> Self {
        Self {
            mode: EraseMode::Normal,
            radius,
            stroke_bounds: None,
        }
    }

    pub fn mode(&self) -> EraseMode {
        self.mode
    }

    pub fn is_erasing(&self) -> bool {
        self.mode == EraseMode::Erasing
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    /// Applies to later `erase` calls only.
    pub fn set_radius(&mut self, radius: f32) {
        self.radius = radius;
    }

    /// Enter erasing mode and begin a new stroke.
    pub fn start(&mut self) {
        self.mode = EraseMode::Erasing;
        self.stroke_bounds = None;
    }

    /// Leave erasing mode and report what the stroke changed. Erased pixels
    /// stay erased.
    pub fn stop(&mut self) -> StrokeSummary {
        self.mode = EraseMode::Normal;
        StrokeSummary {
            bounds: self.stroke_bounds.take(),
        }
    }

    /// Clear the circle at `(x, y)` in `buffer`. Ignored in `Normal` mode.
    /// Returns the bounds of pixels that actually changed.
    pub fn erase(&mut self, buffer: &mut PixelBuffer, x: f32, y: f32) -> Option<PixelBounds> {
        if !self.is_erasing() {
            return None;
        }
        let changed = erase_circle(buffer, x, y, self.radius)?;
        self.stroke_bounds = Some(union_bounds(self.stroke_bounds, changed));
        Some(changed)
    }
}

/// Full-coverage destination-out: the pixel becomes `(0, 0, 0, 0)`.
/// Edges are hard, so a second pass over the same circle changes nothing.
/// Returns whether the pixel changed.
#[inline]
fn destination_out(px: &mut [u8]) -> bool {
    if *px == [0, 0, 0, 0] {
        return false;
    }
    px.copy_from_slice(&[0, 0, 0, 0]);
    true
}

/// Clear every pixel whose centre lies within `radius` of `(cx, cy)`.
/// Returns the bounds of changed pixels, `None` if nothing changed.
pub fn erase_circle(buffer: &mut PixelBuffer, cx: f32, cy: f32, radius: f32) -> Option<PixelBounds> {
    if !(radius.is_finite() && cx.is_finite() && cy.is_finite()) || radius < 0.0 || buffer.is_empty() {
        return None;
    }

    let (w, h) = buffer.dimensions();
    let min_x = (cx - radius - 0.5).floor().max(0.0);
    let min_y = (cy - radius - 0.5).floor().max(0.0);
    let max_x = (cx + radius - 0.5).ceil().min(w as f32 - 1.0);
    let max_y = (cy + radius - 0.5).ceil().min(h as f32 - 1.0);
    if min_x > max_x || min_y > max_y {
        return None;
    }
    let (min_x, min_y, max_x, max_y) = (min_x as u32, min_y as u32, max_x as u32, max_y as u32);

    let radius_sq = radius * radius;
    let stride = buffer.stride();
    let raw = buffer.as_raw_mut();
    let mut changed: Option<PixelBounds> = None;

    for y in min_y..=max_y {
        let dy = y as f32 + 0.5 - cy;
        let dy_sq = dy * dy;
        let row_off = y as usize * stride;
        for x in min_x..=max_x {
            let dx = x as f32 + 0.5 - cx;
            if dx * dx + dy_sq > radius_sq {
                continue;
            }
            let off = row_off + x as usize * CHANNELS;
            if destination_out(&mut raw[off..off + CHANNELS]) {
                changed = Some(union_bounds(changed, (x, y, x, y)));
            }
        }
    }

    changed
}
