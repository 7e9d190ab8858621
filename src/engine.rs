// ============================================================================
// IMAGE ENGINE — one document: buffers, live adjustment, eraser, history
// ============================================================================
//
// Buffers:
//   original — the image exactly as decoded; only `revert()` reads it.
//   source   — the recompute basis. Grading, blur and sharpen never touch it;
//              crop and erase are committed into it so they survive later
//              recomputes. History snapshots are taken of this buffer.
//   working  — what callers see and export: `source` with the live
//              adjustment applied. Only an in-progress erase stroke may
//              make it differ from that render; ending the stroke resyncs.
// ============================================================================

use std::future::Future;
use std::pin::Pin;

use uuid::Uuid;

use crate::canvas::PixelBuffer;
use crate::components::history::HistoryStack;
use crate::components::tools::{EraseMask, EraseMode, erase_circle};
use crate::io::{self, DecodeError, EncodeError, ExportFormat};
use crate::ops::adjustments::{FilterParams, apply_filters};
use crate::ops::effects::{apply_blur, apply_sharpness};
use crate::ops::transform::{apply_crop, clamp_crop_rect};
use crate::settings::EngineSettings;

/// The non-destructive operation currently shown in the working buffer.
/// Each recompute starts from the source, so the latest call replaces any
/// earlier one.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum Adjustment {
    #[default]
    None,
    Grade(FilterParams),
    Blur(f32),
    Sharpen(f32),
}

impl Adjustment {
    /// Render `source` with this adjustment.
    pub fn render(&self, source: &PixelBuffer) -> PixelBuffer {
        match *self {
            Adjustment::None => source.clone(),
            Adjustment::Grade(ref params) => apply_filters(source, params),
            Adjustment::Blur(radius) => apply_blur(source, radius),
            Adjustment::Sharpen(amount) => apply_sharpness(source, amount),
        }
    }
}

/// A decode started by [`ImageEngine::begin_load`].
pub struct PendingLoad {
    generation: u64,
    decode: Pin<Box<dyn Future<Output = Result<PixelBuffer, DecodeError>> + Send>>,
}

/// Result of [`ImageEngine::complete_load`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The image is now the engine's document.
    Applied,
    /// A later `begin_load` superseded this one; nothing changed.
    Superseded,
}

struct Document {
    original: PixelBuffer,
    source: PixelBuffer,
    working: PixelBuffer,
}

pub struct ImageEngine {
    session_id: Uuid,
    doc: Option<Document>,
    adjustment: Adjustment,
    /// Set while a stroke deferred an adjustment recompute.
    render_pending: bool,
    eraser: EraseMask,
    history: HistoryStack,
    settings: EngineSettings,
    load_generation: u64,
}

impl Default for ImageEngine {
    fn default() -> Self {
        Self::new(EngineSettings::default())
    }
}

impl ImageEngine {
    pub fn new(settings: EngineSettings) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            doc: None,
            adjustment: Adjustment::None,
            render_pending: false,
            eraser: EraseMask::new(settings.erase_radius),
            history: HistoryStack::new(settings.max_undo_steps, settings.max_history_bytes()),
            settings,
            load_generation: 0,
        }
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn is_loaded(&self) -> bool {
        self.doc.is_some()
    }

    /// The buffer callers display and export.
    pub fn working(&self) -> Option<&PixelBuffer> {
        self.doc.as_ref().map(|d| &d.working)
    }

    /// The recompute basis.
    pub fn source(&self) -> Option<&PixelBuffer> {
        self.doc.as_ref().map(|d| &d.source)
    }

    pub fn dimensions(&self) -> Option<(u32, u32)> {
        self.working().map(|w| w.dimensions())
    }

    pub fn adjustment(&self) -> Adjustment {
        self.adjustment
    }

    pub fn history(&self) -> &HistoryStack {
        &self.history
    }

    pub fn erase_mode(&self) -> EraseMode {
        self.eraser.mode()
    }

    pub fn erase_radius(&self) -> f32 {
        self.eraser.radius()
    }

    // ------------------------------------------------------------------
    // Load
    // ------------------------------------------------------------------

    /// Decode `bytes` and make the result the current document. On failure
    /// the previous document is left untouched.
    pub async fn load(&mut self, bytes: Vec<u8>) -> Result<LoadOutcome, DecodeError> {
        let pending = self.begin_load(bytes);
        self.complete_load(pending).await
    }

    /// Start decoding in the background. Only the most recently started load
    /// can be applied by [`complete_load`](Self::complete_load).
    pub fn begin_load(&mut self, bytes: Vec<u8>) -> PendingLoad {
        self.load_generation += 1;
        PendingLoad {
            generation: self.load_generation,
            decode: Box::pin(io::decode(bytes)),
        }
    }

    pub async fn complete_load(&mut self, pending: PendingLoad) -> Result<LoadOutcome, DecodeError> {
        let result = pending.decode.await;
        if pending.generation != self.load_generation {
            log_info!("[{}] dropping superseded load #{}", self.session_id, pending.generation);
            return Ok(LoadOutcome::Superseded);
        }
        match result {
            Ok(buffer) => {
                self.install(buffer);
                Ok(LoadOutcome::Applied)
            }
            Err(e) => {
                log_warn!("[{}] decode failed: {}", self.session_id, e);
                Err(e)
            }
        }
    }

    /// Make `buffer` the document directly, skipping decode.
    pub fn install(&mut self, buffer: PixelBuffer) {
        let (w, h) = buffer.dimensions();
        self.eraser.stop();
        self.adjustment = Adjustment::None;
        self.render_pending = false;
        self.history.clear();
        self.history.push(&buffer, "Open");
        self.doc = Some(Document {
            original: buffer.clone(),
            source: buffer.clone(),
            working: buffer,
        });
        log_info!("[{}] loaded {}x{} image", self.session_id, w, h);
    }

    // ------------------------------------------------------------------
    // Non-destructive adjustments
    // ------------------------------------------------------------------

    /// Grade the source with `params`. Returns `false` when nothing is loaded.
    pub fn apply_filters(&mut self, params: FilterParams) -> bool {
        self.set_adjustment(Adjustment::Grade(params))
    }

    /// Drop the live adjustment; the working buffer becomes the source again.
    pub fn reset_filters(&mut self) -> bool {
        self.set_adjustment(Adjustment::None)
    }

    pub fn apply_blur(&mut self, radius: f32) -> bool {
        self.set_adjustment(Adjustment::Blur(radius))
    }

    pub fn apply_sharpness(&mut self, amount: f32) -> bool {
        self.set_adjustment(Adjustment::Sharpen(amount))
    }

    fn set_adjustment(&mut self, adjustment: Adjustment) -> bool {
        if self.doc.is_none() {
            return false;
        }
        self.adjustment = adjustment;
        if self.eraser.is_erasing() {
            // Recomputing would discard the stroke's view; wait for stop.
            self.render_pending = true;
        } else {
            self.render();
        }
        true
    }

    fn render(&mut self) {
        self.render_pending = false;
        if let Some(doc) = self.doc.as_mut() {
            doc.working = self.adjustment.render(&doc.source);
        }
    }

    // ------------------------------------------------------------------
    // Destructive edits
    // ------------------------------------------------------------------

    /// Crop to `[x, x+width) × [y, y+height)`, clamped to the image. An
    /// empty clamped rectangle leaves the image alone and returns `false`.
    pub fn apply_crop(&mut self, x: i64, y: i64, width: i64, height: i64) -> bool {
        self.finish_stroke();
        let Some(doc) = self.doc.as_mut() else { return false };

        let rect = clamp_crop_rect(&doc.source, x, y, width, height);
        if rect.is_empty() {
            log_warn!("[{}] ignoring empty crop {},{} {}x{}", self.session_id, x, y, width, height);
            return false;
        }

        doc.source = apply_crop(&doc.source, x, y, width, height);
        doc.working = apply_crop(&doc.working, x, y, width, height);
        self.history.push(&doc.source, "Crop");
        log_info!(
            "[{}] crop to {},{} {}x{}",
            self.session_id, rect.x, rect.y, rect.width, rect.height
        );
        true
    }

    /// Begin an erase stroke.
    pub fn start_erasing(&mut self) -> bool {
        if self.doc.is_none() {
            return false;
        }
        self.eraser.start();
        true
    }

    /// Erase a circle at `(x, y)` with the current radius. Has no effect
    /// outside a stroke. Returns whether any pixel changed.
    pub fn erase(&mut self, x: f32, y: f32) -> bool {
        let Some(doc) = self.doc.as_mut() else { return false };
        if !self.eraser.is_erasing() {
            return false;
        }
        let in_working = self.eraser.erase(&mut doc.working, x, y).is_some();
        let in_source = erase_circle(&mut doc.source, x, y, self.eraser.radius()).is_some();
        in_working || in_source
    }

    /// End the stroke. A stroke that changed pixels becomes one history
    /// entry; returns whether one was pushed.
    pub fn stop_erasing(&mut self) -> bool {
        self.finish_stroke()
    }

    /// The pointer left the canvas: end the stroke, keeping what was erased.
    pub fn pointer_left(&mut self) -> bool {
        self.finish_stroke()
    }

    pub fn set_erase_radius(&mut self, radius: f32) {
        self.eraser.set_radius(radius);
    }

    fn finish_stroke(&mut self) -> bool {
        if !self.eraser.is_erasing() {
            return false;
        }
        let summary = self.eraser.stop();
        // The working view can hide source changes; compare with the snapshot.
        let source_changed = match (&self.doc, self.history.current()) {
            (Some(doc), Some(entry)) => entry.pixels() != &doc.source,
            _ => false,
        };
        let changed = summary.changed() || source_changed;
        // Stamps went straight into the rendered view; rebuild it from source.
        if self.render_pending || (changed && self.adjustment != Adjustment::None) {
            self.render();
        }
        let Some(doc) = self.doc.as_ref() else { return false };
        if !changed {
            return false;
        }
        self.history.push(&doc.source, "Erase");
        if let Some((x0, y0, x1, y1)) = summary.bounds {
            log_info!("[{}] erase stroke over {},{}..{},{}", self.session_id, x0, y0, x1, y1);
        }
        true
    }

    /// Restore the image as decoded and drop the live adjustment. Undoable.
    pub fn revert(&mut self) -> bool {
        self.finish_stroke();
        let Some(doc) = self.doc.as_mut() else { return false };
        doc.source = doc.original.clone();
        self.adjustment = Adjustment::None;
        self.render_pending = false;
        doc.working = doc.source.clone();
        self.history.push(&doc.source, "Revert");
        true
    }

    // ------------------------------------------------------------------
    // History
    // ------------------------------------------------------------------

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Step back one snapshot. The live adjustment is re-applied on top.
    pub fn undo(&mut self) -> bool {
        self.finish_stroke();
        let Some(entry) = self.history.undo() else { return false };
        let restored = entry.pixels().clone();
        self.restore(restored)
    }

    /// Step forward one snapshot.
    pub fn redo(&mut self) -> bool {
        self.finish_stroke();
        let Some(entry) = self.history.redo() else { return false };
        let restored = entry.pixels().clone();
        self.restore(restored)
    }

    fn restore(&mut self, source: PixelBuffer) -> bool {
        let Some(doc) = self.doc.as_mut() else { return false };
        doc.source = source;
        self.render();
        true
    }

    // ------------------------------------------------------------------
    // Export
    // ------------------------------------------------------------------

    /// Encode the working buffer. Does not change engine state.
    pub fn export(
        &self,
        format: ExportFormat,
        quality: u8,
    ) -> impl Future<Output = Result<Vec<u8>, EncodeError>> + use<> {
        let snapshot = self.working().cloned();
        let session = self.session_id;
        async move {
            let Some(buffer) = snapshot else {
                log_warn!("[{}] export requested with no image loaded", session);
                return Err(EncodeError::NoImage);
            };
            io::encode(buffer, format, quality).await
        }
    }

    /// Export with the format and quality from settings.
    pub fn export_default(&self) -> impl Future<Output = Result<Vec<u8>, EncodeError>> + use<> {
        self.export(self.settings.export_format, self.settings.export_quality)
    }
}
