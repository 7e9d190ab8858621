//! Retouch: a single-image retouching engine.
//!
//! [`ImageEngine`] owns one decoded image and exposes non-destructive color
//! grading, blur and sharpen, destructive crop and erase, a bounded undo/redo
//! history and async decode/export. The pixel operations live in [`ops`] and
//! take explicit buffers, so they can also be used on their own.

#[macro_use]
pub mod logger;

pub mod canvas;
pub mod cli;
pub mod components;
pub mod engine;
pub mod io;
pub mod ops;
pub mod settings;

pub use canvas::PixelBuffer;
pub use components::history::{HistoryEntry, HistoryStack};
pub use components::tools::{EraseMask, EraseMode};
pub use engine::{Adjustment, ImageEngine, LoadOutcome, PendingLoad};
pub use io::{DecodeError, EncodeError, ExportFormat};
pub use ops::adjustments::FilterParams;
pub use settings::EngineSettings;
