use crate::canvas::PixelBuffer;

// ============================================================================
// HISTORY ENTRY — an immutable full-buffer snapshot
// ============================================================================

/// Deep copy of a buffer taken at a point in time, plus a label for the
/// history list ("Open", "Crop", "Erase", ...).
#[derive(Clone, Debug)]
pub struct HistoryEntry {
    description: String,
    pixels: PixelBuffer,
}

impl HistoryEntry {
    fn capture(description: &str, buffer: &PixelBuffer) -> Self {
        Self {
            description: description.to_string(),
            pixels: buffer.clone(),
        }
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn pixels(&self) -> &PixelBuffer {
        &self.pixels
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn memory_size(&self) -> usize {
        self.pixels.memory_bytes() + self.description.len()
    }
}

// ============================================================================
// HISTORY STACK — snapshot list with an undo/redo cursor and memory limits
// ============================================================================

/// Default number of snapshots kept.
pub const DEFAULT_MAX_ENTRIES: usize = 50;
/// Default memory cap across all snapshots (100 MB).
pub const DEFAULT_MAX_BYTES: usize = 100 * 1024 * 1024;

/// Ordered snapshots with a cursor at the current state.
///
/// `cursor` is `None` only while the stack is empty; otherwise it indexes
/// `entries`. Boundary undo/redo calls are silent no-ops. The stack never
/// touches the live buffer: restoring a returned entry is up to the caller.
pub struct HistoryStack {
    entries: Vec<HistoryEntry>,
    cursor: Option<usize>,
    max_entries: usize,
    /// Optional memory cap in bytes.
    max_memory_bytes: Option<usize>,
    /// Running memory total across all entries.
    total_memory: usize,
}

impl Default for HistoryStack {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ENTRIES, Some(DEFAULT_MAX_BYTES))
    }
}

impl HistoryStack {
    /// `max_entries` below 1 is raised to 1 so the current state always fits.
    pub fn new(max_entries: usize, max_memory_bytes: Option<usize>) -> Self {
        Self {
            entries: Vec::new(),
            cursor: None,
            max_entries: max_entries.max(1),
            max_memory_bytes,
            total_memory: 0,
        }
    }

    /// Snapshot `buffer`, dropping any redo entries beyond the cursor.
    pub fn push(&mut self, buffer: &PixelBuffer, description: &str) {
        let keep = self.cursor.map_or(0, |c| c + 1);
        for removed in self.entries.drain(keep..) {
            self.total_memory = self.total_memory.saturating_sub(removed.memory_size());
        }

        let entry = HistoryEntry::capture(description, buffer);
        self.total_memory += entry.memory_size();
        self.entries.push(entry);
        self.cursor = Some(self.entries.len() - 1);

        self.prune();
    }

    /// Step back one entry and return it.
    pub fn undo(&mut self) -> Option<&HistoryEntry> {
        match self.cursor {
            Some(c) if c > 0 => {
                self.cursor = Some(c - 1);
                self.entries.get(c - 1)
            }
            _ => None,
        }
    }

    /// Step forward one entry and return it.
    pub fn redo(&mut self) -> Option<&HistoryEntry> {
        let next = self.cursor?.checked_add(1)?;
        if next < self.entries.len() {
            self.cursor = Some(next);
            self.entries.get(next)
        } else {
            None
        }
    }

    pub fn can_undo(&self) -> bool {
        self.cursor.is_some_and(|c| c > 0)
    }

    pub fn can_redo(&self) -> bool {
        self.cursor.is_some_and(|c| c + 1 < self.entries.len())
    }

    /// Entry at the cursor.
    pub fn current(&self) -> Option<&HistoryEntry> {
        self.entries.get(self.cursor?)
    }

    /// Label of the state `undo()` would leave.
    pub fn undo_description(&self) -> Option<&str> {
        if self.can_undo() {
            self.current().map(|e| e.description())
        } else {
            None
        }
    }

    /// Label of the state `redo()` would restore.
    pub fn redo_description(&self) -> Option<&str> {
        let next = self.cursor? + 1;
        self.entries.get(next).map(|e| e.description())
    }

    /// All labels, oldest first.
    pub fn descriptions(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.description()).collect()
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Current memory usage of all snapshots (O(1) via cached total).
    pub fn memory_usage(&self) -> usize {
        self.total_memory
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.cursor = None;
        self.total_memory = 0;
    }

    /// Drop the oldest entries while over a limit. The entry at the cursor
    /// is never dropped, so the cursor stays valid. The memory cap also
    /// keeps the entry before the cursor: one undo step always survives.
    fn prune(&mut self) {
        while self.entries.len() > self.max_entries && self.cursor.is_some_and(|c| c > 0) {
            self.remove_oldest();
        }

        if let Some(max_bytes) = self.max_memory_bytes {
            while self.total_memory > max_bytes && self.cursor.is_some_and(|c| c > 1) {
                self.remove_oldest();
            }
        }
    }

    fn remove_oldest(&mut self) {
        let removed = self.entries.remove(0);
        self.total_memory = self.total_memory.saturating_sub(removed.memory_size());
        self.cursor = self.cursor.and_then(|c| c.checked_sub(1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buf(v: u8) -> PixelBuffer {
        PixelBuffer::filled(2, 2, [v, v, v, 255])
    }

    #[test]
    fn empty_stack_is_inert() {
        let mut h = HistoryStack::default();
        assert!(h.undo().is_none());
        assert!(h.redo().is_none());
        assert_eq!(h.cursor(), None);
        assert!(!h.can_undo() && !h.can_redo());
    }

    #[test]
    fn undo_redo_round_trip() {
        let mut h = HistoryStack::default();
        h.push(&buf(1), "A");
        h.push(&buf(2), "B");
        assert_eq!(h.undo().map(|e| e.pixels().clone()), Some(buf(1)));
        assert_eq!(h.redo().map(|e| e.pixels().clone()), Some(buf(2)));
        assert!(h.redo().is_none());
    }

    #[test]
    fn push_after_undo_discards_redo() {
        let mut h = HistoryStack::default();
        h.push(&buf(1), "A");
        h.push(&buf(2), "B");
        h.undo();
        h.push(&buf(3), "C");
        assert!(h.redo().is_none());
        assert_eq!(h.descriptions(), vec!["A", "C"]);
        assert_eq!(h.cursor(), Some(1));
    }

    #[test]
    fn undo_stops_at_first_entry() {
        let mut h = HistoryStack::default();
        h.push(&buf(1), "A");
        assert!(h.undo().is_none());
        assert_eq!(h.cursor(), Some(0));
    }

    #[test]
    fn entries_are_deep_copies() {
        let mut h = HistoryStack::default();
        let mut live = buf(10);
        h.push(&live, "A");
        live.as_raw_mut()[0] = 99;
        assert_eq!(h.current().unwrap().pixels(), &buf(10));
    }

    #[test]
    fn entry_limit_prunes_oldest() {
        let mut h = HistoryStack::new(3, None);
        for v in 0..5 {
            h.push(&buf(v), &format!("S{v}"));
        }
        assert_eq!(h.descriptions(), vec!["S2", "S3", "S4"]);
        assert_eq!(h.cursor(), Some(2));
        assert_eq!(h.memory_usage(), 3 * (16 + 2));
    }

    #[test]
    fn memory_limit_keeps_one_undo_step() {
        let mut h = HistoryStack::new(50, Some(1));
        h.push(&buf(1), "A");
        h.push(&buf(2), "B");
        h.push(&buf(3), "C");
        assert_eq!(h.descriptions(), vec!["B", "C"]);
        assert_eq!(h.current().unwrap().description(), "C");
        assert_eq!(h.undo().map(|e| e.pixels().clone()), Some(buf(2)));
        assert!(h.undo().is_none());
    }

    #[test]
    fn oversized_snapshots_still_undo() {
        let big = |v: u8| PixelBuffer::filled(100, 100, [v, v, v, 255]);
        let mut h = HistoryStack::new(50, Some(50_000));
        h.push(&big(1), "A");
        h.push(&big(2), "B");
        assert_eq!(h.len(), 2);
        assert!(h.can_undo());
        assert_eq!(h.undo().map(|e| e.pixels().clone()), Some(big(1)));
        assert_eq!(h.redo().map(|e| e.pixels().clone()), Some(big(2)));
    }

    #[test]
    fn descriptions_follow_cursor() {
        let mut h = HistoryStack::default();
        h.push(&buf(1), "Open");
        h.push(&buf(2), "Crop");
        assert_eq!(h.undo_description(), Some("Crop"));
        assert_eq!(h.redo_description(), None);
        h.undo();
        assert_eq!(h.undo_description(), None);
        assert_eq!(h.redo_description(), Some("Crop"));
    }
}
