//! Bounded linear undo/redo history of immutable snapshots.

/// Linear snapshot history with a cursor.
///
/// `snapshots[cursor]` is always the current value. Pushing after an undo
/// discards the redo tail. When the stack grows past `limit` the oldest
/// snapshots are dropped.
#[derive(Debug, Clone)]
pub struct HistoryStack<T> {
    snapshots: Vec<T>,
    cursor: usize,
    limit: usize,
}

impl<T: Clone> HistoryStack<T> {
    /// History holding only `initial`. A `limit` below 1 is treated as 1.
    #[must_use]
    pub fn new(initial: T, limit: usize) -> Self {
        Self {
            snapshots: vec![initial],
            cursor: 0,
            limit: limit.max(1),
        }
    }

    /// The current snapshot.
    #[must_use]
    pub fn current(&self) -> &T {
        &self.snapshots[self.cursor]
    }

    /// Commit a new snapshot after the cursor.
    pub fn push(&mut self, snapshot: T) {
        self.snapshots.truncate(self.cursor + 1);
        self.snapshots.push(snapshot);
        if self.snapshots.len() > self.limit {
            let excess = self.snapshots.len() - self.limit;
            self.snapshots.drain(..excess);
        }
        self.cursor = self.snapshots.len() - 1;
    }

    /// Step back one snapshot. Returns `false` at the oldest snapshot.
    pub fn undo(&mut self) -> bool {
        if self.can_undo() {
            self.cursor -= 1;
            true
        } else {
            false
        }
    }

    /// Step forward one snapshot. Returns `false` at the newest snapshot.
    pub fn redo(&mut self) -> bool {
        if self.can_redo() {
            self.cursor += 1;
            true
        } else {
            false
        }
    }

    /// Whether an older snapshot exists.
    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    /// Whether a newer snapshot exists.
    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.snapshots.len()
    }

    /// Number of retained snapshots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Always `false`; a history holds at least its initial snapshot.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}
