// Undo buffer - bounded history of executed actions and their inverses

use super::Action;
use std::collections::VecDeque;

/// Default number of undo entries kept
pub const DEFAULT_UNDO_DEPTH: usize = 50;

/// One undoable step: the action that reverts it and the action that replays it
#[derive(Debug, Clone, PartialEq)]
pub struct UndoEntry {
    pub tag: String,
    pub undo: Action,
    pub redo: Action,
}

impl UndoEntry {
    pub fn new(tag: impl Into<String>, undo: Action, redo: Action) -> Self {
        Self {
            tag: tag.into(),
            undo,
            redo,
        }
    }
}

/// Undo and redo stacks. Recording a new entry clears the redo stack; once
/// `max_depth` entries are held the oldest is dropped.
#[derive(Debug)]
pub struct UndoBuffer {
    undo_stack: VecDeque<UndoEntry>,
    redo_stack: Vec<UndoEntry>,
    max_depth: usize,
}

impl UndoBuffer {
    pub fn new(max_depth: usize) -> Self {
        Self {
            undo_stack: VecDeque::with_capacity(max_depth),
            redo_stack: Vec::new(),
            max_depth,
        }
    }

    /// Record a freshly executed action
    pub fn record(&mut self, entry: UndoEntry) {
        tracing::debug!("Recording undo entry '{}'", entry.tag);
        self.redo_stack.clear();
        self.push_undo(entry);
    }

    fn push_undo(&mut self, entry: UndoEntry) {
        if self.max_depth == 0 {
            return;
        }
        self.undo_stack.push_back(entry);
        while self.undo_stack.len() > self.max_depth {
            self.undo_stack.pop_front();
        }
    }

    pub(crate) fn pop_undo(&mut self) -> Option<UndoEntry> {
        self.undo_stack.pop_back()
    }

    pub(crate) fn pop_redo(&mut self) -> Option<UndoEntry> {
        self.redo_stack.pop()
    }

    /// Move an undone entry onto the redo stack
    pub(crate) fn push_redo(&mut self, entry: UndoEntry) {
        self.redo_stack.push(entry);
    }

    /// Move a redone entry back onto the undo stack, keeping the rest of the redo stack
    pub(crate) fn push_redone(&mut self, entry: UndoEntry) {
        self.push_undo(entry);
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Tag of the entry the next undo would revert
    pub fn undo_tag(&self) -> Option<&str> {
        self.undo_stack.back().map(|e| e.tag.as_str())
    }

    pub fn redo_tag(&self) -> Option<&str> {
        self.redo_stack.last().map(|e| e.tag.as_str())
    }

    pub fn undo_count(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_count(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}

impl Default for UndoBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_UNDO_DEPTH)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(n: usize) -> UndoEntry {
        UndoEntry::new(
            format!("Step {}", n),
            Action::activate_tool(format!("PaintTool{}", n)),
            Action::activate_tool(format!("PaintTool{}", n + 1)),
        )
    }

    #[test]
    fn test_oldest_entries_dropped_first() {
        let mut buffer = UndoBuffer::new(3);
        for n in 0..5 {
            buffer.record(entry(n));
        }

        assert_eq!(buffer.undo_count(), 3);
        assert_eq!(buffer.undo_tag(), Some("Step 4"));
        assert_eq!(buffer.pop_undo().map(|e| e.tag), Some("Step 4".to_string()));
        assert_eq!(buffer.pop_undo().map(|e| e.tag), Some("Step 3".to_string()));
        assert_eq!(buffer.pop_undo().map(|e| e.tag), Some("Step 2".to_string()));
        assert!(buffer.pop_undo().is_none());
    }

    #[test]
    fn test_record_clears_redo() {
        let mut buffer = UndoBuffer::default();
        buffer.record(entry(0));
        buffer.record(entry(1));

        let undone = buffer.pop_undo().unwrap();
        buffer.push_redo(undone);
        assert!(buffer.can_redo());
        assert_eq!(buffer.redo_tag(), Some("Step 1"));

        buffer.record(entry(2));
        assert!(!buffer.can_redo());
        assert_eq!(buffer.undo_count(), 2);
    }

    #[test]
    fn test_redone_entry_keeps_remaining_redo() {
        let mut buffer = UndoBuffer::default();
        buffer.record(entry(0));
        buffer.record(entry(1));
        for _ in 0..2 {
            let e = buffer.pop_undo().unwrap();
            buffer.push_redo(e);
        }

        let redone = buffer.pop_redo().unwrap();
        assert_eq!(redone.tag, "Step 0");
        buffer.push_redone(redone);

        assert_eq!(buffer.undo_count(), 1);
        assert_eq!(buffer.redo_count(), 1);
    }

    #[test]
    fn test_zero_depth_keeps_nothing() {
        let mut buffer = UndoBuffer::new(0);
        buffer.record(entry(0));
        assert!(!buffer.can_undo());
    }
}
