use image::RgbaImage;
use std::collections::HashMap;
use std::sync::Arc;

use super::source::SourceStore;
use crate::document::{Document, SourceId};
use crate::error::EditorResult;

/// The whole object graph at one point in time.
///
/// The graph is stored serialized; pixel buffers are immutable and shared
/// with the live document through `Arc`, so a snapshot never copies pixels.
#[derive(Clone)]
pub struct HistorySnapshot {
    graph: String,
    sources: HashMap<SourceId, Arc<RgbaImage>>,
}

impl std::fmt::Debug for HistorySnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistorySnapshot")
            .field("graph_len", &self.graph.len())
            .field("sources", &self.sources.len())
            .finish()
    }
}

impl HistorySnapshot {
    pub fn capture(document: &Document, store: &SourceStore) -> EditorResult<Self> {
        let graph = serde_json::to_string(document)?;
        let sources = document
            .source_ids()
            .into_iter()
            .filter_map(|id| store.get(id).map(|pixels| (id, pixels)))
            .collect();
        Ok(Self { graph, sources })
    }

    pub fn restore(&self) -> EditorResult<(Document, SourceStore)> {
        let document: Document = serde_json::from_str(&self.graph)?;
        let store = SourceStore::from_map(self.sources.clone());
        Ok((document, store))
    }
}

/// Linear undo history over structural snapshots.
///
/// Invariants: `index` is in `[-1, len-1]`, `-1` only while empty, and
/// `len <= capacity`. While `restoring` is set, `record` refuses new
/// snapshots so that restoring a state never records that same state again.
#[derive(Debug)]
pub struct History {
    snapshots: Vec<HistorySnapshot>,
    index: isize,
    capacity: usize,
    restoring: bool,
}

impl History {
    pub fn new(capacity: usize) -> Self {
        Self {
            snapshots: Vec::new(),
            index: -1,
            capacity: capacity.max(1),
            restoring: false,
        }
    }

    pub fn clear(&mut self) {
        self.snapshots.clear();
        self.index = -1;
    }

    pub fn index(&self) -> isize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn can_undo(&self) -> bool {
        self.index > 0
    }

    pub fn can_redo(&self) -> bool {
        self.index >= 0 && (self.index as usize) + 1 < self.snapshots.len()
    }

    pub fn is_restoring(&self) -> bool {
        self.restoring
    }

    /// Push a snapshot after the current index, discarding the redo branch.
    ///
    /// Returns false (and drops the snapshot) while a restore is in flight.
    pub fn record(&mut self, snapshot: HistorySnapshot) -> bool {
        if self.restoring {
            return false;
        }
        self.snapshots.truncate((self.index + 1) as usize);
        self.snapshots.push(snapshot);
        if self.snapshots.len() > self.capacity {
            let excess = self.snapshots.len() - self.capacity;
            self.snapshots.drain(..excess);
            log::debug!("history pruned {} oldest snapshot(s)", excess);
        }
        self.index = self.snapshots.len() as isize - 1;
        true
    }

    /// Move one step back and return the snapshot to restore
    pub(crate) fn step_back(&mut self) -> Option<HistorySnapshot> {
        if !self.can_undo() {
            return None;
        }
        self.index -= 1;
        self.snapshots.get(self.index as usize).cloned()
    }

    /// Move one step forward and return the snapshot to restore
    pub(crate) fn step_forward(&mut self) -> Option<HistorySnapshot> {
        if !self.can_redo() {
            return None;
        }
        self.index += 1;
        self.snapshots.get(self.index as usize).cloned()
    }

    /// Undo a step taken by `step_back`/`step_forward` whose restore failed
    pub(crate) fn revert_step(&mut self, previous_index: isize) {
        self.index = previous_index;
    }

    /// Precondition: no restore in flight. Postcondition: `record` is disabled.
    pub(crate) fn begin_restore(&mut self) {
        debug_assert!(!self.restoring, "nested history restore");
        self.restoring = true;
    }

    /// Re-enables `record` once the restored graph is in place
    pub(crate) fn end_restore(&mut self) {
        self.restoring = false;
    }
}
