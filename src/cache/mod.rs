//! In-memory store of per-canvas text state.
//!
//! Exactly one [`CanvasTextEntry`] exists per canvas id. Its lifecycle is
//!
//! ```text
//! NotRequested -> Discovered -> Fetching -> Fetched | Failed
//! ```
//!
//! Every transition into `Fetching` (and every reset) stamps the entry with
//! a fresh generation from a cache-wide counter. Results are written back
//! with the generation their fetch started under; a write whose generation
//! no longer matches is discarded, so a superseded fetch can never clobber
//! newer state.
//!
//! # Thread Safety
//!
//! The map sits behind `Arc<parking_lot::RwLock<_>>`; clones share state.
//! Each transition takes the write lock once, which makes the
//! `Discovered -> Fetching` step the exclusivity gate for a canvas.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::ir::{CanvasId, CanvasSize, ParsedText};

/// Where a canvas' text came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    /// An OCR document (ALTO or hOCR).
    Ocr,
    /// A IIIF annotation list.
    Annos,
}

/// Lifecycle state of a canvas entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EntryStatus {
    NotRequested,
    Discovered,
    Fetching,
    Fetched,
    Failed,
}

impl EntryStatus {
    /// True for `Fetched` and `Failed`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, EntryStatus::Fetched | EntryStatus::Failed)
    }
}

/// Text state of one canvas.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CanvasTextEntry {
    pub status: EntryStatus,
    pub source_uri: String,
    pub source_type: SourceType,
    /// Present iff `status == Fetched`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parsed_text: Option<ParsedText>,
    /// Present iff `status == Failed`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub generation: u64,
    /// Canvas size the text was requested for.
    pub canvas_size: CanvasSize,
}

impl CanvasTextEntry {
    fn new(
        status: EntryStatus,
        source_uri: &str,
        source_type: SourceType,
        canvas_size: CanvasSize,
        generation: u64,
    ) -> Self {
        Self {
            status,
            source_uri: source_uri.to_string(),
            source_type,
            parsed_text: None,
            error: None,
            generation,
            canvas_size,
        }
    }

    /// True when discovery may (re)consider this canvas.
    fn is_open(&self) -> bool {
        self.status == EntryStatus::NotRequested
    }
}

/// Shared per-canvas text cache.
#[derive(Clone, Debug, Default)]
pub struct CanvasTextCache {
    entries: Arc<RwLock<HashMap<CanvasId, CanvasTextEntry>>>,
    generation: Arc<AtomicU64>,
}

impl CanvasTextCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// A copy of the canvas' entry.
    pub fn get(&self, id: &CanvasId) -> Option<CanvasTextEntry> {
        self.entries.read().get(id).cloned()
    }

    /// True when the canvas has an entry past `NotRequested`.
    pub fn is_live(&self, id: &CanvasId) -> bool {
        self.entries
            .read()
            .get(id)
            .is_some_and(|entry| !entry.is_open())
    }

    /// Records that a text source was found for the canvas.
    ///
    /// Returns false (and changes nothing) when the canvas already has a
    /// live entry.
    pub fn mark_discovered(
        &self,
        id: &CanvasId,
        source_uri: &str,
        source_type: SourceType,
        canvas_size: CanvasSize,
    ) -> bool {
        let mut entries = self.entries.write();
        if entries.get(id).is_some_and(|entry| !entry.is_open()) {
            return false;
        }
        let generation = self.next_generation();
        entries.insert(
            id.clone(),
            CanvasTextEntry::new(
                EntryStatus::Discovered,
                source_uri,
                source_type,
                canvas_size,
                generation,
            ),
        );
        true
    }

    /// Moves the canvas into `Fetching` and returns the generation results
    /// must be written back with.
    ///
    /// Only absent, `NotRequested` and `Discovered` entries can start a
    /// fetch; for anything else `None` is returned.
    pub fn begin_fetch(
        &self,
        id: &CanvasId,
        source_uri: &str,
        source_type: SourceType,
        canvas_size: CanvasSize,
    ) -> Option<u64> {
        let mut entries = self.entries.write();
        let startable = entries.get(id).map_or(true, |entry| {
            entry.status != EntryStatus::Fetching && !entry.status.is_terminal()
        });
        if !startable {
            return None;
        }
        let generation = self.next_generation();
        entries.insert(
            id.clone(),
            CanvasTextEntry::new(
                EntryStatus::Fetching,
                source_uri,
                source_type,
                canvas_size,
                generation,
            ),
        );
        Some(generation)
    }

    /// Moves the canvas into `Fetching` whatever its state, superseding any
    /// fetch already in flight.
    pub fn restart(
        &self,
        id: &CanvasId,
        source_uri: &str,
        source_type: SourceType,
        canvas_size: CanvasSize,
    ) -> u64 {
        let mut entries = self.entries.write();
        let generation = self.next_generation();
        entries.insert(
            id.clone(),
            CanvasTextEntry::new(
                EntryStatus::Fetching,
                source_uri,
                source_type,
                canvas_size,
                generation,
            ),
        );
        generation
    }

    /// Stores parsed text. Returns false when the write was stale.
    pub fn complete(
        &self,
        id: &CanvasId,
        generation: u64,
        source_type: SourceType,
        parsed_text: ParsedText,
    ) -> bool {
        self.finish(id, generation, |entry| {
            entry.status = EntryStatus::Fetched;
            entry.source_type = source_type;
            entry.parsed_text = Some(parsed_text);
            entry.error = None;
        })
    }

    /// Records a failure. Returns false when the write was stale.
    pub fn fail(&self, id: &CanvasId, generation: u64, error: impl Into<String>) -> bool {
        let error = error.into();
        self.finish(id, generation, |entry| {
            entry.status = EntryStatus::Failed;
            entry.parsed_text = None;
            entry.error = Some(error);
        })
    }

    fn finish(
        &self,
        id: &CanvasId,
        generation: u64,
        update: impl FnOnce(&mut CanvasTextEntry),
    ) -> bool {
        let mut entries = self.entries.write();
        match entries.get_mut(id) {
            Some(entry)
                if entry.generation == generation && entry.status == EntryStatus::Fetching =>
            {
                update(entry);
                true
            }
            _ => false,
        }
    }

    /// Puts the canvas back to `NotRequested` so discovery picks it up
    /// again. Any fetch in flight for it becomes stale.
    pub fn reset(&self, id: &CanvasId) -> bool {
        let mut entries = self.entries.write();
        let Some(entry) = entries.get_mut(id) else {
            return false;
        };
        entry.status = EntryStatus::NotRequested;
        entry.parsed_text = None;
        entry.error = None;
        entry.generation = self.next_generation();
        true
    }

    /// Drops every entry.
    pub fn clear(&self) {
        self.entries.write().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Copies of all entries.
    pub fn snapshot(&self) -> HashMap<CanvasId, CanvasTextEntry> {
        self.entries.read().clone()
    }
}
