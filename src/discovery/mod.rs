//! Discovery and fetching of canvas text.
//!
//! The [`Orchestrator`] decides, per visible canvas, whether a text source
//! exists and needs fetching, drives the fetch/parse pipeline and records
//! the outcome in the [`CanvasTextCache`]. Every state change is announced
//! as a [`TextEvent`] on an unbounded channel.
//!
//! Failures are per canvas: a transport or parse error marks that canvas
//! `Failed` and never affects the others. There are no retries; a canvas
//! is fetched again only after a configuration change resets it.

pub mod annotations;
pub mod canvas;
pub mod config;
pub mod events;

use std::sync::Arc;

use futures::future::join_all;
use serde_json::Value;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

pub use canvas::{CanvasCatalog, CanvasMetadata, StaticCatalog, TextAssociation};
pub use config::{TextOverlayConfig, TextOverlayUpdate, WindowConfigs};
pub use events::{ConfigPayload, TextEvent, ViewerEvent};

use crate::cache::{CanvasTextCache, CanvasTextEntry, EntryStatus, SourceType};
use crate::error::TextLayerError;
use crate::fetch::Fetcher;
use crate::ir::io_alto_xml::AltoOptions;
use crate::ir::{parse_source_with, CanvasId, CanvasSize, ParsedText, SourceDialect, WindowId};
use crate::settings::Settings;

/// Coordinates discovery, fetching and parsing of canvas text.
///
/// Cheap to clone; clones share the cache, collaborators and window
/// configuration.
#[derive(Clone)]
pub struct Orchestrator {
    inner: Arc<Inner>,
}

struct Inner {
    cache: CanvasTextCache,
    catalog: Arc<dyn CanvasCatalog>,
    fetcher: Arc<dyn Fetcher>,
    configs: WindowConfigs,
    events: UnboundedSender<TextEvent>,
    alto: AltoOptions,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("cache", &self.inner.cache)
            .field("configs", &self.inner.configs)
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    /// Creates an orchestrator with default settings.
    pub fn new(
        cache: CanvasTextCache,
        catalog: Arc<dyn CanvasCatalog>,
        fetcher: Arc<dyn Fetcher>,
        events: UnboundedSender<TextEvent>,
    ) -> Self {
        Self::with_settings(cache, catalog, fetcher, events, &Settings::default())
    }

    /// Creates an orchestrator whose windows start from `settings.overlay`.
    pub fn with_settings(
        cache: CanvasTextCache,
        catalog: Arc<dyn CanvasCatalog>,
        fetcher: Arc<dyn Fetcher>,
        events: UnboundedSender<TextEvent>,
        settings: &Settings,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                cache,
                catalog,
                fetcher,
                configs: WindowConfigs::new(settings.overlay),
                events,
                alto: settings.alto.options(),
            }),
        }
    }

    /// The cache this orchestrator writes to.
    pub fn cache(&self) -> &CanvasTextCache {
        &self.inner.cache
    }

    /// Dispatches an inbound viewer event.
    pub async fn handle(&self, event: ViewerEvent) {
        match event {
            ViewerEvent::DiscoverRequest {
                visible_canvas_ids,
                window_id,
            } => self.discover(&visible_canvas_ids, &window_id).await,
            ViewerEvent::ConfigChanged { window_id, payload } => match payload.text_overlay {
                Some(update) => self.on_config_change(&window_id, update).await,
                None => debug!(window = %window_id, "config change without text overlay settings"),
            },
        }
    }

    /// Finds text sources for the visible canvases and fetches them.
    ///
    /// Canvases that already have a live cache entry are skipped, so
    /// calling this repeatedly is harmless. Returns once every fetch it
    /// started has finished.
    pub async fn discover(&self, visible_canvas_ids: &[CanvasId], window_id: &WindowId) {
        let Some(config) = self.inner.configs.get(window_id) else {
            debug!(window = %window_id, "no overlay configuration; skipping discovery");
            return;
        };
        if !config.enabled {
            debug!(window = %window_id, "overlay disabled; skipping discovery");
            return;
        }

        let mut fetches = Vec::new();
        for canvas_id in visible_canvas_ids {
            if self.inner.cache.is_live(canvas_id) {
                continue;
            }
            let Some(metadata) = self.inner.catalog.canvas(window_id, canvas_id) else {
                debug!(canvas = %canvas_id, "canvas not in catalog");
                continue;
            };
            let Some(association) = metadata.text_association.clone() else {
                continue;
            };
            let Some(source_type) = association.source_type() else {
                debug!(canvas = %canvas_id, uri = %association.uri, "unrecognized text source");
                continue;
            };

            let canvas_size = metadata.size();
            if !self.inner.cache.mark_discovered(
                canvas_id,
                &association.uri,
                source_type,
                canvas_size,
            ) {
                continue;
            }
            self.emit(TextEvent::Discovered {
                target_id: canvas_id.clone(),
                source_uri: association.uri.clone(),
            });

            if !(config.selectable || config.visible) {
                continue;
            }
            let Some(generation) = self.inner.cache.begin_fetch(
                canvas_id,
                &association.uri,
                source_type,
                canvas_size,
            ) else {
                continue;
            };
            self.emit(TextEvent::Requested {
                target_id: canvas_id.clone(),
                source_uri: association.uri.clone(),
                canvas_size,
            });
            fetches.push(self.run_fetch(canvas_id.clone(), association, canvas_size, generation));
        }

        join_all(fetches).await;
    }

    /// Stores a window's new configuration and rediscovers when needed.
    ///
    /// Discovery runs only when the overlay is enabled and in use, and a
    /// visible canvas has no text yet, has annotation-sourced text, failed
    /// before, or was discovered while the overlay was not in use. Those
    /// entries are reset first.
    pub async fn on_config_change(&self, window_id: &WindowId, update: TextOverlayUpdate) {
        let config = self.inner.configs.apply(window_id, &update);
        if !config.wants_text() {
            return;
        }

        let visible = self.inner.catalog.visible_canvases(window_id);
        let entries: Vec<(CanvasId, Option<CanvasTextEntry>)> = visible
            .iter()
            .map(|id| (id.clone(), self.inner.cache.get(id)))
            .collect();

        // Only entries discovery can rebuild from the catalog are reset;
        // annotation text pushed in without an association is kept.
        let refreshable = |id: &CanvasId, entry: &CanvasTextEntry| {
            (entry.source_type == SourceType::Annos
                || matches!(entry.status, EntryStatus::Failed | EntryStatus::Discovered))
                && self.has_text_source(window_id, id)
        };
        let needs_discovery = entries.iter().any(|(id, entry)| match entry {
            None => true,
            Some(entry) => refreshable(id, entry) || entry.status == EntryStatus::NotRequested,
        });
        if !needs_discovery {
            return;
        }

        for (id, entry) in &entries {
            if entry.as_ref().is_some_and(|entry| refreshable(id, entry)) {
                self.inner.cache.reset(id);
            }
        }
        self.discover(&visible, window_id).await;
    }

    fn has_text_source(&self, window_id: &WindowId, id: &CanvasId) -> bool {
        self.inner
            .catalog
            .canvas(window_id, id)
            .and_then(|metadata| metadata.text_association)
            .is_some_and(|association| association.source_type().is_some())
    }

    /// Fetches and parses a text source for one canvas.
    ///
    /// Does nothing when the canvas already has a fetch in flight or a
    /// terminal entry.
    pub async fn fetch_and_parse(
        &self,
        target_id: &CanvasId,
        source_uri: &str,
        canvas_size: CanvasSize,
    ) {
        let association = TextAssociation::new(source_uri);
        let source_type = association.source_type().unwrap_or(SourceType::Ocr);
        let Some(generation) =
            self.inner
                .cache
                .begin_fetch(target_id, source_uri, source_type, canvas_size)
        else {
            debug!(canvas = %target_id, "fetch already started or finished");
            return;
        };
        self.emit(TextEvent::Requested {
            target_id: target_id.clone(),
            source_uri: source_uri.to_string(),
            canvas_size,
        });
        self.run_fetch(target_id.clone(), association, canvas_size, generation)
            .await;
    }

    /// Parses an annotation list the viewer already holds and stores the
    /// result as the canvas' text, superseding any fetch in flight.
    ///
    /// Geometry maps onto the size of the canvas' cache entry, else the
    /// size the catalog declares.
    pub async fn process_annotation_source(
        &self,
        target_id: &CanvasId,
        annotation_id: &str,
        annotation_json: Value,
    ) {
        let canvas_size = self
            .inner
            .cache
            .get(target_id)
            .map(|entry| entry.canvas_size)
            .filter(|size| !size.is_empty())
            .or_else(|| self.inner.catalog.canvas_size(target_id))
            .unwrap_or_default();
        let generation =
            self.inner
                .cache
                .restart(target_id, annotation_id, SourceType::Annos, canvas_size);

        let result =
            annotations::annotation_text(annotation_json, self.inner.fetcher.as_ref(), canvas_size)
                .await;
        self.record(target_id, annotation_id, generation, SourceType::Annos, result);
    }

    async fn run_fetch(
        &self,
        target_id: CanvasId,
        association: TextAssociation,
        canvas_size: CanvasSize,
        generation: u64,
    ) {
        info!(canvas = %target_id, uri = %association.uri, "fetching text source");
        let (source_type, result) = self.fetch_text(&association, canvas_size).await;
        self.record(&target_id, &association.uri, generation, source_type, result);
    }

    async fn fetch_text(
        &self,
        association: &TextAssociation,
        canvas_size: CanvasSize,
    ) -> (SourceType, Result<ParsedText, TextLayerError>) {
        let fallback_type = association.source_type().unwrap_or(SourceType::Ocr);
        let resource = match self.inner.fetcher.fetch(&association.uri).await {
            Ok(resource) => resource,
            Err(err) => return (fallback_type, Err(err)),
        };

        let dialect = match association.declared_dialect() {
            Some(dialect) => Ok(dialect),
            None => SourceDialect::detect(resource.media_type.as_deref(), &resource.body),
        };
        let dialect = match dialect {
            Ok(dialect) => dialect,
            Err(err) => return (fallback_type, Err(err)),
        };
        debug!(uri = %association.uri, dialect = %dialect, "parsing text source");

        match dialect {
            SourceDialect::IiifAnnotation => {
                let result = match annotations::annotation_json(&resource.body) {
                    Ok(json) => {
                        annotations::annotation_text(json, self.inner.fetcher.as_ref(), canvas_size)
                            .await
                    }
                    Err(err) => Err(err),
                };
                (SourceType::Annos, result)
            }
            dialect => (
                SourceType::Ocr,
                parse_source_with(dialect, &resource.body, canvas_size, &self.inner.alto),
            ),
        }
    }

    /// Writes a result into the cache and announces it, unless the write
    /// is stale.
    fn record(
        &self,
        target_id: &CanvasId,
        source_uri: &str,
        generation: u64,
        source_type: SourceType,
        result: Result<ParsedText, TextLayerError>,
    ) {
        match result {
            Ok(parsed_text) => {
                let lines = parsed_text.lines.len();
                if self
                    .inner
                    .cache
                    .complete(target_id, generation, source_type, parsed_text.clone())
                {
                    info!(canvas = %target_id, uri = source_uri, lines, "text received");
                    self.emit(TextEvent::Received {
                        target_id: target_id.clone(),
                        source_uri: source_uri.to_string(),
                        source_type,
                        parsed_text,
                    });
                } else {
                    debug!(canvas = %target_id, generation, "discarding stale result");
                }
            }
            Err(err) => {
                let error = err.to_string();
                if self.inner.cache.fail(target_id, generation, error.clone()) {
                    warn!(canvas = %target_id, uri = source_uri, error = %error, "text unavailable");
                    self.emit(TextEvent::ReceiveFailed {
                        target_id: target_id.clone(),
                        source_uri: source_uri.to_string(),
                        error,
                    });
                } else {
                    debug!(canvas = %target_id, generation, "discarding stale failure");
                }
            }
        }
    }

    fn emit(&self, event: TextEvent) {
        debug!(event = event.name(), canvas = %event.target_id(), "emit");
        if self.inner.events.send(event).is_err() {
            debug!("event receiver dropped");
        }
    }

    /// Cache entry of a canvas.
    pub fn text_for_canvas(&self, canvas_id: &CanvasId) -> Option<CanvasTextEntry> {
        self.inner.cache.get(canvas_id)
    }

    /// Entries of the window's visible canvases that have one, in display order.
    pub fn texts_for_visible_canvases(
        &self,
        window_id: &WindowId,
    ) -> Vec<(CanvasId, CanvasTextEntry)> {
        self.inner
            .catalog
            .visible_canvases(window_id)
            .into_iter()
            .filter_map(|id| self.inner.cache.get(&id).map(|entry| (id, entry)))
            .collect()
    }

    /// True when any visible canvas has fetched text.
    pub fn texts_available(&self, window_id: &WindowId) -> bool {
        self.texts_for_visible_canvases(window_id)
            .iter()
            .any(|(_, entry)| entry.status == EntryStatus::Fetched)
    }

    /// True when a fetch is in flight for any visible canvas.
    pub fn texts_fetching(&self, window_id: &WindowId) -> bool {
        self.texts_for_visible_canvases(window_id)
            .iter()
            .any(|(_, entry)| entry.status == EntryStatus::Fetching)
    }

    /// The window's overlay configuration; `None` means disabled.
    pub fn window_config(&self, window_id: &WindowId) -> Option<TextOverlayConfig> {
        self.inner.configs.get(window_id)
    }
}
