#![allow(dead_code)]

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use textlayer::cache::CanvasTextCache;
use textlayer::discovery::{
    CanvasMetadata, Orchestrator, StaticCatalog, TextAssociation, TextEvent, TextOverlayUpdate,
};
use textlayer::fetch::{FetchedResource, Fetcher};
use textlayer::ir::{CanvasId, WindowId};
use textlayer::TextLayerError;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::sync::Notify;

pub fn fixture_path(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

pub fn fixture(name: &str) -> String {
    fs::read_to_string(fixture_path(name)).expect("read fixture")
}

/// Serves canned bodies and records every requested URI.
#[derive(Default)]
pub struct MockFetcher {
    responses: HashMap<String, FetchedResource>,
    calls: Mutex<Vec<String>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, uri: &str, body: &str, media_type: Option<&str>) -> Self {
        self.responses
            .insert(uri.to_string(), FetchedResource::new(body, media_type));
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self, uri: &str) -> usize {
        self.calls.lock().iter().filter(|call| *call == uri).count()
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    async fn fetch(&self, uri: &str) -> Result<FetchedResource, TextLayerError> {
        self.calls.lock().push(uri.to_string());
        self.responses.get(uri).cloned().ok_or_else(|| {
            TextLayerError::Transport {
                uri: uri.to_string(),
                message: "HTTP 404 Not Found".to_string(),
            }
        })
    }
}

/// A [`MockFetcher`] whose responses are held back until [`GatedFetcher::open`].
pub struct GatedFetcher {
    pub inner: MockFetcher,
    gate: Notify,
}

impl GatedFetcher {
    pub fn new(inner: MockFetcher) -> Self {
        Self {
            inner,
            gate: Notify::new(),
        }
    }

    pub fn open(&self) {
        self.gate.notify_one();
    }
}

#[async_trait]
impl Fetcher for GatedFetcher {
    async fn fetch(&self, uri: &str) -> Result<FetchedResource, TextLayerError> {
        self.gate.notified().await;
        self.inner.fetch(uri).await
    }
}

/// An orchestrator wired to an in-memory catalog and an event receiver.
pub struct Harness {
    pub orchestrator: Orchestrator,
    pub catalog: Arc<StaticCatalog>,
    pub events: UnboundedReceiver<TextEvent>,
    pub window: WindowId,
}

impl Harness {
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        let catalog = Arc::new(StaticCatalog::new());
        let (tx, rx) = mpsc::unbounded_channel();
        let orchestrator =
            Orchestrator::new(CanvasTextCache::new(), catalog.clone(), fetcher, tx);
        Self {
            orchestrator,
            catalog,
            events: rx,
            window: WindowId::new("window"),
        }
    }

    /// Registers a visible canvas with a text source.
    pub fn add_canvas(&self, id: &str, width: u32, height: u32, association: Option<TextAssociation>) {
        let mut metadata = CanvasMetadata::new(width, height);
        metadata.text_association = association;
        self.catalog.insert_canvas(id, metadata);

        let mut visible = self.catalog_visible();
        visible.push(CanvasId::new(id));
        self.catalog.set_visible(self.window.clone(), visible);
    }

    fn catalog_visible(&self) -> Vec<CanvasId> {
        use textlayer::discovery::CanvasCatalog;
        self.catalog.visible_canvases(&self.window)
    }

    pub fn visible(&self) -> Vec<CanvasId> {
        self.catalog_visible()
    }

    /// Stores a configuration for the window without triggering discovery.
    pub async fn configure(&self, enabled: bool, selectable: bool, visible: bool) {
        // Keep the catalog empty of visible canvases while configuring so no
        // discovery runs as a side effect.
        let canvases = self.catalog_visible();
        self.catalog.set_visible(self.window.clone(), Vec::new());
        self.orchestrator
            .on_config_change(
                &self.window,
                TextOverlayUpdate {
                    enabled: Some(enabled),
                    selectable: Some(selectable),
                    visible: Some(visible),
                    opacity: None,
                },
            )
            .await;
        self.catalog.set_visible(self.window.clone(), canvases);
    }

    pub async fn discover_visible(&self) {
        let visible = self.visible();
        self.orchestrator.discover(&visible, &self.window).await;
    }

    /// Every event emitted so far.
    pub fn drain(&mut self) -> Vec<TextEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            events.push(event);
        }
        events
    }
}

pub fn event_names(events: &[TextEvent]) -> Vec<&'static str> {
    events.iter().map(TextEvent::name).collect()
}

pub fn alto_association(uri: &str) -> TextAssociation {
    TextAssociation::new(uri)
        .with_media_type("application/xml+alto")
        .with_profile("http://www.loc.gov/standards/alto/ns-v3#")
}

pub fn hocr_association(uri: &str) -> TextAssociation {
    TextAssociation::new(uri).with_media_type("text/vnd.hocr+html")
}

pub fn annotation_association(uri: &str) -> TextAssociation {
    TextAssociation::new(uri).with_media_type("application/ld+json")
}
