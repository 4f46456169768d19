//! Canvas metadata and the catalog the orchestrator reads it from.

use std::collections::HashMap;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::cache::SourceType;
use crate::ir::{CanvasId, CanvasSize, SourceDialect, WindowId};

/// A text source linked from a canvas.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextAssociation {
    pub uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,
}

impl TextAssociation {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            media_type: None,
            profile: None,
        }
    }

    pub fn with_media_type(mut self, media_type: impl Into<String>) -> Self {
        self.media_type = Some(media_type.into());
        self
    }

    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = Some(profile.into());
        self
    }

    /// The dialect the association declares through its media type or profile.
    pub fn declared_dialect(&self) -> Option<SourceDialect> {
        self.media_type
            .as_deref()
            .and_then(SourceDialect::from_media_type)
            .or_else(|| self.profile.as_deref().and_then(SourceDialect::from_profile))
    }

    /// What kind of source this is, or `None` when it is not recognized.
    pub fn source_type(&self) -> Option<SourceType> {
        self.declared_dialect().map(|dialect| match dialect {
            SourceDialect::IiifAnnotation => SourceType::Annos,
            SourceDialect::Alto | SourceDialect::Hocr => SourceType::Ocr,
        })
    }
}

/// What the orchestrator needs to know about a canvas.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanvasMetadata {
    pub width: u32,
    pub height: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_association: Option<TextAssociation>,
}

impl CanvasMetadata {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            text_association: None,
        }
    }

    pub fn with_text(mut self, association: TextAssociation) -> Self {
        self.text_association = Some(association);
        self
    }

    pub fn size(&self) -> CanvasSize {
        CanvasSize::new(self.width, self.height)
    }

    /// Reads a IIIF canvas (Presentation v2 or v3).
    ///
    /// An OCR document linked through `seeAlso` wins; otherwise the first
    /// annotation list in `otherContent` (v2) or `annotations` (v3) is used.
    pub fn from_iiif_canvas(canvas: &Value) -> Self {
        let dimension = |key: &str| {
            canvas
                .get(key)
                .and_then(Value::as_u64)
                .and_then(|value| u32::try_from(value).ok())
                .unwrap_or(0)
        };

        let text_association = see_also_ocr(canvas).or_else(|| annotation_list(canvas));

        Self {
            width: dimension("width"),
            height: dimension("height"),
            text_association,
        }
    }
}

/// The id of a IIIF canvas (`@id` or `id`).
pub fn iiif_canvas_id(canvas: &Value) -> Option<CanvasId> {
    canvas
        .get("@id")
        .or_else(|| canvas.get("id"))
        .and_then(Value::as_str)
        .map(CanvasId::new)
}

fn see_also_ocr(canvas: &Value) -> Option<TextAssociation> {
    one_or_many(canvas.get("seeAlso")?)
        .into_iter()
        .filter_map(|link| {
            let uri = link.get("@id").or_else(|| link.get("id"))?.as_str()?;
            let mut association = TextAssociation::new(uri);
            association.media_type = link.get("format").and_then(Value::as_str).map(str::to_string);
            association.profile = link.get("profile").and_then(first_str).map(str::to_string);
            Some(association)
        })
        .find(|association| association.source_type() == Some(SourceType::Ocr))
}

fn annotation_list(canvas: &Value) -> Option<TextAssociation> {
    let lists = canvas
        .get("otherContent")
        .or_else(|| canvas.get("annotations"))?;
    one_or_many(lists).into_iter().find_map(|list| {
        let uri = match list {
            Value::String(uri) => uri.as_str(),
            _ => list.get("@id").or_else(|| list.get("id"))?.as_str()?,
        };
        Some(TextAssociation::new(uri).with_media_type("application/ld+json"))
    })
}

fn one_or_many(value: &Value) -> Vec<&Value> {
    match value {
        Value::Array(items) => items.iter().collect(),
        Value::Null => Vec::new(),
        other => vec![other],
    }
}

fn first_str(value: &Value) -> Option<&str> {
    match value {
        Value::String(raw) => Some(raw.as_str()),
        Value::Array(items) => items.iter().find_map(Value::as_str),
        _ => None,
    }
}

/// Canvas metadata provided by the host viewer.
pub trait CanvasCatalog: Send + Sync {
    /// Metadata of a canvas shown in `window`.
    fn canvas(&self, window: &WindowId, id: &CanvasId) -> Option<CanvasMetadata>;

    /// Canvases currently visible in `window`, in display order.
    fn visible_canvases(&self, window: &WindowId) -> Vec<CanvasId>;

    /// Declared size of a canvas, whichever window shows it.
    fn canvas_size(&self, _id: &CanvasId) -> Option<CanvasSize> {
        None
    }
}

/// In-memory [`CanvasCatalog`].
#[derive(Debug, Default)]
pub struct StaticCatalog {
    canvases: RwLock<HashMap<CanvasId, CanvasMetadata>>,
    visible: RwLock<HashMap<WindowId, Vec<CanvasId>>>,
}

impl StaticCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_canvas(&self, id: impl Into<CanvasId>, metadata: CanvasMetadata) {
        self.canvases.write().insert(id.into(), metadata);
    }

    pub fn set_visible(&self, window: impl Into<WindowId>, ids: Vec<CanvasId>) {
        self.visible.write().insert(window.into(), ids);
    }

    /// Registers every canvas of a IIIF manifest (v2 `sequences[].canvases`
    /// or v3 `items`) and returns their ids in manifest order.
    pub fn insert_manifest(&self, manifest: &Value) -> Vec<CanvasId> {
        let v2 = manifest
            .get("sequences")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(|sequence| sequence.get("canvases").and_then(Value::as_array))
            .flatten();
        let v3 = manifest
            .get("items")
            .and_then(Value::as_array)
            .into_iter()
            .flatten();

        let mut ids = Vec::new();
        let mut canvases = self.canvases.write();
        for canvas in v2.chain(v3) {
            if let Some(id) = iiif_canvas_id(canvas) {
                canvases.insert(id.clone(), CanvasMetadata::from_iiif_canvas(canvas));
                ids.push(id);
            }
        }
        ids
    }
}

impl CanvasCatalog for StaticCatalog {
    fn canvas(&self, _window: &WindowId, id: &CanvasId) -> Option<CanvasMetadata> {
        self.canvases.read().get(id).cloned()
    }

    fn visible_canvases(&self, window: &WindowId) -> Vec<CanvasId> {
        self.visible.read().get(window).cloned().unwrap_or_default()
    }

    fn canvas_size(&self, id: &CanvasId) -> Option<CanvasSize> {
        self.canvases.read().get(id).map(CanvasMetadata::size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn see_also_alto_is_an_ocr_source() {
        let canvas = json!({
            "@id": "https://example.org/canvas/1",
            "width": 2000,
            "height": 3000,
            "seeAlso": [
                { "@id": "https://example.org/meta.json", "format": "application/json" },
                {
                    "@id": "https://example.org/alto/1.xml",
                    "format": "application/xml+alto",
                    "profile": "http://www.loc.gov/standards/alto/ns-v3#"
                }
            ],
            "otherContent": [{ "@id": "https://example.org/list/1" }]
        });

        let metadata = CanvasMetadata::from_iiif_canvas(&canvas);
        assert_eq!(metadata.size(), CanvasSize::new(2000, 3000));
        let association = metadata.text_association.unwrap();
        assert_eq!(association.uri, "https://example.org/alto/1.xml");
        assert_eq!(association.source_type(), Some(SourceType::Ocr));
    }

    #[test]
    fn annotation_lists_are_the_fallback() {
        let canvas = json!({
            "id": "https://example.org/canvas/1",
            "width": 10,
            "height": 20,
            "annotations": [{ "id": "https://example.org/page/1", "type": "AnnotationPage" }]
        });
        let association = CanvasMetadata::from_iiif_canvas(&canvas)
            .text_association
            .unwrap();
        assert_eq!(association.uri, "https://example.org/page/1");
        assert_eq!(association.source_type(), Some(SourceType::Annos));
    }

    #[test]
    fn unrecognized_formats_are_ignored() {
        let association = TextAssociation::new("x").with_media_type("text/plain");
        assert_eq!(association.source_type(), None);

        let hocr = TextAssociation::new("x")
            .with_media_type("text/html")
            .with_profile("http://kba.cloud/hocr-spec/1.2");
        assert_eq!(hocr.source_type(), Some(SourceType::Ocr));
    }

    #[test]
    fn manifest_canvases_are_registered() {
        let manifest = json!({
            "sequences": [{ "canvases": [
                { "@id": "c1", "width": 1, "height": 1 },
                { "@id": "c2", "width": 2, "height": 2 }
            ]}]
        });
        let catalog = StaticCatalog::new();
        let ids = catalog.insert_manifest(&manifest);
        assert_eq!(ids, vec![CanvasId::new("c1"), CanvasId::new("c2")]);

        let window = WindowId::new("w");
        catalog.set_visible(window.clone(), ids);
        assert_eq!(catalog.visible_canvases(&window).len(), 2);
        assert_eq!(
            catalog.canvas(&window, &CanvasId::new("c2")).unwrap().size(),
            CanvasSize::new(2, 2)
        );
    }
}
