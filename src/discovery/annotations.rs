//! Turning an annotation list into canvas text.

use serde_json::Value;
use tracing::debug;

use crate::error::TextLayerError;
use crate::fetch::Fetcher;
use crate::ir::io_iiif_annotations::{parse_iiif_annotations, text_bearing_resources};
use crate::ir::{CanvasSize, ParsedText, SourceDialect};
use crate::resolve::resolve_resources;

/// Resolves external content, keeps the text-bearing annotations and
/// parses them.
pub async fn annotation_text(
    annotation_json: Value,
    fetcher: &dyn Fetcher,
    canvas: CanvasSize,
) -> Result<ParsedText, TextLayerError> {
    if !annotation_json.is_object() && !annotation_json.is_array() {
        return Err(TextLayerError::malformed(
            SourceDialect::IiifAnnotation,
            "expected an annotation list object or array",
        ));
    }

    let resolved = resolve_resources(annotation_json, fetcher).await;
    let annotations = text_bearing_resources(&resolved);
    debug!(count = annotations.len(), "text-bearing annotations");
    parse_iiif_annotations(&annotations, canvas)
}

/// Parses a fetched body as annotation JSON.
pub(crate) fn annotation_json(body: &str) -> Result<Value, TextLayerError> {
    serde_json::from_str(body).map_err(|source| {
        TextLayerError::malformed(SourceDialect::IiifAnnotation, format!("invalid JSON: {source}"))
    })
}
