//! Events exchanged with the host viewer.

use serde::{Deserialize, Serialize};

use super::config::TextOverlayUpdate;
use crate::cache::SourceType;
use crate::ir::{CanvasId, CanvasSize, ParsedText, WindowId};

/// Outbound notifications about canvas text.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TextEvent {
    /// A text source was found for a canvas.
    Discovered {
        target_id: CanvasId,
        source_uri: String,
    },
    /// A fetch was issued.
    Requested {
        target_id: CanvasId,
        source_uri: String,
        canvas_size: CanvasSize,
    },
    /// Text was fetched and parsed.
    Received {
        target_id: CanvasId,
        source_uri: String,
        source_type: SourceType,
        parsed_text: ParsedText,
    },
    /// Fetching or parsing failed.
    ReceiveFailed {
        target_id: CanvasId,
        source_uri: String,
        error: String,
    },
}

impl TextEvent {
    /// The canvas the event is about.
    pub fn target_id(&self) -> &CanvasId {
        match self {
            TextEvent::Discovered { target_id, .. }
            | TextEvent::Requested { target_id, .. }
            | TextEvent::Received { target_id, .. }
            | TextEvent::ReceiveFailed { target_id, .. } => target_id,
        }
    }

    /// Short event name, as used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            TextEvent::Discovered { .. } => "discovered",
            TextEvent::Requested { .. } => "requested",
            TextEvent::Received { .. } => "received",
            TextEvent::ReceiveFailed { .. } => "receive_failed",
        }
    }
}

/// Inbound requests from the host viewer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ViewerEvent {
    /// The set of visible canvases changed.
    DiscoverRequest {
        visible_canvas_ids: Vec<CanvasId>,
        window_id: WindowId,
    },
    /// A window's configuration changed.
    ConfigChanged {
        window_id: WindowId,
        #[serde(default)]
        payload: ConfigPayload,
    },
}

/// Payload of [`ViewerEvent::ConfigChanged`]. Only the text overlay part is
/// of interest; other keys are ignored.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigPayload {
    #[serde(
        default,
        alias = "textOverlay",
        skip_serializing_if = "Option::is_none"
    )]
    pub text_overlay: Option<TextOverlayUpdate>,
}
