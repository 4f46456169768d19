//! Resolution of externally referenced annotation content.
//!
//! IIIF annotations may point at their text instead of embedding it:
//!
//! ```json
//! { "resource": { "@id": "https://example.org/page1.txt#char=120,14" } }
//! ```
//!
//! [`resolve_resources`] fetches every distinct referenced document once,
//! concurrently, and rewrites the references into inline form so the
//! annotation parser only ever sees embedded text. References that cannot be
//! resolved are logged and left as they were.

use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

use futures::future::join_all;
use regex::Regex;
use serde_json::{Map, Value};
use tracing::{debug, warn};
use url::Url;

use crate::error::TextLayerError;
use crate::fetch::Fetcher;
use crate::ir::io_iiif_annotations::is_painting;

/// Keys that hold inline content.
const CONTENT_KEYS: [&str; 3] = ["chars", "value", "content"];

/// How an annotation's content is provided.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResourceRef {
    /// Content is embedded in the annotation.
    Inline,
    /// Content lives in another document.
    External(ExternalRef),
}

/// A reference to content in another document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExternalRef {
    /// The reference id as written, fragment included.
    pub id: String,
    /// The document to fetch (fragment stripped).
    pub document: String,
    /// Character range selected by a `#char=` fragment.
    pub range: Option<CharRange>,
}

/// A `#char=start,length` selection, counted in characters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CharRange {
    pub start: usize,
    pub length: usize,
}

impl CharRange {
    /// Parses a fragment (without `#`). Fragments that are not `char=`
    /// selectors yield `Ok(None)`.
    pub fn parse_fragment(fragment: &str) -> Result<Option<Self>, String> {
        static CHAR_RE: OnceLock<Regex> = OnceLock::new();
        let char_re = CHAR_RE
            .get_or_init(|| Regex::new(r"^\s*(\d+)\s*,\s*(\d+)\s*$").expect("valid char regex"));

        let Some(spec) = fragment.strip_prefix("char=") else {
            return Ok(None);
        };
        let caps = char_re
            .captures(spec)
            .ok_or_else(|| format!("malformed char fragment '{fragment}'"))?;
        let start = caps[1]
            .parse()
            .map_err(|_| format!("char offset out of range in '{fragment}'"))?;
        let length = caps[2]
            .parse()
            .map_err(|_| format!("char length out of range in '{fragment}'"))?;
        Ok(Some(Self { start, length }))
    }

    /// Characters `[start, start + length)` of `text`, clamped to its bounds.
    pub fn slice(&self, text: &str) -> String {
        text.chars().skip(self.start).take(self.length).collect()
    }
}

impl ResourceRef {
    /// Classifies a content object.
    ///
    /// A reference is external when it has an `@id`/`id` and no inline
    /// content. Fails when the id carries a malformed `#char=` fragment.
    pub fn classify(content: &Value) -> Result<Self, TextLayerError> {
        let has_inline = CONTENT_KEYS.iter().any(|key| content.get(key).is_some());
        let id = content
            .get("@id")
            .or_else(|| content.get("id"))
            .and_then(Value::as_str);
        let Some(id) = id.filter(|_| !has_inline) else {
            return Ok(Self::Inline);
        };

        let (document, fragment) = split_fragment(id);
        let range = match fragment {
            Some(fragment) => CharRange::parse_fragment(fragment)
                .map_err(|message| TextLayerError::unresolvable(id, message))?,
            None => None,
        };

        Ok(Self::External(ExternalRef {
            id: id.to_string(),
            document,
            range,
        }))
    }
}

/// Splits an id into the fetchable document and its fragment.
fn split_fragment(id: &str) -> (String, Option<&str>) {
    let fragment = id.split_once('#').map(|(_, fragment)| fragment);
    let document = match Url::parse(id) {
        Ok(mut url) => {
            url.set_fragment(None);
            url.to_string()
        }
        Err(_) => id.split('#').next().unwrap_or(id).to_string(),
    };
    (document, fragment)
}

/// What a fetched document contributed.
#[derive(Debug)]
struct Fetched {
    /// The parsed document when it was a JSON object.
    json: Option<Value>,
    /// Its text content.
    text: Option<String>,
}

/// Resolves every external content reference in an annotation list.
///
/// `list` is a v2 list (`resources`), a v3 page (`items`) or a bare array.
/// Each distinct document is fetched once. Failures are logged and leave
/// the affected references unchanged.
pub async fn resolve_resources(mut list: Value, fetcher: &dyn Fetcher) -> Value {
    let mut documents = Vec::new();
    let mut seen = HashSet::new();
    for_each_content(&mut list, |content| match ResourceRef::classify(content) {
        Ok(ResourceRef::External(external)) => {
            if seen.insert(external.document.clone()) {
                documents.push(external.document);
            }
        }
        Ok(ResourceRef::Inline) => {}
        Err(err) => warn!(error = %err, "leaving external resource unresolved"),
    });

    if documents.is_empty() {
        return list;
    }
    debug!(count = documents.len(), "fetching external annotation resources");

    let results = join_all(documents.iter().map(|document| fetcher.fetch(document))).await;
    let fetched: HashMap<String, Result<Fetched, TextLayerError>> = documents
        .into_iter()
        .zip(results)
        .map(|(document, result)| {
            let fetched = result.map(|resource| into_fetched(&resource.body));
            (document, fetched)
        })
        .collect();

    for_each_content(&mut list, |content| {
        let Ok(ResourceRef::External(external)) = ResourceRef::classify(content) else {
            return;
        };
        match fetched.get(&external.document) {
            Some(Ok(document)) => {
                if let Err(err) = apply(content, &external, document) {
                    warn!(error = %err, "leaving external resource unresolved");
                }
            }
            Some(Err(err)) => {
                let err = TextLayerError::unresolvable(&external.id, err.to_string());
                warn!(error = %err, "leaving external resource unresolved");
            }
            None => {}
        }
    });

    list
}

fn into_fetched(body: &str) -> Fetched {
    match serde_json::from_str::<Value>(body) {
        Ok(json @ Value::Object(_)) => {
            let text = inline_text(&json);
            Fetched {
                json: Some(json),
                text,
            }
        }
        _ => Fetched {
            json: None,
            text: Some(body.to_string()),
        },
    }
}

fn inline_text(value: &Value) -> Option<String> {
    CONTENT_KEYS
        .iter()
        .find_map(|key| value.get(key).and_then(Value::as_str))
        .map(str::to_string)
}

/// Rewrites one external reference in place.
fn apply(content: &mut Value, external: &ExternalRef, fetched: &Fetched) -> Result<(), TextLayerError> {
    let text = fetched
        .text
        .as_deref()
        .ok_or_else(|| TextLayerError::unresolvable(&external.id, "fetched resource has no text"))?;

    match external.range {
        Some(range) => {
            if let Value::Object(map) = content {
                map.insert("value".to_string(), Value::String(range.slice(text)));
            }
        }
        None => {
            *content = match &fetched.json {
                Some(json) => json.clone(),
                None => {
                    let id_key = if content.get("@id").is_some() { "@id" } else { "id" };
                    let mut map = Map::new();
                    map.insert(id_key.to_string(), Value::String(external.id.clone()));
                    map.insert("value".to_string(), Value::String(text.to_string()));
                    Value::Object(map)
                }
            };
        }
    }
    Ok(())
}

/// Calls `f` on every content object (`resource`/`body`, single or array)
/// of every annotation in the list. Painting annotations are skipped.
fn for_each_content(list: &mut Value, mut f: impl FnMut(&mut Value)) {
    let annotations = match list {
        Value::Array(items) => items,
        Value::Object(map) => {
            let key = if map.contains_key("resources") { "resources" } else { "items" };
            match map.get_mut(key) {
                Some(Value::Array(items)) => items,
                _ => return,
            }
        }
        _ => return,
    };

    for anno in annotations.iter_mut() {
        if is_painting(anno) {
            continue;
        }
        let Value::Object(anno) = anno else { continue };
        let key = if anno.contains_key("resource") { "resource" } else { "body" };
        match anno.get_mut(key) {
            Some(Value::Array(items)) => items.iter_mut().filter(|item| item.is_object()).for_each(&mut f),
            Some(content @ Value::Object(_)) => f(content),
            _ => {}
        }
    }
}
