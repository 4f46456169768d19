//! The normalized text model every parser produces.
//!
//! Whatever dialect a source was written in, a renderer only ever sees a
//! [`ParsedText`]: lines in reading order, optionally split into words, all
//! positioned in canvas pixel space.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::rect::Rect;
use super::space::Pixel;

/// Pixel dimensions of a canvas.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CanvasSize {
    pub width: u32,
    pub height: u32,
}

impl CanvasSize {
    /// Creates a new canvas size.
    #[inline]
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// True when either dimension is zero, i.e. the size is unknown.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// A single word with its position and text.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Word {
    /// Position on the canvas.
    pub rect: Rect<Pixel>,

    /// The word's text.
    pub text: String,

    /// Recognition confidence in `0.0..=1.0`, when the source records one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,

    /// Source-defined style hints (e.g. "font-family", "font-size").
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub style: BTreeMap<String, String>,
}

impl Word {
    /// Creates a new word without confidence or style hints.
    pub fn new(rect: Rect<Pixel>, text: impl Into<String>) -> Self {
        Self {
            rect,
            text: text.into(),
            confidence: None,
            style: BTreeMap::new(),
        }
    }

    /// Adds a confidence score to the word.
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    /// Adds a style hint to the word.
    pub fn with_style(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.style.insert(key.into(), value.into());
        self
    }
}

/// A line of text.
///
/// `words` is in reading order and may be empty when the source does not
/// split lines into words; `text` always holds the line's full text.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Line {
    /// Position on the canvas.
    pub rect: Rect<Pixel>,

    /// The full text of the line.
    pub text: String,

    /// Words in reading order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub words: Vec<Word>,

    /// Source-defined style hints applying to the whole line.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub style: BTreeMap<String, String>,
}

impl Line {
    /// Creates a line that is not decomposed into words.
    pub fn text_only(rect: Rect<Pixel>, text: impl Into<String>) -> Self {
        Self {
            rect,
            text: text.into(),
            words: Vec::new(),
            style: BTreeMap::new(),
        }
    }

    /// Creates a line from its words, deriving the text by joining them with spaces.
    pub fn from_words(rect: Rect<Pixel>, words: Vec<Word>) -> Self {
        let text = join_words(&words);
        Self {
            rect,
            text,
            words,
            style: BTreeMap::new(),
        }
    }

    /// Appends a word and refreshes the line text when it was derived from words.
    pub fn push_word(&mut self, word: Word) {
        let derived = self.text.is_empty() || self.text == join_words(&self.words);
        self.words.push(word);
        if derived {
            self.text = join_words(&self.words);
        }
    }
}

fn join_words(words: &[Word]) -> String {
    words
        .iter()
        .map(|word| word.text.trim())
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// The pipeline's output for one canvas.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedText {
    /// Width of the pixel space the geometry was normalized against.
    pub width: u32,

    /// Height of the pixel space the geometry was normalized against.
    pub height: u32,

    /// Lines in reading order.
    pub lines: Vec<Line>,
}

impl ParsedText {
    /// Builds a `ParsedText`, clipping every rectangle into `[0,width] × [0,height]`.
    ///
    /// All parsers finish through here, so the clipping invariant holds for
    /// any output regardless of what the source declared.
    pub fn clipped(extent: CanvasSize, mut lines: Vec<Line>) -> Self {
        let (max_w, max_h) = (f64::from(extent.width), f64::from(extent.height));
        for line in &mut lines {
            line.rect = line.rect.clip_to(max_w, max_h);
            for word in &mut line.words {
                word.rect = word.rect.clip_to(max_w, max_h);
            }
        }
        Self {
            width: extent.width,
            height: extent.height,
            lines,
        }
    }

    /// Plain text of the page, one line per row.
    pub fn plain_text(&self) -> String {
        self.lines
            .iter()
            .map(|line| line.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Total number of words across all lines.
    pub fn word_count(&self) -> usize {
        self.lines.iter().map(|line| line.words.len()).sum()
    }
}
