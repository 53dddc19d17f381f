use serde::{Deserialize, Serialize};

use crate::core::error::{MalformedWord, ReconcileError};
use crate::core::geometry::{Quad, Rect};

/// A single word detection from the OCR provider.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Word {
    pub text: String,
    pub quad: Quad,
    rect: Rect,
}

impl Word {
    /// Fails when the quad cannot produce a complete rectangle.
    pub fn new(text: impl Into<String>, quad: Quad) -> Result<Self, MalformedWord> {
        let rect = quad.bounding_rect()?;
        Ok(Self {
            text: text.into(),
            quad,
            rect,
        })
    }

    pub fn rect(&self) -> Rect {
        self.rect
    }
}

/// An ALTO `String` element.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AltoString {
    pub content: String,
    pub rect: Rect,
}

impl AltoString {
    pub fn from_word(word: &Word) -> Self {
        Self {
            content: word.text.clone(),
            rect: word.rect(),
        }
    }
}

/// Raw `HPOS`/`VPOS`/`WIDTH`/`HEIGHT` attribute text of a line.
///
/// Kept unparsed so the layout can be written back exactly as it was read.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct LineGeometry {
    pub hpos: Option<String>,
    pub vpos: Option<String>,
    pub width: Option<String>,
    pub height: Option<String>,
}

impl LineGeometry {
    pub fn new(hpos: &str, vpos: &str, width: &str, height: &str) -> Self {
        Self {
            hpos: Some(hpos.to_string()),
            vpos: Some(vpos.to_string()),
            width: Some(width.to_string()),
            height: Some(height.to_string()),
        }
    }
}

/// A pre-segmented ALTO `TextLine`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TextLine {
    pub id: Option<String>,
    /// 1-based position in the document.
    pub position: usize,
    pub geometry: LineGeometry,
    pub strings: Vec<AltoString>,
}

impl TextLine {
    pub fn label(&self) -> String {
        match &self.id {
            Some(id) => id.clone(),
            None => format!("line_{}", self.position),
        }
    }

    pub fn rect(&self) -> Result<Rect, ReconcileError> {
        let hpos = self.coord("HPOS", &self.geometry.hpos)?;
        let vpos = self.coord("VPOS", &self.geometry.vpos)?;
        let width = self.coord("WIDTH", &self.geometry.width)?;
        let height = self.coord("HEIGHT", &self.geometry.height)?;
        let x_max = hpos
            .checked_add(width)
            .ok_or_else(|| self.malformed("WIDTH", &self.geometry.width))?;
        let y_max = vpos
            .checked_add(height)
            .ok_or_else(|| self.malformed("HEIGHT", &self.geometry.height))?;
        Ok(Rect::new(hpos, vpos, x_max, y_max))
    }

    fn coord(&self, attribute: &'static str, raw: &Option<String>) -> Result<i64, ReconcileError> {
        raw.as_deref()
            .and_then(parse_coordinate)
            .ok_or_else(|| self.malformed(attribute, raw))
    }

    fn malformed(&self, attribute: &'static str, raw: &Option<String>) -> ReconcileError {
        ReconcileError::MalformedLayout {
            line: self.label(),
            attribute,
            value: raw.clone(),
        }
    }

    pub fn text(&self) -> String {
        self.strings
            .iter()
            .map(|s| s.content.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Parses an ALTO measurement such as `"1026"` or `"1026.7"`, truncating toward zero.
///
/// Values outside the `i64` range are rejected rather than clamped.
pub fn parse_coordinate(raw: &str) -> Option<i64> {
    // 2^63 is exact in f64; i64::MAX is not.
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    let value = raw.trim().parse::<f64>().ok()?.trunc();
    if value.is_finite() && (-LIMIT..LIMIT).contains(&value) {
        Some(value as i64)
    } else {
        None
    }
}

/// Outcome of one reconciled page.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReconcileSummary {
    pub lines: usize,
    pub filled_lines: usize,
    pub assigned_words: usize,
    pub orphan_words: usize,
}
