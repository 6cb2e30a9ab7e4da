//! Inspection helpers for ingested collections: chunk lengths, term lookup and
//! a running-text classifier.

use crate::store::StoredPoint;
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

/// Length statistics over the chunks of a collection.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ChunkLengthStats {
    pub count: usize,
    pub min: usize,
    pub max: usize,
    pub average: f64,
    /// Chunks shorter than `short_threshold` characters.
    pub short: usize,
    pub short_threshold: usize,
}

impl ChunkLengthStats {
    /// Stats over character lengths; `None` when there is nothing to measure.
    pub fn from_texts<'a>(
        texts: impl IntoIterator<Item = &'a str>,
        short_threshold: usize,
    ) -> Option<Self> {
        let lengths: Vec<usize> = texts.into_iter().map(|t| t.chars().count()).collect();
        let min = *lengths.iter().min()?;
        let max = *lengths.iter().max()?;

        Some(Self {
            count: lengths.len(),
            min,
            max,
            average: lengths.iter().sum::<usize>() as f64 / lengths.len() as f64,
            short: lengths.iter().filter(|&&l| l < short_threshold).count(),
            short_threshold,
        })
    }

    pub fn print_summary(&self) {
        println!("Chunks with text:  {}", self.count);
        println!("Min length:        {}", self.min);
        println!("Max length:        {}", self.max);
        println!("Average length:    {:.1}", self.average);
        println!("Below {} chars:    {}", self.short_threshold, self.short);
    }
}

/// Texts of the points that have any.
pub fn point_texts(points: &[StoredPoint]) -> Vec<&str> {
    points.iter().filter_map(|p| p.text()).collect()
}

/// Points whose text contains every term, ignoring case.
pub fn find_with_terms<'a>(points: &'a [StoredPoint], terms: &[String]) -> Vec<&'a StoredPoint> {
    let terms: Vec<String> = terms.iter().map(|t| t.to_lowercase()).collect();
    points
        .iter()
        .filter(|p| {
            let text = p.text().unwrap_or_default().to_lowercase();
            terms.iter().all(|term| text.contains(term.as_str()))
        })
        .collect()
}

static FIGURE_OR_TABLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(figure|figur|table|tabell|diagram)\b").expect("valid figure pattern")
});

static BULLET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\s*([-•*]|(\d+[.)]))\s+").expect("valid bullet pattern")
});

/// Whether a chunk reads as continuous prose rather than a table, figure
/// residue or list.
///
/// Rejects text under 200 characters, text with many short lines or a high
/// line density, digit-heavy text, lists, figure/table mentions and text with
/// fewer than six sentence punctuation marks.
pub fn is_running_text(text: &str) -> bool {
    let t = text.trim();
    let n_chars = t.chars().count();
    if n_chars < 200 {
        return false;
    }

    let lines: Vec<&str> = t.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
    if lines.is_empty() {
        return false;
    }

    let n_lines = lines.len() as f64;
    let avg_line_len = lines.iter().map(|l| l.chars().count()).sum::<usize>() as f64 / n_lines;
    let short_line_ratio = lines.iter().filter(|l| l.chars().count() < 25).count() as f64 / n_lines;
    let newline_density = n_lines / (n_chars as f64 / 80.0).max(1.0);

    if short_line_ratio > 0.35 || avg_line_len < 40.0 || newline_density > 2.2 {
        return false;
    }

    let digit_ratio = t.chars().filter(|c| c.is_ascii_digit()).count() as f64 / n_chars as f64;
    if digit_ratio > 0.12 || t.matches('%').count() > 6 {
        return false;
    }

    if BULLET.is_match(t) || FIGURE_OR_TABLE.is_match(t) {
        return false;
    }

    t.chars().filter(|c| matches!(c, '.' | ',' | ';' | ':')).count() >= 6
}
