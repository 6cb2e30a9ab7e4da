//! Agreement between human labels and the LLM judge.

use super::summary::JudgedRecord;
use crate::error::{EvalError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use tracing::warn;

/// One human label: question id and a 0/1 verdict.
#[derive(Debug, Clone, PartialEq)]
pub struct HumanLabel {
    pub question_id: String,
    pub label: i64,
}

fn parse_label(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    raw.parse::<i64>()
        .ok()
        .or_else(|| raw.parse::<f64>().ok().filter(|f| f.fract() == 0.0).map(|f| f as i64))
}

/// Read a human-label CSV: header row, question id in the first column and
/// the label in the second. Other columns are ignored.
pub fn load_human_labels(path: &Path) -> Result<Vec<HumanLabel>> {
    if !path.exists() {
        return Err(EvalError::FileNotFound(path.to_path_buf()));
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)?;

    let mut labels = Vec::new();
    for (idx, row) in reader.records().enumerate() {
        let row = row?;
        let question_id = row.get(0).unwrap_or("").trim().to_string();
        let raw_label = row.get(1).unwrap_or("");
        let label = parse_label(raw_label).ok_or_else(|| {
            EvalError::Csv(format!(
                "row {}: label '{}' for '{}' is not a number",
                idx + 1,
                raw_label,
                question_id
            ))
        })?;
        labels.push(HumanLabel { question_id, label });
    }

    Ok(labels)
}

/// Agreement statistics for one metric.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgreementReport {
    pub metric: String,
    pub samples: usize,
    /// Share of identical labels in percent.
    pub agreement_rate: f64,
    /// `None` when expected agreement is 1 and the kappa is undefined.
    pub kappa: Option<f64>,
}

impl AgreementReport {
    /// Print summary to stdout.
    pub fn print_summary(&self) {
        println!("Metric: {}", self.metric);
        println!("Number of samples: {}", self.samples);
        println!("Agreement Rate: {:.2}%", self.agreement_rate);
        match self.kappa {
            Some(kappa) => println!("Cohen's Kappa: {:.3}", kappa),
            None => println!("Cohen's Kappa: nan"),
        }
    }
}

/// Cohen's Kappa `(p_o - p_e) / (1 - p_e)` for two equal-length label vectors.
///
/// `p_e` sums, over every label seen in either vector, the product of the two
/// raters' marginal frequencies. Returns `None` for empty or mismatched input,
/// and when `p_e == 1` (both raters used one and the same label throughout).
pub fn cohens_kappa(a: &[i64], b: &[i64]) -> Option<f64> {
    if a.len() != b.len() || a.is_empty() {
        return None;
    }

    let n = a.len() as f64;
    let p_o = a.iter().zip(b).filter(|(x, y)| x == y).count() as f64 / n;

    let categories: BTreeSet<i64> = a.iter().chain(b).copied().collect();
    let p_e: f64 = categories
        .iter()
        .map(|cat| {
            let count_a = a.iter().filter(|&&x| x == *cat).count() as f64;
            let count_b = b.iter().filter(|&&y| y == *cat).count() as f64;
            (count_a / n) * (count_b / n)
        })
        .sum();

    if (1.0 - p_e).abs() < f64::EPSILON {
        return None;
    }
    Some((p_o - p_e) / (1.0 - p_e))
}

/// Interpret a Kappa score on the Landis and Koch scale.
pub fn interpret_kappa(kappa: f64) -> &'static str {
    if kappa < 0.0 {
        "Poor"
    } else if kappa < 0.20 {
        "Slight"
    } else if kappa < 0.40 {
        "Fair"
    } else if kappa < 0.60 {
        "Moderate"
    } else if kappa < 0.80 {
        "Substantial"
    } else {
        "Almost Perfect"
    }
}

fn judge_label(record: &JudgedRecord, metric: &str) -> Option<i64> {
    match record.get(metric)? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::Bool(b) => Some(i64::from(*b)),
        Value::String(s) => parse_label(s),
        _ => None,
    }
}

/// Inner-join human labels with judged records on question id and compare one
/// metric. Judged records with no value for the metric are left out.
pub fn compare(human: &[HumanLabel], judged: &[JudgedRecord], metric: &str) -> AgreementReport {
    let judge_labels: HashMap<&str, i64> = judged
        .iter()
        .filter_map(|r| {
            let id = r.get("question_id")?.as_str()?;
            match judge_label(r, metric) {
                Some(label) => Some((id, label)),
                None => {
                    warn!(question_id = id, metric, "no judge label, excluded from agreement");
                    None
                }
            }
        })
        .collect();

    let (human_labels, llm_labels): (Vec<i64>, Vec<i64>) = human
        .iter()
        .filter_map(|h| {
            judge_labels
                .get(h.question_id.as_str())
                .map(|llm| (h.label, *llm))
        })
        .unzip();

    let samples = human_labels.len();
    let agreement_rate = if samples == 0 {
        0.0
    } else {
        human_labels
            .iter()
            .zip(&llm_labels)
            .filter(|(h, l)| h == l)
            .count() as f64
            / samples as f64
            * 100.0
    };

    AgreementReport {
        metric: metric.to_string(),
        samples,
        agreement_rate,
        kappa: cohens_kappa(&human_labels, &llm_labels),
    }
}
