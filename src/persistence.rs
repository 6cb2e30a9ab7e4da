//! Reading and writing the JSON files exchanged between stages.
//!
//! Every stage reads its inputs from and writes its outputs to pretty-printed
//! JSON files; non-ASCII text is written as-is.

use crate::error::{EvalError, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};

/// Save a value as pretty-printed JSON, creating parent directories.
pub fn save_json<T: Serialize + ?Sized>(value: &T, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| EvalError::io(parent, e))?;
        }
    }

    let data = serde_json::to_string_pretty(value)
        .map_err(|e| EvalError::Serialization(e.to_string()))?;

    fs::write(path, data).map_err(|e| EvalError::io(path, e))?;

    Ok(())
}

/// Load a JSON file into `T`.
pub fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    if !path.exists() {
        return Err(EvalError::FileNotFound(path.to_path_buf()));
    }

    let content = fs::read_to_string(path).map_err(|e| EvalError::io(path, e))?;

    serde_json::from_str(&content)
        .map_err(|e| EvalError::Serialization(format!("{}: {}", path.display(), e)))
}

/// Path of the per-k results file: `<dir>/<prefix>_k<k>.json`.
pub fn results_path_for_k(dir: &Path, prefix: &str, k: usize) -> PathBuf {
    dir.join(format!("{}_k{}.json", prefix, k))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use tempfile::TempDir;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Record {
        question_id: String,
        answer: String,
    }

    #[test]
    fn test_save_creates_parent_dirs() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/out/records.json");

        let records = vec![Record {
            question_id: "GT_001".to_string(),
            answer: "Bil".to_string(),
        }];
        save_json(&records, &path).unwrap();

        assert!(path.is_file());
        let loaded: Vec<Record> = load_json(&path).unwrap();
        assert_eq!(loaded, records);
    }

    #[test]
    fn test_non_ascii_written_verbatim() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sv.json");

        save_json(&vec!["resvaneundersökning"], &path).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("resvaneundersökning"));
    }

    #[test]
    fn test_load_nonexistent() {
        let result: Result<Vec<Record>> = load_json(Path::new("/nonexistent/records.json"));
        assert!(matches!(result, Err(EvalError::FileNotFound(_))));
    }

    #[test]
    fn test_load_malformed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, "[{").unwrap();

        let result: Result<Vec<Record>> = load_json(&path);
        assert!(matches!(result, Err(EvalError::Serialization(_))));
    }

    #[test]
    fn test_results_path_for_k() {
        let path = results_path_for_k(Path::new("data"), "results_clean", 10);
        assert_eq!(path, PathBuf::from("data/results_clean_k10.json"));
    }
}
