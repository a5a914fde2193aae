//! Corpus file I/O
//!
//! The corpus is newline-delimited JSON: one `CorpusRecord` per line.
//! Ingestion writes it; retrieval scans it to map match ids back to text.
//! Records are addressable under two schemes: the explicit `id` field when
//! present, and always the positional fallback id `"{source}-{ordinal}"`.

use crate::errors::{AppError, Result};
use crate::models::CorpusRecord;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use tracing::{debug, info, warn};

/// Write records to a corpus file, one JSON object per line
pub fn write_corpus(path: &Path, records: &[CorpusRecord]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    for record in records {
        serde_json::to_writer(&mut writer, record)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    info!(path = %path.display(), records = records.len(), "Corpus written");
    Ok(())
}

/// Read all records from a corpus file, skipping malformed lines
pub fn read_corpus(path: &Path) -> Result<Vec<CorpusRecord>> {
    Ok(read_corpus_slots(path)?
        .into_iter()
        .map(|(_, record)| record)
        .collect())
}

/// Read records paired with their positional slot ordinal
///
/// Malformed lines are skipped with a warning but still consume a slot, so
/// fallback ids derived from these ordinals stay aligned with whatever the
/// vector index already holds for this file.
pub fn read_corpus_slots(path: &Path) -> Result<Vec<(usize, CorpusRecord)>> {
    if !path.exists() {
        return Err(AppError::CorpusMissing {
            path: path.display().to_string(),
        });
    }

    let file = File::open(path)?;
    let reader = BufReader::new(file);

    let mut slots = Vec::new();
    let mut ordinal = 0usize;
    for (line_num, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<CorpusRecord>(&line) {
            Ok(record) => slots.push((ordinal, record)),
            Err(e) => {
                warn!(line = line_num, error = %e, "Skipping malformed corpus line");
            }
        }
        ordinal += 1; // the slot is occupied either way
    }
    Ok(slots)
}

/// Build the id→text map for a corpus file
///
/// Every record is registered under its positional fallback id, and also
/// under its explicit id when one is present, so both addressing schemes
/// resolve to the same text.
pub fn load_id_map(path: &Path, source: &str) -> Result<HashMap<String, String>> {
    let slots = read_corpus_slots(path)?;

    let mut map = HashMap::new();
    for (ordinal, record) in slots {
        let fallback = CorpusRecord::fallback_id(source, ordinal);
        if let Some(id) = &record.id {
            map.insert(id.clone(), record.text.clone());
        }
        map.insert(fallback, record.text);
    }

    info!(path = %path.display(), entries = map.len(), "Corpus id map loaded");
    debug!(sample = ?map.keys().take(5).collect::<Vec<_>>(), "Sample corpus ids");
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Metadata;
    use std::io::Write as _;
    use tempfile::NamedTempFile;

    fn record(id: Option<&str>, text: &str) -> CorpusRecord {
        CorpusRecord {
            id: id.map(String::from),
            text: text.to_string(),
            char_length: text.len(),
            token_estimate: text.split_whitespace().count(),
            metadata: Metadata::new(),
        }
    }

    #[test]
    fn test_write_then_map_registers_both_schemes() {
        let file = NamedTempFile::new().unwrap();
        let records = vec![
            record(Some("zoning-custom"), "Setback rules"),
            record(None, "Height limits"),
        ];
        write_corpus(file.path(), &records).unwrap();

        let map = load_id_map(file.path(), "zoning").unwrap();
        assert_eq!(map.get("zoning-custom").unwrap(), "Setback rules");
        assert_eq!(map.get("zoning-0").unwrap(), "Setback rules");
        assert_eq!(map.get("zoning-1").unwrap(), "Height limits");
    }

    #[test]
    fn test_malformed_lines_are_skipped_not_fatal() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"text":"ok one","char_length":6,"token_estimate":2}}"#).unwrap();
        writeln!(file, "this is not json").unwrap();
        writeln!(file, r#"{{"text":"ok two","char_length":6,"token_estimate":2}}"#).unwrap();

        let map = load_id_map(file.path(), "zoning").unwrap();
        assert_eq!(map.get("zoning-0").unwrap(), "ok one");
        // ordinal 1 was the malformed line; the record after it keeps slot 2
        assert!(!map.contains_key("zoning-1"));
        assert_eq!(map.get("zoning-2").unwrap(), "ok two");
    }

    #[test]
    fn test_slots_survive_malformed_lines() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"text":"ok one","char_length":6,"token_estimate":2}}"#).unwrap();
        writeln!(file, "this is not json").unwrap();
        writeln!(file, r#"{{"text":"ok two","char_length":6,"token_estimate":2}}"#).unwrap();

        let slots = read_corpus_slots(file.path()).unwrap();
        assert_eq!(slots.len(), 2);
        assert_eq!(slots[0].0, 0);
        assert_eq!(slots[1].0, 2);
        assert_eq!(slots[1].1.text, "ok two");
    }

    #[test]
    fn test_missing_corpus_is_configuration_error() {
        let err = load_id_map(Path::new("/nonexistent/corpus.jsonl"), "zoning").unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_read_corpus_roundtrip() {
        let file = NamedTempFile::new().unwrap();
        let records = vec![record(None, "alpha"), record(None, "beta")];
        write_corpus(file.path(), &records).unwrap();

        let back = read_corpus(file.path()).unwrap();
        assert_eq!(back.len(), 2);
        assert_eq!(back[1].text, "beta");
    }
}
