//! CSV readers for the dictionary, transcripts and session cutoffs.
//!
//! Readers take any `io::Read` so they can be fed from memory in tests; the
//! path-based wrappers attach the file name to errors. The `origin` path only
//! labels errors.

use crate::core::utterance::{parse_seconds, RawUtterance};
use crate::core::windowing::SessionBounds;
use crate::io::SourceError;
use crate::lexicon::DictionaryEntry;
use csv::StringRecord;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Header names of the dictionary columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DictionaryColumns {
    pub word: String,
    pub category: String,
}

impl Default for DictionaryColumns {
    fn default() -> Self {
        Self {
            word: "words".to_string(),
            category: "diction_code".to_string(),
        }
    }
}

/// Transcript columns, in `RawUtterance` field order.
const TRANSCRIPT_COLUMNS: [&str; 4] = ["speaker", "start", "end", "text"];

fn csv_reader<R: Read>(reader: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(reader)
}

fn column_index(headers: &StringRecord, column: &str, origin: &Path) -> Result<usize, SourceError> {
    headers
        .iter()
        .position(|h| h.eq_ignore_ascii_case(column))
        .ok_or_else(|| SourceError::MissingColumn {
            path: origin.to_path_buf(),
            column: column.to_string(),
        })
}

fn field(record: &StringRecord, index: usize) -> Option<String> {
    record
        .get(index)
        .filter(|v| !v.trim().is_empty())
        .map(str::to_string)
}

fn open(path: &Path) -> Result<File, SourceError> {
    File::open(path).map_err(|e| SourceError::io(path, e))
}

/// Read `(word, category)` pairs in file order.
///
/// Unreadable records are fatal here: the dictionary defines the output
/// columns, so a partial dictionary would silently change results.
pub fn dictionary_from_reader<R: Read>(
    reader: R,
    columns: &DictionaryColumns,
    origin: &Path,
) -> Result<Vec<DictionaryEntry>, SourceError> {
    let mut rdr = csv_reader(reader);
    let headers = rdr.headers().map_err(|e| SourceError::csv(origin, e))?.clone();
    let word_idx = column_index(&headers, &columns.word, origin)?;
    let category_idx = column_index(&headers, &columns.category, origin)?;

    let mut entries = Vec::new();
    for record in rdr.records() {
        let record = record.map_err(|e| SourceError::csv(origin, e))?;
        entries.push(DictionaryEntry {
            word: field(&record, word_idx).unwrap_or_default(),
            category: field(&record, category_idx).unwrap_or_default(),
        });
    }
    Ok(entries)
}

/// Read a dictionary CSV file.
pub fn read_dictionary(
    path: &Path,
    columns: &DictionaryColumns,
) -> Result<Vec<DictionaryEntry>, SourceError> {
    dictionary_from_reader(open(path)?, columns, path)
}

/// Read transcript rows.
///
/// Extra columns are ignored. A record the CSV parser rejects becomes an
/// empty row, which the utterance filter then drops.
pub fn transcript_from_reader<R: Read>(
    reader: R,
    origin: &Path,
) -> Result<Vec<RawUtterance>, SourceError> {
    let mut rdr = csv_reader(reader);
    let headers = rdr.headers().map_err(|e| SourceError::csv(origin, e))?.clone();
    let [speaker, start, end, text] = TRANSCRIPT_COLUMNS;
    let speaker_idx = column_index(&headers, speaker, origin)?;
    let start_idx = column_index(&headers, start, origin)?;
    let end_idx = column_index(&headers, end, origin)?;
    let text_idx = column_index(&headers, text, origin)?;

    let mut rows = Vec::new();
    for (index, record) in rdr.records().enumerate() {
        let row = match record {
            Ok(record) => RawUtterance {
                speaker: field(&record, speaker_idx),
                start: field(&record, start_idx),
                end: field(&record, end_idx),
                text: field(&record, text_idx),
            },
            Err(e) => {
                tracing::warn!(path = ?origin, index, error = %e, "unreadable transcript record");
                RawUtterance::default()
            }
        };
        rows.push(row);
    }
    Ok(rows)
}

/// Read a transcript CSV file.
pub fn read_transcript(path: &Path) -> Result<Vec<RawUtterance>, SourceError> {
    transcript_from_reader(open(path)?, path)
}

/// Read per-session cutoffs from `session,start,end` rows.
///
/// Rows with unparseable times are skipped with a warning; the affected
/// session then has no bounds and fails on its own if it needs them.
pub fn session_bounds_from_reader<R: Read>(
    reader: R,
    origin: &Path,
) -> Result<HashMap<String, SessionBounds>, SourceError> {
    let mut rdr = csv_reader(reader);
    let headers = rdr.headers().map_err(|e| SourceError::csv(origin, e))?.clone();
    let session_idx = column_index(&headers, "session", origin)?;
    let start_idx = column_index(&headers, "start", origin)?;
    let end_idx = column_index(&headers, "end", origin)?;

    let mut bounds = HashMap::new();
    for (index, record) in rdr.records().enumerate() {
        let record = record.map_err(|e| SourceError::csv(origin, e))?;
        let Some(session) = field(&record, session_idx) else {
            tracing::warn!(path = ?origin, index, "cutoff row without session key");
            continue;
        };
        let start = field(&record, start_idx).as_deref().and_then(parse_seconds);
        let end = field(&record, end_idx).as_deref().and_then(parse_seconds);

        match (start, end) {
            (Some(start), Some(end)) => {
                bounds.insert(session.trim().to_string(), SessionBounds::new(start, end));
            }
            _ => tracing::warn!(
                path = ?origin,
                index,
                session = %session,
                "cutoff row with invalid times"
            ),
        }
    }
    Ok(bounds)
}

/// Read a session cutoffs CSV file.
pub fn read_session_bounds(path: &Path) -> Result<HashMap<String, SessionBounds>, SourceError> {
    session_bounds_from_reader(open(path)?, path)
}
