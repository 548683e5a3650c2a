//! Writers for session output tables.
//!
//! Layout for a session with file prefix `P` under an output directory:
//!
//! ```text
//! P_group_text_analysis.csv
//! P_category_summary.json
//! P_speaker_time_series/
//!     <speaker>_time_series.csv
//! ```

use crate::core::series::SeriesRow;
use crate::core::stats::{summarize, CategorySummary};
use crate::core::SessionOutput;
use crate::io::SourceError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Table output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Csv,
    /// Pretty JSON array of row objects
    Json,
    /// One JSON row object per line
    Jsonl,
}

impl OutputFormat {
    /// File extension for tables in this format.
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Json => "json",
            OutputFormat::Jsonl => "jsonl",
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "csv" => Ok(OutputFormat::Csv),
            "json" => Ok(OutputFormat::Json),
            "jsonl" => Ok(OutputFormat::Jsonl),
            other => Err(format!(
                "unknown output format '{other}' (expected csv, json or jsonl)"
            )),
        }
    }
}

/// Files written for one session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionFiles {
    pub group: PathBuf,
    pub summary: PathBuf,
    pub speakers: Vec<PathBuf>,
    pub rows_written: usize,
}

/// Render seconds the way the tables show them: always with a fraction.
pub fn format_seconds(secs: f64) -> String {
    if secs.fract() == 0.0 && secs.is_finite() {
        format!("{secs:.1}")
    } else {
        secs.to_string()
    }
}

/// Make a speaker identifier safe to use as a file name.
fn file_stem(speaker: &str) -> String {
    let stem: String = speaker
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '-' | '_' | '.' | ' ') {
                c
            } else {
                '_'
            }
        })
        .collect();
    match stem.trim() {
        "" | "." | ".." => "unknown".to_string(),
        s => s.to_string(),
    }
}

/// Pick a stem not yet in `used`, appending `_2`, `_3`, ... on collision.
///
/// Comparison ignores case so tables stay distinct on case-insensitive
/// filesystems.
fn unique_stem(speaker: &str, used: &mut HashSet<String>) -> String {
    let base = file_stem(speaker);
    let mut stem = base.clone();
    let mut n = 1;
    while !used.insert(stem.to_lowercase()) {
        n += 1;
        stem = format!("{base}_{n}");
    }
    if n > 1 {
        tracing::warn!(speaker, file_stem = %stem, "speaker file name collides, renamed");
    }
    stem
}

fn row_json(row: &SeriesRow, categories: &[String]) -> serde_json::Value {
    let mut object = serde_json::Map::new();
    object.insert("speaker".into(), row.speaker.clone().into());
    object.insert("window_start".into(), row.window_start.into());
    object.insert("window_end".into(), row.window_end.into());
    for category in categories {
        object.insert(category.clone(), row.count(category).into());
    }
    serde_json::Value::Object(object)
}

/// Write one table of rows with columns `speaker, window_start, window_end,
/// <categories...>`.
pub fn write_table(
    path: &Path,
    rows: &[SeriesRow],
    categories: &[String],
    format: OutputFormat,
) -> Result<(), SourceError> {
    match format {
        OutputFormat::Csv => {
            let mut writer = csv::Writer::from_path(path).map_err(|e| SourceError::csv(path, e))?;

            let mut header = vec!["speaker", "window_start", "window_end"];
            header.extend(categories.iter().map(String::as_str));
            writer
                .write_record(&header)
                .map_err(|e| SourceError::csv(path, e))?;

            for row in rows {
                let mut record = vec![
                    row.speaker.clone(),
                    format_seconds(row.window_start),
                    format_seconds(row.window_end),
                ];
                record.extend(categories.iter().map(|c| row.count(c).to_string()));
                writer
                    .write_record(&record)
                    .map_err(|e| SourceError::csv(path, e))?;
            }
            writer.flush().map_err(|e| SourceError::io(path, e))?;
        }
        OutputFormat::Json => {
            let values: Vec<serde_json::Value> =
                rows.iter().map(|r| row_json(r, categories)).collect();
            write_json(path, &values)?;
        }
        OutputFormat::Jsonl => {
            let file = File::create(path).map_err(|e| SourceError::io(path, e))?;
            let mut out = BufWriter::new(file);
            for row in rows {
                serde_json::to_writer(&mut out, &row_json(row, categories)).map_err(|e| {
                    SourceError::Serialize {
                        path: path.to_path_buf(),
                        source: e,
                    }
                })?;
                out.write_all(b"\n").map_err(|e| SourceError::io(path, e))?;
            }
            out.flush().map_err(|e| SourceError::io(path, e))?;
        }
    }
    Ok(())
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), SourceError> {
    let json = serde_json::to_string_pretty(value).map_err(|e| SourceError::Serialize {
        path: path.to_path_buf(),
        source: e,
    })?;
    std::fs::write(path, json).map_err(|e| SourceError::io(path, e))
}

/// Category summaries for the group series and each speaker series.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryReport {
    pub session: String,
    pub window_count: usize,
    pub group: Vec<CategorySummary>,
    pub speakers: Vec<SpeakerSummary>,
}

/// Summary for one speaker's series.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeakerSummary {
    pub speaker: String,
    /// Windows in which the speaker was active
    pub active_windows: usize,
    /// Computed over the speaker's full (gap-filled) series
    pub categories: Vec<CategorySummary>,
}

impl SummaryReport {
    /// Summarize the group and every speaker series of `output`.
    pub fn build(session: &str, output: &SessionOutput) -> Self {
        let series = &output.series;
        Self {
            session: session.to_string(),
            window_count: series.group.len(),
            group: summarize(&series.categories, &series.group),
            speakers: series
                .speakers
                .iter()
                .map(|s| SpeakerSummary {
                    speaker: s.speaker.clone(),
                    active_windows: s.active_rows().count(),
                    categories: summarize(&series.categories, &s.rows),
                })
                .collect(),
        }
    }
}

/// Write all tables for one session under `out_dir`.
pub fn write_session(
    out_dir: &Path,
    prefix: &str,
    output: &SessionOutput,
    format: OutputFormat,
) -> Result<SessionFiles, SourceError> {
    let series = &output.series;
    let ext = format.extension();

    let speaker_dir = out_dir.join(format!("{prefix}_speaker_time_series"));
    std::fs::create_dir_all(&speaker_dir).map_err(|e| SourceError::io(&speaker_dir, e))?;

    let mut files = SessionFiles::default();
    let mut used_stems = HashSet::new();

    for speaker in &series.speakers {
        let stem = unique_stem(&speaker.speaker, &mut used_stems);
        let path = speaker_dir.join(format!("{stem}_time_series.{ext}"));
        write_table(&path, &speaker.rows, &series.categories, format)?;
        tracing::debug!(path = ?path, rows = speaker.rows.len(), "wrote speaker series");
        files.rows_written += speaker.rows.len();
        files.speakers.push(path);
    }

    let group_path = out_dir.join(format!("{prefix}_group_text_analysis.{ext}"));
    write_table(&group_path, &series.group, &series.categories, format)?;
    files.rows_written += series.group.len();
    files.group = group_path;

    let summary_path = out_dir.join(format!("{prefix}_category_summary.json"));
    write_json(&summary_path, &SummaryReport::build(prefix, output))?;
    files.summary = summary_path;

    Ok(files)
}
