//! The on-disk artifact format.
//!
//! An artifact has two sections. `[meta]` holds flat `key=value` pairs.
//! `[data]` holds the row set: the first line is the column header (a JSON
//! array of names, derived from the first row's keys), followed by one JSON
//! array per record, with missing values persisted as null.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde_json::Value;
use trackdash_core::{constants, header_for, Error, ReportRow, Result};

/// Derive the artifact filename for a write timestamp.
///
/// Millisecond precision, UTC, lexicographically sortable:
/// `report-20260824T101530123.snap`.
#[must_use]
pub fn artifact_name(at: DateTime<Utc>) -> String {
    format!(
        "{}{}.{}",
        constants::ARTIFACT_PREFIX,
        at.format("%Y%m%dT%H%M%S%3f"),
        constants::ARTIFACT_EXTENSION
    )
}

/// Whether a filename looks like an artifact written by this store.
/// Temporary files and foreign files never match.
#[must_use]
pub fn is_artifact_name(name: &str) -> bool {
    name.starts_with(constants::ARTIFACT_PREFIX)
        && name.ends_with(&format!(".{}", constants::ARTIFACT_EXTENSION))
}

/// Serialize metadata pairs and rows into the sectioned text form.
pub fn encode_artifact(
    metadata: &IndexMap<String, String>,
    rows: &[ReportRow],
) -> Result<String> {
    let mut out = String::new();
    out.push_str(constants::META_SECTION);
    out.push('\n');
    for (key, value) in metadata {
        if key.contains('=') || key.contains('\n') || value.contains('\n') {
            return Err(Error::configuration(format!(
                "metadata key/value contains a reserved character: '{key}'"
            )));
        }
        out.push_str(key);
        out.push('=');
        out.push_str(value);
        out.push('\n');
    }
    out.push_str(constants::DATA_SECTION);
    out.push('\n');

    if rows.is_empty() {
        return Ok(out);
    }
    let header = header_for(rows);
    out.push_str(&serde_json::to_string(&header)?);
    out.push('\n');
    for row in rows {
        out.push_str(&serde_json::to_string(&row.values_for(&header))?);
        out.push('\n');
    }
    Ok(out)
}

/// Parse an artifact back into its metadata map and row set.
pub fn decode_artifact(
    name: &str,
    text: &str,
) -> Result<(IndexMap<String, String>, Vec<ReportRow>)> {
    let mut metadata = IndexMap::new();
    let mut rows = Vec::new();
    let mut header: Option<Vec<String>> = None;

    #[derive(PartialEq)]
    enum Section {
        Preamble,
        Meta,
        Data,
    }
    let mut section = Section::Preamble;

    for (line_no, line) in text.lines().enumerate() {
        if line == constants::META_SECTION {
            section = Section::Meta;
            continue;
        }
        if line == constants::DATA_SECTION {
            section = Section::Data;
            continue;
        }
        if line.is_empty() {
            continue;
        }
        match section {
            Section::Preamble => {
                return Err(Error::parse(
                    name,
                    format!("line {}: content before the [meta] section", line_no + 1),
                ));
            }
            Section::Meta => {
                let (key, value) = line.split_once('=').ok_or_else(|| {
                    Error::parse(
                        name,
                        format!("line {}: metadata line is not key=value", line_no + 1),
                    )
                })?;
                metadata.insert(key.to_string(), value.to_string());
            }
            Section::Data => match &header {
                None => {
                    let columns: Vec<String> = serde_json::from_str(line).map_err(|e| {
                        Error::parse(
                            name,
                            format!("line {}: header row is not a string array: {e}", line_no + 1),
                        )
                    })?;
                    header = Some(columns);
                }
                Some(columns) => {
                    let values: Vec<Value> = serde_json::from_str(line).map_err(|e| {
                        Error::parse(
                            name,
                            format!("line {}: record is not a JSON array: {e}", line_no + 1),
                        )
                    })?;
                    if values.len() != columns.len() {
                        return Err(Error::parse(
                            name,
                            format!(
                                "line {}: record has {} values but the header has {} columns",
                                line_no + 1,
                                values.len(),
                                columns.len()
                            ),
                        ));
                    }
                    rows.push(columns.iter().cloned().zip(values).collect());
                }
            },
        }
    }

    Ok((metadata, rows))
}
