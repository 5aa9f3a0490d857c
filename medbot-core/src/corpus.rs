//! Local medical dataset loader
//!
//! Two fixed on-disk layouts are supported, selected by [`CorpusFormat`]:
//! - JSON: one file per topic under per-domain folders (see [`JSON_LAYOUT`])
//! - CSV: one table per entity kind (see [`CSV_LAYOUT`])
//!
//! Missing files are logged and skipped; a record without a name is skipped; a
//! missing attribute is simply absent and renders as a placeholder later.

use std::collections::BTreeMap;
use std::path::Path;

use serde_json::Value;

use crate::config::CorpusFormat;
use crate::error::MedbotError;
use crate::models::record::normalize_key;
use crate::models::{EntityKind, Record};

/// `(relative path, kind)` for the JSON layout.
pub const JSON_LAYOUT: &[(&str, EntityKind)] = &[
    ("conditions/common_conditions.json", EntityKind::Condition),
    ("symptoms/common_symptoms.json", EntityKind::Symptom),
    ("symptoms/emergency_symptoms.json", EntityKind::Symptom),
    ("medications/drug_database.json", EntityKind::Drug),
    ("general_health/prevention_guidelines.json", EntityKind::Solution),
    ("first_aid/emergency_procedure.json", EntityKind::Solution),
];

/// `(relative path, kind)` for the CSV layout.
pub const CSV_LAYOUT: &[(&str, EntityKind)] = &[
    ("conditions.csv", EntityKind::Condition),
    ("drugs.csv", EntityKind::Drug),
    ("symptoms.csv", EntityKind::Symptom),
    ("solutions.csv", EntityKind::Solution),
];

/// All loaded records, one collection per entity kind, in file order.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    collections: BTreeMap<EntityKind, Vec<Record>>,
    /// `kind/source` for every file that was read.
    topics: Vec<String>,
}

impl Corpus {
    /// Read the layout for `format` under `root`.
    pub fn load(root: &Path, format: CorpusFormat) -> Corpus {
        let mut corpus = Corpus::default();
        let layout = match format {
            CorpusFormat::Json => JSON_LAYOUT,
            CorpusFormat::Csv => CSV_LAYOUT,
        };

        for (relative, kind) in layout {
            let path = root.join(relative);
            if !path.exists() {
                tracing::warn!(path = %path.display(), "Corpus file not found, skipping");
                continue;
            }

            let source = source_name(&path);
            let loaded = match format {
                CorpusFormat::Json => load_json_file(&path, *kind, &source),
                CorpusFormat::Csv => load_csv_file(&path, *kind, &source),
            };

            match loaded {
                Ok(records) => {
                    tracing::info!(
                        path = %path.display(),
                        kind = %kind,
                        records = records.len(),
                        "Loaded corpus file"
                    );
                    corpus.topics.push(format!("{}/{}", kind, source));
                    for record in records {
                        corpus.insert(record);
                    }
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Failed to read corpus file, skipping");
                }
            }
        }

        corpus
    }

    /// Build a corpus from already-parsed records (tests, embedding hosts).
    pub fn from_records(records: impl IntoIterator<Item = Record>) -> Corpus {
        let mut corpus = Corpus::default();
        for record in records {
            let topic = record.provenance();
            if !corpus.topics.contains(&topic) {
                corpus.topics.push(topic);
            }
            corpus.insert(record);
        }
        corpus
    }

    fn insert(&mut self, record: Record) {
        self.collections.entry(record.kind).or_default().push(record);
    }

    pub fn records(&self, kind: EntityKind) -> &[Record] {
        self.collections.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every record, grouped by kind in [`EntityKind`] order.
    pub fn iter(&self) -> impl Iterator<Item = &Record> {
        self.collections.values().flatten()
    }

    pub fn len(&self) -> usize {
        self.collections.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn topics(&self) -> &[String] {
        &self.topics
    }

    /// First record of `kind` whose name matches `name` case-insensitively.
    pub fn lookup(&self, kind: EntityKind, name: &str) -> Option<&Record> {
        self.records(kind).iter().find(|r| r.name_matches(name))
    }

    /// Per-kind record counts.
    pub fn counts(&self) -> BTreeMap<EntityKind, usize> {
        self.collections.iter().map(|(k, v)| (*k, v.len())).collect()
    }
}

fn source_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

// ============================================================================
// JSON layout
// ============================================================================

fn load_json_file(path: &Path, kind: EntityKind, source: &str) -> Result<Vec<Record>, MedbotError> {
    let raw = std::fs::read_to_string(path)?;
    let value: Value = serde_json::from_str(&raw)?;
    Ok(records_from_json(&value, kind, source))
}

/// Normalize the accepted JSON shapes into records.
///
/// Accepted: an array of objects; an object wrapping a single array of objects,
/// possibly beside scalar metadata such as `"version"`; an object whose values are
/// all objects (keys become names); a single object. Records keep file order.
pub fn records_from_json(value: &Value, kind: EntityKind, source: &str) -> Vec<Record> {
    let objects: Vec<(Option<&str>, &serde_json::Map<String, Value>)> = match value {
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_object)
            .map(|o| (None, o))
            .collect(),
        Value::Object(map) => {
            let arrays: Vec<&Vec<Value>> = map
                .values()
                .filter_map(Value::as_array)
                .filter(|items| items.iter().any(Value::is_object))
                .collect();
            let only_scalar_siblings = map
                .values()
                .filter(|v| !v.is_array())
                .all(|v| !v.is_object());
            if arrays.len() == 1 && only_scalar_siblings {
                arrays[0]
                    .iter()
                    .filter_map(Value::as_object)
                    .map(|o| (None, o))
                    .collect()
            } else if !map.is_empty() && map.values().all(Value::is_object) {
                map.iter()
                    .filter_map(|(k, v)| v.as_object().map(|o| (Some(k.as_str()), o)))
                    .collect()
            } else {
                vec![(None, map)]
            }
        }
        _ => {
            tracing::warn!(source, "Corpus JSON is neither an object nor an array");
            Vec::new()
        }
    };

    objects
        .into_iter()
        .filter_map(|(key, object)| {
            let fields: BTreeMap<String, String> = object
                .iter()
                .map(|(k, v)| (normalize_key(k), flatten_value(v)))
                .collect();
            build_record(kind, key, fields, source)
        })
        .collect()
}

/// Render a JSON value as flat text: arrays join with `"; "`, objects as `k: v | k: v`.
fn flatten_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.trim().to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => items
            .iter()
            .map(flatten_value)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("; "),
        Value::Object(map) => map
            .iter()
            .map(|(k, v)| format!("{}: {}", k, flatten_value(v)))
            .collect::<Vec<_>>()
            .join(" | "),
    }
}

// ============================================================================
// CSV layout
// ============================================================================

fn load_csv_file(path: &Path, kind: EntityKind, source: &str) -> Result<Vec<Record>, MedbotError> {
    let reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_path(path)?;
    records_from_csv(reader, kind, source)
}

/// Parse every row of a headed CSV table. Malformed rows are skipped.
pub fn records_from_csv<R: std::io::Read>(
    mut reader: csv::Reader<R>,
    kind: EntityKind,
    source: &str,
) -> Result<Vec<Record>, MedbotError> {
    let headers: Vec<String> = reader.headers()?.iter().map(normalize_key).collect();
    let mut records = Vec::new();

    for (line, row) in reader.records().enumerate() {
        let row = match row {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(source, row = line + 1, error = %e, "Skipping malformed CSV row");
                continue;
            }
        };

        let fields: BTreeMap<String, String> = headers
            .iter()
            .zip(row.iter())
            .map(|(h, v)| (h.clone(), v.to_string()))
            .collect();

        if let Some(record) = build_record(kind, None, fields, source) {
            records.push(record);
        }
    }

    Ok(records)
}

fn build_record(
    kind: EntityKind,
    key: Option<&str>,
    fields: BTreeMap<String, String>,
    source: &str,
) -> Option<Record> {
    let name = kind
        .name_aliases()
        .iter()
        .filter_map(|alias| fields.get(*alias))
        .map(|v| v.trim())
        .find(|v| !v.is_empty())
        .map(str::to_string)
        .or_else(|| key.map(|k| k.trim().to_string()).filter(|k| !k.is_empty()));

    match name {
        Some(name) => Some(Record {
            kind,
            name,
            fields,
            source: source.to_string(),
        }),
        None => {
            tracing::warn!(source, kind = %kind, "Skipping record without a name");
            None
        }
    }
}
