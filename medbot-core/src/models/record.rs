use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::MedbotError;

/// The four kinds of entity held in the local dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Condition,
    Drug,
    Symptom,
    Solution,
}

impl EntityKind {
    pub const ALL: [EntityKind; 4] = [
        EntityKind::Condition,
        EntityKind::Drug,
        EntityKind::Symptom,
        EntityKind::Solution,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Condition => "condition",
            EntityKind::Drug => "drug",
            EntityKind::Symptom => "symptom",
            EntityKind::Solution => "solution",
        }
    }

    /// Field keys that may hold the record's name, most specific first.
    pub fn name_aliases(&self) -> &'static [&'static str] {
        match self {
            EntityKind::Condition => &["name", "condition", "condition_name", "title"],
            EntityKind::Drug => &["name", "drug", "drug_name", "medication", "title"],
            EntityKind::Symptom => &["name", "symptom", "symptom_name", "title"],
            EntityKind::Solution => &["name", "solution", "procedure", "guideline", "title"],
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = MedbotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "condition" | "conditions" => Ok(EntityKind::Condition),
            "drug" | "drugs" | "medication" | "medications" => Ok(EntityKind::Drug),
            "symptom" | "symptoms" => Ok(EntityKind::Symptom),
            "solution" | "solutions" => Ok(EntityKind::Solution),
            other => Err(MedbotError::UnknownKind(other.to_string())),
        }
    }
}

/// One entity from the dataset. Every attribute is free text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub kind: EntityKind,
    pub name: String,
    pub fields: BTreeMap<String, String>,
    /// File stem the record was read from, e.g. `drug_database`.
    pub source: String,
}

impl Record {
    pub fn new(kind: EntityKind, name: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            fields: BTreeMap::new(),
            source: source.into(),
        }
    }

    pub fn with_field(mut self, key: &str, value: impl Into<String>) -> Self {
        self.fields.insert(normalize_key(key), value.into());
        self
    }

    /// First non-blank value among `aliases`.
    pub fn field(&self, aliases: &[&str]) -> Option<&str> {
        aliases
            .iter()
            .filter_map(|a| self.fields.get(*a))
            .map(|v| v.trim())
            .find(|v| !v.is_empty())
    }

    /// Case-insensitive containment in either direction.
    pub fn name_matches(&self, needle: &str) -> bool {
        let needle = needle.trim().to_lowercase();
        if needle.is_empty() {
            return false;
        }
        let name = self.name.trim().to_lowercase();
        if name.is_empty() {
            return false;
        }
        name.contains(&needle) || needle.contains(&name)
    }

    pub fn provenance(&self) -> String {
        format!("{}/{}", self.kind, self.source)
    }
}

/// Lower-case a field key and fold spaces and hyphens into underscores.
pub fn normalize_key(key: &str) -> String {
    key.trim()
        .to_lowercase()
        .chars()
        .map(|c| if c == ' ' || c == '-' { '_' } else { c })
        .collect()
}
