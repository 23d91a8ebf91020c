//! Dataset-level provenance attributes and the history audit trail.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Sentinel for provenance attributes that were not supplied.
pub const UNKNOWN: &str = "Unknown";

/// Default metadata conventions.
pub const CONVENTIONS: &str = "CF-1.10";

/// One timestamped history entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub timestamp: DateTime<Utc>,
    pub message: String,
}

impl HistoryEntry {
    pub fn now(message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            message: message.into(),
        }
    }

    /// Parse a `"<timestamp> - <message>"` line.
    ///
    /// Lines without a recognizable timestamp are stamped with the current
    /// time and kept verbatim.
    pub fn parse_line(line: &str) -> Self {
        if let Some((stamp, message)) = line.split_once(" - ") {
            let stamp = stamp.trim();
            let parsed = DateTime::parse_from_rfc3339(stamp)
                .map(|t| t.with_timezone(&Utc))
                .ok()
                .or_else(|| {
                    NaiveDateTime::parse_from_str(stamp, "%Y-%m-%dT%H:%M:%S")
                        .or_else(|_| NaiveDateTime::parse_from_str(stamp, "%Y-%m-%d %H:%M:%S%.f"))
                        .map(|t| t.and_utc())
                        .ok()
                });
            if let Some(timestamp) = parsed {
                return Self {
                    timestamp,
                    message: message.trim().to_string(),
                };
            }
        }
        Self::now(line.trim())
    }
}

impl fmt::Display for HistoryEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} - {}",
            self.timestamp.format("%Y-%m-%dT%H:%M:%S"),
            self.message
        )
    }
}

/// Append-only ordered audit trail.
///
/// Transformations never mutate a history in place: [`History::with`]
/// returns a new history holding the old entries plus one more.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct History(Vec<HistoryEntry>);

impl History {
    /// A history seeded with a creation entry.
    pub fn created() -> Self {
        Self(vec![HistoryEntry::now(format!(
            "dataset creation by atmo-profile, version {}",
            crate::VERSION
        ))])
    }

    /// Parse a newline-separated history string.
    pub fn parse(text: &str) -> Self {
        Self(
            text.lines()
                .filter(|l| !l.trim().is_empty())
                .map(HistoryEntry::parse_line)
                .collect(),
        )
    }

    /// A copy of this history with one more entry.
    pub fn with(&self, message: impl Into<String>) -> Self {
        let mut entries = self.0.clone();
        entries.push(HistoryEntry::now(message));
        Self(entries)
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn last_message(&self) -> Option<&str> {
        self.0.last().map(|e| e.message.as_str())
    }
}

impl fmt::Display for History {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lines: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        write!(f, "{}", lines.join("\n"))
    }
}

/// Dataset-level attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attributes {
    #[serde(rename = "Conventions")]
    pub conventions: String,
    pub title: String,
    pub institution: String,
    pub source: String,
    pub references: String,
    pub history: History,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub urldate: Option<String>,
    /// Any other attribute.
    #[serde(flatten)]
    pub extra: BTreeMap<String, String>,
}

impl Default for Attributes {
    fn default() -> Self {
        Self {
            conventions: CONVENTIONS.to_string(),
            title: UNKNOWN.to_string(),
            institution: UNKNOWN.to_string(),
            source: UNKNOWN.to_string(),
            references: UNKNOWN.to_string(),
            history: History::created(),
            url: None,
            urldate: None,
            extra: BTreeMap::new(),
        }
    }
}

impl Attributes {
    /// Build attributes from raw strings, filling the missing required ones
    /// with defaults.
    pub fn from_map(raw: &BTreeMap<String, String>) -> Self {
        let mut attrs = Self::default();
        for (key, value) in raw {
            match key.as_str() {
                "Conventions" => attrs.conventions = value.clone(),
                "title" => attrs.title = value.clone(),
                "institution" => attrs.institution = value.clone(),
                "source" => attrs.source = value.clone(),
                "references" => attrs.references = value.clone(),
                "history" => {
                    let parsed = History::parse(value);
                    if !parsed.is_empty() {
                        attrs.history = parsed;
                    }
                }
                "url" => attrs.url = Some(value.clone()),
                "urldate" => attrs.urldate = Some(value.clone()),
                _ => {
                    attrs.extra.insert(key.clone(), value.clone());
                }
            }
        }
        attrs
    }

    /// A copy of these attributes with one more history entry.
    pub fn with_history(&self, message: impl Into<String>) -> Self {
        Self {
            history: self.history.with(message),
            ..self.clone()
        }
    }

    /// Names of required attributes that are empty.
    pub fn missing_required(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        let required = [
            ("Conventions", &self.conventions),
            ("title", &self.title),
            ("institution", &self.institution),
            ("source", &self.source),
            ("references", &self.references),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                missing.push(name);
            }
        }
        if self.history.is_empty() {
            missing.push("history");
        }
        missing
    }
}
