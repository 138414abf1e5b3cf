//! Separation of internal diagnostics from user-visible text.
//!
//! Oracles and internal stages may tag text with `[unverified]` or `[unverified: note]`
//! markers. Those markers never reach user-facing fields; they are collected into a
//! [`DebugChannel`] instead.

use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

fn marker_regex() -> &'static Regex {
    static MARKER: OnceLock<Regex> = OnceLock::new();
    MARKER.get_or_init(|| {
        Regex::new(r"(?i)\[\s*unverified(?:\s*:[^\]]*)?\]").unwrap_or_else(|err| {
            unreachable!("unverified marker regex must compile: {err}")
        })
    })
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DebugDisclosure {
    pub field: String,
    pub marker: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DebugChannel {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub disclosures: Vec<DebugDisclosure>,
}

impl DebugChannel {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.disclosures.is_empty()
    }

    /// Return `text` without unverified markers, remembering what was stripped under `field`.
    pub fn scrub(&mut self, field: &str, text: &str) -> String {
        let regex = marker_regex();
        if !regex.is_match(text) {
            return text.to_string();
        }
        for found in regex.find_iter(text) {
            self.disclosures.push(DebugDisclosure {
                field: field.to_string(),
                marker: found.as_str().to_string(),
            });
        }
        let stripped = regex.replace_all(text, "");
        stripped.split_whitespace().collect::<Vec<_>>().join(" ")
    }
}
