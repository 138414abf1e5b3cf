//! Intent normalization and the two keys loop detection compares on.
//!
//! * the **fingerprint** identifies the exact normalized intent;
//! * the **semantic bucket** identifies its bag of content words, so reorderings, stop-word
//!   changes and simple inflections ("parse config" / "parsing the configs") land together.

use sha2::{Digest, Sha256};

const STOPWORDS: &[&str] = &[
    "a", "an", "and", "any", "are", "as", "at", "be", "by", "can", "do", "does", "for", "from",
    "how", "i", "in", "into", "is", "it", "its", "me", "my", "of", "on", "or", "show", "that",
    "the", "this", "to", "what", "where", "which", "who", "why", "with",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QueryKey {
    pub fingerprint: u64,
    pub bucket: u64,
}

impl QueryKey {
    /// Returns the key together with the normalized intent it was derived from.
    #[must_use]
    pub fn from_intent(intent: &str) -> (Self, String) {
        let normalized = normalize_intent(intent);
        let key = Self {
            fingerprint: hash64(normalized.as_bytes()),
            bucket: semantic_bucket(&normalized),
        };
        (key, normalized)
    }
}

/// Lowercase, punctuation folded to spaces (path separators and `_` kept), whitespace collapsed.
#[must_use]
pub fn normalize_intent(intent: &str) -> String {
    let folded: String = intent
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '_' | '/' | '.') {
                c.to_ascii_lowercase()
            } else {
                ' '
            }
        })
        .collect();
    folded
        .split_whitespace()
        .map(|token| token.trim_matches('.'))
        .filter(|token| !token.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[must_use]
pub fn semantic_bucket(normalized: &str) -> u64 {
    let mut terms: Vec<String> = normalized
        .split_whitespace()
        .filter(|token| !STOPWORDS.contains(token))
        .map(stem)
        .filter(|term| !term.is_empty())
        .collect();
    terms.sort();
    terms.dedup();
    hash64(terms.join(" ").as_bytes())
}

fn stem(token: &str) -> String {
    if token.contains(['/', '.']) {
        return token.to_string();
    }
    let mut root = token;
    for suffix in ["ing", "ed", "es", "s"] {
        if let Some(stripped) = token.strip_suffix(suffix) {
            if stripped.chars().count() >= 3 {
                root = stripped;
                break;
            }
        }
    }
    // "parse" / "parsed" / "parsing" all reduce to "pars".
    match root.strip_suffix('e') {
        Some(stripped) if stripped.chars().count() >= 3 => stripped.to_string(),
        _ => root.to_string(),
    }
}

fn hash64(bytes: &[u8]) -> u64 {
    let digest = Sha256::digest(bytes);
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(head)
}
