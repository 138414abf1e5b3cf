use regex::Regex;
use relay_protocol::IntentType;
use std::sync::OnceLock;

/// Coarse shape of an intent, used to weight path matches against content matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryType {
    /// A symbol name, possibly followed by a clarifying word: `load_config ttl`.
    Identifier,
    /// File names, paths or module paths: `src/lib.rs`, `relay::session`.
    Path,
    /// Everything else, usually a natural-language sentence.
    Conceptual,
}

pub struct QueryClassifier;

fn write_risk_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"(?i)\b(write|edit|modify|change|update|rewrite|refactor|rename|delete|remove|drop|purge|truncate|overwrite|migrate|patch|deploy|auth|authn|authz|authentication|authorization|password|secret|credential|permission|security|encrypt|decrypt|vulnerability|exploit)\b",
        )
        .unwrap_or_else(|err| unreachable!("write-risk pattern is valid: {err}"))
    })
}

impl QueryClassifier {
    #[must_use]
    pub fn classify(query: &str) -> QueryType {
        let tokens: Vec<&str> = query.split_whitespace().collect();
        let Some(first) = tokens.first() else {
            return QueryType::Conceptual;
        };

        let pathish = tokens.iter().filter(|token| looks_like_path(token)).count();
        if pathish == tokens.len() || (pathish > 0 && tokens.len() <= 2) {
            return QueryType::Path;
        }

        let head =
            first.trim_matches(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == ':'));
        if !head.is_empty() && !Self::is_question_leader(head) && looks_like_symbol(head) {
            return QueryType::Identifier;
        }
        QueryType::Conceptual
    }

    /// Does acting on this request risk changing the workspace (or touch security)?
    ///
    /// A declared mutating intent type decides on its own; otherwise the intent text is
    /// scanned for write, delete and security vocabulary.
    #[must_use]
    pub fn is_write_risk(intent: &str, declared: Option<IntentType>) -> bool {
        if declared.is_some_and(IntentType::is_mutating) {
            return true;
        }
        write_risk_pattern().is_match(intent)
    }

    /// Lowercased search terms: question leaders, filler words and one-letter tokens dropped,
    /// first occurrence order kept.
    #[must_use]
    pub fn terms(query: &str) -> Vec<String> {
        let mut terms: Vec<String> = Vec::new();
        for raw in query.split(|c: char| !(c.is_alphanumeric() || c == '_')) {
            let token = raw.to_lowercase();
            if token.chars().count() < 2
                || Self::is_question_leader(&token)
                || FILLER_WORDS.contains(&token.as_str())
            {
                continue;
            }
            if !terms.contains(&token) {
                terms.push(token);
            }
        }
        terms
    }

    /// Words that open a question or request rather than name a symbol ("How", "Explain").
    fn is_question_leader(token: &str) -> bool {
        let lowered = token.to_lowercase();
        QUESTION_LEADERS.contains(&lowered.as_str())
    }
}

const QUESTION_LEADERS: &[&str] = &[
    "how", "what", "why", "where", "when", "who", "which", "does", "do", "is", "are", "can",
    "could", "should", "will", "would", "explain", "describe", "tell", "show", "list", "find",
    "help",
];

fn looks_like_path(token: &str) -> bool {
    if token.contains('/') || token.contains('\\') || token.contains("::") {
        return true;
    }
    token.trim().rsplit_once('.').is_some_and(|(stem, ext)| {
        !stem.is_empty()
            && (1..=6).contains(&ext.len())
            && ext.chars().all(|c| c.is_ascii_alphanumeric())
    })
}

/// snake_case, camelCase/PascalCase or digit-bearing single tokens.
fn looks_like_symbol(token: &str) -> bool {
    let mixed_case = token.chars().any(|c| c.is_ascii_lowercase())
        && token.chars().any(|c| c.is_ascii_uppercase());
    token.contains('_') || mixed_case || token.chars().any(|c| c.is_ascii_digit())
}

const FILLER_WORDS: &[&str] = &[
    "a", "an", "and", "any", "as", "at", "be", "by", "for", "from", "in", "into", "it", "its",
    "me", "my", "of", "on", "or", "that", "the", "this", "to", "with",
];

#[cfg(test)]
mod tests {
    use super::{QueryClassifier, QueryType};
    use relay_protocol::IntentType;

    #[test]
    fn symbols_with_a_clarifying_word_are_identifiers() {
        assert_eq!(QueryClassifier::classify("HybridSearch"), QueryType::Identifier);
        assert_eq!(QueryClassifier::classify("load_config ttl"), QueryType::Identifier);
    }

    #[test]
    fn paths_and_module_paths_are_paths() {
        assert_eq!(QueryClassifier::classify("src/lib.rs"), QueryType::Path);
        assert_eq!(QueryClassifier::classify("relay::session"), QueryType::Path);
    }

    #[test]
    fn questions_are_conceptual() {
        assert_eq!(
            QueryClassifier::classify("How does admission control work"),
            QueryType::Conceptual
        );
    }

    #[test]
    fn declared_mutating_intent_is_write_risk() {
        assert!(QueryClassifier::is_write_risk(
            "look at the parser",
            Some(IntentType::Refactor)
        ));
        assert!(!QueryClassifier::is_write_risk(
            "look at the parser",
            Some(IntentType::Navigate)
        ));
    }

    #[test]
    fn write_and_security_vocabulary_is_write_risk() {
        assert!(QueryClassifier::is_write_risk("delete the stale cache entries", None));
        assert!(QueryClassifier::is_write_risk("where is the password hashed", None));
        assert!(!QueryClassifier::is_write_risk("where is the tokenizer", None));
        assert!(!QueryClassifier::is_write_risk("explain the retry loop", None));
    }

    #[test]
    fn terms_drop_question_words_and_duplicates() {
        assert_eq!(
            QueryClassifier::terms("Where is the retry hint for the retry loop?"),
            vec!["retry".to_string(), "hint".to_string(), "loop".to_string()]
        );
    }
}
