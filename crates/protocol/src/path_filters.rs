//! Workspace-relative scope filters carried by retrieval requests.

/// Compiled include/exclude prefixes plus an optional file pattern.
///
/// Prefixes match whole path components (`src` matches `src/lib.rs`, not `src2/lib.rs`).
/// Exclusions win over inclusions. A pattern without `*`/`?` is a substring match.
#[derive(Debug, Clone, Default)]
pub struct ScopeFilter {
    include: Vec<String>,
    exclude: Vec<String>,
    pattern: Option<FilePattern>,
}

#[derive(Debug, Clone)]
enum FilePattern {
    Substring(String),
    Glob(glob::Pattern),
}

impl ScopeFilter {
    pub fn new(
        include_paths: &[String],
        exclude_paths: &[String],
        file_pattern: Option<&str>,
    ) -> Result<Self, glob::PatternError> {
        let pattern = match file_pattern.map(str::trim).filter(|p| !p.is_empty()) {
            None => None,
            Some(raw) if raw.contains('*') || raw.contains('?') => {
                Some(FilePattern::Glob(glob::Pattern::new(raw)?))
            }
            Some(raw) => Some(FilePattern::Substring(raw.to_string())),
        };
        Ok(Self {
            include: normalize_prefixes(include_paths),
            exclude: normalize_prefixes(exclude_paths),
            pattern,
        })
    }

    #[must_use]
    pub fn allows(&self, rel_path: &str) -> bool {
        let rel_path = rel_path.replace('\\', "/");

        if !self.include.is_empty()
            && !self
                .include
                .iter()
                .any(|prefix| prefix_matches(prefix, &rel_path))
        {
            return false;
        }
        if self
            .exclude
            .iter()
            .any(|prefix| prefix_matches(prefix, &rel_path))
        {
            return false;
        }

        match &self.pattern {
            None => true,
            Some(FilePattern::Substring(needle)) => rel_path.contains(needle.as_str()),
            Some(FilePattern::Glob(glob)) => glob.matches(&rel_path),
        }
    }
}

fn normalize_prefixes(raw: &[String]) -> Vec<String> {
    raw.iter()
        .map(|p| normalize_prefix(p))
        .filter(|p| !p.is_empty())
        .collect()
}

fn normalize_prefix(raw: &str) -> String {
    let mut value = raw.trim().replace('\\', "/");
    while let Some(rest) = value.strip_prefix("./") {
        value = rest.to_string();
    }
    let value = value.trim_matches('/');
    if value == "." {
        return String::new();
    }
    value.to_string()
}

fn prefix_matches(prefix: &str, path: &str) -> bool {
    path == prefix
        || (path.starts_with(prefix) && path.as_bytes().get(prefix.len()) == Some(&b'/'))
}
