use ignore::WalkBuilder;
use std::path::{Path, PathBuf};

const MAX_SCANNED_FILE_BYTES: u64 = 1024 * 1024;

const SKIPPED_DIRS: &[&str] = &[
    ".git",
    ".hg",
    ".svn",
    ".idea",
    ".vscode",
    ".cache",
    "node_modules",
    ".next",
    "dist",
    "build",
    "coverage",
    "target",
    ".venv",
    "__pycache__",
    "vendor",
];

const BINARY_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "bmp", "ico", "webp", "pdf", "zip", "gz", "tgz", "xz", "bz2",
    "7z", "tar", "jar", "class", "o", "a", "so", "dylib", "dll", "exe", "bin", "wasm", "onnx",
    "woff", "woff2", "ttf", "otf", "mp3", "mp4", "mov", "sqlite", "db",
];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanOutcome {
    /// Absolute paths, in walk order.
    pub files: Vec<PathBuf>,
    /// The walk stopped at the file budget.
    pub truncated: bool,
}

/// Finds candidate text files under a workspace root (.gitignore aware, bounded).
#[derive(Debug, Clone)]
pub struct WorkspaceScanner {
    root: PathBuf,
    max_files: usize,
}

impl WorkspaceScanner {
    pub fn new(root: impl AsRef<Path>, max_files: usize) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            max_files: max_files.max(1),
        }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Blocking walk; run it on the blocking pool from async code.
    #[must_use]
    pub fn scan(&self) -> ScanOutcome {
        let mut outcome = ScanOutcome::default();

        let root = self.root.clone();
        let mut builder = WalkBuilder::new(&self.root);
        builder
            .hidden(true)
            .git_ignore(true)
            .git_global(true)
            .git_exclude(true)
            .require_git(false)
            .sort_by_file_name(|a, b| a.cmp(b));
        builder.filter_entry(move |entry| !is_skipped_dir(entry.path(), &root));

        for result in builder.build() {
            let entry = match result {
                Ok(entry) => entry,
                Err(err) => {
                    log::warn!("Failed to read entry: {err}");
                    continue;
                }
            };
            if !entry.file_type().is_some_and(|ft| ft.is_file()) {
                continue;
            }

            let path = entry.path();
            if let Ok(meta) = entry.metadata() {
                if meta.len() > MAX_SCANNED_FILE_BYTES {
                    log::debug!("Skipping large file {} ({} bytes)", path.display(), meta.len());
                    continue;
                }
            }
            if is_binary_path(path) {
                continue;
            }

            if outcome.files.len() >= self.max_files {
                outcome.truncated = true;
                break;
            }
            outcome.files.push(path.to_path_buf());
        }

        log::debug!(
            "scanned {}: {} file(s){}",
            self.root.display(),
            outcome.files.len(),
            if outcome.truncated { " (truncated)" } else { "" }
        );
        outcome
    }

    /// Workspace-relative path with `/` separators.
    #[must_use]
    pub fn relative(&self, path: &Path) -> String {
        path.strip_prefix(&self.root)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/")
    }
}

fn is_skipped_dir(path: &Path, root: &Path) -> bool {
    let Ok(relative) = path.strip_prefix(root) else {
        return false;
    };
    relative.components().any(|component| match component {
        std::path::Component::Normal(name) => {
            let lowered = name.to_string_lossy().to_lowercase();
            SKIPPED_DIRS.iter().any(|ignored| *ignored == lowered)
        }
        _ => false,
    })
}

fn is_binary_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            BINARY_EXTENSIONS
                .iter()
                .any(|candidate| ext.eq_ignore_ascii_case(candidate))
        })
}
