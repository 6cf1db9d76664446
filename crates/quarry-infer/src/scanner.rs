//! Bounded project file walk.

use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::time::Instant;
use tracing::debug;
use walkdir::{DirEntry, WalkDir};

use quarry_core::InferenceConfig;

use crate::cancel::CancellationToken;
use crate::error::InferenceError;

pub(crate) struct Scanner<'a> {
    config: &'a InferenceConfig,
    cancel: &'a CancellationToken,
    deadline: Instant,
    files_scanned: usize,
}

impl<'a> Scanner<'a> {
    pub(crate) fn new(
        config: &'a InferenceConfig,
        cancel: &'a CancellationToken,
        deadline: Instant,
    ) -> Self {
        Self {
            config,
            cancel,
            deadline,
            files_scanned: 0,
        }
    }

    /// Feed the text of each candidate file to `visit`, preferred root files
    /// first, then a sorted walk. Returns the number of files read.
    pub(crate) fn run<F>(mut self, root: &Path, mut visit: F) -> Result<usize, InferenceError>
    where
        F: FnMut(&str),
    {
        if !root.is_dir() {
            return Ok(0);
        }
        let config = self.config;

        for name in &config.preferred_files {
            if self.exhausted()? {
                return Ok(self.files_scanned);
            }
            let path = root.join(name);
            if path.is_file() {
                self.read_into(&path, &mut visit);
            }
        }

        let skip_dirs = &config.skip_dirs;
        let walker = WalkDir::new(root)
            .follow_links(false)
            .max_depth(config.max_depth + 1)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_skipped_dir(e, skip_dirs));

        for entry in walker {
            if self.exhausted()? {
                break;
            }
            let Ok(entry) = entry else {
                continue;
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy();
            if entry.depth() == 1 && config.preferred_files.iter().any(|p| p.as_str() == name) {
                continue;
            }
            if !is_candidate_file(&name, &config.extensions) {
                continue;
            }
            self.read_into(entry.path(), &mut visit);
        }

        Ok(self.files_scanned)
    }

    /// True once the file budget is spent. Deadline and cancellation abort the scan.
    fn exhausted(&self) -> Result<bool, InferenceError> {
        if self.cancel.is_cancelled() {
            return Err(InferenceError::ScanAborted("cancelled"));
        }
        if Instant::now() >= self.deadline {
            return Err(InferenceError::ScanAborted("time budget exceeded"));
        }
        Ok(self.files_scanned >= self.config.max_files)
    }

    fn read_into<F: FnMut(&str)>(&mut self, path: &Path, visit: &mut F) {
        let mut buf = Vec::new();
        let read = File::open(path)
            .and_then(|f| f.take(self.config.max_file_bytes).read_to_end(&mut buf));
        match read {
            Ok(_) => {
                self.files_scanned += 1;
                visit(&String::from_utf8_lossy(&buf));
            }
            Err(e) => debug!(kind = ?e.kind(), "Skipping unreadable file"),
        }
    }
}

fn is_skipped_dir(entry: &DirEntry, skip_dirs: &[String]) -> bool {
    entry.file_type().is_dir()
        && skip_dirs
            .iter()
            .any(|d| entry.file_name().to_str() == Some(d.as_str()))
}

/// Dotenv files (`.env`, `.env.production`) plus the configured extensions.
fn is_candidate_file(name: &str, extensions: &[String]) -> bool {
    let lower = name.to_ascii_lowercase();
    if lower == ".env" || lower.starts_with(".env.") || lower.ends_with(".env") {
        return true;
    }
    match lower.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)),
        _ => false,
    }
}
