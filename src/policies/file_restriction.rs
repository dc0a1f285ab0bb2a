//! File restriction
//!
//! PreToolUse handler that confines Write/Edit to a single file.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::core::{paths, GuardResult};
use crate::hooks::{CallEvent, Handler, Phase, Verdict};

/// Denies every Write/Edit whose target is not the allowed file
///
/// The allowed path is resolved once at construction. Relative targets in
/// events are resolved against the same base directory.
#[derive(Debug, Clone)]
pub struct FileRestrictionHook {
    allowed: PathBuf,
    resolved_allowed: PathBuf,
    base_dir: PathBuf,
}

impl FileRestrictionHook {
    /// Restrict writes to `allowed`, resolving relative paths against `base_dir`
    pub fn new(allowed: impl Into<PathBuf>, base_dir: impl Into<PathBuf>) -> Self {
        let allowed = allowed.into();
        let base_dir = paths::normalize(&base_dir.into());
        let resolved_allowed = paths::resolve(&base_dir, &allowed);
        Self {
            allowed,
            resolved_allowed,
            base_dir,
        }
    }

    pub fn allowed_path(&self) -> &Path {
        &self.resolved_allowed
    }
}

#[async_trait]
impl Handler for FileRestrictionHook {
    fn name(&self) -> &str {
        "file-restriction"
    }

    async fn evaluate(&self, event: &CallEvent) -> GuardResult<Verdict> {
        if event.is_cancelled() || event.phase() != Phase::Pre || !event.call().is_file_write() {
            return Ok(Verdict::Continue);
        }

        let Some(file_path) = event.file_path() else {
            return Ok(Verdict::Continue);
        };

        if paths::resolve(&self.base_dir, file_path) == self.resolved_allowed {
            return Ok(Verdict::Continue);
        }

        Ok(Verdict::deny(format!(
            "Only the allowed file can be modified: {}. Attempted: {}",
            self.allowed.display(),
            file_path.display()
        )))
    }
}
