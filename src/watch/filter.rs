//! Which file-system events matter to the watch loop.

use std::path::{Path, PathBuf};

use notify::EventKind;
use notify::event::ModifyKind;

use crate::utils::path::normalize_path;

/// Check if path is a temp/backup file (editor artifacts).
pub(super) fn is_temp_file(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    matches!(ext, "bck" | "bak" | "backup" | "swp" | "swo" | "tmp")
        || name.ends_with('~')
        || name.starts_with('.')
}

/// Only content-affecting kinds count.
///
/// Metadata-only changes (mtime/atime/chmod noise) are ignored; writing the
/// output would otherwise trigger endless re-runs.
fn is_relevant(kind: &EventKind) -> bool {
    match kind {
        EventKind::Create(_) | EventKind::Remove(_) => true,
        EventKind::Modify(modify) => !matches!(modify, ModifyKind::Metadata(_)),
        _ => false,
    }
}

/// Filter for input-folder events.
#[derive(Debug, Clone)]
pub struct InputFilter {
    output: PathBuf,
}

impl InputFilter {
    /// `output` must be normalized; events inside it are ignored.
    pub fn new(output: &Path) -> Self {
        Self {
            output: normalize_path(output),
        }
    }

    /// Paths of `event` that should trigger a run.
    pub fn changed_paths(&self, event: &notify::Event) -> Vec<PathBuf> {
        if !is_relevant(&event.kind) {
            return Vec::new();
        }
        event
            .paths
            .iter()
            .filter(|path| !is_temp_file(path))
            .map(|path| normalize_path(path))
            .filter(|path| !path.starts_with(&self.output))
            .collect()
    }
}

/// True if `event` touches the config file.
pub fn touches_config(event: &notify::Event, config_path: &Path) -> bool {
    is_relevant(&event.kind)
        && event
            .paths
            .iter()
            .any(|path| path == config_path || normalize_path(path) == config_path)
}
