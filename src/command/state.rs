// DocumentStatus - the "has unsaved changes" flag of one open document
//
// Cloned handles share the same flag, so the undo manager can mark the
// document dirty while the session (or a UI) reads it.

use crate::command::trait_def::UnsavedChanges;
use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex};

#[derive(Debug, Default)]
struct StatusInner {
    has_unsaved_changes: bool,
    last_modified: Option<DateTime<Utc>>,
}

/// Shared unsaved-changes flag
#[derive(Debug, Clone, Default)]
pub struct DocumentStatus {
    inner: Arc<Mutex<StatusInner>>,
}

impl DocumentStatus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.inner
            .lock()
            .map(|inner| inner.has_unsaved_changes)
            .unwrap_or(false)
    }

    /// Time of the last change that dirtied the document
    pub fn last_modified(&self) -> Option<DateTime<Utc>> {
        self.inner.lock().ok().and_then(|inner| inner.last_modified)
    }
}

impl UnsavedChanges for DocumentStatus {
    fn set_has_unsaved_changes(&self, dirty: bool) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.has_unsaved_changes = dirty;
            if dirty {
                inner.last_modified = Some(Utc::now());
            }
        }
    }
}
