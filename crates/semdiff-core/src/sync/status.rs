//! Shared sync status: in-flight counter and connectivity flag.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Status summary shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncLabel {
    Offline,
    Syncing,
    AllSaved,
}

impl fmt::Display for SyncLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            SyncLabel::Offline => "Offline",
            SyncLabel::Syncing => "Syncing…",
            SyncLabel::AllSaved => "All saved",
        };
        f.write_str(text)
    }
}

/// Number of syncs in flight plus the last known connectivity.
#[derive(Debug)]
pub struct SyncStatus {
    syncing: AtomicUsize,
    online: AtomicBool,
}

impl Default for SyncStatus {
    fn default() -> Self {
        Self::new(true)
    }
}

impl SyncStatus {
    pub fn new(online: bool) -> Self {
        Self {
            syncing: AtomicUsize::new(0),
            online: AtomicBool::new(online),
        }
    }

    /// Mark a sync as started. The count drops again when the guard is
    /// dropped, on every exit path.
    pub fn begin(&self) -> SyncGuard<'_> {
        self.syncing.fetch_add(1, Ordering::SeqCst);
        SyncGuard { status: self }
    }

    pub fn syncing_count(&self) -> usize {
        self.syncing.load(Ordering::SeqCst)
    }

    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    /// Store connectivity. Returns the previous value.
    pub fn set_online(&self, online: bool) -> bool {
        self.online.swap(online, Ordering::SeqCst)
    }

    pub fn label(&self) -> SyncLabel {
        if !self.is_online() {
            SyncLabel::Offline
        } else if self.syncing_count() > 0 {
            SyncLabel::Syncing
        } else {
            SyncLabel::AllSaved
        }
    }
}

/// RAII marker for one in-flight sync.
#[derive(Debug)]
pub struct SyncGuard<'a> {
    status: &'a SyncStatus,
}

impl Drop for SyncGuard<'_> {
    fn drop(&mut self) {
        self.status.syncing.fetch_sub(1, Ordering::SeqCst);
    }
}
