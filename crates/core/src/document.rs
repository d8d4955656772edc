//! Document-level load status.

use pageview_engine::LoadProgress;

/// Where the viewer is in opening its document
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DocumentStatus {
    /// Nothing opened yet, or torn down
    #[default]
    Idle,

    /// Open in progress; dimensions of the first pages may still be pending
    Loading {
        progress: LoadProgress,
        /// Known once the engine has opened the file
        page_count: Option<u32>,
    },

    /// Pages are laid out and rendering
    Ready { page_count: u32 },

    /// Open failed; nothing further renders
    Failed { reason: String },
}

impl DocumentStatus {
    pub fn is_ready(&self) -> bool {
        matches!(self, DocumentStatus::Ready { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, DocumentStatus::Failed { .. })
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, DocumentStatus::Loading { .. })
    }

    pub fn page_count(&self) -> Option<u32> {
        match self {
            DocumentStatus::Ready { page_count } => Some(*page_count),
            DocumentStatus::Loading { page_count, .. } => *page_count,
            DocumentStatus::Idle | DocumentStatus::Failed { .. } => None,
        }
    }

    /// Load progress as a whole percentage.
    pub fn progress_percent(&self) -> u8 {
        match self {
            DocumentStatus::Loading { progress, .. } => progress.percent(),
            DocumentStatus::Ready { .. } => 100,
            DocumentStatus::Idle | DocumentStatus::Failed { .. } => 0,
        }
    }

    /// Short lowercase label, for logs and machine output.
    pub fn label(&self) -> &'static str {
        match self {
            DocumentStatus::Idle => "idle",
            DocumentStatus::Loading { .. } => "loading",
            DocumentStatus::Ready { .. } => "ready",
            DocumentStatus::Failed { .. } => "failed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_follows_status() {
        let loading = DocumentStatus::Loading {
            progress: LoadProgress { loaded: 30, total: 120 },
            page_count: None,
        };
        assert_eq!(loading.progress_percent(), 25);
        assert_eq!(DocumentStatus::Ready { page_count: 3 }.progress_percent(), 100);
        assert_eq!(DocumentStatus::Idle.progress_percent(), 0);
        assert_eq!(loading.label(), "loading");
    }
}
