/// Reload progress.
///
/// ```text
/// Idle → Validating(path) → Loaded → Swapped
///                   └──────────┴──→ Failed
/// ```
/// A dry run stops in `Loaded`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ReloadState {
    #[default]
    Idle,
    Validating { path: String },
    Loaded { sections: Vec<String> },
    Swapped { sections: Vec<String> },
    Failed { reason: String },
}

impl ReloadState {
    pub fn name(&self) -> &'static str {
        match self {
            ReloadState::Idle => "idle",
            ReloadState::Validating { .. } => "validating",
            ReloadState::Loaded { .. } => "loaded",
            ReloadState::Swapped { .. } => "swapped",
            ReloadState::Failed { .. } => "failed",
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, ReloadState::Failed { .. })
    }
}
