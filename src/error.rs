use thiserror::Error;

/// Failure kinds the selection pipeline branches on.
///
/// Plumbing code returns `anyhow::Result`; these variants are attached as the
/// root cause so callers can `downcast_ref::<GliderError>()` when the kind matters
/// (the service only treats [`GliderError::HookPermission`] specially).
#[derive(Debug, Error)]
pub enum GliderError {
    #[error("the operating system denied the global input hook: {0}")]
    HookPermission(String),
    #[error("global input hooks are unavailable: {0}")]
    HookUnavailable(String),
    #[error("clipboard access failed: {0}")]
    Clipboard(String),
    #[error("failed to simulate the copy keystroke: {0}")]
    Keystroke(String),
    #[error("selection probe failed: {0}")]
    Probe(String),
    #[error("display enumeration failed: {0}")]
    Topology(String),
}

impl GliderError {
    pub fn is_permission(err: &anyhow::Error) -> bool {
        matches!(
            err.downcast_ref::<GliderError>(),
            Some(GliderError::HookPermission(_))
        )
    }
}
