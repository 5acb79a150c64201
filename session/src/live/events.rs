use super::snapshot::SessionSnapshot;

/// Events broadcast from the session actor to all subscribers.
#[derive(Debug, Clone)]
#[allow(clippy::large_enum_variant)]
pub enum SessionEvent {
    /// Full state snapshot after any change, local or remote.
    StateChanged(SessionSnapshot),
    /// Error notification.
    Error(String),
    /// The session can no longer continue; the actor has stopped.
    Terminated(String),
}
