use chess::PieceKind;
use tokio::sync::{broadcast, oneshot};

use super::events::SessionEvent;
use super::snapshot::SessionSnapshot;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("It is not your turn")]
    NotYourTurn,
    #[error("Waiting for an opponent to join")]
    WaitingForOpponent,
    #[error("The game is over")]
    GameOver,
    #[error("Illegal move: {0}")]
    IllegalMove(String),
    #[error("Game record no longer exists")]
    RemoteRecordMissing,
    #[error("Machine opponent failed: {0}")]
    MachineFailed(String),
    #[error("Session not found: {0}")]
    NotFound(String),
    #[error("Session closed")]
    Closed,
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A move as the player entered it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveInput {
    /// SAN (`Nf3`, `O-O`, `e8=Q`) or coordinates (`g1f3`, `e7e8q`).
    Notation(String),
    /// A board drop. Promotion defaults to a queen.
    Squares {
        from: String,
        to: String,
        promotion: Option<PieceKind>,
    },
}

impl MoveInput {
    pub fn notation(text: impl Into<String>) -> Self {
        Self::Notation(text.into())
    }

    pub fn squares(from: &str, to: &str) -> Self {
        Self::Squares {
            from: from.to_string(),
            to: to.to_string(),
            promotion: None,
        }
    }
}

impl std::fmt::Display for MoveInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Notation(text) => f.write_str(text),
            Self::Squares {
                from,
                to,
                promotion,
            } => {
                write!(f, "{}{}", from, to)?;
                if let Some(piece) = promotion {
                    write!(f, "{}", piece)?;
                }
                Ok(())
            }
        }
    }
}

/// Commands sent to the session actor. Each embeds a oneshot for the reply.
/// Machine replies are requested by the actor itself.
pub enum SessionCommand {
    SubmitMove {
        input: MoveInput,
        reply: oneshot::Sender<Result<SessionSnapshot, SessionError>>,
    },
    GetSnapshot {
        reply: oneshot::Sender<SessionSnapshot>,
    },
    Subscribe {
        reply: oneshot::Sender<(SessionSnapshot, broadcast::Receiver<SessionEvent>)>,
    },
    Shutdown,
}
