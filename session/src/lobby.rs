//! Creating and joining online games by join code.

use chess::fen::STANDARD_START_FEN;
use chess::PlayerSide;

use crate::store::{GameRecord, GameStore, RecordStatus, StoreError};

pub const JOIN_CODE_LEN: usize = 6;

/// Seat requested by the player creating a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeatChoice {
    White,
    Black,
    Random,
}

impl SeatChoice {
    fn resolve(self) -> PlayerSide {
        match self {
            Self::White => PlayerSide::White,
            Self::Black => PlayerSide::Black,
            Self::Random => {
                if rand::random::<bool>() {
                    PlayerSide::White
                } else {
                    PlayerSide::Black
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LobbyError {
    #[error("Code must be 6 characters long.")]
    InvalidCode,
    #[error("No waiting game with that code.")]
    NotFound,
    #[error("You can't join your own game.")]
    OwnGame,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Store a waiting game at the standard start with the creator seated.
#[tracing::instrument(skip(store))]
pub async fn create_online_game<S: GameStore>(
    store: &S,
    creator_id: &str,
    seat: SeatChoice,
    join_code: &str,
) -> Result<GameRecord, LobbyError> {
    let code = normalize_code(join_code)?;
    let side = seat.resolve();
    let creator = Some(creator_id.to_string());
    let (white_id, black_id) = match side {
        PlayerSide::White => (creator, None),
        PlayerSide::Black => (None, creator),
    };

    let record = store
        .create(GameRecord {
            id: String::new(),
            fen: STANDARD_START_FEN.to_string(),
            pgn: String::new(),
            white_id,
            black_id,
            status: RecordStatus::Waiting,
            join_code: code,
        })
        .await?;
    tracing::info!(id = %record.id, side = %side, "Online game created");
    Ok(record)
}

/// Take the open seat of the waiting game with `code` and activate it.
#[tracing::instrument(skip(store))]
pub async fn join_online_game<S: GameStore>(
    store: &S,
    code: &str,
    user_id: &str,
) -> Result<GameRecord, LobbyError> {
    let code = normalize_code(code)?;
    let mut record = store
        .find_waiting_by_code(&code)
        .await?
        .ok_or(LobbyError::NotFound)?;

    if record.white_id.as_deref() == Some(user_id) || record.black_id.as_deref() == Some(user_id)
    {
        return Err(LobbyError::OwnGame);
    }

    if record.white_id.is_none() {
        record.white_id = Some(user_id.to_string());
    } else {
        record.black_id = Some(user_id.to_string());
    }
    record.status = RecordStatus::Active;
    store.update(record.clone()).await?;
    tracing::info!(id = %record.id, "Joined online game");
    Ok(record)
}

fn normalize_code(code: &str) -> Result<String, LobbyError> {
    let code = code.trim();
    if code.chars().count() != JOIN_CODE_LEN {
        return Err(LobbyError::InvalidCode);
    }
    Ok(code.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn test_create_seats_creator() {
        let store = MemoryStore::new();
        let record = create_online_game(&store, "alice", SeatChoice::Black, "ABC123")
            .await
            .unwrap();
        assert_eq!(record.white_id, None);
        assert_eq!(record.black_id.as_deref(), Some("alice"));
        assert_eq!(record.status, RecordStatus::Waiting);
        assert_eq!(record.join_code, "abc123");
        assert_eq!(record.fen, STANDARD_START_FEN);
        assert!(record.pgn.is_empty());
    }

    #[tokio::test]
    async fn test_random_seat_fills_exactly_one_side() {
        let store = MemoryStore::new();
        let record = create_online_game(&store, "alice", SeatChoice::Random, "abc123")
            .await
            .unwrap();
        assert!(record.white_id.is_some() ^ record.black_id.is_some());
    }

    #[tokio::test]
    async fn test_join_fills_empty_seat() {
        let store = MemoryStore::new();
        let created = create_online_game(&store, "alice", SeatChoice::White, "abc123")
            .await
            .unwrap();

        let joined = join_online_game(&store, " AbC123 ", "bob").await.unwrap();
        assert_eq!(joined.id, created.id);
        assert_eq!(joined.white_id.as_deref(), Some("alice"));
        assert_eq!(joined.black_id.as_deref(), Some("bob"));
        assert_eq!(joined.status, RecordStatus::Active);
        assert_eq!(store.get(&created.id).await.unwrap(), joined);

        // No longer waiting.
        assert_eq!(
            join_online_game(&store, "abc123", "carol").await,
            Err(LobbyError::NotFound)
        );
    }

    #[tokio::test]
    async fn test_join_rejections() {
        let store = MemoryStore::new();
        create_online_game(&store, "alice", SeatChoice::White, "abc123")
            .await
            .unwrap();

        let err = join_online_game(&store, "abc12", "bob").await.unwrap_err();
        assert_eq!(err.to_string(), "Code must be 6 characters long.");

        let err = join_online_game(&store, "zzz999", "bob").await.unwrap_err();
        assert_eq!(err.to_string(), "No waiting game with that code.");

        let err = join_online_game(&store, "abc123", "alice").await.unwrap_err();
        assert_eq!(err.to_string(), "You can't join your own game.");
    }
}
