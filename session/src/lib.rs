//! Live game sessions, replay views and the shared game-record store.

pub mod live;
pub mod lobby;
pub mod replay;
pub mod store;

pub use live::{
    MoveInput, SessionError, SessionEvent, SessionHandle, SessionManager, SessionSnapshot,
};
pub use lobby::{create_online_game, join_online_game, LobbyError, SeatChoice};
pub use replay::{spawn_replay, KeyInput, ReplayHandle, ReplayNav, ReplayView};
pub use store::{GameRecord, GameStore, MemoryStore, RecordStatus, StoreError};
