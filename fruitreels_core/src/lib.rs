pub mod engine;
pub mod error;
pub mod policy;
pub mod rng;
pub mod session;
pub mod store;
pub mod symbols;

pub use crate::engine::{draw_reels, is_three_of_a_kind, resolve_round, verify_round, RoundOutcome};
pub use crate::error::{GameError, GameResult};
pub use crate::policy::{SuppressionBand, SuppressionPolicy};
pub use crate::rng::{derive_hash_hex, ProvablyFairRng};
pub use crate::session::{
    validate_snapshot, SessionState, SnapshotPolicy, WalletAccount, MIN_ROLLS_FOR_CASHOUT,
    STARTING_CREDITS,
};
pub use crate::store::{Cashout, PlayedRound, SessionStore, StoreConfig, DEFAULT_ACCOUNT};
pub use crate::symbols::{draw_one, SymbolFace, SymbolKind};
