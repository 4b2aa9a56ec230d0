use chrono::{DateTime, Utc};
use fruitreels_core::{Cashout, GameError, RoundOutcome, SessionState, SymbolKind};
use serde::{Deserialize, Serialize};

/// Body of `POST /api/slot`. Every field is optional; an empty body is a
/// plain spin.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct SpinRequest {
    #[serde(default)]
    pub session: Option<SessionState>,
    #[serde(default)]
    pub client_seed: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SpinResponse {
    pub result: [SymbolKind; 3],
    pub reward: u64,
    pub credits: u64,
    pub rolls: u64,
    pub server_seed_hash: String,
    pub nonce: u64,
}

impl SpinResponse {
    pub fn new(outcome: RoundOutcome, server_seed_hash: String, nonce: u64) -> Self {
        Self {
            result: outcome.result,
            reward: outcome.reward,
            credits: outcome.credits,
            rolls: outcome.rolls,
            server_seed_hash,
            nonce,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct CashoutRequest {
    #[serde(default)]
    pub session: Option<SessionState>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CashoutResponse {
    pub message: String,
    /// Wallet balance after the move.
    pub credits: u64,
    #[serde(rename = "cashedOut")]
    pub cashed_out: u64,
}

impl From<Cashout> for CashoutResponse {
    fn from(c: Cashout) -> Self {
        Self {
            message: "Cashed out successfully".to_string(),
            credits: c.wallet_balance,
            cashed_out: c.amount_cashed,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ResetResponse {
    pub message: String,
    #[serde(flatten)]
    pub session: SessionState,
}

impl From<SessionState> for ResetResponse {
    fn from(session: SessionState) -> Self {
        Self {
            message: "Session reset".to_string(),
            session,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct VerifyResponse {
    pub server_seed_hash: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct AccountView {
    pub account: String,
    pub session: Option<SessionState>,
    pub wallet_balance: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RoundLogEntry {
    pub id: i64,
    pub ts: DateTime<Utc>,
    pub account: String,
    pub client_seed: String,
    pub nonce: i64,
    pub server_seed_hash: String,
    /// Reel letters, e.g. `"CLO"`.
    pub symbols: String,
    pub reward: i64,
    /// Post-stake balance the round was resolved against.
    pub balance_in: i64,
    pub credits: i64,
    pub rolls: i64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CashoutLogEntry {
    pub id: i64,
    pub ts: DateTime<Utc>,
    pub account: String,
    pub amount: i64,
    pub wallet_balance: i64,
    pub rolls: i64,
}

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("invalid request: {0}")]
    Invalid(String),
    #[error(transparent)]
    Rejected(#[from] GameError),
    #[error("internal server error")]
    Internal,
}

impl ApiError {
    pub fn body(&self) -> ErrorBody {
        ErrorBody {
            error: self.to_string(),
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
