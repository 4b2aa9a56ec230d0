use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::{engine::RoundOutcome, error::GameError};

pub const STARTING_CREDITS: u64 = 10;

/// Rolls required in a session before its credits may be cashed out.
pub const MIN_ROLLS_FOR_CASHOUT: u64 = 2;

/// One continuous play sequence. Also the snapshot shape exchanged with
/// callers: `{ credits, rolls, history, ended }`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionState {
    pub credits: u64,
    pub rolls: u64,
    #[serde(default)]
    pub history: Vec<RoundOutcome>,
    #[serde(default)]
    pub ended: bool,
}

impl SessionState {
    pub fn fresh() -> Self {
        Self {
            credits: STARTING_CREDITS,
            rolls: 0,
            history: Vec::new(),
            ended: false,
        }
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::fresh()
    }
}

/// Credits extracted from play. Only grows.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct WalletAccount {
    pub balance: u64,
}

/// What the store does with a session snapshot handed in by a caller.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotPolicy {
    /// Drop it; the store's own state is authoritative.
    Ignore,
    /// Adopt it only if it passes [`validate_snapshot`].
    #[default]
    Validated,
    /// Adopt it as-is.
    Trusted,
}

impl FromStr for SnapshotPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ignore" => Ok(Self::Ignore),
            "validated" => Ok(Self::Validated),
            "trusted" => Ok(Self::Trusted),
            other => Err(format!("unknown snapshot policy {other:?}")),
        }
    }
}

/// Range and consistency checks for a caller-supplied snapshot. Legacy
/// clients send `history: []` with a non-zero roll count, so history may be
/// shorter than `rolls` but never longer.
pub fn validate_snapshot(snapshot: &SessionState, max_credits: u64) -> Result<(), GameError> {
    let invalid = |msg: String| Err(GameError::InvalidSnapshot(msg));

    if snapshot.credits > max_credits {
        return invalid(format!(
            "credits {} exceed the limit of {}",
            snapshot.credits, max_credits
        ));
    }
    if snapshot.history.len() as u64 > snapshot.rolls {
        return invalid(format!(
            "{} history records for {} rolls",
            snapshot.history.len(),
            snapshot.rolls
        ));
    }
    let mut last_roll = 0u64;
    for (i, record) in snapshot.history.iter().enumerate() {
        if record.rolls <= last_roll || record.rolls > snapshot.rolls {
            return invalid(format!("history record {i} has roll counter {}", record.rolls));
        }
        last_roll = record.rolls;
        let expected = record.matched().map_or(0, |k| k.reward());
        if record.reward != expected {
            return invalid(format!(
                "history record {i} pays {} for {}",
                record.reward,
                record.letters()
            ));
        }
    }
    Ok(())
}
