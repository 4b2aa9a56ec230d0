//! Per-account session and wallet storage.
//!
//! Every account owns one [`SessionState`] and one [`WalletAccount`] behind
//! its own mutex, so `spin`, `cash_out` and `reset` on one account are fully
//! serialized while different accounts never contend beyond the map lookup.

use parking_lot::{Mutex, RwLock};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::{
    engine::{resolve_round, RoundOutcome},
    error::{GameError, GameResult},
    policy::SuppressionPolicy,
    session::{
        validate_snapshot, SessionState, SnapshotPolicy, WalletAccount, MIN_ROLLS_FOR_CASHOUT,
    },
};

pub const DEFAULT_ACCOUNT: &str = "default";

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub policy: SuppressionPolicy,
    pub snapshot_policy: SnapshotPolicy,
    /// Upper bound on `credits` for a validated snapshot.
    pub max_snapshot_credits: u64,
    /// Add a winning round's reward to the session balance. Off by default:
    /// the session only ever loses its stake and the reward is reported.
    pub credit_rewards: bool,
}

impl StoreConfig {
    /// The legacy client keeps its own balance and pushes it back as a
    /// snapshot on every call.
    pub fn legacy() -> Self {
        Self {
            snapshot_policy: SnapshotPolicy::Trusted,
            ..Self::default()
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            policy: SuppressionPolicy::house_default(),
            snapshot_policy: SnapshotPolicy::Validated,
            max_snapshot_credits: 1000,
            credit_rewards: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Cashout {
    pub wallet_balance: u64,
    pub amount_cashed: u64,
    /// Session roll count at the moment of the cashout.
    pub rolls: u64,
}

/// A played round plus the post-stake balance it was resolved against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayedRound {
    pub outcome: RoundOutcome,
    pub balance_in: u64,
}

#[derive(Debug, Default)]
struct Account {
    session: Option<SessionState>,
    wallet: WalletAccount,
    depleted_since: Option<Instant>,
}

impl Account {
    fn adopt(&mut self, snapshot: Option<SessionState>, config: &StoreConfig) -> GameResult<()> {
        let Some(snapshot) = snapshot else {
            return Ok(());
        };
        match config.snapshot_policy {
            SnapshotPolicy::Ignore => return Ok(()),
            SnapshotPolicy::Validated => {
                if let Err(e) = validate_snapshot(&snapshot, config.max_snapshot_credits) {
                    warn!(error = %e, "snapshot rejected");
                    return Err(e);
                }
            }
            SnapshotPolicy::Trusted => {}
        }
        self.session = Some(snapshot);
        self.track_depletion(Instant::now());
        Ok(())
    }

    fn track_depletion(&mut self, now: Instant) {
        match &self.session {
            Some(s) if s.credits == 0 && !s.ended => {
                self.depleted_since.get_or_insert(now);
            }
            _ => self.depleted_since = None,
        }
    }

    fn install_fresh(&mut self) -> SessionState {
        let fresh = SessionState::fresh();
        self.session = Some(fresh.clone());
        self.depleted_since = None;
        fresh
    }
}

#[derive(Debug, Default)]
pub struct SessionStore {
    config: StoreConfig,
    accounts: RwLock<HashMap<String, Arc<Mutex<Account>>>>,
}

impl SessionStore {
    pub fn new(config: StoreConfig) -> Self {
        Self {
            config,
            accounts: RwLock::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    fn account(&self, id: &str) -> Arc<Mutex<Account>> {
        if let Some(entry) = self.accounts.read().get(id) {
            return entry.clone();
        }
        self.accounts
            .write()
            .entry(id.to_string())
            .or_default()
            .clone()
    }

    /// Stake one credit and play a round.
    pub fn spin<R: RngCore + ?Sized>(
        &self,
        account: &str,
        snapshot: Option<SessionState>,
        rng: &mut R,
    ) -> GameResult<RoundOutcome> {
        self.play(account, snapshot, rng).map(|round| round.outcome)
    }

    /// Like [`SessionStore::spin`], also reporting the balance the resolver saw.
    pub fn play<R: RngCore + ?Sized>(
        &self,
        account: &str,
        snapshot: Option<SessionState>,
        rng: &mut R,
    ) -> GameResult<PlayedRound> {
        let entry = self.account(account);
        let mut acct = entry.lock();
        acct.adopt(snapshot, &self.config)?;

        let session = acct.session.get_or_insert_with(SessionState::fresh);
        if session.ended {
            return Err(GameError::SessionEnded);
        }
        if session.credits == 0 {
            return Err(GameError::InsufficientCredits);
        }
        session.credits -= 1;
        session.rolls += 1;

        let balance_in = session.credits;
        let mut outcome = resolve_round(rng, &self.config.policy, balance_in);
        if self.config.credit_rewards {
            session.credits = session.credits.saturating_add(outcome.reward);
        }
        outcome.credits = session.credits;
        outcome.rolls = session.rolls;
        session.history.push(outcome.clone());

        acct.track_depletion(Instant::now());
        Ok(PlayedRound {
            outcome,
            balance_in,
        })
    }

    /// Move every session credit into the wallet.
    pub fn cash_out(&self, account: &str, snapshot: Option<SessionState>) -> GameResult<Cashout> {
        let entry = self.account(account);
        let mut acct = entry.lock();
        acct.adopt(snapshot, &self.config)?;

        let Account {
            session, wallet, ..
        } = &mut *acct;
        let session = match session {
            Some(s) if !s.ended => s,
            _ => return Err(GameError::NoActiveSession),
        };
        if session.rolls < MIN_ROLLS_FOR_CASHOUT {
            return Err(GameError::InsufficientEngagement {
                rolls: session.rolls,
                required: MIN_ROLLS_FOR_CASHOUT,
            });
        }
        let amount_cashed = std::mem::take(&mut session.credits);
        wallet.balance = wallet.balance.saturating_add(amount_cashed);
        let cashout = Cashout {
            wallet_balance: wallet.balance,
            amount_cashed,
            rolls: session.rolls,
        };

        acct.track_depletion(Instant::now());
        info!(
            account,
            amount = cashout.amount_cashed,
            wallet = cashout.wallet_balance,
            "cashed out"
        );
        Ok(cashout)
    }

    /// Replace the session with a fresh one. The wallet is kept.
    pub fn reset(&self, account: &str) -> SessionState {
        let entry = self.account(account);
        let fresh = entry.lock().install_fresh();
        info!(account, "session reset");
        fresh
    }

    pub fn session(&self, account: &str) -> Option<SessionState> {
        let entry = self.accounts.read().get(account).cloned()?;
        let session = entry.lock().session.clone();
        session
    }

    pub fn wallet(&self, account: &str) -> WalletAccount {
        let Some(entry) = self.accounts.read().get(account).cloned() else {
            return WalletAccount::default();
        };
        let wallet = entry.lock().wallet;
        wallet
    }

    /// Reset every session that has sat at zero credits for at least `idle`.
    pub fn reset_depleted(&self, idle: Duration) -> Vec<String> {
        self.reset_depleted_at(Instant::now(), idle)
    }

    pub fn reset_depleted_at(&self, now: Instant, idle: Duration) -> Vec<String> {
        let entries: Vec<(String, Arc<Mutex<Account>>)> = self
            .accounts
            .read()
            .iter()
            .map(|(id, entry)| (id.clone(), entry.clone()))
            .collect();

        let mut expired = Vec::new();
        for (id, entry) in entries {
            let mut acct = entry.lock();
            let due = acct
                .depleted_since
                .is_some_and(|since| now.saturating_duration_since(since) >= idle);
            let still_empty = acct
                .session
                .as_ref()
                .is_some_and(|s| s.credits == 0 && !s.ended);
            if due && still_empty {
                acct.install_fresh();
                info!(account = %id, "depleted session reset");
                expired.push(id);
            }
        }
        expired.sort();
        expired
    }
}
