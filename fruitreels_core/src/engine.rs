use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    policy::SuppressionPolicy,
    rng::ProvablyFairRng,
    symbols::{draw_one, SymbolKind},
};

/// Result of one round. Serialises to the legacy history record shape
/// `{ result: [{icon, letter}; 3], reward, credits, rolls }`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoundOutcome {
    pub result: [SymbolKind; 3],
    pub reward: u64,
    /// Session balance after the round.
    pub credits: u64,
    /// Cumulative roll count after the round.
    pub rolls: u64,
}

impl RoundOutcome {
    pub fn is_win(&self) -> bool {
        is_three_of_a_kind(&self.result)
    }

    /// The matched kind of a winning round.
    pub fn matched(&self) -> Option<SymbolKind> {
        self.is_win().then_some(self.result[0])
    }

    /// Letter codes of the three reels, e.g. `"CLO"`.
    pub fn letters(&self) -> String {
        self.result.iter().map(|k| k.letter()).collect()
    }
}

pub fn draw_reels<R: RngCore + ?Sized>(rng: &mut R) -> [SymbolKind; 3] {
    [draw_one(rng), draw_one(rng), draw_one(rng)]
}

pub fn is_three_of_a_kind(reels: &[SymbolKind; 3]) -> bool {
    reels[0] == reels[1] && reels[1] == reels[2]
}

/// Draws three reels for a session whose post-stake balance is
/// `current_credits`.
///
/// A winning draw is kept or, with the policy's probability for that balance,
/// thrown away and replaced by fresh draws until one is not a three-of-a-kind.
/// Every reel shown is a genuine draw; suppression only rejects winners.
/// `rolls` is left at 0 for the caller to fill in.
pub fn resolve_round<R: RngCore + ?Sized>(
    rng: &mut R,
    policy: &SuppressionPolicy,
    current_credits: u64,
) -> RoundOutcome {
    let mut reels = draw_reels(rng);
    if is_three_of_a_kind(&reels) {
        let p = policy.probability(current_credits);
        if p > 0.0 && rng.gen_bool(p) {
            let discarded = reels;
            let mut redraws = 0u32;
            // terminates with probability 1: a losing draw has probability 3/4
            while is_three_of_a_kind(&reels) {
                reels = draw_reels(rng);
                redraws += 1;
            }
            debug!(
                credits = current_credits,
                discarded = ?discarded[0],
                redraws,
                "winning draw suppressed"
            );
        }
    }
    let reward = if is_three_of_a_kind(&reels) {
        reels[0].reward()
    } else {
        0
    };
    RoundOutcome {
        result: reels,
        reward,
        credits: current_credits,
        rolls: 0,
    }
}

/// Recompute a served round from its revealed seeds and compare the reels.
pub fn verify_round(
    server_seed: &str,
    client_seed: &str,
    nonce: u64,
    policy: &SuppressionPolicy,
    balance_in: u64,
    expected: &[SymbolKind; 3],
) -> bool {
    let mut rng = ProvablyFairRng::new(server_seed, client_seed, nonce);
    resolve_round(&mut rng, policy, balance_in).result == *expected
}
