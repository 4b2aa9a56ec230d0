use fruitreels_core::{
    is_three_of_a_kind, resolve_round, GameError, ProvablyFairRng, SessionState, SessionStore,
    SnapshotPolicy, StoreConfig, SuppressionPolicy, SymbolKind,
};
use rand::{rngs::StdRng, RngCore, SeedableRng};
use std::collections::VecDeque;

/// Replays a fixed list of words; `symbol_word` turns a kind into the word
/// that draws it.
struct ScriptedRng(VecDeque<u32>);

impl ScriptedRng {
    fn reels(rounds: &[[SymbolKind; 3]]) -> Self {
        Self(rounds.iter().flatten().map(|k| symbol_word(*k)).collect())
    }
}

fn symbol_word(kind: SymbolKind) -> u32 {
    let idx = SymbolKind::ALL.iter().position(|k| *k == kind).unwrap() as u32;
    idx << 30
}

impl RngCore for ScriptedRng {
    fn next_u32(&mut self) -> u32 {
        self.0.pop_front().expect("script exhausted")
    }
    fn next_u64(&mut self) -> u64 {
        ((self.next_u32() as u64) << 32) | self.next_u32() as u64
    }
    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for b in dest {
            *b = self.next_u32() as u8;
        }
    }
    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

/// Records every `next_u32` so a test can see the first draw of a round.
struct Recording<R> {
    inner: R,
    words: Vec<u32>,
}

impl<R: RngCore> RngCore for Recording<R> {
    fn next_u32(&mut self) -> u32 {
        let w = self.inner.next_u32();
        self.words.push(w);
        w
    }
    fn next_u64(&mut self) -> u64 {
        self.inner.next_u64()
    }
    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.inner.fill_bytes(dest)
    }
    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.inner.try_fill_bytes(dest)
    }
}

fn win_rate(credits: u64, trials: u32, seed: u64) -> f64 {
    let policy = SuppressionPolicy::house_default();
    let mut rng = StdRng::seed_from_u64(seed);
    let wins = (0..trials)
        .filter(|_| resolve_round(&mut rng, &policy, credits).is_win())
        .count();
    wins as f64 / trials as f64
}

#[test]
fn suppression_scales_win_rate_by_band() {
    // three of a kind over four equally likely kinds: 4 * (1/4)^3
    let base = 1.0 / 16.0;
    for (credits, p) in [(10u64, 0.0), (50, 0.3), (80, 0.6)] {
        let rate = win_rate(credits, 100_000, credits);
        let expected = base * (1.0 - p);
        assert!(
            (rate - expected).abs() < 0.004,
            "credits={credits} rate={rate} expected={expected}"
        );
    }
}

#[test]
fn about_thirty_percent_of_wins_discarded_at_fifty() {
    let policy = SuppressionPolicy::house_default();
    let mut rng = Recording {
        inner: StdRng::seed_from_u64(50),
        words: Vec::new(),
    };
    let (mut drawn_wins, mut kept_wins) = (0u32, 0u32);
    for _ in 0..100_000 {
        rng.words.clear();
        let out = resolve_round(&mut rng, &policy, 50);
        let first: Vec<u32> = rng.words[..3].iter().map(|w| w >> 30).collect();
        if first[0] == first[1] && first[1] == first[2] {
            drawn_wins += 1;
            if out.is_win() {
                kept_wins += 1;
            }
        } else {
            assert!(!out.is_win());
        }
    }
    let discarded = 1.0 - kept_wins as f64 / drawn_wins as f64;
    assert!((discarded - 0.3).abs() < 0.03, "discarded={discarded}");
}

#[test]
fn outcomes_are_internally_consistent() {
    let policy = SuppressionPolicy::house_default();
    for nonce in 0..2_000u64 {
        let mut rng = ProvablyFairRng::new("server", "client", nonce);
        let out = resolve_round(&mut rng, &policy, 75);
        assert_eq!(out.is_win(), is_three_of_a_kind(&out.result));
        assert_eq!(out.reward > 0, out.is_win());
    }
}

#[test]
fn credit_floor_and_roll_accounting() {
    let store = SessionStore::default();
    let mut rng = StdRng::seed_from_u64(11);
    let mut accepted = 0u64;
    for _ in 0..500 {
        let before = store.session("p");
        match store.spin("p", None, &mut rng) {
            Ok(out) => {
                accepted += 1;
                assert_eq!(out.rolls, accepted);
            }
            Err(e) => {
                assert_eq!(e, GameError::InsufficientCredits);
                assert_eq!(store.session("p"), before);
            }
        }
        let s = store.session("p").unwrap();
        assert_eq!(s.rolls, accepted);
        assert_eq!(s.history.len() as u64, s.rolls);
    }
}

#[test]
fn spin_at_zero_credits_leaves_state_unchanged() {
    let store = SessionStore::new(StoreConfig::legacy());
    let empty = SessionState {
        credits: 0,
        rolls: 4,
        history: vec![],
        ended: false,
    };
    let mut rng = StdRng::seed_from_u64(1);
    assert_eq!(
        store.spin("p", Some(empty.clone()), &mut rng),
        Err(GameError::InsufficientCredits)
    );
    assert_eq!(store.session("p"), Some(empty));
}

#[test]
fn cashout_needs_two_rolls() {
    let store = SessionStore::default();
    let mut rng =
        ScriptedRng::reels(&[[SymbolKind::Cherry, SymbolKind::Lemon, SymbolKind::Orange]]);
    store.spin("p", None, &mut rng).unwrap();

    let err = store.cash_out("p", None).unwrap_err();
    assert_eq!(
        err,
        GameError::InsufficientEngagement {
            rolls: 1,
            required: 2
        }
    );
    assert_eq!(err.to_string(), "You must roll at least twice before cashing out.");
    assert_eq!(store.session("p").unwrap().credits, 9);
    assert_eq!(store.wallet("p").balance, 0);
}

#[test]
fn two_spins_then_lemon_win_cashes_out() {
    let store = SessionStore::default();
    let mut rng = ScriptedRng::reels(&[
        [SymbolKind::Cherry, SymbolKind::Lemon, SymbolKind::Orange],
        [SymbolKind::Lemon; 3],
    ]);
    let first = store.spin("p", None, &mut rng).unwrap();
    assert_eq!((first.reward, first.credits), (0, 9));

    let second = store.spin("p", None, &mut rng).unwrap();
    assert!(second.is_win());
    assert_eq!(second.reward, 20);
    // the session only loses its stake; the reward is reported
    assert_eq!(second.credits, 8);
    assert_eq!(second.rolls, 2);
    assert_eq!(store.session("p").unwrap().credits, 8);

    let cashout = store.cash_out("p", None).unwrap();
    assert_eq!(cashout.amount_cashed, 8);
    assert_eq!(cashout.wallet_balance, 8);
    assert_eq!(cashout.rolls, 2);
    let s = store.session("p").unwrap();
    assert_eq!((s.credits, s.rolls, s.history.len()), (0, 2, 2));

    // empty cashout still succeeds once the roll rule is met
    let again = store.cash_out("p", None).unwrap();
    assert_eq!((again.amount_cashed, again.wallet_balance), (0, 8));
    assert_eq!(
        store.spin("p", None, &mut rng),
        Err(GameError::InsufficientCredits)
    );
}

#[test]
fn credited_rewards_are_opt_in() {
    let store = SessionStore::new(StoreConfig {
        credit_rewards: true,
        ..StoreConfig::default()
    });
    let mut rng = ScriptedRng::reels(&[
        [SymbolKind::Cherry, SymbolKind::Lemon, SymbolKind::Orange],
        [SymbolKind::Lemon; 3],
    ]);
    store.spin("p", None, &mut rng).unwrap();
    let round = store.play("p", None, &mut rng).unwrap();
    assert_eq!(round.balance_in, 8);
    assert_eq!(round.outcome.credits, 28);

    let cashout = store.cash_out("p", None).unwrap();
    assert_eq!((cashout.amount_cashed, cashout.wallet_balance), (28, 28));
}

#[test]
fn legacy_flow_adopts_client_balance() {
    let store = SessionStore::new(StoreConfig::legacy());
    let mut rng = ScriptedRng::reels(&[[SymbolKind::Orange; 3]]);
    let out = store.spin("p", None, &mut rng).unwrap();
    // reward is reported but the balance is left to the client
    assert_eq!((out.reward, out.credits), (30, 9));

    let client_view = SessionState {
        credits: 39,
        rolls: 2,
        history: vec![],
        ended: false,
    };
    let cashout = store.cash_out("p", Some(client_view)).unwrap();
    assert_eq!(cashout.amount_cashed, 39);
    assert_eq!(store.session("p").unwrap().credits, 0);
}

#[test]
fn reset_keeps_wallet() {
    let store = SessionStore::new(StoreConfig {
        snapshot_policy: SnapshotPolicy::Trusted,
        ..StoreConfig::default()
    });
    let rich = SessionState {
        credits: 70,
        rolls: 5,
        history: vec![],
        ended: true,
    };
    assert_eq!(store.cash_out("p", Some(rich.clone())), Err(GameError::NoActiveSession));

    let playing = SessionState { ended: false, ..rich };
    store.cash_out("p", Some(playing)).unwrap();
    assert_eq!(store.wallet("p").balance, 70);

    for _ in 0..2 {
        assert_eq!(store.reset("p"), SessionState::fresh());
        assert_eq!(store.session("p"), Some(SessionState::fresh()));
        assert_eq!(store.wallet("p").balance, 70);
    }
}
