use fruitreels_core::{ProvablyFairRng, SessionStore, StoreConfig, DEFAULT_ACCOUNT};

fn main() {
    // Play a session to exhaustion on a provably fair stream, then cash out
    let server_seed = "example-server-seed";
    let client_seed = "example-client-seed";
    let store = SessionStore::new(StoreConfig::default());

    let mut nonce = 0u64;
    loop {
        nonce += 1;
        let mut rng = ProvablyFairRng::new(server_seed, client_seed, nonce);
        match store.spin(DEFAULT_ACCOUNT, None, &mut rng) {
            Ok(out) => println!(
                "nonce={} reels={} reward={} credits={} rolls={}",
                nonce,
                out.letters(),
                out.reward,
                out.credits,
                out.rolls
            ),
            Err(e) => {
                println!("stopped: {e}");
                break;
            }
        }
        if nonce == 25 {
            break;
        }
    }

    match store.cash_out(DEFAULT_ACCOUNT, None) {
        Ok(c) => println!("cashed out {} -> wallet {}", c.amount_cashed, c.wallet_balance),
        Err(e) => println!("cashout refused: {e}"),
    }
}
