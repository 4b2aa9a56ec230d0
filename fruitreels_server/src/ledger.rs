use fruitreels_core::{derive_hash_hex, Cashout, RoundOutcome};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

// Schema lives in migrations/

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct StoredParams {
    pub server_seed: String,
    pub server_seed_hash: String,
    pub nonce: i64,
}

pub async fn get_params(pool: &SqlitePool) -> anyhow::Result<StoredParams> {
    let row = sqlx::query_as::<_, StoredParams>(
        "SELECT server_seed, server_seed_hash, nonce FROM params WHERE id = 1",
    )
    .fetch_one(pool)
    .await?;
    Ok(row)
}

pub async fn set_params(pool: &SqlitePool, p: &StoredParams) -> anyhow::Result<()> {
    sqlx::query("UPDATE params SET server_seed = ?, server_seed_hash = ?, nonce = ? WHERE id = 1")
        .bind(&p.server_seed)
        .bind(&p.server_seed_hash)
        .bind(p.nonce)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn init_db(db: &SqlitePool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(db).await?;
    // ensure server_seed_hash matches server_seed
    let mut p = get_params(db).await?;
    let hash = derive_hash_hex(p.server_seed.as_bytes());
    if p.server_seed_hash != hash {
        p.server_seed_hash = hash;
        set_params(db, &p).await?;
    }
    Ok(())
}

/// Allocates the next nonce. Callers serialize this themselves.
pub async fn next_nonce(pool: &SqlitePool) -> anyhow::Result<StoredParams> {
    let mut p = get_params(pool).await?;
    p.nonce += 1;
    set_params(pool, &p).await?;
    Ok(p)
}

pub struct RoundRecord<'a> {
    pub account: &'a str,
    pub client_seed: &'a str,
    pub nonce: i64,
    pub server_seed_hash: &'a str,
    pub balance_in: u64,
    pub outcome: &'a RoundOutcome,
}

pub async fn record_round(pool: &SqlitePool, r: &RoundRecord<'_>) -> anyhow::Result<()> {
    let ts = chrono::Utc::now().to_rfc3339();
    sqlx::query(
        "INSERT INTO rounds (ts, account, client_seed, nonce, server_seed_hash, symbols, reward, balance_in, credits, rolls) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(ts)
    .bind(r.account)
    .bind(r.client_seed)
    .bind(r.nonce)
    .bind(r.server_seed_hash)
    .bind(r.outcome.letters())
    .bind(r.outcome.reward as i64)
    .bind(r.balance_in as i64)
    .bind(r.outcome.credits as i64)
    .bind(r.outcome.rolls as i64)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn record_cashout(
    pool: &SqlitePool,
    account: &str,
    cashout: &Cashout,
) -> anyhow::Result<()> {
    let ts = chrono::Utc::now().to_rfc3339();
    sqlx::query(
        "INSERT INTO cashouts (ts, account, amount, wallet_balance, rolls) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(ts)
    .bind(account)
    .bind(cashout.amount_cashed as i64)
    .bind(cashout.wallet_balance as i64)
    .bind(cashout.rolls as i64)
    .execute(pool)
    .await?;
    Ok(())
}
