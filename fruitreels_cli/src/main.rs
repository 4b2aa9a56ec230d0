use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use sqlx::{sqlite::SqlitePoolOptions, Row, SqlitePool};

use fruitreels_core::{derive_hash_hex, verify_round, SuppressionPolicy, SymbolKind};
use fruitreels_shared::{CashoutLogEntry, RoundLogEntry};

#[derive(Parser)]
#[command(name = "fruitreels-cli", about = "Admin CLI for the fruitreels server")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Database URL, default sqlite://fruitreels.db
    #[arg(long, value_parser, env = "DATABASE_URL")]
    database_url: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Rotate server seed to a new secret
    RotateSeed { new_seed: String },
    /// View last N rounds
    ViewLogs {
        #[arg(default_value_t = 20)]
        n: i64,
    },
    /// View last N cashouts
    ViewCashouts {
        #[arg(default_value_t = 20)]
        n: i64,
    },
    /// Export rounds to CSV path
    ExportCsv { path: String },
    /// Check a logged round against a revealed server seed
    VerifyRound {
        id: i64,
        #[arg(long)]
        server_seed: String,
    },
}

async fn get_pool(url: Option<String>) -> anyhow::Result<SqlitePool> {
    let url = url.unwrap_or_else(|| "sqlite://fruitreels.db".into());
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&url)
        .await
        .with_context(|| format!("opening {url}"))?;
    Ok(pool)
}

fn round_from_row(r: &sqlx::sqlite::SqliteRow) -> anyhow::Result<RoundLogEntry> {
    let ts: String = r.get("ts");
    Ok(RoundLogEntry {
        id: r.get("id"),
        ts: chrono::DateTime::parse_from_rfc3339(&ts)?.into(),
        account: r.get("account"),
        client_seed: r.get("client_seed"),
        nonce: r.get("nonce"),
        server_seed_hash: r.get("server_seed_hash"),
        symbols: r.get("symbols"),
        reward: r.get("reward"),
        balance_in: r.get("balance_in"),
        credits: r.get("credits"),
        rolls: r.get("rolls"),
    })
}

fn parse_reels(symbols: &str) -> anyhow::Result<[SymbolKind; 3]> {
    let kinds = symbols
        .chars()
        .map(|c| SymbolKind::from_letter(c).with_context(|| format!("unknown symbol {c:?}")))
        .collect::<anyhow::Result<Vec<_>>>()?;
    match kinds.as_slice() {
        [a, b, c] => Ok([*a, *b, *c]),
        _ => bail!("expected 3 symbols, got {symbols:?}"),
    }
}

const ROUND_COLUMNS: &str = "id, ts, account, client_seed, nonce, server_seed_hash, \
    symbols, reward, balance_in, credits, rolls";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let pool = get_pool(cli.database_url).await?;

    match cli.command {
        Commands::RotateSeed { new_seed } => {
            let hash = derive_hash_hex(new_seed.as_bytes());
            sqlx::query(
                "UPDATE params SET server_seed = ?, server_seed_hash = ?, nonce = 0 WHERE id = 1",
            )
            .bind(new_seed)
            .bind(hash.clone())
            .execute(&pool)
            .await?;
            println!("Rotated server seed. New hash: {}", hash);
        }
        Commands::ViewLogs { n } => {
            let rows = sqlx::query(&format!(
                "SELECT {ROUND_COLUMNS} FROM rounds ORDER BY id DESC LIMIT ?"
            ))
            .bind(n)
            .fetch_all(&pool)
            .await?;
            for r in &rows {
                let e = round_from_row(r)?;
                println!(
                    "#{:>6} {} {} {} reward={:>2} credits={:>3} rolls={:>3} seed={} nonce={} hash={}",
                    e.id,
                    e.ts.to_rfc3339(),
                    e.account,
                    e.symbols,
                    e.reward,
                    e.credits,
                    e.rolls,
                    e.client_seed,
                    e.nonce,
                    e.server_seed_hash
                );
            }
        }
        Commands::ViewCashouts { n } => {
            let rows = sqlx::query(
                "SELECT id, ts, account, amount, wallet_balance, rolls FROM cashouts ORDER BY id DESC LIMIT ?",
            )
            .bind(n)
            .fetch_all(&pool)
            .await?;
            for r in rows {
                let ts: String = r.get("ts");
                let e = CashoutLogEntry {
                    id: r.get("id"),
                    ts: chrono::DateTime::parse_from_rfc3339(&ts)?.into(),
                    account: r.get("account"),
                    amount: r.get("amount"),
                    wallet_balance: r.get("wallet_balance"),
                    rolls: r.get("rolls"),
                };
                println!(
                    "#{:>6} {} {} amount={} wallet={} rolls={}",
                    e.id,
                    e.ts.to_rfc3339(),
                    e.account,
                    e.amount,
                    e.wallet_balance,
                    e.rolls
                );
            }
        }
        Commands::ExportCsv { path } => {
            let mut wtr = csv::Writer::from_path(&path)?;
            let rows = sqlx::query(&format!("SELECT {ROUND_COLUMNS} FROM rounds ORDER BY id ASC"))
                .fetch_all(&pool)
                .await?;
            for r in &rows {
                wtr.serialize(round_from_row(r)?)?;
            }
            wtr.flush()?;
            println!("Exported {} rows to {}", rows.len(), path);
        }
        Commands::VerifyRound { id, server_seed } => {
            let row = sqlx::query(&format!("SELECT {ROUND_COLUMNS} FROM rounds WHERE id = ?"))
                .bind(id)
                .fetch_optional(&pool)
                .await?
                .with_context(|| format!("no round #{id}"))?;
            let e = round_from_row(&row)?;
            if derive_hash_hex(server_seed.as_bytes()) != e.server_seed_hash {
                bail!("seed does not match hash {} recorded for round #{id}", e.server_seed_hash);
            }
            let reels = parse_reels(&e.symbols)?;
            let ok = verify_round(
                &server_seed,
                &e.client_seed,
                e.nonce as u64,
                &SuppressionPolicy::house_default(),
                e.balance_in as u64,
                &reels,
            );
            if !ok {
                bail!("round #{id} does not reproduce from its seeds");
            }
            println!("Round #{id} verified: {} at nonce {}", e.symbols, e.nonce);
        }
    }

    Ok(())
}
