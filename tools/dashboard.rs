//! Fraud Detection Dashboard
//!
//! Terminal front end for the scoring service: submit predictions, seed test
//! traffic, browse the history, view reports, and delete records.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use fraud_scoring_service::{
    config::AppConfig,
    logging, reporting,
    types::{DashboardReport, ErrorResponse, PredictionResponse, TransactionRecord},
    TransactionInput, TransactionStore, TransactionType,
};
use rand::Rng;
use std::collections::BTreeSet;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Parser)]
#[command(author, version, about = "Fraud detection dashboard")]
struct Cli {
    /// Configuration file
    #[arg(short, long, default_value = "config/config.toml")]
    config: String,

    /// Scoring endpoint (overrides dashboard.api_url)
    #[arg(long)]
    api_url: Option<String>,

    /// History database (overrides database.path)
    #[arg(long)]
    db_path: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score one transaction through the scoring endpoint
    Predict {
        /// PAYMENT, TRANSFER or CASH_OUT
        #[arg(long = "type", default_value = "PAYMENT")]
        transaction_type: TransactionType,

        #[arg(long, default_value_t = 1000.0)]
        amount: f64,

        /// Sender balance before the transaction
        #[arg(long, default_value_t = 10000.0)]
        old_balance_org: f64,

        /// Sender balance after the transaction
        #[arg(long, default_value_t = 9000.0)]
        new_balance_orig: f64,

        /// Receiver balance before the transaction
        #[arg(long, default_value_t = 0.0)]
        old_balance_dest: f64,

        /// Receiver balance after the transaction
        #[arg(long, default_value_t = 0.0)]
        new_balance_dest: f64,
    },

    /// Post randomly generated transactions to the scoring endpoint
    Seed {
        #[arg(long, default_value_t = 100)]
        count: u64,

        /// Share of suspicious transactions
        #[arg(long, default_value_t = 0.1)]
        fraud_rate: f64,

        #[arg(long, default_value_t = 100)]
        delay_ms: u64,
    },

    /// Print stored transactions, newest first
    History {
        #[arg(long)]
        year: Option<i32>,

        /// Month name or number
        #[arg(long)]
        month: Option<String>,
    },

    /// Print KPIs, type distribution and monthly fraud overview
    Report {
        #[arg(long)]
        year: Option<i32>,

        /// Month name or number
        #[arg(long)]
        month: Option<String>,
    },

    /// Delete all history or selected transactions
    Delete {
        /// Delete every transaction and restart numbering
        #[arg(long, conflicts_with = "ids")]
        all: bool,

        /// Comma-separated transaction ids
        #[arg(long, value_delimiter = ',')]
        ids: Vec<i64>,
    },
}

/// Random transaction generator for seeding test traffic
struct TransactionGenerator {
    rng: rand::rngs::ThreadRng,
}

impl TransactionGenerator {
    fn new() -> Self {
        Self {
            rng: rand::thread_rng(),
        }
    }

    /// Small payment that leaves the sender with a balance
    fn generate_legitimate(&mut self) -> TransactionInput {
        let old_balance_org = self.rng.gen_range(1000.0..50000.0_f64);
        let amount = self.rng.gen_range(10.0..old_balance_org / 4.0);
        let old_balance_dest = self.rng.gen_range(0.0..20000.0_f64);

        TransactionInput {
            transaction_type: TransactionType::Payment,
            amount: round_cents(amount),
            old_balance_org: round_cents(old_balance_org),
            new_balance_orig: round_cents(old_balance_org - amount),
            old_balance_dest: round_cents(old_balance_dest),
            new_balance_dest: round_cents(old_balance_dest + amount),
        }
    }

    /// Transfer or cash-out that drains the sender's whole balance
    fn generate_suspicious(&mut self) -> TransactionInput {
        let transaction_type = if self.rng.gen_bool(0.5) {
            TransactionType::Transfer
        } else {
            TransactionType::CashOut
        };
        let amount = self.rng.gen_range(10000.0..1_000_000.0_f64);

        TransactionInput {
            transaction_type,
            amount: round_cents(amount),
            old_balance_org: round_cents(amount),
            new_balance_orig: 0.0,
            old_balance_dest: 0.0,
            // Receiver balance not updated
            new_balance_dest: 0.0,
        }
    }
}

fn round_cents(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load_from_path(&cli.config)?;
    if let Some(url) = cli.api_url {
        config.dashboard.api_url = url;
    }
    if let Some(path) = cli.db_path {
        config.database.path = path;
    }
    logging::init(&config.logging, "fraud_dashboard")?;

    match cli.command {
        Commands::Predict {
            transaction_type,
            amount,
            old_balance_org,
            new_balance_orig,
            old_balance_dest,
            new_balance_dest,
        } => {
            let input = TransactionInput {
                transaction_type,
                amount,
                old_balance_org,
                new_balance_orig,
                old_balance_dest,
                new_balance_dest,
            };
            let client = reqwest::blocking::Client::new();
            let prediction = post_prediction(&client, &config.dashboard.api_url, &input)?;
            print_prediction(&prediction);
        }

        Commands::Seed {
            count,
            fraud_rate,
            delay_ms,
        } => seed(&config.dashboard.api_url, count, fraud_rate, delay_ms)?,

        Commands::History { year, month } => {
            let month = parse_month_arg(month.as_deref())?;
            let records = open_store(&config)?.list_all()?;
            let rows = reporting::filter_period(&records, year, month);
            if rows.is_empty() {
                println!("No prediction history found yet.");
            } else {
                print_records(&rows);
            }
        }

        Commands::Report { year, month } => {
            let month = parse_month_arg(month.as_deref())?;
            let records = open_store(&config)?.list_all()?;
            print_report(&reporting::build_dashboard(&records, year, month));
        }

        Commands::Delete { all, ids } => {
            let store = open_store(&config)?;
            if all {
                let deleted = store.delete_all()?;
                println!("All history deleted ({} transactions).", deleted);
            } else if !ids.is_empty() {
                let ids: BTreeSet<i64> = ids.into_iter().collect();
                let deleted = store.delete_by_ids(&ids)?;
                let listed: Vec<String> = ids.iter().map(|id| id.to_string()).collect();
                println!(
                    "Deleted entries: {} ({} found)",
                    listed.join(", "),
                    deleted
                );
            } else {
                bail!("nothing to delete: pass --all or --ids");
            }
        }
    }

    Ok(())
}

fn open_store(config: &AppConfig) -> Result<TransactionStore> {
    TransactionStore::open(
        &config.database.path,
        Duration::from_millis(config.database.busy_timeout_ms),
    )
    .with_context(|| format!("Failed to open transaction store {}", config.database.path))
}

fn parse_month_arg(raw: Option<&str>) -> Result<Option<chrono::Month>> {
    match raw {
        None => Ok(None),
        Some(m) if m.eq_ignore_ascii_case("all") => Ok(None),
        Some(m) => match reporting::parse_month(m) {
            Some(month) => Ok(Some(month)),
            None => bail!("invalid month '{}'", m),
        },
    }
}

fn post_prediction(
    client: &reqwest::blocking::Client,
    api_url: &str,
    input: &TransactionInput,
) -> Result<PredictionResponse> {
    let response = client
        .post(api_url)
        .json(input)
        .send()
        .with_context(|| format!("Failed to reach scoring endpoint {}", api_url))?;

    let status = response.status();
    if status.is_success() {
        return response
            .json::<PredictionResponse>()
            .context("Failed to decode prediction response");
    }

    match response.json::<ErrorResponse>() {
        Ok(body) => bail!("scoring request failed ({}): {}", status, body.error),
        Err(_) => bail!("scoring request failed ({})", status),
    }
}

/// Clamp a finite rate into [0, 1]; NaN and infinities are rejected
fn checked_fraud_rate(rate: f64) -> Result<f64> {
    if !rate.is_finite() {
        bail!("fraud rate must be a finite number, got {}", rate);
    }
    Ok(rate.clamp(0.0, 1.0))
}

fn seed(api_url: &str, count: u64, fraud_rate: f64, delay_ms: u64) -> Result<()> {
    let client = reqwest::blocking::Client::new();
    let mut generator = TransactionGenerator::new();
    let mut rng = rand::thread_rng();
    let fraud_rate = checked_fraud_rate(fraud_rate)?;

    info!(api_url = %api_url, count = count, fraud_rate = fraud_rate, "Seeding transactions");

    let (mut legitimate, mut suspicious, mut flagged, mut failed) = (0u64, 0u64, 0u64, 0u64);

    for i in 0..count {
        let input = if rng.gen_bool(fraud_rate) {
            suspicious += 1;
            generator.generate_suspicious()
        } else {
            legitimate += 1;
            generator.generate_legitimate()
        };

        match post_prediction(&client, api_url, &input) {
            Ok(prediction) if prediction.is_fraud() => flagged += 1,
            Ok(_) => {}
            Err(e) => {
                failed += 1;
                warn!(error = %e, "Seed transaction failed");
            }
        }

        if (i + 1) % 10 == 0 {
            info!(
                "Posted {}/{} transactions ({} legitimate, {} suspicious)",
                i + 1,
                count,
                legitimate,
                suspicious
            );
        }

        std::thread::sleep(Duration::from_millis(delay_ms));
    }

    info!(
        "Completed! Posted {} transactions: {} flagged as fraud, {} failed",
        count, flagged, failed
    );
    Ok(())
}

fn print_prediction(prediction: &PredictionResponse) {
    let label = if prediction.is_fraud() {
        "FRAUD"
    } else {
        "NOT FRAUD"
    };
    println!("Prediction: {}", label);
    println!("Fraud Score: {}%", prediction.score_percent());
    if prediction.is_fraud() {
        println!("This transaction is likely FRAUDULENT.");
    } else {
        println!("This transaction seems safe.");
    }
}

fn print_records(records: &[TransactionRecord]) {
    println!(
        "{:>6} {:<19} {:<9} {:>12} {:>12} {:>12} {:>12} {:>12} {:>5} {:>5}",
        "ID",
        "Timestamp",
        "Type",
        "Amount",
        "OldSender",
        "NewSender",
        "OldReceiver",
        "NewReceiver",
        "Fraud",
        "Score"
    );
    for r in records {
        println!(
            "{:>6} {:<19} {:<9} {:>12.2} {:>12.2} {:>12.2} {:>12.2} {:>12.2} {:>5} {:>5.2}",
            r.transaction_id,
            r.timestamp.format("%Y-%m-%d %H:%M:%S"),
            r.transaction_type,
            r.amount,
            r.old_balance_sender,
            r.new_balance_sender,
            r.old_balance_receiver,
            r.new_balance_receiver,
            r.is_fraud,
            r.fraud_score
        );
    }
}

fn bar(count: u64, max: u64) -> String {
    if max == 0 {
        return String::new();
    }
    "█".repeat(((count * 40) / max) as usize)
}

fn print_report(report: &DashboardReport) {
    if !report.has_data() {
        println!("No prediction history found yet.");
        println!("Total Transactions: 0");
        println!("Fraudulent Transactions: 0");
        return;
    }

    println!("Total Transactions: {}", report.total_transactions);
    println!("Fraudulent Transactions: {}", report.fraudulent_transactions);

    println!();
    println!("Transactions by Type");
    let max_type = report.by_type.iter().map(|t| t.count).max().unwrap_or(0);
    for t in &report.by_type {
        println!(
            "  {:<9} {:>6} {}",
            t.transaction_type,
            t.count,
            bar(t.count, max_type)
        );
    }

    println!();
    let years: Vec<String> = report.years.iter().map(|y| y.to_string()).collect();
    println!("Years: {}", years.join(", "));
    if let Some(year) = report.selected_year {
        println!(
            "Monthly Fraud Overview ({}; months: {})",
            year,
            report.months.join(", ")
        );
        let max_month = report.monthly.iter().map(|m| m.total).max().unwrap_or(0);
        for m in &report.monthly {
            println!(
                "  {:<9} total {:>5} {:<40} fraud {:>5} {}",
                m.month,
                m.total,
                bar(m.total, max_month),
                m.fraud,
                bar(m.fraud, max_month)
            );
        }
    }

    println!();
    match &report.selected_month {
        Some(month) => println!("Transaction Records ({})", month),
        None => println!("Transaction Records"),
    }
    print_records(&report.records);
}
