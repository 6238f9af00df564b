use anyhow::Context;
use api_client::{ResponseRecord, VaultClient};
use clap::{Parser, Subcommand};
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use configuration::{LogFormat, VaultConfig};
use core_types::SimulationRequest;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

/// The main entry point for the simulation client.
#[tokio::main]
async fn main() -> ExitCode {
    // Load VAULT_* variables from a .env file if there is one.
    dotenvy::dotenv().ok();

    // Parse command-line arguments
    let cli = Cli::parse();

    let mut config = match load(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return ExitCode::FAILURE;
        }
    };
    if let Some(format) = cli.log_format {
        config.logging.format = format;
    }
    let _log_guard = match configuration::init_tracing(&config.logging) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    // Execute the appropriate command
    let result = match cli.command {
        Commands::Simulate(args) => handle_simulate(args, &config).await,
        Commands::CheckConfig => handle_check_config(&config),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// Submits contract simulations to the core API and inspects the streamed results.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Read settings from this TOML file instead of ./config.toml.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the configured log output format.
    #[arg(long, global = true, value_enum)]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit a simulation request read from a JSON file.
    Simulate(SimulateArgs),
    /// Load and validate the configuration, then print it with the token redacted.
    CheckConfig,
}

#[derive(Parser)]
struct SimulateArgs {
    /// Path to a JSON request document
    /// (`start_timestamp`, `end_timestamp`, `smart_contracts`, `instructions`).
    #[arg(long)]
    request: PathBuf,

    /// Print each record as a JSON line instead of a summary table.
    #[arg(long)]
    raw: bool,

    /// Advisory server-side timeout for this call, in seconds.
    #[arg(long)]
    timeout_secs: Option<u64>,
}

fn load(cli: &Cli) -> anyhow::Result<VaultConfig> {
    let config = match &cli.config {
        Some(path) => configuration::load_config_from(path)
            .with_context(|| format!("failed to load configuration from {}", path.display()))?,
        None => configuration::load_config().context("failed to load configuration")?,
    };
    Ok(config)
}

// ==============================================================================
// Command Logic
// ==============================================================================

async fn handle_simulate(args: SimulateArgs, config: &VaultConfig) -> anyhow::Result<ExitCode> {
    let text = std::fs::read_to_string(&args.request)
        .with_context(|| format!("failed to read {}", args.request.display()))?;
    let request: SimulationRequest = serde_json::from_str(&text)
        .with_context(|| format!("{} is not a valid simulation request", args.request.display()))?;

    let client = VaultClient::from_config(config)?;
    let timeout = args
        .timeout_secs
        .map(Duration::from_secs)
        .unwrap_or_else(|| client.timeout());

    tracing::info!(request = %args.request.display(), "Running simulation.");
    match client.simulate_contracts_with_timeout(&request, timeout).await {
        Ok(records) => {
            print_records(&records, args.raw)?;
            Ok(ExitCode::SUCCESS)
        }
        Err(failure) => {
            eprintln!(
                "Simulation failed after {} record(s):\n{}",
                failure.partial.len(),
                failure.fault
            );
            if let Err(e) = print_records(&failure.partial, args.raw) {
                tracing::warn!(error = %e, "Failed to print partial records.");
            }
            Ok(ExitCode::FAILURE)
        }
    }
}

fn handle_check_config(config: &VaultConfig) -> anyhow::Result<ExitCode> {
    let client = VaultClient::from_config(config)?;
    println!("core_api_url: {}", client.core_api_url());
    println!("auth_token:   <redacted>");
    println!("timeout:      {}", api_client::format_timeout(client.timeout()));
    match &config.contract_path {
        Some(path) => println!("contract:     {}", path.display()),
        None => println!("contract:     (not set)"),
    }
    Ok(ExitCode::SUCCESS)
}

fn print_records(records: &[ResponseRecord], raw: bool) -> anyhow::Result<()> {
    if raw {
        for record in records {
            println!("{}", serde_json::to_string(record.as_value())?);
        }
        return Ok(());
    }
    if let Some(table) = render_table(records) {
        println!("{table}");
    }
    Ok(())
}

/// Summarizes each record on one row. A record that does not fit the typed
/// result view is shown as raw JSON in the last column.
fn render_table(records: &[ResponseRecord]) -> Option<Table> {
    if records.is_empty() {
        return None;
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["#", "Timestamp", "Posting batches", "Balances", "Last log"]);

    for (index, record) in records.iter().enumerate() {
        let result = match record.simulation_result() {
            Ok(result) => result,
            Err(e) => {
                tracing::debug!(index, error = %e, "Record does not fit the result view.");
                table.add_row(vec![
                    index.to_string(),
                    String::new(),
                    String::new(),
                    String::new(),
                    record.as_value().to_string(),
                ]);
                continue;
            }
        };
        let balances = result
            .balances
            .iter()
            .flat_map(|(account, held)| {
                held.balances.iter().map(move |balance| {
                    format!("{} {}: {} {}", account, balance.account_address, balance.amount, balance.denomination)
                })
            })
            .collect::<Vec<_>>()
            .join("\n");
        table.add_row(vec![
            index.to_string(),
            result.timestamp.clone().unwrap_or_default(),
            result.posting_instruction_batches.len().to_string(),
            balances,
            result.logs.last().cloned().unwrap_or_default(),
        ]);
    }
    Some(table)
}
