//! synthUSD CLI
//!
//! Command-line interface for running scripted sessions against an in-memory
//! synthUSD engine and inspecting its risk parameters.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use console::{style, Term};

use synthusd::cli::{
    CliConfig, OutputFormat, OutputFormatter, Scenario, ScenarioReport, ScenarioRunner,
};
use synthusd::utils::math::{calculate_health_factor, format_wad, parse_wad};

/// synthUSD CLI - overcollateralized synthetic issuance
#[derive(Parser)]
#[command(name = "synthusd")]
#[command(author = "synthUSD Team")]
#[command(version = synthusd::VERSION)]
#[command(about = "Command-line interface for the synthUSD engine", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, env = "SYNTHUSD_CONFIG", default_value_os_t = CliConfig::default_path())]
    config: PathBuf,

    /// Output format (text, json, json-pretty)
    #[arg(short, long, global = true)]
    format: Option<OutputFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration and an example scenario
    Init {
        /// Force overwrite existing files
        #[arg(short, long)]
        force: bool,
    },

    /// Run a scenario file on a fresh in-memory engine
    Run {
        /// Scenario file; falls back to the configured one
        scenario: Option<PathBuf>,
    },

    /// Show the effective risk parameters
    Params,

    /// Compute a health factor
    Health {
        /// Collateral value in USD
        #[arg(long)]
        collateral_usd: String,

        /// Outstanding debt
        #[arg(long)]
        debt: String,
    },
}

fn main() {
    let cli = Cli::parse();
    let term = Term::stdout();

    let config = match CliConfig::resolve(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            std::process::exit(1);
        }
    };

    // Initialize logging; RUST_LOG wins over the configured level
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| {
            tracing_subscriber::EnvFilter::default().add_directive(tracing::Level::INFO.into())
        });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run_command(&cli, &config, &term) {
        eprintln!("{} {:#}", style("Error:").red().bold(), e);
        std::process::exit(1);
    }
}

fn run_command(cli: &Cli, config: &CliConfig, term: &Term) -> anyhow::Result<()> {
    let output =
        OutputFormatter::new(cli.format.unwrap_or(config.format)).with_color(config.color);

    match &cli.command {
        Commands::Init { force } => cmd_init(cli, config, *force, term),
        Commands::Run { scenario } => cmd_run(scenario.as_deref(), config, &output),
        Commands::Params => cmd_params(config, &output),
        Commands::Health {
            collateral_usd,
            debt,
        } => cmd_health(config, collateral_usd, debt, &output),
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// COMMAND HANDLERS
// ═══════════════════════════════════════════════════════════════════════════════

fn cmd_init(cli: &Cli, config: &CliConfig, force: bool, term: &Term) -> anyhow::Result<()> {
    term.write_line(&format!(
        "{} Initializing synthUSD configuration...",
        style("→").cyan()
    ))?;

    let scenario_path = cli
        .config
        .parent()
        .map(|dir| dir.join("scenario.json"))
        .unwrap_or_else(|| PathBuf::from("scenario.json"));

    for path in [&cli.config, &scenario_path] {
        if path.exists() && !force {
            bail!("{} already exists (use --force to overwrite)", path.display());
        }
    }

    let mut written = config.clone();
    written.scenario = Some(scenario_path.clone());
    written.save(&cli.config)?;
    term.write_line(&format!(
        "{} Configuration written to {}",
        style("✓").green(),
        style(cli.config.display()).yellow()
    ))?;

    Scenario::example().save(&scenario_path)?;
    term.write_line(&format!(
        "{} Example scenario written to {}",
        style("✓").green(),
        style(scenario_path.display()).yellow()
    ))?;

    Ok(())
}

fn cmd_run(
    scenario: Option<&Path>,
    config: &CliConfig,
    output: &OutputFormatter,
) -> anyhow::Result<()> {
    let path = match scenario.or(config.scenario.as_deref()) {
        Some(path) => path,
        None => bail!("no scenario given and none configured (see `synthusd init`)"),
    };

    let scenario = Scenario::load(path)
        .with_context(|| format!("loading scenario {}", path.display()))?;
    let report = ScenarioRunner::run(&scenario, config.params.clone())?;

    if output.format().is_json() {
        output.json(&report)?;
    } else {
        print_report(&report, output)?;
    }
    Ok(())
}

fn print_report(report: &ScenarioReport, output: &OutputFormatter) -> anyhow::Result<()> {
    output.section(&format!("Scenario: {}", report.name))?;
    let steps: Vec<Vec<String>> = report
        .steps
        .iter()
        .map(|step| {
            vec![
                step.index.to_string(),
                step.action.clone(),
                match step.error_code {
                    Some(code) => format!("E{}", code),
                    None => "ok".into(),
                },
                step.detail.clone(),
            ]
        })
        .collect();
    output.table(&["#", "action", "result", "detail"], &steps)?;

    output.section("Accounts")?;
    let accounts: Vec<Vec<String>> = report
        .accounts
        .iter()
        .map(|account| {
            vec![
                account.account.clone(),
                join_balances(&account.collateral),
                account.debt.clone(),
                account.collateral_value_usd.clone(),
                account.health_factor.clone(),
                account.status.clone(),
                join_balances(&account.wallet),
            ]
        })
        .collect();
    output.table(
        &["account", "collateral", "debt", "value (USD)", "health", "status", "wallet"],
        &accounts,
    )?;

    output.section("Totals")?;
    output.kv("Total debt", &report.total_debt)?;
    output.kv("Synthetic supply", &report.synthetic_supply)?;
    output.kv("Events", &report.events.to_string())?;
    output.kv("Liquidations", &report.liquidations.to_string())?;
    output.kv("State hash", &report.state_hash)?;

    match report.failures() {
        0 => output.success("all steps committed")?,
        n => output.info(&format!("{} of {} steps rejected", n, report.steps.len()))?,
    }
    Ok(())
}

fn join_balances(balances: &std::collections::BTreeMap<String, String>) -> String {
    if balances.is_empty() {
        return "-".into();
    }
    balances
        .iter()
        .map(|(asset, amount)| format!("{} {}", amount, asset))
        .collect::<Vec<_>>()
        .join(", ")
}

fn cmd_params(config: &CliConfig, output: &OutputFormatter) -> anyhow::Result<()> {
    let params = &config.params;
    output.section("Risk Parameters")?;
    output.kv("Version", &params.version)?;
    output.kv(
        "Liquidation threshold",
        &format!("{}%", params.liquidation_threshold),
    )?;
    output.kv(
        "Minimum collateral ratio",
        &format!("{}%", params.min_collateral_ratio_pct()),
    )?;
    output.kv("Liquidation bonus", &format!("{}%", params.liquidation_bonus))?;
    output.kv("Minimum health factor", &format_wad(params.min_health_factor))?;
    output.kv("Event log size", &params.max_events.to_string())?;
    Ok(())
}

fn cmd_health(
    config: &CliConfig,
    collateral_usd: &str,
    debt: &str,
    output: &OutputFormatter,
) -> anyhow::Result<()> {
    let collateral = parse_wad(collateral_usd)?;
    let debt = parse_wad(debt)?;
    let hf = calculate_health_factor(collateral, debt, config.params.liquidation_threshold)?;

    output.kv("Health factor", &format_wad(hf))?;
    if hf < config.params.min_health_factor {
        output.error("position would be liquidatable")?;
    } else {
        output.success("position is solvent")?;
    }
    Ok(())
}
