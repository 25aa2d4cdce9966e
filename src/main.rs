use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use calfetch::captcha::{AutoSolve, CaptchaStrategy, ManualWait, SolverClient};
use calfetch::config::Config;
use calfetch::report;
use calfetch::session::SessionController;

#[derive(Parser)]
#[command(name = "calfetch")]
#[command(about = "Account and debt extraction from the CALF customer portal")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "calfetch.toml")]
    config: PathBuf,

    /// Run the browser without a visible window
    #[arg(long)]
    headless: bool,

    /// Print the result as JSON instead of the console report
    #[arg(long)]
    json: bool,

    /// Force the automated captcha solver (requires an API key)
    #[arg(long)]
    solver: bool,

    /// Where to write the CSV export
    #[arg(long)]
    csv: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(
                "info,chromiumoxide=warn,chromiumoxide::conn=off,chromiumoxide::handler=off",
            )
        }))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let mut config = Config::load_or_default(&cli.config)
        .with_context(|| format!("Failed to load config: {}", cli.config.display()))?;
    config.apply_env_overrides();
    if cli.headless {
        config.headless = true;
    }

    if config.id_number.is_empty() {
        anyhow::bail!(
            "No identifier configured: set id_number in {} or the CALF_NRO_ID environment variable",
            cli.config.display()
        );
    }

    let strategy = build_strategy(&cli, &config)?;
    tracing::info!(strategy = strategy.name(), "Starting portal session");

    let controller = SessionController::new(config.clone(), strategy);
    let person = controller.run().await?;

    if cli.json {
        println!("{}", report::to_json(&person)?);
    } else {
        print!("{}", report::render_console(&person));
    }

    let csv_path = cli
        .csv
        .unwrap_or_else(|| PathBuf::from(format!("calf_{}_{}.csv", config.id_type, config.id_number)));
    report::write_csv(&person, &csv_path)?;
    tracing::info!(path = %csv_path.display(), "CSV exported");

    Ok(())
}

/// Pick the captcha strategy for this run.
///
/// The automated solver is used when forced by flag, or when running
/// headless with a key configured (no visible browser means nobody can
/// solve the challenge by hand).
fn build_strategy(cli: &Cli, config: &Config) -> Result<Box<dyn CaptchaStrategy>> {
    let timeout = config.timeouts.captcha;

    let automated = cli.solver || (config.headless && config.solver_api_key.is_some());
    if automated {
        let api_key = config
            .solver_api_key
            .clone()
            .context("Automated solving requires solver_api_key (or ANTICAPTCHA_KEY)")?;
        if config.site_key.is_empty() {
            anyhow::bail!("Automated solving requires the portal's captcha site_key");
        }
        let client = SolverClient::new(api_key)?;
        Ok(Box::new(AutoSolve::new(client, timeout)))
    } else {
        if config.headless {
            tracing::warn!("Headless run with manual captcha strategy; nobody can solve the challenge");
        }
        Ok(Box::new(ManualWait::new(timeout)))
    }
}
