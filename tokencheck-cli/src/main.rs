use std::path::PathBuf;

use clap::Parser;
use tokencheck_cli::config::CliConfig;
use tokencheck_cli::report;
use tokencheck_core::{decode, TokenValidator};
use tracing::debug;

#[derive(Parser)]
#[command(
    name = "tokencheck",
    version,
    about = "Validate an access token against the tenant's signing keys"
)]
struct Cli {
    /// Access token to validate
    token: String,

    /// YAML configuration file (environment variables take precedence)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the decoded token and debug logs
    #[arg(short, long)]
    verbose: bool,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "info,tokencheck_core=debug"
    } else {
        "warn,tokencheck_core=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match CliConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", colored::Colorize::red(format!("Error: {e}").as_str()));
            std::process::exit(2);
        }
    };
    debug!(tenant = %config.tenant_id, audience = %config.audience, "Using configuration");

    if !cli.json {
        println!("Testing token validation...");
        if cli.verbose {
            if let Ok(decoded) = decode(&cli.token) {
                print!("{}", report::render_decoded(&decoded));
            }
        }
    }

    let validator = TokenValidator::new(config.to_verifier_config());
    let result = validator.validate_access_token(&cli.token).await;

    if cli.json {
        println!("{}", report::render_json(&result));
    } else {
        print!("{}", report::render_result(&result));
    }

    if !result.is_valid() {
        std::process::exit(1);
    }
}
