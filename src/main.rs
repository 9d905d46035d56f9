//! Conduit client - command-line entry point.

use std::process::ExitCode;

use conduit_client::cli::{Cli, Command, OutputFormat};
use conduit_client::config::Config;
use conduit_client::error::Result;
use conduit_client::logging;
use conduit_client::output;
use conduit_client::query::{ExecutionOutcome, QuerySession};
use conduit_client::ConduitClient;
use tracing::{error, info, warn};

/// Exit code when a query ran out of time.
const EXIT_TIMED_OUT: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    // A missing .env is fine; it only supplies CONDUIT_SERVER / CONDUIT_TOKEN
    let _ = dotenvy::dotenv();

    let cli = Cli::parse_args();
    logging::init_stderr_logging(cli.verbose);

    match run(&cli).await {
        Ok(code) => code,
        Err(e) => {
            error!("{}: {}", e.category(), e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli) -> Result<ExitCode> {
    info!("Starting Conduit client, getting config");

    // Precedence: CLI flags, environment, config file, defaults
    let mut config = Config::load(cli.config.as_deref())?;
    config.apply_env_overrides();
    cli.apply_to(&mut config);

    let credentials = config.require_credentials()?;
    let client = ConduitClient::new(&credentials)?.with_poll_interval(config.query.poll_interval());
    info!("Initialized...");

    match cli.command() {
        Command::Databases => {
            let databases = client.databases().await?;
            match cli.output {
                OutputFormat::Text => print!("{databases}"),
                OutputFormat::Json => println!("{}", output::to_pretty_json(&databases)?),
            }
        }
        Command::Tables { database } => {
            let tables = client.tables(&database).await?;
            match cli.output {
                OutputFormat::Text => print!("{tables}"),
                OutputFormat::Json => println!("{}", output::to_pretty_json(&tables)?),
            }
        }
        Command::Schema { database, table } => {
            let schema = client.table_schema(&database, &table).await?;
            match cli.output {
                OutputFormat::Text => print!("{schema}"),
                OutputFormat::Json => println!("{}", output::to_pretty_json(&schema)?),
            }
        }
        Command::Query {
            sql,
            page_size,
            timeout,
        } => {
            let (page_size, timeout) = Cli::query_settings(&config.query, page_size, timeout);
            let mut session = QuerySession::new(sql, page_size, timeout);

            match client.run(&mut session).await? {
                ExecutionOutcome::Completed => match cli.output {
                    OutputFormat::Text => {
                        println!("{}", output::format_session_table(&session));
                        info!("{} row(s) in {} page(s)", session.row_count(), session.pages().len());
                    }
                    OutputFormat::Json => println!("{}", output::format_session_json(&session)?),
                },
                ExecutionOutcome::TimedOut { cancel } => {
                    warn!(
                        cancelled = cancel.is_cancelled(),
                        "Query timed out after {}s: {}",
                        session.timeout_secs(),
                        session
                    );
                    return Ok(ExitCode::from(EXIT_TIMED_OUT));
                }
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}
