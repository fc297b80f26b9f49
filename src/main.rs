//! `wsd` binary entry point.

use clap::Parser;
use tokio::io::BufReader;
use tracing::{debug, error, info};

use wsd::{Cli, InputEnd, Session, Terminal, run_input, transport::dial};

/// Exit status for invalid flags or headers.
const EXIT_CONFIG: i32 = 2;

/// Exit status when the handshake fails.
const EXIT_CONNECT: i32 = 1;

fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

#[tokio::main]
async fn main() {
    init_tracing();

    let code = run(Cli::parse()).await;

    // Standard input may still be blocked in a read that cannot be cancelled.
    std::process::exit(code);
}

async fn run(cli: Cli) -> i32 {
    let config = match cli.into_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("wsd: {e}");
            return EXIT_CONFIG;
        }
    };

    let terminal = Terminal::stdout();
    terminal.connecting(&config);

    let connection = match dial(&config).await {
        Ok(connection) => connection,
        Err(e) => {
            error!(error = %e, url = %config.url(), "Handshake failed");
            eprintln!("wsd: {e}");
            return EXIT_CONNECT;
        }
    };

    terminal.connected(&config, connection.protocol());
    info!(url = %config.url(), "Connected");

    let session = Session::attach(connection, terminal.clone(), config.transient_policy());
    let outbox = session.outbox();
    let shutdown = session.shutdown_token();

    let interrupt = shutdown.clone();
    tokio::spawn(async move {
        tokio::select! {
            () = interrupt.cancelled() => {}
            result = tokio::signal::ctrl_c() => {
                if let Err(e) = result {
                    error!(error = %e, "Failed to listen for Ctrl-C");
                    return;
                }
                info!("Interrupted");
                interrupt.cancel();
            }
        }
    });

    let stdin = BufReader::new(tokio::io::stdin());
    let (input, outcome) = tokio::join!(
        run_input(stdin, &outbox, &terminal, &shutdown),
        session.wait(),
    );

    match input {
        Ok(InputEnd::Exhausted) => debug!("Input closed before session ended"),
        Ok(InputEnd::Cancelled) => {}
        Err(e) => error!(error = %e, "Reading input failed"),
    }

    debug!(?outcome, "Exiting");
    outcome.exit_code()
}
