// tether-echod: echo peer for manual and scripted end-to-end runs
use clap::Parser;
use std::process::ExitCode;
use tether_core::Endpoint;
use tether_echo::{EchoServer, DEFAULT_WORKERS};
use tracing::error;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tether-echod")]
#[command(about = "Echo every received byte back to the sender", long_about = None)]
#[command(version)]
struct Cli {
    /// Endpoint to listen on (host:port, tcp://host:port or unix:/path)
    #[arg(short, long, env = "TETHER_ECHO_LISTEN", default_value = tether_core::DEFAULT_ENDPOINT)]
    listen: Endpoint,

    /// Number of connection worker threads
    #[arg(short, long, default_value_t = DEFAULT_WORKERS)]
    workers: usize,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("TETHER_LOG")
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let server = match EchoServer::bind(&cli.listen) {
        Ok(server) => server,
        Err(e) => {
            error!(endpoint = %cli.listen, error = %e, "failed to bind");
            return ExitCode::FAILURE;
        }
    };

    match server.serve(cli.workers) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "echo server stopped");
            ExitCode::FAILURE
        }
    }
}
