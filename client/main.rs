// tether-hello: connect, send one message, print the reply
use clap::Parser;
use std::process::ExitCode;
use tether_client::{exchange, render_reply, HelloArgs};
use tracing::error;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let args = HelloArgs::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::WARN.into())
                .with_env_var("TETHER_LOG")
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let result = args.config().and_then(|config| exchange(&args, config));
    match result {
        Ok(reply) => {
            println!("{}", render_reply(&reply, args.terminator));
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(kind = ?e.kind(), "session failed");
            eprintln!("tether-hello: {}", e);
            ExitCode::FAILURE
        }
    }
}
