use std::process::ExitCode;

use clap::Parser;
use tracing::error;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Port to listen on, overrides RUST_PORT
    #[arg(long)]
    port: Option<u16>,

    /// Base of the startup box, overrides ABACUS_BASE
    #[arg(long)]
    base: Option<i64>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    match server::start_server(args.port, args.base).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Server failed: {e}");
            ExitCode::FAILURE
        }
    }
}
