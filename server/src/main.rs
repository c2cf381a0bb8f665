use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use common::config::read_config;

mod cli;
mod dao;
mod http;
mod plan;
mod stream;

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// config file; defaults apply when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Cli::parse();

    // a bad config file or an unbindable port surfaces here as a non-zero
    // exit before any request is accepted
    let config = read_config(args.config).await?;

    http::svc::serve_http(config).await
}
