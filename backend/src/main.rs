use std::path::PathBuf;

use clap::Parser;
use server::config::DEFAULT_LOCAL_CONFIG;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Local JSON config, read before the environment.
    #[arg(long, default_value = DEFAULT_LOCAL_CONFIG)]
    config: PathBuf,

    /// Overrides `PORT`.
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    server::start_server(&args.config, args.port).await
}
