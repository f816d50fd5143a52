// src/main.rs

use wrapngo::{cli, logging, run};

#[tokio::main]
async fn main() {
    if let Err(err) = run_main().await {
        eprintln!("wrapngo error: {err:#}");
        std::process::exit(1);
    }
}

async fn run_main() -> anyhow::Result<()> {
    let args = cli::parse();
    let handle = logging::init_logging(args.log_level)?;
    run(args, &handle).await
}
