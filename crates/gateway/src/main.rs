// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use clap::Parser;
use tracing::error;

use ussdgw::config::{Cli, Commands, LogArgs};

fn init_tracing(log: &LogArgs) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log.log_level.clone()));
    if log.log_format == "text" {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Serve(args) => {
            init_tracing(&args.log);
            if let Err(e) = args.validate() {
                eprintln!("error: {e}");
                std::process::exit(2);
            }
            ussdgw::run::serve(args).await
        }
        Commands::Console(args) => {
            init_tracing(&args.log);
            ussdgw::run::console(args).await
        }
        Commands::Sessiond(args) => {
            init_tracing(&args.log);
            ussdgw::sessiond::run(&args.host, args.port).await
        }
    };

    if let Err(e) = result {
        error!("fatal: {e:#}");
        std::process::exit(1);
    }
}
