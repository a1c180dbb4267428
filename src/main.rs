use clap::Parser;
use sqscpp_cli::{Cli, Invocation, SqsClient};
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_tracing(debug: bool) {
    // --debug also surfaces the HTTP client's own wire logging.
    let default_filter = if debug {
        "sqscpp_cli=debug,reqwest=debug,hyper=debug"
    } else {
        "sqscpp_cli=info"
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let invocation = Invocation::from_cli(&cli)?;
    let client = SqsClient::with_config(cli.config())?;

    if let Some(output) = invocation.execute(&client).await? {
        println!("{}", output);
    }

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.debug);
    debug!(?cli, "parsed arguments");

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            // Printed directly so the diagnostic survives any RUST_LOG filter.
            eprintln!("Error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}
