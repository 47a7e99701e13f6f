use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use token_scanner::api::{create_rest_router, AppState};
use token_scanner::error::ScanResult;
use token_scanner::models::{HolderProgress, HolderResult};
use token_scanner::services::report;
use token_scanner::{Config, Scanner};

const USAGE: &str = "usage: token-scanner [--serve]
       token-scanner burn <name> [address] [--csv]
       token-scanner holders <address> [--csv]
       token-scanner liquidity <address> [--csv]
       token-scanner volume <address> [--csv]";

#[derive(Debug, PartialEq)]
enum Command {
    Serve,
    Burn { name: String, address: Option<String> },
    Holders(String),
    Liquidity(String),
    Volume(String),
}

fn parse_args(args: &[String]) -> Result<(Command, bool), String> {
    let csv = args.iter().any(|a| a == "--csv");
    let positional: Vec<&str> = args
        .iter()
        .map(String::as_str)
        .filter(|a| !a.starts_with("--"))
        .collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        return Err(USAGE.to_string());
    }

    let command = match positional.as_slice() {
        [] => Command::Serve,
        ["burn", name] => Command::Burn { name: name.to_string(), address: None },
        ["burn", name, address] => Command::Burn {
            name: name.to_string(),
            address: Some(address.to_string()),
        },
        ["holders", address] => Command::Holders(address.to_string()),
        ["liquidity", address] => Command::Liquidity(address.to_string()),
        ["volume", address] => Command::Volume(address.to_string()),
        _ => return Err(USAGE.to_string()),
    };
    Ok((command, csv))
}

fn render<T, F>(result: &T, csv: bool, export: F) -> Result<String, Box<dyn std::error::Error>>
where
    T: Serialize,
    F: FnOnce(&T) -> Result<String, csv::Error>,
{
    if csv {
        Ok(export(result)?)
    } else {
        Ok(serde_json::to_string_pretty(result)?)
    }
}

fn finish<T>(result: ScanResult<T>) -> T {
    match result {
        Ok(value) => value,
        Err(e) => {
            tracing::debug!("Scan error: {:?}", e);
            eprintln!("✗ {}", e.user_message());
            std::process::exit(1);
        }
    }
}

async fn scan_holders(
    scanner: &Scanner,
    address: &str,
    cancel: &CancellationToken,
) -> ScanResult<HolderResult> {
    let (progress_tx, mut progress_rx) = mpsc::unbounded_channel::<HolderProgress>();
    let bar = ProgressBar::new(scanner.holders.target() as u64);
    bar.set_style(
        ProgressStyle::with_template("{spinner} [{bar:40}] {pos}/{len} holders ({elapsed})")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    let bar_task = {
        let bar = bar.clone();
        tokio::spawn(async move {
            while let Some(progress) = progress_rx.recv().await {
                bar.set_length(progress.target as u64);
                bar.set_position(progress.processed as u64);
            }
        })
    };

    let result = scanner.holders.scan(address, Some(&progress_tx), cancel).await;
    drop(progress_tx);
    let _ = bar_task.await;
    bar.finish_and_clear();
    result
}

async fn run(
    config: &Config,
    scanner: Scanner,
    command: Command,
    csv: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if command == Command::Serve {
        return serve(config, scanner).await;
    }

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!("\n⏹  Cancelling scan...");
                cancel.cancel();
            }
        });
    }

    let output = match command {
        Command::Burn { name, address } => {
            let result = finish(scanner.burn.scan(&name, address.as_deref(), &cancel).await);
            render(&result, csv, |r| report::burn_csv(r, address.as_deref()))?
        }
        Command::Holders(address) => {
            let result = finish(scan_holders(&scanner, &address, &cancel).await);
            render(&result, csv, report::holders_csv)?
        }
        Command::Liquidity(address) => {
            let result = finish(scanner.liquidity.scan(&address, &cancel).await);
            render(&result, csv, report::liquidity_csv)?
        }
        Command::Volume(address) => {
            let result = finish(scanner.volume.scan(&address, &cancel).await);
            render(&result, csv, report::volume_csv)?
        }
        Command::Serve => return Ok(()),
    };

    println!("{}", output);
    Ok(())
}

async fn serve(config: &Config, scanner: Scanner) -> Result<(), Box<dyn std::error::Error>> {
    let state = Arc::new(AppState { scanner });
    let app = create_rest_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    println!("\n✓ Server ready on http://{}\n", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutting down");
        })
        .await?;

    Ok(())
}

#[tokio::main(worker_threads = 4)]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let (command, csv) = match parse_args(&args) {
        Ok(parsed) => parsed,
        Err(usage) => {
            eprintln!("{}", usage);
            std::process::exit(2);
        }
    };

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,token_scanner=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config::load()?;
    tracing::info!("✓ Configuration loaded");

    let scanner = Scanner::from_config(&config)?;

    run(&config, scanner, command, csv).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|a| a.to_string()).collect()
    }

    #[test]
    fn test_parse_args() {
        assert_eq!(parse_args(&args(&[])).unwrap(), (Command::Serve, false));
        assert_eq!(parse_args(&args(&["--serve"])).unwrap(), (Command::Serve, false));
        assert_eq!(
            parse_args(&args(&["burn", "PLS"])).unwrap(),
            (Command::Burn { name: "PLS".into(), address: None }, false)
        );
        assert_eq!(
            parse_args(&args(&["burn", "HEX", "0x2b59", "--csv"])).unwrap(),
            (
                Command::Burn { name: "HEX".into(), address: Some("0x2b59".into()) },
                true
            )
        );
        assert_eq!(
            parse_args(&args(&["--csv", "holders", "0xabc"])).unwrap(),
            (Command::Holders("0xabc".into()), true)
        );
        assert!(parse_args(&args(&["holders"])).is_err());
        assert!(parse_args(&args(&["unknown", "x"])).is_err());
    }
}
