//! SMS Dispatch - entry point
//!
//! Two modes:
//!
//! ```text
//! sms_dispatch --serve                      # webhook receiver + status API only
//! sms_dispatch --send numbers.txt \
//!              --body "text" [--env prod]   # dispatch a batch (server runs alongside
//!                                           # so carrier callbacks land in the cache)
//! ```

use anyhow::Context;
use std::sync::Arc;

use sms_dispatch::batch::BatchDispatcher;
use sms_dispatch::carrier::{CarrierGateway, MockGateway, TwilioGateway};
use sms_dispatch::config::{AppConfig, CarrierMode};
use sms_dispatch::gateway::run_server;
use sms_dispatch::status::{Outcome, StatusCache};

// ============================================================
// ARGUMENT PARSING
// ============================================================

fn get_env() -> String {
    get_arg_value("--env")
        .or_else(|| get_arg_value("-e"))
        .unwrap_or_else(|| "dev".to_string())
}

fn get_arg_value(flag: &str) -> Option<String> {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if args[i] == flag && i + 1 < args.len() {
            return Some(args[i + 1].clone());
        }
    }
    None
}

fn has_flag(flag: &str) -> bool {
    std::env::args().any(|a| a == flag)
}

/// Get port override from command line (--port argument)
fn get_port_override() -> Option<u16> {
    get_arg_value("--port").and_then(|p| p.parse().ok())
}

// ============================================================
// HELPERS
// ============================================================

fn build_gateway(config: &AppConfig) -> anyhow::Result<Arc<dyn CarrierGateway>> {
    match config.carrier.mode {
        CarrierMode::Twilio => {
            let gw = TwilioGateway::new(&config.carrier)
                .context("Failed to initialize carrier gateway")?;
            Ok(Arc::new(gw))
        }
        CarrierMode::Mock => {
            println!("⚠️  Carrier in mock mode - no real SMS will be sent");
            Ok(Arc::new(MockGateway::new()))
        }
    }
}

/// Read one recipient per line, skipping blanks and comments
fn read_recipients(path: &str) -> anyhow::Result<Vec<String>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read recipients file: {}", path))?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_string)
        .collect())
}

fn print_report(report: &sms_dispatch::batch::BatchReport) {
    println!();
    println!("=== Batch Report ===");
    for result in &report.results {
        let marker = match result.outcome {
            Outcome::Success => "✅",
            Outcome::Failure => "❌",
            Outcome::Pending => "⏳",
        };
        let id = result.message_id.as_deref().unwrap_or("-");
        println!(
            "{} {:16} {}  (id: {}, attempts: {})",
            marker, result.recipient, result.state_label, id, result.attempts
        );
    }
    println!(
        "Delivered: {}  Failed: {}  Pending: {}",
        report.delivered, report.failed, report.pending
    );
}

// ============================================================
// MAIN
// ============================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env = get_env();
    let config = AppConfig::load(&env);
    let _log_guard = sms_dispatch::logging::init_logging(&config);

    tracing::info!("Starting sms_dispatch in {} mode", env);

    let cache = Arc::new(StatusCache::new());
    let host = config.gateway.host.clone();
    let port = get_port_override().unwrap_or(config.gateway.port);

    if let Some(recipients_path) = get_arg_value("--send") {
        let body = get_arg_value("--body")
            .context("--send requires --body \"message text\"")?;
        let recipients = read_recipients(&recipients_path)?;
        anyhow::ensure!(!recipients.is_empty(), "No recipients in {}", recipients_path);

        // Webhook receiver runs alongside the batch so carrier pushes
        // land in the shared cache while the monitors poll
        let server_cache = cache.clone();
        tokio::spawn(async move {
            run_server(&host, port, server_cache).await;
        });

        let gateway = build_gateway(&config)?;
        let dispatcher = BatchDispatcher::new(
            gateway,
            cache,
            config.monitor.clone(),
            config.batch.clone(),
            config.cache.clone(),
        );

        println!(
            "Dispatching {} message(s) from {}",
            recipients.len(),
            recipients_path
        );
        let report = dispatcher.dispatch(&recipients, &body).await;
        print_report(&report);
        return Ok(());
    }

    if has_flag("--serve") {
        run_server(&host, port, cache).await;
        return Ok(());
    }

    eprintln!("Usage:");
    eprintln!("  sms_dispatch --serve [--env dev] [--port 8080]");
    eprintln!("  sms_dispatch --send numbers.txt --body \"message\" [--env dev]");
    std::process::exit(2);
}
