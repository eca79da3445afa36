//! sdplat - Main CLI application
//!
//! Discovers remote hosts on the local network segment, prepares a qperf
//! agent on each, and measures round-trip latency from this host.

use clap::Parser;
use sdplat::{app::App, cli::Cli, error::AppError};
use std::process;

#[tokio::main]
async fn main() {
    // Set up better panic handling
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("Application panic: {}", panic_info);
        process::exit(1);
    }));

    let cli = Cli::parse();
    let use_color = cli.use_colors();

    if let Err(e) = run_application(cli).await {
        eprintln!("{}", e.format_for_console(use_color));

        print_error_suggestions(&e);

        process::exit(e.exit_code());
    }
}

/// Main application logic
async fn run_application(cli: Cli) -> sdplat::Result<()> {
    let app = App::new(cli)?;
    app.run().await?;
    Ok(())
}

/// Print helpful suggestions for common errors
fn print_error_suggestions(error: &AppError) {
    match error {
        AppError::Config(_) => {
            eprintln!();
            eprintln!("Configuration help:");
            eprintln!("  - --password and --output are required");
            eprintln!("  - --target and --connections cannot be combined");
            eprintln!("  - the password can also be passed via SDPLAT_PASSWORD");
        }
        AppError::InterfaceQuery(_) => {
            eprintln!();
            eprintln!("Interface troubleshooting:");
            eprintln!("  - check that the {} interface exists and is up", sdplat::defaults::DEFAULT_INTERFACE);
            eprintln!("  - verify it has an IPv4 address and netmask (ifconfig {})", sdplat::defaults::DEFAULT_INTERFACE);
        }
        AppError::NoTargets(_) => {
            eprintln!();
            eprintln!("Discovery troubleshooting:");
            eprintln!("  - check active iSCSI sessions with 'iscsiadm -m session'");
            eprintln!("  - or pass an explicit target with --target <ip>");
        }
        AppError::Timeout(_) => {
            eprintln!();
            eprintln!("Timeout troubleshooting:");
            eprintln!("  - increase --run-timeout");
            eprintln!("  - reduce --concurrency if remote hosts respond slowly");
        }
        _ => {}
    }
}
