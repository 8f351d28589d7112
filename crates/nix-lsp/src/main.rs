//! Nix Language Server binary.
//!
//! Usage:
//!   nix-lsp [options]
//!
//! Options:
//!   --stdio      Use stdio for communication (default)
//!   --log        Enable logging to stderr (respects RUST_LOG)
//!   --health     Quick health check
//!   --version    Show version information
//!   --help       Show this help message

use std::env;
use std::process;

use tracing_subscriber::EnvFilter;

fn main() {
    let args: Vec<String> = env::args().collect();

    let mut enable_logging = false;
    for arg in &args[1..] {
        match arg.as_str() {
            "--stdio" => {}
            "--log" => enable_logging = true,
            "--health" => {
                println!("ok {}", env!("CARGO_PKG_VERSION"));
                process::exit(0);
            }
            "--version" => {
                println!("nix-lsp {}", env!("CARGO_PKG_VERSION"));
                process::exit(0);
            }
            "--help" | "-h" => {
                print_help();
                process::exit(0);
            }
            other => {
                eprintln!("Unknown option: {other}");
                print_help();
                process::exit(1);
            }
        }
    }

    if enable_logging {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
            )
            .with_writer(std::io::stderr)
            .init();
    }

    match nix_lsp::run_stdio() {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("LSP server error: {e}");
            process::exit(1);
        }
    }
}

fn print_help() {
    eprintln!("Nix Language Server");
    eprintln!();
    eprintln!("Usage: nix-lsp [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --stdio          Use stdio for communication (default)");
    eprintln!("  --log            Enable logging to stderr (respects RUST_LOG)");
    eprintln!("  --health         Quick health check (prints 'ok <version>')");
    eprintln!("  --version        Show version information");
    eprintln!("  --help           Show this help message");
    eprintln!();
    eprintln!("Examples:");
    eprintln!("  # Run in stdio mode (for VSCode, Neovim, etc.)");
    eprintln!("  nix-lsp --stdio");
    eprintln!();
    eprintln!("  # Run with logging enabled");
    eprintln!("  RUST_LOG=debug nix-lsp --stdio --log");
}
