/// Stepwise CLI
///
/// Loads a program tree, runs it, and hands Ctrl-C to the built-in debugger.
use stepwise_core::cli;
use tracing_subscriber::EnvFilter;

fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = cli::run_cli() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
