use tracing_subscriber::EnvFilter;

fn main() {
    init_tracing();

    if let Err(error) = keymark_cli::run(std::env::args_os()) {
        eprintln!("{error:#}");
        std::process::exit(1);
    }
}

/// Log to stderr, filtered by `KEYMARK_LOG`, then `RUST_LOG`, defaulting to warnings.
fn init_tracing() {
    let filter = EnvFilter::try_from_env("KEYMARK_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
