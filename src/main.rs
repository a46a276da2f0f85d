use tracing_subscriber::EnvFilter;

fn main() {
    let filter = std::env::var("ASMFLOW_LOG")
        .ok()
        .and_then(|value| EnvFilter::try_new(value).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = assembly_flow::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
