use tracing_subscriber::EnvFilter;

pub mod tui;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = tui::run(tui::Settings::from_env()).await {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
