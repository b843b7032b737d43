mod cli;
#[cfg(target_os = "linux")]
mod gpio;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
    cli::run()
}
