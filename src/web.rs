#![cfg(not(tarpaulin_include))]

use inequality_dashboard::{app, settings::Settings};

/// Main entry point for the dashboard web application
///
/// Loads [`Settings`] (defaults, `dashboard.toml`, `DASHBOARD_*` variables),
/// sets up logging and serves until the process is stopped.
///
/// # Returns
/// * `Result<(), Box<dyn std::error::Error>>` - Success or error object
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let settings = Settings::new()?;
    log::info!(
        "Starting dashboard with data directory {}",
        settings.storage.data_dir.display()
    );
    app::run(settings).await
}
