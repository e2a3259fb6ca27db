use std::io;

use stockwatch::configuration::Settings;
use stockwatch::startup::Application;
use stockwatch::telemetry::{get_subscriber, init_subscriber};
use stockwatch::watcher::PriceWatcher;

#[tokio::main]
#[allow(clippy::redundant_pub_crate)]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    let subscriber = get_subscriber("stockwatch".into(), "info".into(), io::stdout);
    init_subscriber(subscriber);

    // Retrieve settings
    let config_app = Settings::get_config().expect("Failed to load configuration");
    let config_wtc = Settings::get_config().expect("Failed to load configuration");

    // Prepare the application and the price watcher
    let application = Application::build(config_app).await?.run_until_stopped();
    let watcher = PriceWatcher::build(config_wtc)?.run_until_stopped();

    // Run both tasks concurrently, return as soon as one of the tasks completes or errors out
    tokio::select! {
        _ = application => {},
        _ = watcher => {},
    }

    Ok(())
}
