use conduit_runner::config::{load_config, load_default_config};
use conduit_runner::{ScriptedSession, SessionBootstrap, init_logging};

/// Path of a JSON runner config; the embedded default is used when unset
const CONFIG_ENV: &str = "CONDUIT_CONFIG";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = match std::env::var(CONFIG_ENV) {
        Ok(path) => load_config(&path)?,
        Err(_) => load_default_config()?,
    };
    init_logging(&config.log_level);

    let bootstrap = SessionBootstrap::with_config(config)?;
    let results = ScriptedSession::new(bootstrap).run().await;

    log::info!("Orders placed: {}", results.orders_placed);
    for (status, count) in &results.events_by_status {
        log::info!("  {:?}: {}", status, count);
    }
    log::info!("Fees: {}", results.total_fees);
    log::info!("Ticks routed: {}", results.ticks);
    log::info!("Messages: {:?}", results.messages);

    match results.error {
        Some(error) => Err(error.into()),
        None => Ok(()),
    }
}
