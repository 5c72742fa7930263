use env_logger::{Builder, Env};

/// Install the global logger. `RUST_LOG` wins over `default_filter`.
///
/// Safe to call more than once; later calls are ignored.
pub fn init_logging(default_filter: &str) {
    let result = Builder::from_env(Env::default().default_filter_or(default_filter))
        .format_timestamp_millis()
        .try_init();

    if result.is_err() {
        log::debug!("Logger already initialised");
    }
}
