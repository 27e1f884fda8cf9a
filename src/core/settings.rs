use crate::config::ConsoleConfig;
use std::path::Path;

pub fn init() {
    if std::env::var_os("RUST_LOG").is_none() {
        std::env::set_var("RUST_LOG", "warn");
    }
    pretty_env_logger::init();
}

pub fn config(path: Option<&Path>) -> ConsoleConfig {
    match path {
        Some(path) => ConsoleConfig::load_from(path).unwrap_or_else(|e| {
            log::warn!("errors loading config from {}: {e:?}", path.display());
            ConsoleConfig::default()
        }),
        None => ConsoleConfig::config(),
    }
}
