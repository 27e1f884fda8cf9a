#![allow(dead_code)]

pub mod mock_xapi;
pub mod scripted;

use once_cell::sync::Lazy;
use vmconsole::models::connection::Connection;
use vmconsole::{ConsoleConfig, Session};

static LOGGER: Lazy<()> = Lazy::new(|| {
    let _ = env_logger::builder().is_test(true).try_init();
});

pub fn init_logging() {
    Lazy::force(&LOGGER);
}

/// A session that is never logged in. Scripted operations ignore it.
pub fn offline_session() -> Session {
    let connection = Connection::new("127.0.0.1".into(), "root".into());
    Session::new(&connection, &ConsoleConfig::default()).expect("client should build")
}
