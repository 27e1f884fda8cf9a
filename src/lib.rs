pub mod app;
pub mod config;
pub mod core;
pub mod db;
pub mod http;
pub mod models;
pub mod operations;
pub mod utils;
pub mod widgets;

pub use app::Console;
pub use config::ConsoleConfig;
pub use http::{ApiError, Session};
pub use models::{connection::Connection, operation::OperationState};
pub use operations::{
    ApiCallOperation, MultipleOperation, Operation, OperationError, OperationEvent,
    OperationHandle,
};
