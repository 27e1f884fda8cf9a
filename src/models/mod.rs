pub mod connection;
pub mod history;
pub mod operation;
pub mod operation_status;
