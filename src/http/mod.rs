pub mod task;

use crate::app::APP;
use crate::config::ConsoleConfig;
use crate::models::connection::Connection;
use crate::utils::json::{parse_error_description, parse_serde_json_value_to_raw_string};
use reqwest::{Client, ClientBuilder};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use task::TaskRecord;

pub const API_VERSION: &str = "2.21";

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("HTTP error {status}: {body}")]
    Http { status: u16, body: String },

    #[error("{}", .0.join(" "))]
    Failure(Vec<String>),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("not logged in")]
    NotLoggedIn,
}

impl ApiError {
    /// The server's error code, e.g. `SESSION_AUTHENTICATION_FAILED`.
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Failure(description) => description.first().map(String::as_str),
            _ => None,
        }
    }
}

/// Authenticated channel to a pool master's JSON-RPC endpoint.
#[derive(Debug)]
pub struct Session {
    client: Client,
    url: String,
    username: String,
    opaque_ref: Option<String>,
    request_id: AtomicU64,
}

impl Session {
    pub fn new(connection: &Connection, config: &ConsoleConfig) -> Result<Self, ApiError> {
        let client = ClientBuilder::new()
            .danger_accept_invalid_certs(connection.trust_invalid_certs)
            .timeout(config.request_timeout())
            .build()?;
        Ok(Self {
            client,
            url: connection.rpc_url(),
            username: connection.username.clone(),
            opaque_ref: None,
            request_id: AtomicU64::new(1),
        })
    }

    pub async fn login(
        connection: &Connection,
        password: &str,
        config: &ConsoleConfig,
    ) -> Result<Self, ApiError> {
        let mut session = Self::new(connection, config)?;
        session.login_with_password(password).await?;
        Ok(session)
    }

    pub async fn login_with_password(&mut self, password: &str) -> Result<(), ApiError> {
        let result = self
            .invoke(
                "session.login_with_password",
                vec![
                    json!(self.username),
                    json!(password),
                    json!(API_VERSION),
                    json!(APP),
                ],
            )
            .await?;
        let opaque_ref = result.as_str().ok_or_else(|| {
            ApiError::InvalidResponse(format!("expected a session reference, got {result}"))
        })?;
        log::info!("logged in to {} as {}", self.url, self.username);
        self.opaque_ref = Some(opaque_ref.to_string());
        Ok(())
    }

    pub async fn logout(&mut self) -> Result<(), ApiError> {
        if let Some(opaque_ref) = self.opaque_ref.take() {
            self.invoke("session.logout", vec![json!(opaque_ref)]).await?;
        }
        Ok(())
    }

    pub fn is_authenticated(&self) -> bool {
        self.opaque_ref.is_some()
    }

    /// Calls `method` with the session reference prepended to `params`.
    pub async fn call(&self, method: &str, params: Vec<Value>) -> Result<Value, ApiError> {
        let opaque_ref = self.opaque_ref.as_ref().ok_or(ApiError::NotLoggedIn)?;
        let mut full_params = Vec::with_capacity(params.len() + 1);
        full_params.push(json!(opaque_ref));
        full_params.extend(params);
        self.invoke(method, full_params).await
    }

    /// Starts `Async.<method>` and returns the reference of the server task tracking it.
    pub async fn call_async(&self, method: &str, params: Vec<Value>) -> Result<String, ApiError> {
        let result = self.call(&format!("Async.{method}"), params).await?;
        match result.as_str() {
            Some(task) => Ok(task.to_string()),
            None => Err(ApiError::InvalidResponse(format!(
                "expected a task reference, got {result}"
            ))),
        }
    }

    pub async fn task_record(&self, task: &str) -> Result<TaskRecord, ApiError> {
        let value = self.call("task.get_record", vec![json!(task)]).await?;
        Ok(serde_json::from_value(value)?)
    }

    pub async fn cancel_task(&self, task: &str) -> Result<(), ApiError> {
        self.call("task.cancel", vec![json!(task)]).await?;
        Ok(())
    }

    pub async fn destroy_task(&self, task: &str) -> Result<(), ApiError> {
        self.call("task.destroy", vec![json!(task)]).await?;
        Ok(())
    }

    async fn invoke(&self, method: &str, params: Vec<Value>) -> Result<Value, ApiError> {
        let id = self.request_id.fetch_add(1, Ordering::Relaxed);
        log::debug!("calling {method} (request {id})");
        let response = self
            .client
            .post(&self.url)
            .json(&build_request(id, method, params))
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Http {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }
        let payload: Value = response.json().await?;
        parse_response(payload)
    }
}

pub(crate) fn build_request(id: u64, method: &str, params: Vec<Value>) -> Value {
    json!({
        "jsonrpc": "2.0",
        "method": method,
        "params": params,
        "id": id,
    })
}

pub(crate) fn parse_response(payload: Value) -> Result<Value, ApiError> {
    if let Some(error) = payload.get("error").filter(|error| !error.is_null()) {
        let mut description = vec![error
            .get("message")
            .map(parse_serde_json_value_to_raw_string)
            .unwrap_or_else(|| "UNKNOWN_ERROR".to_string())];
        match error.get("data") {
            Some(Value::Array(data)) => description.extend(parse_error_description(data)),
            Some(Value::Null) | None => {}
            Some(other) => description.push(parse_serde_json_value_to_raw_string(other)),
        }
        return Err(ApiError::Failure(description));
    }
    match payload.get("result") {
        Some(result) => Ok(result.clone()),
        None => Err(ApiError::InvalidResponse(format!(
            "response has neither result nor error: {payload}"
        ))),
    }
}
