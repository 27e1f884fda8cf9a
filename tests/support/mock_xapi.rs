use std::{
    collections::HashMap,
    convert::Infallible,
    sync::{Arc, Mutex},
};

use anyhow::{Context, Result};
use hyper::service::{make_service_fn, service_fn};
use hyper::{body, Body, Method, Request, Response, Server, StatusCode};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use vmconsole::models::connection::Connection;

pub const SESSION_REF: &str = "OpaqueRef:session-1";
pub const PASSWORD: &str = "secret";

/// How the server task created for an `Async.*` method behaves.
#[derive(Clone, Debug)]
pub enum TaskPlan {
    /// Reports `pending` for the given number of polls, then `success`.
    Succeed { pending_polls: usize, result: String },
    Fail { error_info: Vec<String> },
    /// Stays `pending` until `task.cancel` is called.
    UntilCancelled,
}

struct TaskState {
    plan: TaskPlan,
    polls: usize,
    cancelled: bool,
}

#[derive(Default)]
struct XapiInner {
    calls: Vec<String>,
    plans: HashMap<String, TaskPlan>,
    tasks: HashMap<String, TaskState>,
    destroyed: Vec<String>,
    next_task: u64,
}

#[derive(Clone, Default)]
pub struct MockXapi {
    inner: Arc<Mutex<XapiInner>>,
}

impl MockXapi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the plan used by tasks for `method` (without the `Async.` prefix).
    pub fn plan(&self, method: &str, plan: TaskPlan) {
        self.lock().plans.insert(method.to_string(), plan);
    }

    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    pub fn call_count(&self, method: &str) -> usize {
        self.lock().calls.iter().filter(|call| *call == method).count()
    }

    pub fn destroyed_tasks(&self) -> Vec<String> {
        self.lock().destroyed.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, XapiInner> {
        self.inner.lock().expect("mock xapi poisoned")
    }

    fn handle_call(&self, call: Value) -> Value {
        let id = call.get("id").cloned().unwrap_or(Value::Null);
        let method = call
            .get("method")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let params = call
            .get("params")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        let param = |index: usize| {
            params
                .get(index)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };

        let mut inner = self.lock();
        inner.calls.push(method.clone());

        if method == "session.login_with_password" {
            return if param(1) == PASSWORD {
                success(id, json!(SESSION_REF))
            } else {
                error(
                    id,
                    "SESSION_AUTHENTICATION_FAILED",
                    &[param(0).as_str(), "Authentication failure"],
                )
            };
        }
        if param(0) != SESSION_REF {
            return error(id, "SESSION_INVALID", &[param(0).as_str()]);
        }

        if let Some(async_method) = method.strip_prefix("Async.") {
            inner.next_task += 1;
            let task = format!("OpaqueRef:task-{}", inner.next_task);
            let plan = inner
                .plans
                .get(async_method)
                .cloned()
                .unwrap_or(TaskPlan::Succeed {
                    pending_polls: 0,
                    result: String::new(),
                });
            inner.tasks.insert(
                task.clone(),
                TaskState {
                    plan,
                    polls: 0,
                    cancelled: false,
                },
            );
            return success(id, json!(task));
        }

        match method.as_str() {
            "session.logout" => success(id, json!("")),
            "task.get_record" => match inner.tasks.get_mut(&param(1)) {
                Some(task) => {
                    task.polls += 1;
                    success(id, task_record(task))
                }
                None => error(id, "HANDLE_INVALID", &["task", param(1).as_str()]),
            },
            "task.cancel" => match inner.tasks.get_mut(&param(1)) {
                Some(task) => {
                    task.cancelled = true;
                    success(id, json!(""))
                }
                None => error(id, "HANDLE_INVALID", &["task", param(1).as_str()]),
            },
            "task.destroy" => {
                let task = param(1);
                inner.tasks.remove(&task);
                inner.destroyed.push(task);
                success(id, json!(""))
            }
            _ => error(id, "MESSAGE_METHOD_UNKNOWN", &[method.as_str()]),
        }
    }
}

fn task_record(task: &TaskState) -> Value {
    if task.cancelled {
        return json!({"status": "cancelled", "progress": 0.5, "result": "", "error_info": []});
    }
    match &task.plan {
        TaskPlan::Succeed {
            pending_polls,
            result,
        } if task.polls > *pending_polls => {
            json!({"status": "success", "progress": 1.0, "result": result, "error_info": []})
        }
        TaskPlan::Succeed { pending_polls, .. } => {
            let progress = task.polls as f64 / (*pending_polls as f64 + 1.0);
            json!({"status": "pending", "progress": progress, "result": "", "error_info": []})
        }
        TaskPlan::Fail { error_info } => {
            json!({"status": "failure", "progress": 1.0, "result": "", "error_info": error_info})
        }
        TaskPlan::UntilCancelled => {
            json!({"status": "pending", "progress": 0.25, "result": "", "error_info": []})
        }
    }
}

pub struct MockXapiServer {
    port: u16,
    shutdown: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl MockXapiServer {
    pub async fn start(xapi: MockXapi) -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .context("failed to bind mock xapi listener")?;
        let addr = listener
            .local_addr()
            .context("failed to read mock listener address")?;
        let std_listener = listener
            .into_std()
            .context("failed to convert mock listener")?;
        std_listener
            .set_nonblocking(true)
            .context("failed to set mock listener non-blocking")?;

        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let make_service = make_service_fn(move |_| {
            let xapi = xapi.clone();
            async move { Ok::<_, Infallible>(service_fn(move |req| serve_request(xapi.clone(), req))) }
        });

        let server = Server::from_tcp(std_listener)
            .context("failed to build mock HTTP server")?
            .serve(make_service);
        let graceful = server.with_graceful_shutdown(async {
            let _ = shutdown_rx.await;
        });

        let handle = tokio::spawn(async move {
            if let Err(err) = graceful.await {
                eprintln!("mock xapi server stopped: {err}");
            }
        });

        Ok(Self {
            port: addr.port(),
            shutdown: Some(shutdown_tx),
            handle: Some(handle),
        })
    }

    pub fn connection(&self) -> Connection {
        let mut connection = Connection::new("127.0.0.1".into(), "root".into());
        connection.use_tls = false;
        connection.port = self.port;
        connection
    }

    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

async fn serve_request(xapi: MockXapi, req: Request<Body>) -> Result<Response<Body>, Infallible> {
    if req.method() != Method::POST {
        let mut response = Response::new(Body::from("Unsupported method"));
        *response.status_mut() = StatusCode::METHOD_NOT_ALLOWED;
        return Ok(response);
    }

    let bytes = match body::to_bytes(req.into_body()).await {
        Ok(bytes) => bytes,
        Err(err) => {
            let mut response = Response::new(Body::from(format!("failed to read body: {err}")));
            *response.status_mut() = StatusCode::BAD_REQUEST;
            return Ok(response);
        }
    };

    let payload: Value = match serde_json::from_slice(&bytes) {
        Ok(value) => value,
        Err(err) => {
            let mut response = Response::new(Body::from(format!("invalid JSON payload: {err}")));
            *response.status_mut() = StatusCode::BAD_REQUEST;
            return Ok(response);
        }
    };

    let mut response = Response::new(Body::from(xapi.handle_call(payload).to_string()));
    response.headers_mut().insert(
        hyper::header::CONTENT_TYPE,
        hyper::header::HeaderValue::from_static("application/json"),
    );
    Ok(response)
}

fn success(id: Value, result: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "result": result,
        "id": id,
    })
}

fn error(id: Value, message: &str, data: &[&str]) -> Value {
    json!({
        "jsonrpc": "2.0",
        "error": {
            "code": 1,
            "message": message,
            "data": data,
        },
        "id": id,
    })
}
