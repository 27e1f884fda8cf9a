use serde::{Deserialize, Serialize};

pub const DEFAULT_TLS_PORT: u16 = 443;
pub const DEFAULT_PLAIN_PORT: u16 = 80;

#[derive(Serialize, Deserialize, Debug, Clone, Eq, PartialEq)]
pub struct Connection {
    pub hostname: String,
    pub port: u16,
    pub username: String,
    pub use_tls: bool,
    pub trust_invalid_certs: bool,
}

impl Connection {
    pub fn new(hostname: String, username: String) -> Self {
        Self {
            hostname,
            port: DEFAULT_TLS_PORT,
            username,
            use_tls: true,
            trust_invalid_certs: false,
        }
    }

    pub fn base_url(&self) -> String {
        let scheme = if self.use_tls { "https" } else { "http" };
        format!("{scheme}://{}:{}", self.hostname, self.port)
    }

    pub fn rpc_url(&self) -> String {
        self.base_url() + "/jsonrpc"
    }
}
