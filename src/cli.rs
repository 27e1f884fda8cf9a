use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use vmconsole::models::connection::{Connection, DEFAULT_PLAIN_PORT, DEFAULT_TLS_PORT};

#[derive(Parser)]
#[command(name = "vmconsole", version, about = "Batch VM operations against a pool master")]
pub struct Cli {
    /// Configuration file (defaults to the user config directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start VMs
    Start(PowerArgs),
    /// Cleanly shut down VMs
    Shutdown(PowerArgs),
    /// Cleanly reboot VMs
    Reboot(PowerArgs),
    /// Snapshot VMs
    Snapshot {
        #[command(flatten)]
        power: PowerArgs,
        /// Name given to every snapshot
        #[arg(long)]
        name: String,
    },
    /// Show recently finished operations
    History {
        #[arg(long, default_value = "20")]
        limit: u32,
    },
}

#[derive(Args)]
pub struct ConnectionArgs {
    /// Pool master hostname or address
    #[arg(long)]
    pub host: String,
    /// Defaults to 443, or 80 with --no-tls
    #[arg(long)]
    pub port: Option<u16>,
    #[arg(long, default_value = "root")]
    pub username: String,
    #[arg(long, env = "VMCONSOLE_PASSWORD", hide_env_values = true)]
    pub password: String,
    /// Use plain HTTP
    #[arg(long)]
    pub no_tls: bool,
    /// Accept invalid TLS certificates
    #[arg(long)]
    pub insecure: bool,
}

impl ConnectionArgs {
    pub fn to_connection(&self) -> Connection {
        let mut connection = Connection::new(self.host.clone(), self.username.clone());
        connection.use_tls = !self.no_tls;
        connection.port = self.port.unwrap_or(if self.no_tls {
            DEFAULT_PLAIN_PORT
        } else {
            DEFAULT_TLS_PORT
        });
        connection.trust_invalid_certs = self.insecure;
        connection
    }
}

#[derive(Args)]
pub struct PowerArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,
    /// Skip the remaining VMs after the first failure
    #[arg(long)]
    pub stop_on_first_error: bool,
    /// Keep the batch description instead of mirroring the current VM's
    #[arg(long)]
    pub hide_details: bool,
    /// VM references, optionally followed by `=NAME` for display
    #[arg(required = true)]
    pub vms: Vec<String>,
}

/// Splits `OpaqueRef:...=web01` into reference and display name.
pub fn parse_vm_target(target: &str) -> (String, String) {
    match target.split_once('=') {
        Some((vm_ref, name)) if !name.is_empty() => (vm_ref.to_string(), name.to_string()),
        Some((vm_ref, _)) => (vm_ref.to_string(), vm_ref.to_string()),
        None => (target.to_string(), target.to_string()),
    }
}
