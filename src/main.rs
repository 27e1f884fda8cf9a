mod cli;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use cli::{Cli, Command, PowerArgs};
use std::io::Write;
use std::sync::Arc;
use vmconsole::core::settings;
use vmconsole::db::HistoryDatabase;
use vmconsole::models::operation::OperationProgress;
use vmconsole::operations::{ApiCallOperation, Operation, OperationEvent, OperationHandle};
use vmconsole::widgets::progress_info::{operation_progress_line, DEFAULT_BAR_WIDTH};
use vmconsole::{Console, ConsoleConfig, Session};

enum PowerAction {
    Start,
    Shutdown,
    Reboot,
    Snapshot(String),
}

impl PowerAction {
    fn title(&self, count: usize) -> String {
        let verb = match self {
            Self::Start => "Start",
            Self::Shutdown => "Shut down",
            Self::Reboot => "Reboot",
            Self::Snapshot(_) => "Snapshot",
        };
        format!("{verb} {count} VM(s)")
    }

    fn descriptions(&self) -> (&'static str, &'static str) {
        match self {
            Self::Start => ("Starting VMs", "VMs started"),
            Self::Shutdown => ("Shutting down VMs", "VMs shut down"),
            Self::Reboot => ("Rebooting VMs", "VMs rebooted"),
            Self::Snapshot(_) => ("Taking snapshots", "Snapshots taken"),
        }
    }

    fn operation(&self, vm_ref: &str, vm_name: &str) -> ApiCallOperation {
        match self {
            Self::Start => ApiCallOperation::vm_start(vm_ref, vm_name),
            Self::Shutdown => ApiCallOperation::vm_clean_shutdown(vm_ref, vm_name),
            Self::Reboot => ApiCallOperation::vm_clean_reboot(vm_ref, vm_name),
            Self::Snapshot(name) => ApiCallOperation::vm_snapshot(vm_ref, vm_name, name),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    settings::init();
    let cli = Cli::parse();
    let config = settings::config(cli.config.as_deref());

    match cli.command {
        Command::Start(args) => run_power_batch(config, args, PowerAction::Start).await,
        Command::Shutdown(args) => run_power_batch(config, args, PowerAction::Shutdown).await,
        Command::Reboot(args) => run_power_batch(config, args, PowerAction::Reboot).await,
        Command::Snapshot { power, name } => {
            run_power_batch(config, power, PowerAction::Snapshot(name)).await
        }
        Command::History { limit } => show_history(limit).await,
    }
}

async fn run_power_batch(
    mut config: ConsoleConfig,
    args: PowerArgs,
    action: PowerAction,
) -> Result<()> {
    config.stop_on_first_error |= args.stop_on_first_error;
    config.show_sub_operation_details &= !args.hide_details;

    let console = Console::new(config).await;
    let connection = args.connection.to_connection();
    let mut session = Session::login(&connection, &args.connection.password, console.config())
        .await
        .with_context(|| format!("failed to log in to {}", connection.base_url()))?;

    let poll_interval = console.config().poll_interval();
    let operations: Vec<Arc<dyn Operation>> = args
        .vms
        .iter()
        .map(|target| {
            let (vm_ref, vm_name) = cli::parse_vm_target(target);
            Arc::new(
                action
                    .operation(&vm_ref, &vm_name)
                    .with_poll_interval(poll_interval),
            ) as Arc<dyn Operation>
        })
        .collect();
    let (start_description, end_description) = action.descriptions();
    let batch = Arc::new(console.batch(
        action.title(operations.len()),
        start_description,
        end_description,
        operations,
    ));
    attach_progress_printer(batch.handle());

    let ctrl_c = {
        let batch = batch.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                log::warn!("Ctrl-C received, cancelling after the current VM");
                batch.cancel();
            }
        })
    };
    let state = console.run(batch.as_ref(), &session).await;
    ctrl_c.abort();
    eprintln!();

    for sub_operation in batch.sub_operations() {
        let sub_state = sub_operation.handle().snapshot();
        match sub_state.error_message {
            Some(message) => println!("{:<12} {}: {message}", sub_state.status, sub_state.title),
            None => println!("{:<12} {}", sub_state.status, sub_state.title),
        }
    }

    if let Err(e) = session.logout().await {
        log::warn!("failed to log out: {e}");
    }

    match state.error_message {
        Some(message) => Err(anyhow!(message)),
        None => {
            println!("{}", state.description);
            Ok(())
        }
    }
}

fn attach_progress_printer(handle: &OperationHandle) {
    let weak = handle.downgrade();
    handle.subscribe(Arc::new(move |event: &OperationEvent| {
        if matches!(event, OperationEvent::Completed(_)) {
            return;
        }
        if let Some(handle) = weak.upgrade() {
            let progress = OperationProgress::from_state(&handle.snapshot(), true);
            let mut stderr = std::io::stderr().lock();
            let _ = write!(
                stderr,
                "\r\x1b[2K{}",
                operation_progress_line(&progress, DEFAULT_BAR_WIDTH)
            );
            let _ = stderr.flush();
        }
    }));
}

async fn show_history(limit: u32) -> Result<()> {
    let history = HistoryDatabase::create()
        .await
        .context("failed to open the operation history")?;
    let records = history.recent(limit).await?;
    if records.is_empty() {
        println!("No operations recorded yet.");
    }
    for record in records {
        let error = record
            .error_message
            .as_deref()
            .map(|message| format!(" - {message}"))
            .unwrap_or_default();
        println!(
            "{}  {:<12} {} ({}s){error}",
            record.finished_at.format("%Y-%m-%d %H:%M:%S"),
            record.status,
            record.title,
            record.duration().num_seconds(),
        );
    }
    Ok(())
}
