use crate::models::operation::OperationProgress;

pub const DEFAULT_BAR_WIDTH: usize = 24;

pub fn operation_progress_line(progress: &OperationProgress, bar_width: usize) -> String {
    let percent = usize::from(progress.percent_complete.min(100));
    let filled = percent * bar_width / 100;
    let bar = format!("{}{}", "#".repeat(filled), "-".repeat(bar_width - filled));

    let mut line = format!("[{bar}] {percent:>3}% {}", progress.operation_label);
    if let Some(sub_operation_label) = &progress.sub_operation_label {
        line.push_str(" | ");
        line.push_str(sub_operation_label);
    }
    if progress.cancellable {
        line.push_str(" (Ctrl-C to cancel)");
    }
    line
}
