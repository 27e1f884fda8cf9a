pub mod progress_info;
