//! CLI command handlers.

mod annotate;
mod apply;
mod config;
mod context;
mod format;

pub use annotate::run_annotate_command;
pub use apply::run_apply_command;
pub use config::run_config_show_command;
pub use format::run_format_command;
