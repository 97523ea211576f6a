//! Output formatting for CLI

use clap::ValueEnum;
use colored::Colorize;
use liquidfn_harness::{JsonPresenter, Presenter, TextPresenter, TextStyle};

/// Output format
#[derive(Debug, Clone, Copy, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable blocks
    #[default]
    Text,
    /// JSON format
    Json,
}

/// Build the presenter for the selected format
pub fn presenter(
    format: OutputFormat,
    pretty: Option<usize>,
    with_overall: bool,
    color: bool,
) -> Box<dyn Presenter> {
    match format {
        OutputFormat::Text => {
            Box::new(TextPresenter::new(TextStyle { color }).with_overall(with_overall))
        }
        OutputFormat::Json => Box::new(JsonPresenter::new(pretty).with_overall(with_overall)),
    }
}

/// Print success message
pub fn print_success(message: &str) {
    eprintln!("{} {}", " OK ".on_green(), message.green());
}

/// Print error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", " ERR ".on_red(), message.red());
}

/// Print warning message
pub fn print_warning(message: &str) {
    eprintln!("{} {}", " WARN ".on_yellow(), message.yellow());
}
