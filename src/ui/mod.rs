//! Modern CLI UI utilities for terminal output.
//!
//! This module provides colored status lines, a spinner for long-running
//! translations, and table rendering for provider status.

use comfy_table::{Attribute, Cell, Color, Table};
use is_terminal::IsTerminal;
use owo_colors::OwoColorize;
use std::time::Duration;

use crate::models::{JobSuccess, StatusSnapshot};

/// Check if stdout is a terminal.
pub fn is_terminal() -> bool {
    std::io::stdout().is_terminal()
}

/// Check if stderr is a terminal (where spinners are drawn).
pub fn is_stderr_terminal() -> bool {
    std::io::stderr().is_terminal()
}

/// Status icons for different operations.
pub fn status_icon(status: Status) -> &'static str {
    match status {
        Status::Success => "✓",
        Status::Error => "✗",
        Status::Warning => "⚠",
        Status::Info => "ℹ",
        Status::Pending => "○",
    }
}

/// Status types for colored output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Success,
    Error,
    Warning,
    Info,
    Pending,
}

/// Print a styled status message.
pub fn print_status(status: Status, msg: &str) {
    let icon = status_icon(status);
    match status {
        Status::Success => println!("{} {}", icon.green().bold(), msg),
        Status::Error => println!("{} {}", icon.red().bold(), msg),
        Status::Warning => println!("{} {}", icon.yellow().bold(), msg),
        Status::Info => println!("{} {}", icon.cyan().bold(), msg),
        Status::Pending => println!("{} {}", icon.white().dimmed(), msg),
    }
}

/// Print a section header.
pub fn print_section(title: &str) {
    println!();
    println!("{}", format!("━━━ {} ━━━", title).bold().cyan());
}

/// Print a divider line.
pub fn print_divider() {
    println!("{}", "─".repeat(60).dimmed());
}

/// Human-readable duration (e.g. "1m 05s", "3.2s").
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs >= 3600 {
        format!("{}h {:02}m", secs / 3600, (secs % 3600) / 60)
    } else if secs >= 60 {
        format!("{}m {:02}s", secs / 60, secs % 60)
    } else {
        format!("{:.1}s", duration.as_secs_f64())
    }
}

/// Get a human-readable file size.
pub fn format_file_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Table of providers and their defaults.
pub fn provider_table(snapshot: &StatusSnapshot) -> Table {
    let mut table = Table::new();
    table.load_preset(comfy_table::presets::UTF8_FULL);
    table.set_header(vec!["Service", "Configured", "Model", "Endpoint", "QPS"]);

    for provider in &snapshot.providers {
        let mut name = Cell::new(provider.id.id()).add_attribute(Attribute::Bold);
        if provider.id == snapshot.default_service {
            name = Cell::new(format!("{} (default)", provider.id.id()))
                .add_attribute(Attribute::Bold);
        }
        let configured = if provider.configured {
            Cell::new("yes").fg(Color::Green)
        } else {
            Cell::new(format!("no ({})", provider.env_var)).fg(Color::Red)
        };
        table.add_row(vec![
            name,
            configured,
            Cell::new(&provider.model),
            Cell::new(&provider.base_url),
            Cell::new(provider.qps),
        ]);
    }
    table
}

/// Table of supported languages.
pub fn language_table(snapshot: &StatusSnapshot) -> Table {
    let mut table = Table::new();
    table.load_preset(comfy_table::presets::UTF8_FULL);
    table.set_header(vec!["Code", "Language"]);
    for language in &snapshot.languages {
        table.add_row(vec![Cell::new(language.code), Cell::new(language.name)]);
    }
    table
}

/// Table of produced files with their sizes.
pub fn output_table(success: &JobSuccess) -> Table {
    let mut table = Table::new();
    table.load_preset(comfy_table::presets::UTF8_FULL);
    table.set_header(vec!["Output", "Size"]);
    for path in &success.outputs {
        let size = std::fs::metadata(path)
            .map(|m| format_file_size(m.len()))
            .unwrap_or_else(|_| "?".to_string());
        table.add_row(vec![Cell::new(path.display()), Cell::new(size)]);
    }
    table
}

/// Print a loading spinner with message.
pub struct Spinner {
    pb: indicatif::ProgressBar,
}

impl Spinner {
    /// Create a new spinner with the given message.
    ///
    /// Drawn on stderr; hidden when stderr is not a terminal.
    pub fn new(msg: &str) -> Self {
        let pb = if is_stderr_terminal() {
            indicatif::ProgressBar::new_spinner()
        } else {
            indicatif::ProgressBar::hidden()
        };
        if let Ok(style) = indicatif::ProgressStyle::with_template("{spinner:.cyan} {msg} [{elapsed}]")
        {
            pb.set_style(style.tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ "));
        }
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));

        Self { pb }
    }

    /// Set the message.
    pub fn set_message(&self, msg: &str) {
        self.pb.set_message(msg.to_string());
    }

    /// Finish with success message.
    pub fn finish_with_success(&self, msg: &str) {
        self.finish_styled("{spinner:.green} {msg}", msg);
    }

    /// Finish with error message.
    pub fn finish_with_error(&self, msg: &str) {
        self.finish_styled("{spinner:.red} {msg}", msg);
    }

    fn finish_styled(&self, template: &str, msg: &str) {
        if let Ok(style) = indicatif::ProgressStyle::with_template(template) {
            self.pb.set_style(style.tick_chars("✓ ✗ "));
        }
        self.pb.finish_with_message(msg.to_string());
    }

    /// Finish the spinner.
    pub fn finish(&self) {
        self.pb.finish_and_clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DispatcherStatus, ProviderStatus};
    use crate::providers::ProviderKind;

    #[test]
    fn test_status_icon() {
        assert_eq!(status_icon(Status::Success), "✓");
        assert_eq!(status_icon(Status::Error), "✗");
        assert_eq!(status_icon(Status::Pending), "○");
    }

    #[test]
    fn test_format_file_size() {
        assert_eq!(format_file_size(500), "500 B");
        assert_eq!(format_file_size(1024), "1.00 KB");
        assert_eq!(format_file_size(1048576), "1.00 MB");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(3200)), "3.2s");
        assert_eq!(format_duration(Duration::from_secs(65)), "1m 05s");
        assert_eq!(format_duration(Duration::from_secs(3720)), "1h 02m");
    }

    #[test]
    fn test_provider_table() {
        let snapshot = StatusSnapshot {
            service: "babeldoc-mcp".to_string(),
            version: "0.1.0".to_string(),
            default_service: ProviderKind::OpenRouter,
            providers: vec![ProviderStatus {
                id: ProviderKind::OpenAi,
                name: "OpenAI".to_string(),
                configured: false,
                env_var: "OPENAI_API_KEY".to_string(),
                model: "gpt-4o-mini".to_string(),
                base_url: "https://api.openai.com/v1".to_string(),
                qps: 4,
            }],
            languages: StatusSnapshot::supported_languages(),
            dispatcher: DispatcherStatus {
                max_concurrent_jobs: 2,
                in_flight: 0,
            },
        };

        let rendered = provider_table(&snapshot).to_string();
        assert!(rendered.contains("openai"));
        assert!(rendered.contains("OPENAI_API_KEY"));
        assert!(rendered.contains("gpt-4o-mini"));

        let languages = language_table(&snapshot).to_string();
        assert!(languages.contains("Vietnamese"));
    }
}
