//! # Output Formatting
//!
//! Rendering of run results for the terminal.
//!
//! Colour follows `--color=always|never|auto`. In `auto` mode it is turned
//! off by `NO_COLOR` (any value), `CLICOLOR=0`, `TERM=dumb` or a non-TTY
//! stdout, and forced on by `CLICOLOR_FORCE=1`. Without colour, status
//! markers fall back to plain bracketed tags so logs stay greppable.

use std::env;

use console::style;

use crate::applier::{RunSummary, TargetOutcome};

/// Whether output should be styled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputConfig {
    pub use_color: bool,
}

impl OutputConfig {
    /// Resolve the `--color` flag against the environment.
    pub fn from_env_and_flag(color_flag: &str) -> Self {
        let use_color = match color_flag.to_lowercase().as_str() {
            "always" => true,
            "never" => false,
            _ => detect_color_support(),
        };
        Self { use_color }
    }

    pub fn plain() -> Self {
        Self { use_color: false }
    }
}

fn detect_color_support() -> bool {
    if env::var_os("NO_COLOR").is_some() {
        return false;
    }
    if env::var("CLICOLOR").is_ok_and(|v| v == "0") {
        return false;
    }
    if env::var("CLICOLOR_FORCE").is_ok_and(|v| v != "0" && !v.is_empty()) {
        return true;
    }
    if env::var("TERM").is_ok_and(|v| v == "dumb") {
        return false;
    }
    console::Term::stdout().features().colors_supported()
}

/// Marker for a target that succeeded or failed.
pub fn marker(config: &OutputConfig, ok: bool) -> String {
    match (config.use_color, ok) {
        (true, true) => style("✔").green().to_string(),
        (true, false) => style("✘").red().to_string(),
        (false, true) => "[OK]".to_string(),
        (false, false) => "[ERR]".to_string(),
    }
}

/// One line describing what happened to a target.
pub fn format_outcome(config: &OutputConfig, outcome: &TargetOutcome) -> String {
    let target = format!(
        "{} ({}:{})",
        outcome.key, outcome.source_repo, outcome.file_path
    );
    let target = if config.use_color {
        style(target).bold().to_string()
    } else {
        target
    };

    match &outcome.result {
        Ok(update) => match &update.pull_request {
            Some(pr) => format!(
                "{} {} committed to {}, pull request {}",
                marker(config, true),
                target,
                update.branch,
                pr.link
            ),
            None => format!(
                "{} {} committed to {}",
                marker(config, true),
                target,
                update.branch
            ),
        },
        Err(e) => format!("{} {}: {}", marker(config, false), target, e),
    }
}

/// Lines for every target followed by a totals line.
pub fn format_summary(config: &OutputConfig, summary: &RunSummary) -> Vec<String> {
    let mut lines: Vec<String> = summary
        .outcomes
        .iter()
        .map(|o| format_outcome(config, o))
        .collect();

    let failed = summary.failed().count();
    let mut totals = format!(
        "{} updated, {} failed",
        summary.succeeded().count(),
        failed
    );
    if summary.was_cancelled() {
        totals.push_str(" (cancelled)");
    }
    lines.push(if config.use_color && failed > 0 {
        style(totals).red().to_string()
    } else {
        totals
    });
    lines
}
