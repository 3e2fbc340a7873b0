//! Terminal output for the CLI.

use console::style;

use crate::alias::AliasTransition;
use crate::cli::PipelineReport;
use crate::domain::TagScheme;
use crate::push::PushOutcome;
use crate::release::ReleasePlan;
use crate::warning::PipelineWarning;

/// Format and print an error message in red.
pub fn display_error(message: &str) {
    eprintln!("{} {}", style("ERROR:").red().bold(), message);
}

/// Format and print a success message with green checkmark.
pub fn display_success(message: &str) {
    println!("{} {}", style("✓").green(), message);
}

/// Format and print a status message with yellow arrow.
pub fn display_status(message: &str) {
    println!("{} {}", style("→").yellow(), message);
}

pub fn display_warning(warning: &PipelineWarning) {
    eprintln!("{} {}", style("⚠ WARNING:").yellow(), warning);
}

/// Lines describing what a release will do to the version and alias tags
pub fn release_plan_lines(plan: &ReleasePlan, scheme: &TagScheme) -> Vec<String> {
    let mut lines = Vec::new();
    if plan.is_initial() {
        lines.push(format!("Initial version: {}", plan.tag_name));
    }
    if let Some(previous) = &plan.previous {
        lines.push(format!("Version: {} -> {}", previous.name, plan.tag_name));
        lines.push(format!(
            "{} -> {} ({})",
            scheme.previous_alias(),
            previous.name,
            previous.commit.short_id()
        ));
    }
    lines.push(format!("{} -> new commit", scheme.latest_alias()));
    lines
}

/// Display the next release computed from the current tags.
pub fn display_release_plan(plan: &ReleasePlan, scheme: &TagScheme) {
    println!("\n{}", style("Next data version:").bold());
    for line in release_plan_lines(plan, scheme) {
        println!("  {}", line);
    }
}

/// Lines summarising a finished push
pub fn push_summary_lines(outcome: &PushOutcome) -> Vec<String> {
    let release = &outcome.release;
    let mut lines = vec![format!("Commit: {}", outcome.commit.short_id())];

    if release.version_tag_created {
        lines.push(format!("Tagged: {}", release.plan.tag_name));
    }
    for alias in release.previous_alias.iter().chain([&release.latest_alias]) {
        let verb = match alias.transition {
            AliasTransition::Created => "created",
            AliasTransition::Replaced => "moved",
        };
        lines.push(format!(
            "{} {} to {}",
            alias.alias,
            verb,
            alias.target.short_id()
        ));
    }
    lines
}

/// Display a pipeline report, then any warnings it collected.
pub fn display_report(report: &PipelineReport) {
    if let Some(bytes) = report.downloaded_bytes {
        display_success(&format!("Downloaded {} bytes", bytes));
    }
    if let Some(cleanse) = &report.cleanse {
        display_success(&format!(
            "Cleansed {} rows ({} duplicates, {} unlabeled removed, {} values imputed)",
            cleanse.rows_out,
            cleanse.duplicates_removed,
            cleanse.unlabeled_removed,
            cleanse.cells_imputed
        ));
    }
    if let Some((train, val, test)) = report.split {
        display_success(&format!(
            "Split into train {} / val {} / test {}",
            train, val, test
        ));
    }
    if let Some(push) = &report.push {
        display_success("Pushed data version");
        for line in push_summary_lines(push) {
            println!("  {}", line);
        }
        for warning in &push.warnings {
            display_warning(warning);
        }
    }
}
