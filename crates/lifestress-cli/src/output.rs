//! Formatted output helpers for the run summary.

use std::fmt::Write;
use std::time::Duration;

use lifestress_harness::report::{RunReport, Termination};

const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const RESET: &str = "\x1b[0m";

/// Formats a duration as milliseconds below one second, seconds above.
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn format_duration(elapsed: Duration) -> String {
    if elapsed < Duration::from_secs(1) {
        format!("{}ms", elapsed.as_millis())
    } else {
        format!("{:.1}s", elapsed.as_secs_f64())
    }
}

/// Renders the per-phase table and the closing status line.
#[must_use]
pub fn render_summary(report: &RunReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "  {BOLD}lifestress{RESET} {DIM}v{} [{}] started {}{RESET}",
        env!("CARGO_PKG_VERSION"),
        report.backend,
        report.started_at
    );
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "  {DIM}{:>4}  {:<8} {:>6} {:>6} {:>6} {:>7} {:>8}{RESET}",
        "ITER", "PHASE", "OK", "FAILED", "FATAL", "SKIPPED", "TIME"
    );
    for phase in &report.phases {
        let _ = writeln!(
            out,
            "  {:>4}  {:<8} {:>6} {:>6} {:>6} {:>7} {:>8}",
            phase.iteration + 1,
            phase.phase.as_str(),
            phase.succeeded,
            phase.failures(),
            phase.fatal,
            phase.skipped,
            format_duration(phase.elapsed)
        );
    }
    let _ = writeln!(out);

    let tasks = match report.expected_tasks {
        Some(expected) => format!("{}/{expected}", report.total_tasks()),
        None => report.total_tasks().to_string(),
    };
    let failures = report.total_failures();
    let elapsed = format_duration(report.elapsed);
    let _ = match &report.termination {
        Termination::Completed if failures == 0 => writeln!(
            out,
            "  {GREEN}{BOLD}Completed{RESET} {tasks} task(s) in {elapsed}"
        ),
        Termination::Completed => writeln!(
            out,
            "  {YELLOW}{BOLD}Completed{RESET} {tasks} task(s) in {elapsed}, {failures} failed"
        ),
        Termination::Aborted { task, error } => writeln!(
            out,
            "  {RED}{BOLD}Aborted{RESET} at {task}: {error}"
        ),
        Termination::Interrupted => writeln!(
            out,
            "  {YELLOW}{BOLD}Interrupted{RESET} after {tasks} task(s)"
        ),
    };
    out
}
