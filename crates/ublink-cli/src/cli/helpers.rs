use super::CliError;
use anyhow::Context;
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use ublink_core::modules::serialization::{format_fixed_f64, write_text_artifact};
use ublink_core::modules::{
    BeamGeometry, IterationReport, LinkOutcome, ToleranceSchedule, load_beam_geometry,
    render_linked_summary, write_orientation, write_peak_table,
};

pub(super) const LINKED_PEAKS_FILE: &str = "LinkedPeaks.json";
pub(super) const LINKED_PREDICTED_PEAKS_FILE: &str = "LinkedPredictedPeaks.json";
pub(super) const LINKED_UB_FILE: &str = "LinkedUB.json";
pub(super) const LINKED_SUMMARY_FILE: &str = "LinkedPeaks.dat";

/// Logs go to stderr so stdout stays a clean summary.
pub(super) fn init_tracing(verbosity: u8) {
    let default_level = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

pub(super) fn load_geometry(path: Option<&Path>) -> Result<BeamGeometry, CliError> {
    match path {
        Some(path) => Ok(load_beam_geometry(path)?),
        None => Ok(BeamGeometry::default()),
    }
}

pub(super) fn ensure_parent_dir(path: &Path) -> Result<(), CliError> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory '{}'", parent.display()))?;
    }
    Ok(())
}

/// Writes every linking output under `output_dir` and returns the paths.
/// On failure the files already written are removed again.
pub(super) fn write_link_outputs(
    output_dir: &Path,
    outcome: &LinkOutcome,
) -> Result<Vec<PathBuf>, CliError> {
    fs::create_dir_all(output_dir).with_context(|| {
        format!(
            "failed to create output directory '{}'",
            output_dir.display()
        )
    })?;

    let mut written = Vec::with_capacity(4);
    let result = write_each_output(output_dir, outcome, &mut written);
    if result.is_err() {
        for path in &written {
            let _ = fs::remove_file(path);
        }
    }
    result.map(|()| written)
}

fn write_each_output(
    output_dir: &Path,
    outcome: &LinkOutcome,
    written: &mut Vec<PathBuf>,
) -> Result<(), CliError> {
    let linked_path = output_dir.join(LINKED_PEAKS_FILE);
    write_peak_table(&linked_path, &outcome.linked)?;
    written.push(linked_path);

    let predicted_path = output_dir.join(LINKED_PREDICTED_PEAKS_FILE);
    write_peak_table(&predicted_path, &outcome.predicted)?;
    written.push(predicted_path);

    let ub_path = output_dir.join(LINKED_UB_FILE);
    write_orientation(&ub_path, &outcome.orientation)?;
    written.push(ub_path);

    let summary_path = output_dir.join(LINKED_SUMMARY_FILE);
    write_text_artifact(&summary_path, &render_linked_summary(&outcome.linked))
        .with_context(|| format!("failed to write '{}'", summary_path.display()))?;
    written.push(summary_path);
    Ok(())
}

pub(super) fn render_iteration_summary(reports: &[IterationReport]) -> String {
    let mut content = String::new();
    for report in reports {
        content.push_str(&format!(
            "iteration {:>3}: qtol={} window={:>5} selected={:>5} matched={:>5} linked={:>5} ambiguous={}\n",
            report.index,
            format_fixed_f64(report.qtol, 10, 6),
            report.window,
            report.selected,
            report.matched,
            report.linked(),
            report.ambiguous
        ));
    }
    content
}

pub(super) fn render_schedule(schedule: &ToleranceSchedule, iterations: usize) -> String {
    let mut content = format!("{:>5}{:>14}{:>10}\n", "m", "qtol", "window");
    for state in schedule.states(iterations) {
        content.push_str(&format!(
            "{:>5}{}{:>10}\n",
            state.index,
            format_fixed_f64(state.qtol, 14, 8),
            state.window
        ));
    }
    content
}
