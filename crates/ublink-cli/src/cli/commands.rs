use super::CliError;
use super::helpers::*;
use anyhow::Context;
use std::fs;
use std::path::PathBuf;
use tracing::info;
use ublink_core::common::load_link_config;
use ublink_core::modules::{
    IterationController, PeakPredictor, PredictionRequest, ReflectionPredictor, TableKind,
    ToleranceSchedule, read_orientation, read_peak_table, write_peak_table,
};

#[derive(clap::Args)]
#[command(group(clap::ArgGroup::new("seed").required(true).args(["predicted", "reference_ub"])))]
pub(super) struct LinkArgs {
    /// Linking configuration (JSON)
    #[arg(long)]
    config: PathBuf,

    /// Observed peak table from peak finding
    #[arg(long)]
    observed: PathBuf,

    /// Seed predicted peak table
    #[arg(long)]
    predicted: Option<PathBuf>,

    /// Reference UB matrix; the seed is predicted from it
    #[arg(long)]
    reference_ub: Option<PathBuf>,

    /// Beam geometry (JSON); defaults to a beam along +z with full coverage
    #[arg(long)]
    workspace: Option<PathBuf>,

    /// Directory receiving the linked tables and refined UB
    #[arg(long)]
    output_dir: PathBuf,
}

#[derive(clap::Args)]
pub(super) struct PredictArgs {
    /// Linking configuration (JSON); only the bands and reflection condition are used
    #[arg(long)]
    config: PathBuf,

    /// UB matrix to predict from
    #[arg(long)]
    ub: PathBuf,

    /// Beam geometry (JSON)
    #[arg(long)]
    workspace: Option<PathBuf>,

    /// Predicted peak table output path
    #[arg(long)]
    output: PathBuf,
}

#[derive(clap::Args)]
pub(super) struct ScheduleArgs {
    /// Linking configuration (JSON)
    #[arg(long)]
    config: PathBuf,
}

pub(super) fn run_link_command(args: LinkArgs) -> Result<i32, CliError> {
    let config = load_link_config(&args.config)?;
    let geometry = load_geometry(args.workspace.as_deref())?;
    let controller = IterationController::with_lattice_backend(config, geometry)?;

    let observed = read_peak_table(&args.observed, TableKind::Observed)?;
    let seed = match (&args.predicted, &args.reference_ub) {
        (Some(path), _) => read_peak_table(path, TableKind::Predicted)?,
        (None, Some(path)) => controller.seed_from_reference(&read_orientation(path)?)?,
        (None, None) => {
            return Err(CliError::Usage(
                "one of --predicted or --reference-ub is required".to_string(),
            ));
        }
    };

    let outcome = controller.run(&observed, seed)?;
    let written = write_link_outputs(&args.output_dir, &outcome)?;

    print!("{}", render_iteration_summary(&outcome.iterations));
    println!(
        "Linked {} of {} observed peaks; {} predicted peaks in final catalogue.",
        outcome.linked.len(),
        observed.len(),
        outcome.predicted.len()
    );
    for path in written {
        println!("Wrote {}", path.display());
    }

    if controller.config().delete_workspace
        && let Some(workspace) = &args.workspace
    {
        fs::remove_file(workspace)
            .with_context(|| format!("failed to delete workspace '{}'", workspace.display()))?;
        info!(workspace = %workspace.display(), "deleted workspace after successful link");
        println!("Deleted workspace {}", workspace.display());
    }

    Ok(0)
}

pub(super) fn run_predict_command(args: PredictArgs) -> Result<i32, CliError> {
    let config = load_link_config(&args.config)?;
    config.validate()?;
    let geometry = load_geometry(args.workspace.as_deref())?;
    let orientation = read_orientation(&args.ub)?;

    let request = PredictionRequest::from_config(&config, geometry);
    let predicted = ReflectionPredictor.predict(&orientation, &request)?;
    ensure_parent_dir(&args.output)?;
    write_peak_table(&args.output, &predicted)?;

    println!(
        "Predicted {} peaks; wrote {}",
        predicted.len(),
        args.output.display()
    );
    Ok(0)
}

pub(super) fn run_schedule_command(args: ScheduleArgs) -> Result<i32, CliError> {
    let config = load_link_config(&args.config)?;
    config.validate()?;
    let schedule = ToleranceSchedule::from_config(&config);
    print!("{}", render_schedule(&schedule, config.iterations));
    Ok(0)
}
