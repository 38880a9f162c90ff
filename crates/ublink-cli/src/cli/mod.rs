mod commands;
mod helpers;

use clap::Parser;
use ublink_core::domain::LinkError;

pub fn run_from_env() -> i32 {
    let args: Vec<String> = std::env::args().skip(1).collect();

    match run(args) {
        Ok(code) => code,
        Err(error) => {
            let link_error = error.as_link_error();
            eprintln!("{}", link_error.diagnostic_line());
            eprintln!("{}", link_error.fatal_exit_line());
            link_error.exit_code()
        }
    }
}

pub fn run<I, S>(args: I) -> Result<i32, CliError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let full_args = std::iter::once("ublink".to_string())
        .chain(args.into_iter().map(Into::into))
        .collect::<Vec<_>>();

    match Cli::try_parse_from(&full_args) {
        Ok(cli) => {
            helpers::init_tracing(cli.verbose);
            dispatch_parsed(cli.command)
        }
        Err(err) => match err.kind() {
            clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => {
                print!("{}", err);
                Ok(0)
            }
            _ => Err(CliError::Usage(err.to_string())),
        },
    }
}

#[derive(Parser)]
#[command(
    name = "ublink",
    version,
    about = "Link observed peaks to a reference UB orientation matrix"
)]
struct Cli {
    /// Raise log verbosity (-v info, -vv debug); RUST_LOG takes precedence
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(clap::Subcommand)]
enum CliCommand {
    /// Iteratively match, refine and re-predict against a reference orientation
    Link(commands::LinkArgs),
    /// Predict reflections for a fixed orientation matrix
    Predict(commands::PredictArgs),
    /// Print the per-iteration tolerance and window schedule
    Schedule(commands::ScheduleArgs),
}

fn dispatch_parsed(command: CliCommand) -> Result<i32, CliError> {
    match command {
        CliCommand::Link(args) => commands::run_link_command(args),
        CliCommand::Predict(args) => commands::run_predict_command(args),
        CliCommand::Schedule(args) => commands::run_schedule_command(args),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("{0}")]
    Usage(String),
    #[error("{0}")]
    Compute(LinkError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl CliError {
    fn as_link_error(&self) -> LinkError {
        match self {
            Self::Usage(message) => LinkError::configuration("INPUT.CLI_USAGE", message.clone()),
            Self::Compute(error) => error.clone(),
            Self::Internal(error) => LinkError::io_system("IO.CLI", format!("{error:#}")),
        }
    }
}

impl From<LinkError> for CliError {
    fn from(error: LinkError) -> Self {
        Self::Compute(error)
    }
}
