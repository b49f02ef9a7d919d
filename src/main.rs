use std::path::PathBuf;

use clap::Parser;
use kmlmerge::cli::args::Cli;
use kmlmerge::cli::{execute, output, CliError, CliResult};
use kmlmerge::config::Settings;
use kmlmerge::exitcode;
use kmlmerge::infrastructure::di::ServiceContainer;
use kmlmerge::infrastructure::logging::setup_logging;
use kmlmerge::infrastructure::InfraError;

fn main() {
    let cli = Cli::parse();

    let code = match run(&cli) {
        Ok(()) => exitcode::OK,
        Err(e) => {
            output::error(&e);
            e.exit_code()
        }
    };
    std::process::exit(code);
}

fn run(cli: &Cli) -> CliResult<()> {
    let work_dir = match &cli.work_dir {
        Some(dir) => dir.clone(),
        None => std::env::current_dir()
            .map_err(|e| InfraError::io("determine working directory", e))?,
    };
    if !work_dir.is_dir() {
        return Err(CliError::Usage(format!(
            "not a directory: {}",
            work_dir.display()
        )));
    }

    let settings = Settings::load(Some(&work_dir))?;
    let log_file: PathBuf = settings.resolve(&work_dir, &settings.log_file);
    let _guard = setup_logging(cli.verbose, Some(&log_file))?;
    tracing::info!(
        "Starting in {} (threshold {} bytes, workers {}, extensions {:?})",
        work_dir.display(),
        settings.large_file_threshold,
        settings.workers,
        settings.extensions
    );

    let container = ServiceContainer::new(settings, work_dir);
    execute(cli, &container)
}

#[cfg(test)]
mod tests {
    use super::*;

    // https://docs.rs/clap/latest/clap/_derive/_tutorial/index.html#testing
    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
