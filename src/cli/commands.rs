//! Command dispatch and the interactive menu

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::CommandFactory;
use itertools::Itertools;
use tracing::{debug, info, instrument, warn};

use crate::application::services::MergeRun;
use crate::application::ApplicationError;
use crate::cli::args::{Cli, Commands, ConfigCommands};
use crate::cli::output;
use crate::cli::{CliError, CliResult};
use crate::config::{global_config_path, local_config_path, Settings};
use crate::domain::{Selection, SelectionInput, SourceDocument, SourceStatus};
use crate::infrastructure::di::ServiceContainer;
use crate::infrastructure::traits::Clock;
use crate::infrastructure::InfraError;

const BANNER: &str = " kmlmerge: merge UFED KML exports ";
const SELECTION_PROMPT: &str =
    "Enter numbers of files to merge (e.g., 1, 2, 5) or Enter to merge all:";
const MENU_PAUSE_SECS: u64 = 3;

/// Run the command selected on the command line.
pub fn execute(cli: &Cli, container: &ServiceContainer) -> CliResult<()> {
    match &cli.command {
        Some(Commands::Merge { files, no_report }) => cmd_merge(container, files, *no_report),
        Some(Commands::List) => cmd_list(container),
        Some(Commands::Config { command }) => cmd_config(container, command),
        Some(Commands::Completion { shell }) => {
            clap_complete::generate(*shell, &mut Cli::command(), "kmlmerge", &mut io::stdout());
            Ok(())
        }
        None => run_interactive(container),
    }
}

#[instrument(skip(container))]
fn cmd_merge(container: &ServiceContainer, files: &[PathBuf], no_report: bool) -> CliResult<()> {
    let sources = if files.is_empty() {
        container
            .catalog_service()
            .source_paths(&container.work_dir)?
    } else {
        files.iter().map(|f| container.source_path(f)).collect()
    };
    debug!("cmd_merge: {} sources", sources.len());

    let selection = Selection::new(sources).map_err(ApplicationError::from)?;
    let run = container
        .merge_service(!no_report)
        .merge_and_write(selection.sources())?;
    print_run(&run);
    Ok(())
}

fn cmd_list(container: &ServiceContainer) -> CliResult<()> {
    let documents = container.catalog_service().list(&container.work_dir)?;
    if documents.is_empty() {
        output::info(&format!(
            "No KML files found in {}",
            container.work_dir.display()
        ));
        return Ok(());
    }
    print_listing(&documents);
    Ok(())
}

fn cmd_config(container: &ServiceContainer, command: &ConfigCommands) -> CliResult<()> {
    match command {
        ConfigCommands::Show => {
            output::info(&container.settings.to_toml()?);
            Ok(())
        }
        ConfigCommands::Init { global } => {
            let path = if *global {
                global_config_path().ok_or_else(|| {
                    CliError::Usage("cannot determine global config directory".into())
                })?
            } else {
                local_config_path(&container.work_dir)
            };
            init_config(&path)
        }
        ConfigCommands::Path => {
            match global_config_path() {
                Some(path) => output::action("Global", &describe_config(&path)),
                None => output::action("Global", &"<unavailable>"),
            }
            output::action(
                "Local",
                &describe_config(&local_config_path(&container.work_dir)),
            );
            Ok(())
        }
    }
}

fn init_config(path: &Path) -> CliResult<()> {
    if path.exists() {
        return Err(CliError::Usage(format!(
            "config already exists: {}",
            path.display()
        )));
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .map_err(|e| InfraError::io(format!("create {}", parent.display()), e))?;
    }
    std::fs::write(path, Settings::template())
        .map_err(|e| InfraError::io(format!("write {}", path.display()), e))?;
    output::action("Created", &path.display());
    Ok(())
}

fn describe_config(path: &Path) -> String {
    let state = if path.exists() { "exists" } else { "not found" };
    format!("{} ({})", path.display(), state)
}

/// Menu loop: list, ask, merge, start over.
///
/// Returns when the operator enters `e`, when input ends, or when no source
/// file is left in the working directory. Selections below the minimum and
/// unparsable answers re-prompt; write failures end the loop.
pub fn run_interactive(container: &ServiceContainer) -> CliResult<()> {
    let catalog = container.catalog_service();
    let merger = container.merge_service(true);

    loop {
        output::header(BANNER);
        let documents = catalog.list(&container.work_dir)?;
        if documents.is_empty() {
            info!("No KML files found in {}", container.work_dir.display());
            output::info(&format!(
                "No KML files found in {}",
                container.work_dir.display()
            ));
            return Ok(());
        }
        print_listing(&documents);
        output::info("e. Exit");

        let Some(answer) = container
            .prompt
            .read_line(SELECTION_PROMPT)
            .map_err(|e| InfraError::io("read selection", e))?
        else {
            return Ok(());
        };

        let input = match SelectionInput::parse(&answer, documents.len()) {
            Ok(SelectionInput::Exit) => {
                info!("Operator chose to exit");
                output::info("Goodbye!");
                return Ok(());
            }
            Ok(input) => input,
            Err(e) => {
                warn!("{}", e);
                output::warning("Invalid selection, please try again or enter 'e' to exit.");
                continue;
            }
        };
        if input == SelectionInput::All {
            info!("No specific files selected, merging all");
        }

        let listed: Vec<PathBuf> = documents.iter().map(|d| d.path.clone()).collect();
        let selection = match Selection::new(input.resolve(&listed)) {
            Ok(selection) => selection,
            Err(e) if e.is_recoverable() => {
                info!("Selection rejected: {}", e);
                output::warning(&e);
                pause(container.clock.as_ref());
                continue;
            }
            Err(e) => return Err(ApplicationError::from(e).into()),
        };
        info!(
            "{} files selected for merging: {}",
            selection.len(),
            selection.sources().iter().map(|p| p.display()).join(", ")
        );

        let run = merger.merge_and_write(selection.sources())?;
        print_run(&run);
        pause(container.clock.as_ref());
    }
}

fn print_listing(documents: &[SourceDocument]) {
    output::header("Found KML files:");
    for (idx, doc) in documents.iter().enumerate() {
        output::info(&format!(
            "{}. {:<30} {:6.2} MB    {} placemarks",
            idx + 1,
            doc.display_name(),
            doc.size_mib(),
            doc.placemark_count
        ));
    }
}

fn print_run(run: &MergeRun) {
    let outcome = run.outcome();
    for source in outcome.successes() {
        output::success_detail(&format!(
            "{} ({} placemarks)",
            source.source.display(),
            source.placemarks()
        ));
    }
    for source in outcome.failures() {
        if let SourceStatus::Failed { reason } = &source.status {
            output::failure(&format!("{}: {}", source.source.display(), reason));
        }
    }

    match run {
        MergeRun::Written {
            output: merged,
            report,
            ..
        } => {
            output::success(&format!(
                "{} files have been successfully merged into {} ({} placemarks)",
                outcome.successes().count(),
                merged.display(),
                outcome.total_placemarks()
            ));
            if let Some(report) = report {
                output::action("Analysis saved as", &report.display());
            }
        }
        MergeRun::NothingMerged { .. } => output::error("No valid KML files were merged."),
    }
}

fn pause(clock: &dyn Clock) {
    output::info(&format!("Returning to main menu in {MENU_PAUSE_SECS} seconds..."));
    clock.sleep(Duration::from_secs(MENU_PAUSE_SECS));
}
