//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand, ValueHint};

/// Merge placemark files (KML) exported from forensic extractions into one document
#[derive(Parser, Debug)]
#[command(name = "kmlmerge")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase stderr verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Working directory holding the source files (default: cwd)
    #[arg(short = 'C', long, global = true, value_hint = ValueHint::DirPath)]
    pub work_dir: Option<PathBuf>,

    /// Without a command an interactive menu is shown
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Merge files into a timestamped KML document
    Merge {
        /// Source files (default: all source files of the working directory)
        #[arg(value_hint = ValueHint::FilePath)]
        files: Vec<PathBuf>,

        /// Skip the CSV summary report
        #[arg(long)]
        no_report: bool,
    },

    /// List source files with size and placemark count
    List,

    /// Manage settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show merged config
    Show,

    /// Create config template
    Init {
        /// Create global config
        #[arg(short, long)]
        global: bool,
    },

    /// Show config paths
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn given_merge_with_files_when_parsed_then_files_kept_in_order() {
        let cli = Cli::try_parse_from(["kmlmerge", "-vv", "merge", "b.kml", "a.kml", "--no-report"])
            .expect("parse");

        assert_eq!(cli.verbose, 2);
        match cli.command {
            Some(Commands::Merge { files, no_report }) => {
                assert_eq!(files, vec![PathBuf::from("b.kml"), PathBuf::from("a.kml")]);
                assert!(no_report);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn given_no_command_when_parsed_then_interactive() {
        let cli = Cli::try_parse_from(["kmlmerge", "-C", "/data"]).expect("parse");
        assert!(cli.command.is_none());
        assert_eq!(cli.work_dir, Some(PathBuf::from("/data")));
    }
}
