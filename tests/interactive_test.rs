//! Tests for the command layer: interactive menu and `merge` subcommand

use std::collections::VecDeque;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Local, TimeZone};
use clap::Parser;
use tempfile::TempDir;

use kmlmerge::cli::{execute, run_interactive, Cli};
use kmlmerge::config::Settings;
use kmlmerge::exitcode;
use kmlmerge::infrastructure::di::ServiceContainer;
use kmlmerge::infrastructure::kml::KmlExtractor;
use kmlmerge::infrastructure::traits::{Clock, PlacemarkExtractor, Prompt};
use kmlmerge::util::testing;

#[ctor::ctor]
fn init() {
    testing::init_test_setup();
}

const KML_NS: &str = "http://www.opengis.net/kml/2.2";

/// Answers from a script; `None` once exhausted.
struct ScriptedPrompt {
    answers: Mutex<VecDeque<String>>,
    asked: Mutex<usize>,
}

impl ScriptedPrompt {
    fn new(answers: &[&str]) -> Self {
        Self {
            answers: Mutex::new(answers.iter().map(|a| a.to_string()).collect()),
            asked: Mutex::new(0),
        }
    }

    fn asked(&self) -> usize {
        *self.asked.lock().unwrap()
    }
}

impl Prompt for ScriptedPrompt {
    fn read_line(&self, _message: &str) -> io::Result<Option<String>> {
        *self.asked.lock().unwrap() += 1;
        Ok(self.answers.lock().unwrap().pop_front())
    }
}

struct SteppingClock(Mutex<DateTime<Local>>);

impl Clock for SteppingClock {
    fn now(&self) -> DateTime<Local> {
        let mut now = self.0.lock().unwrap();
        let current = *now;
        *now = current + chrono::Duration::seconds(1);
        current
    }

    fn sleep(&self, _duration: Duration) {}
}

fn kml(prefix: &str, count: usize) -> String {
    let body: String = (1..=count)
        .map(|i| format!("<Placemark><name>{prefix}{i}</name></Placemark>"))
        .collect();
    format!("<kml xmlns=\"{KML_NS}\"><Document>{body}</Document></kml>")
}

fn setup_sources(dir: &Path) {
    std::fs::write(dir.join("A.kml"), kml("a", 3)).unwrap();
    std::fs::write(dir.join("B.kml"), kml("b", 5)).unwrap();
}

fn container(work_dir: &Path, prompt: Arc<ScriptedPrompt>) -> ServiceContainer {
    let settings = Settings {
        workers: 2,
        ..Settings::default()
    };
    ServiceContainer::with_deps(
        settings,
        work_dir.to_path_buf(),
        Arc::new(KmlExtractor::new(10 * 1024 * 1024)),
        Arc::new(SteppingClock(Mutex::new(
            Local.with_ymd_and_hms(2024, 5, 17, 9, 3, 7).unwrap(),
        ))),
        prompt,
    )
}

fn merged_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .filter(|p| p.to_string_lossy().ends_with("_Merged.kml"))
        .collect();
    files.sort();
    files
}

// ============================================================
// run_interactive() tests
// ============================================================

#[test]
fn given_single_file_selected_when_interactive_then_prompts_again_and_merges_later() {
    // Arrange
    let temp = TempDir::new().unwrap();
    setup_sources(temp.path());
    let prompt = Arc::new(ScriptedPrompt::new(&["1", "1, 2", "e"]));
    let container = container(temp.path(), prompt.clone());

    // Act
    run_interactive(&container).unwrap();

    // Assert
    assert_eq!(prompt.asked(), 3);
    assert_eq!(merged_files(temp.path()).len(), 1);
}

#[test]
fn given_invalid_answer_when_interactive_then_nothing_merged_and_prompted_again() {
    // Arrange
    let temp = TempDir::new().unwrap();
    setup_sources(temp.path());
    let prompt = Arc::new(ScriptedPrompt::new(&["x, 9", "E"]));
    let container = container(temp.path(), prompt.clone());

    // Act
    run_interactive(&container).unwrap();

    // Assert
    assert_eq!(prompt.asked(), 2);
    assert!(merged_files(temp.path()).is_empty());
}

#[test]
fn given_enter_when_interactive_then_all_files_merged_with_report() {
    // Arrange
    let temp = TempDir::new().unwrap();
    setup_sources(temp.path());
    let prompt = Arc::new(ScriptedPrompt::new(&[""]));
    let container = container(temp.path(), prompt.clone());

    // Act: input ends after the merge
    run_interactive(&container).unwrap();

    // Assert
    let merged = merged_files(temp.path());
    assert_eq!(merged.len(), 1);
    let extractor = KmlExtractor::new(u64::MAX);
    assert_eq!(extractor.count(&merged[0]).unwrap(), 8);
    let reports: Vec<_> = std::fs::read_dir(temp.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().starts_with("Analysis_"))
        .collect();
    assert_eq!(reports.len(), 1);
}

#[test]
fn given_no_kml_files_when_interactive_then_returns_without_prompt() {
    let temp = TempDir::new().unwrap();
    let prompt = Arc::new(ScriptedPrompt::new(&[]));
    let container = container(temp.path(), prompt.clone());

    run_interactive(&container).unwrap();

    assert_eq!(prompt.asked(), 0);
}

// ============================================================
// merge subcommand tests
// ============================================================

#[test]
fn given_one_file_when_merge_command_then_usage_exit_code() {
    // Arrange
    let temp = TempDir::new().unwrap();
    setup_sources(temp.path());
    let container = container(temp.path(), Arc::new(ScriptedPrompt::new(&[])));
    let cli = Cli::try_parse_from(["kmlmerge", "merge", "A.kml"]).unwrap();

    // Act
    let err = execute(&cli, &container).unwrap_err();

    // Assert
    assert_eq!(err.exit_code(), exitcode::USAGE);
    assert!(merged_files(temp.path()).is_empty());
}

#[test]
fn given_no_files_when_merge_command_then_all_sources_merged_without_report() {
    // Arrange
    let temp = TempDir::new().unwrap();
    setup_sources(temp.path());
    let container = container(temp.path(), Arc::new(ScriptedPrompt::new(&[])));
    let cli = Cli::try_parse_from(["kmlmerge", "merge", "--no-report"]).unwrap();

    // Act
    execute(&cli, &container).unwrap();

    // Assert
    assert_eq!(merged_files(temp.path()).len(), 1);
    let has_report = std::fs::read_dir(temp.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .any(|e| e.file_name().to_string_lossy().ends_with(".csv"));
    assert!(!has_report);
}
