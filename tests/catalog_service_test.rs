//! Tests for CatalogService

use std::path::Path;
use std::sync::Arc;

use tempfile::TempDir;

use kmlmerge::application::services::CatalogService;
use kmlmerge::infrastructure::kml::KmlExtractor;
use kmlmerge::util::testing;

#[ctor::ctor]
fn init() {
    testing::init_test_setup();
}

const KML_NS: &str = "http://www.opengis.net/kml/2.2";

fn kml(count: usize) -> String {
    let body: String = (0..count)
        .map(|i| format!("<Placemark><name>{i}</name></Placemark>"))
        .collect();
    format!("<kml xmlns=\"{KML_NS}\"><Document>{body}</Document></kml>")
}

fn catalog(extensions: &[&str]) -> CatalogService {
    CatalogService::new(
        Arc::new(KmlExtractor::new(u64::MAX)),
        extensions.iter().map(|e| e.to_string()).collect(),
    )
}

fn file_names(paths: &[std::path::PathBuf]) -> Vec<String> {
    paths
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
        .collect()
}

#[test]
fn given_mixed_directory_when_list_then_only_kml_files_sorted_by_name() {
    // Arrange
    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join("b.kml"), kml(2)).unwrap();
    std::fs::write(temp.path().join("A.KML"), kml(1)).unwrap();
    std::fs::write(temp.path().join("notes.txt"), "x").unwrap();
    std::fs::create_dir(temp.path().join("nested.kml")).unwrap();
    std::fs::write(temp.path().join("nested.kml").join("c.kml"), kml(3)).unwrap();

    // Act
    let documents = catalog(&["kml"]).list(temp.path()).unwrap();

    // Assert
    let names: Vec<String> = documents.iter().map(|d| d.display_name()).collect();
    assert_eq!(names, vec!["A.KML", "b.kml"]);
    assert_eq!(documents[0].placemark_count, 1);
    assert_eq!(documents[1].placemark_count, 2);
    assert_eq!(
        documents[1].size_bytes,
        std::fs::metadata(temp.path().join("b.kml")).unwrap().len()
    );
}

#[test]
fn given_unparsable_file_when_list_then_listed_with_zero_placemarks() {
    // Arrange
    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join("broken.kml"), "<kml><Document>").unwrap();

    // Act
    let documents = catalog(&["kml"]).list(temp.path()).unwrap();

    // Assert
    assert_eq!(documents.len(), 1);
    assert_eq!(documents[0].placemark_count, 0);
}

#[test]
fn given_extra_extension_when_source_paths_then_included() {
    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join("a.kml"), kml(1)).unwrap();
    std::fs::write(temp.path().join("b.xml"), kml(1)).unwrap();

    let paths = catalog(&["kml", "xml"]).source_paths(temp.path()).unwrap();

    assert_eq!(file_names(&paths), vec!["a.kml", "b.xml"]);
}

#[test]
fn given_empty_directory_when_list_then_empty() {
    let temp = TempDir::new().unwrap();

    let documents = catalog(&["kml"]).list(temp.path()).unwrap();

    assert!(documents.is_empty());
}

#[test]
fn given_missing_directory_when_list_then_error() {
    let temp = TempDir::new().unwrap();

    let result = catalog(&["kml"]).list(&temp.path().join("missing"));

    assert!(result.is_err());
}

#[test]
fn test_is_source_ignores_case_and_requires_extension() {
    let catalog = catalog(&["kml"]);
    assert!(catalog.is_source(Path::new("x/Export.Kml")));
    assert!(!catalog.is_source(Path::new("x/kml")));
    assert!(!catalog.is_source(Path::new("x/a.kmz")));
}
