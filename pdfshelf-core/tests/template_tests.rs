//! Template loading, validation and error-message tests.

use assert_fs::prelude::*;
use pdfshelf_core::{Identifier, Template, TemplateError};
use predicates::prelude::predicate;
use rstest::rstest;

fn required() -> Vec<String> {
    vec!["name".to_string()]
}

fn id(s: &str) -> Identifier {
    Identifier::parse(s).expect("identifier")
}

// ---------------------------------------------------------------------------
// 1. Accepted shapes
// ---------------------------------------------------------------------------

#[test]
fn loads_keyed_json_template() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let file = dir.child("template.json");
    file.write_str(
        r#"{
  "JFK": { "name": "John F. Kennedy Intl", "city": "New York", "lat": 40.64 },
  "LAX": { "name": "Los Angeles Intl" }
}"#,
    )
    .expect("write");

    let template = Template::load(file.path(), &required()).expect("load");
    assert_eq!(template.len(), 2);
    let jfk = template.merge(&id("JFK")).expect("merge");
    assert_eq!(jfk["city"], "New York");
    assert_eq!(jfk["lat"], 40.64);
}

#[test]
fn loads_listed_template_and_drops_stale_pdf_info() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let file = dir.child("manifest_template.json");
    file.write_str(
        r#"{
  "schemaVersion": 1,
  "airports": [
    { "iata": "jfk", "icao": "KJFK", "name": "John F. Kennedy Intl",
      "pdf": { "url": "pdfs/JFK/old.pdf", "sha256": "00", "size": 1 } }
  ]
}"#,
    )
    .expect("write");

    let template = Template::load(file.path(), &required()).expect("load");
    let jfk = template.merge(&id("JFK")).expect("merge");
    assert_eq!(jfk["icao"], "KJFK");
    assert!(!jfk.contains_key("pdf"));
    assert!(!jfk.contains_key("iata"));
}

#[test]
fn loads_yaml_by_extension() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let file = dir.child("template.yml");
    file.write_str("JFK:\n  name: John F. Kennedy Intl\n  runways: [4L, 4R]\n")
        .expect("write");

    let template = Template::load(file.path(), &required()).expect("load");
    assert_eq!(template.merge(&id("JFK")).expect("merge")["runways"][1], "4R");
}

// ---------------------------------------------------------------------------
// 2. Rejected templates
// ---------------------------------------------------------------------------

#[rstest]
#[case::reserved_url(r#"{"JFK": {"name": "x", "url": "http://evil"}}"#, "reserved")]
#[case::reserved_digest(r#"{"JFK": {"name": "x", "digest": "00"}}"#, "reserved")]
#[case::not_an_object(r#"{"JFK": "John F. Kennedy Intl"}"#, "not an object")]
#[case::missing_name(r#"{"JFK": {"city": "New York"}}"#, "required field 'name'")]
#[case::blank_name(r#"{"JFK": {"name": "   "}}"#, "required field 'name'")]
#[case::bad_key(r#"{"J/FK": {"name": "x"}}"#, "'/'")]
#[case::duplicate_after_normalising(r#"{"JFK": {"name": "a"}, "jfk": {"name": "b"}}"#, "duplicate")]
#[case::listed_without_key(r#"{"airports": [{"name": "x"}]}"#, "no 'iata'")]
fn invalid_templates_name_the_entry(#[case] body: &str, #[case] needle: &str) {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let file = dir.child("template.json");
    file.write_str(body).expect("write");

    let err = Template::load(file.path(), &required()).unwrap_err();
    assert!(matches!(err, TemplateError::Invalid { .. }), "got: {err}");
    let msg = err.to_string();
    assert!(msg.contains(needle), "expected '{needle}' in: {msg}");
    assert!(msg.contains("template.json"), "must name the file, got: {msg}");
}

#[test]
fn corrupt_json_returns_parse_error_with_path() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let file = dir.child("template.json");
    file.write_str("{ not json").expect("write");

    let err = Template::load(file.path(), &required()).unwrap_err();
    assert!(matches!(err, TemplateError::ParseJson { .. }), "got: {err}");
    assert!(err.to_string().contains("template.json"));
}

#[test]
fn missing_file_returns_io_error() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let err = Template::load(&dir.path().join("absent.json"), &required()).unwrap_err();
    assert!(matches!(err, TemplateError::Io { .. }), "got: {err}");
    dir.child("absent.json").assert(predicate::path::missing());
}

#[test]
fn required_fields_are_configurable() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let file = dir.child("template.json");
    file.write_str(r#"{"JFK": {"city": "New York"}}"#).expect("write");

    Template::load(file.path(), &[]).expect("no required fields");
    let err = Template::load(file.path(), &["name".to_string(), "city".to_string()]).unwrap_err();
    assert!(err.to_string().contains("'name'"));
}
