use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use featureprep::artifact::Project;
use featureprep::error::Error;
use featureprep::processor::{
    resolve_files, CachePolicy, ContentReader, DirectoryKeys, FeatureFileEntry, FsReader,
    ProcessAction, Processor,
};
use featureprep::substitution::{ProjectProperties, PropertySource};
use featureprep::version::VersionFallback;
use indexmap::IndexMap;
use serde_json::Value;
use tempfile::TempDir;

fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
    path
}

fn set_modified(path: &Path, time: SystemTime) {
    fs::File::options()
        .write(true)
        .open(path)
        .unwrap()
        .set_modified(time)
        .unwrap();
}

fn project() -> Project {
    Project::new("g", "a", "1.0.0")
}

fn file_names(entries: &[FeatureFileEntry]) -> Vec<String> {
    let mut names: Vec<String> = entries
        .iter()
        .map(|e| e.file.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[test]
fn test_resolve_files_only_lists_json_children() {
    let temp_dir = TempDir::new().unwrap();
    write(temp_dir.path(), "features/a.json", "{}");
    write(temp_dir.path(), "features/b.json", "{}");
    write(temp_dir.path(), "features/notes.txt", "");
    write(temp_dir.path(), "features/nested/c.json", "{}");

    let entries = resolve_files(temp_dir.path(), "features", &DirectoryKeys::default()).unwrap();
    assert_eq!(file_names(&entries), vec!["a.json", "b.json"]);
    assert!(entries.iter().all(|e| e.run_modes.is_none() && e.model_name.is_none()));
}

#[test]
fn test_resolve_files_accumulates_clause_tags() {
    let temp_dir = TempDir::new().unwrap();
    write(temp_dir.path(), "features1/a.json", "{}");
    write(temp_dir.path(), "features1/b.json", "{}");

    let config = "features1;runmodes=author,features1;runmodes=dev;model=quickstart,features1;model=other";
    let entries = resolve_files(temp_dir.path(), config, &DirectoryKeys::default()).unwrap();
    assert_eq!(entries.len(), 2);
    for entry in &entries {
        assert_eq!(entry.run_modes.as_deref(), Some("author,dev"));
        assert_eq!(entry.model_name.as_deref(), Some("quickstart"));
    }
}

#[test]
fn test_resolve_files_keeps_clause_order() {
    let temp_dir = TempDir::new().unwrap();
    write(temp_dir.path(), "second/z.json", "{}");
    write(temp_dir.path(), "first/y.json", "{}");

    let entries =
        resolve_files(temp_dir.path(), "first, second ,missing", &DirectoryKeys::default()).unwrap();
    let names: Vec<_> = entries
        .iter()
        .map(|e| e.file.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["y.json", "z.json"]);
}

#[test]
fn test_resolve_files_with_custom_keys() {
    let temp_dir = TempDir::new().unwrap();
    write(temp_dir.path(), "features/a.json", "{}");
    let keys = DirectoryKeys {
        runmodes: "modes".to_string(),
        model: "provisioning".to_string(),
    };

    let entries =
        resolve_files(temp_dir.path(), "features;modes:=publish;provisioning=boot", &keys).unwrap();
    assert_eq!(entries[0].run_modes.as_deref(), Some("publish"));
    assert_eq!(entries[0].model_name.as_deref(), Some("boot"));
}

#[test]
fn test_resolve_files_rejects_bad_header() {
    let temp_dir = TempDir::new().unwrap();
    write(temp_dir.path(), "features/a.json", "{}");

    let result = resolve_files(temp_dir.path(), "features;model=\"open", &DirectoryKeys::default());
    assert!(matches!(result, Err(Error::HeaderSyntax { .. })));
}

#[test]
fn test_process_file_injects_id_with_classifier() {
    let temp_dir = TempDir::new().unwrap();
    let file = write(
        temp_dir.path(),
        "boot.json",
        "{\n  // the bundles\n  \"bundles\": [] /* none yet */\n}",
    );
    let project = project();
    let processor = Processor::new(&FsReader, &project, temp_dir.path().join("out"), CachePolicy::Mtime);
    let identity = project.feature_identity(Some("boot"));

    let content = processor
        .process_file(&FeatureFileEntry::new(&file), &[], &identity)
        .unwrap();
    let json: Value = serde_json::from_str(&content).unwrap();
    assert_eq!(json["id"], "g:a:slingosgifeature:boot:1.0.0");
    assert_eq!(json["bundles"], serde_json::json!([]));
    assert!(json.get("variables").is_none());
}

#[test]
fn test_process_file_substitutes_and_tags() {
    let temp_dir = TempDir::new().unwrap();
    let file = write(
        temp_dir.path(),
        "feature.json",
        r#"{
            "id": "${project.groupId}:${project.artifactId}:slingosgifeature:${project.version}",
            "variables": { "osgi": "${project.osgiVersion}", "foo": "${foo}", "keep": "${nope}" }
        }"#,
    );
    let project = Project::new("org.example", "demo", "1.2-SNAPSHOT");
    let builtins = ProjectProperties::new(&project, VersionFallback::OpaqueQualifier);
    let declared: IndexMap<String, String> = [("foo".to_string(), "bar".to_string())].into_iter().collect();
    let sources: [&dyn PropertySource; 2] = [&builtins, &declared];

    let processor = Processor::new(&FsReader, &project, temp_dir.path().join("out"), CachePolicy::Mtime);
    let mut entry = FeatureFileEntry::new(&file);
    entry.run_modes = Some("author,dev".to_string());
    entry.model_name = Some("quickstart".to_string());

    let content = processor
        .process_file(&entry, &sources, &project.feature_identity(None))
        .unwrap();
    let json: Value = serde_json::from_str(&content).unwrap();
    assert_eq!(json["id"], "org.example:demo:slingosgifeature:1.2-SNAPSHOT");
    assert_eq!(json["variables"]["osgi"], "1.2.0.SNAPSHOT");
    assert_eq!(json["variables"]["foo"], "bar");
    assert_eq!(json["variables"]["keep"], "${nope}");
    assert_eq!(json["variables"]["provisioning.runmodes"], "author,dev");
    assert_eq!(json["variables"]["provisioning.model.name"], "quickstart");
}

#[test]
fn test_substituted_values_with_quotes_and_backslashes() {
    let temp_dir = TempDir::new().unwrap();
    let file = write(
        temp_dir.path(),
        "feature.json",
        r#"{ "variables": { "home": "${home}", "motto": "say ${motto}" } }"#,
    );
    let project = project();
    let declared: IndexMap<String, String> = [
        ("home".to_string(), r"C:\work\sling".to_string()),
        ("motto".to_string(), "\"hi\"".to_string()),
    ]
    .into_iter()
    .collect();
    let sources: [&dyn PropertySource; 1] = [&declared];
    let processor = Processor::new(&FsReader, &project, temp_dir.path().join("out"), CachePolicy::Mtime);

    let content = processor
        .process_file(&FeatureFileEntry::new(&file), &sources, &project.feature_identity(None))
        .unwrap();
    let json: Value = serde_json::from_str(&content).unwrap();
    assert_eq!(json["variables"]["home"], r"C:\work\sling");
    assert_eq!(json["variables"]["motto"], "say \"hi\"");
}

#[test]
fn test_default_model_name_applies_without_clause_model() {
    let temp_dir = TempDir::new().unwrap();
    let file = write(temp_dir.path(), "feature.json", "{}");
    let project = project();
    let processor = Processor::new(&FsReader, &project, temp_dir.path().join("out"), CachePolicy::Mtime)
        .with_default_model_name(Some(":default".to_string()));

    let content = processor
        .process_file(&FeatureFileEntry::new(&file), &[], &project.feature_identity(None))
        .unwrap();
    let json: Value = serde_json::from_str(&content).unwrap();
    assert_eq!(json["id"], "g:a:slingosgifeature:1.0.0");
    assert_eq!(json["variables"]["provisioning.model.name"], ":default");
}

#[test]
fn test_process_file_rejects_invalid_documents() {
    let temp_dir = TempDir::new().unwrap();
    let project = project();
    let processor = Processor::new(&FsReader, &project, temp_dir.path().join("out"), CachePolicy::Mtime);
    let identity = project.feature_identity(None);

    for (name, content) in [
        ("array.json", "[]"),
        ("broken.json", "{ \"a\": "),
        ("comment.json", "{ /* open"),
        ("badid.json", "{ \"id\": \"only:two\" }"),
    ] {
        let file = write(temp_dir.path(), name, content);
        let result = processor.process_file(&FeatureFileEntry::new(&file), &[], &identity);
        assert!(
            matches!(result, Err(Error::FeatureFormat { .. })),
            "{name}: {result:?}"
        );
    }
}

struct FailingReader;

impl ContentReader for FailingReader {
    fn read(&self, _path: &Path) -> io::Result<String> {
        Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied"))
    }
}

#[test]
fn test_process_file_read_error() {
    let project = project();
    let processor = Processor::new(&FailingReader, &project, "out", CachePolicy::Mtime);
    let entry = FeatureFileEntry::new("features/a.json");

    match processor.process_file(&entry, &[], &project.feature_identity(None)) {
        Err(Error::FileRead { path, source }) => {
            assert!(path.ends_with("a.json"));
            assert_eq!(source.kind(), io::ErrorKind::PermissionDenied);
        }
        other => panic!("Expected FileRead, got {other:?}"),
    }
}

#[test]
fn test_text_extension_file_is_inlined() {
    let temp_dir = TempDir::new().unwrap();
    let file = write(
        temp_dir.path(),
        "boot.json",
        r#"{ "repoinit:TEXT|true": "@file", "scripts:TEXT|false": "@file:extra.txt" }"#,
    );
    write(temp_dir.path(), "boot-repoinit.txt", "create service user x");
    write(temp_dir.path(), "boot-extra.txt", "more text");
    let project = project();
    let processor = Processor::new(&FsReader, &project, temp_dir.path().join("out"), CachePolicy::Mtime);

    let content = processor
        .process_file(&FeatureFileEntry::new(&file), &[], &project.feature_identity(Some("boot")))
        .unwrap();
    let json: Value = serde_json::from_str(&content).unwrap();
    assert_eq!(json["repoinit:TEXT|true"], "create service user x");
    assert_eq!(json["scripts:TEXT|false"], "more text");
}

#[test]
fn test_text_extension_errors() {
    let temp_dir = TempDir::new().unwrap();
    let project = project();
    let processor = Processor::new(&FsReader, &project, temp_dir.path().join("out"), CachePolicy::Mtime);
    let identity = project.feature_identity(None);

    let missing = write(temp_dir.path(), "missing.json", r#"{ "repoinit:TEXT|true": "@file" }"#);
    match processor.process_file(&FeatureFileEntry::new(&missing), &[], &identity) {
        Err(Error::MissingReferencedFile { path }) => assert!(path.ends_with("missing-repoinit.txt")),
        other => panic!("Expected MissingReferencedFile, got {other:?}"),
    }

    let invalid = write(temp_dir.path(), "invalid.json", r#"{ "repoinit:TEXT|true": "@filex" }"#);
    assert!(matches!(
        processor.process_file(&FeatureFileEntry::new(&invalid), &[], &identity),
        Err(Error::InvalidFileReference(reference)) if reference == "@filex"
    ));
}

#[test_log::test]
fn test_process_all_mtime_cache() {
    let temp_dir = TempDir::new().unwrap();
    let source = write(temp_dir.path(), "features/base.json", "{}");
    set_modified(&source, SystemTime::now() - Duration::from_secs(120));
    let project = project();
    let processed_dir = temp_dir.path().join("target/features/processed");
    let processor = Processor::new(&FsReader, &project, &processed_dir, CachePolicy::Mtime);
    let entries = vec![FeatureFileEntry::new(&source)];

    let first = processor.process_all(&entries, &[]).unwrap();
    assert_eq!(first[0].action, ProcessAction::Processed);
    assert_eq!(first[0].output, processed_dir.join("base.json"));
    let written: Value = serde_json::from_str(&fs::read_to_string(&first[0].output).unwrap()).unwrap();
    assert_eq!(written["id"], "g:a:slingosgifeature:base:1.0.0");

    let second = processor.process_all(&entries, &[]).unwrap();
    assert_eq!(second[0].action, ProcessAction::Cached);

    set_modified(&source, SystemTime::now() + Duration::from_secs(120));
    let third = processor.process_all(&entries, &[]).unwrap();
    assert_eq!(third[0].action, ProcessAction::Processed);
}

#[test_log::test]
fn test_process_all_content_hash_cache() {
    let temp_dir = TempDir::new().unwrap();
    let source = write(temp_dir.path(), "features/base.json", r#"{ "variables": { "v": "${v}" } }"#);
    let project = project();
    let processor = Processor::new(
        &FsReader,
        &project,
        temp_dir.path().join("processed"),
        CachePolicy::ContentHash,
    );
    let entries = vec![FeatureFileEntry::new(&source)];

    let mut declared: IndexMap<String, String> = IndexMap::new();
    declared.insert("v".to_string(), "one".to_string());
    {
        let sources: [&dyn PropertySource; 1] = [&declared];
        assert_eq!(processor.process_all(&entries, &sources).unwrap()[0].action, ProcessAction::Processed);
        assert_eq!(processor.process_all(&entries, &sources).unwrap()[0].action, ProcessAction::Cached);
    }

    declared.insert("v".to_string(), "two".to_string());
    let sources: [&dyn PropertySource; 1] = [&declared];
    let result = processor.process_all(&entries, &sources).unwrap();
    assert_eq!(result[0].action, ProcessAction::Processed);
    let written: Value = serde_json::from_str(&fs::read_to_string(&result[0].output).unwrap()).unwrap();
    assert_eq!(written["variables"]["v"], "two");
}

#[test]
fn test_process_all_stops_at_first_failure() {
    let temp_dir = TempDir::new().unwrap();
    let broken = write(temp_dir.path(), "features/broken.json", "{");
    let good = write(temp_dir.path(), "features/good.json", "{}");
    let project = project();
    let processed_dir = temp_dir.path().join("processed");
    let processor = Processor::new(&FsReader, &project, &processed_dir, CachePolicy::Mtime);

    let entries = vec![FeatureFileEntry::new(&broken), FeatureFileEntry::new(&good)];
    assert!(processor.process_all(&entries, &[]).is_err());
    assert!(!processed_dir.join("good.json").exists());
}

#[test]
fn test_clean_removes_processed_dir() {
    let temp_dir = TempDir::new().unwrap();
    let project = project();
    let processed_dir = temp_dir.path().join("processed");
    write(&processed_dir, "stale.json", "{}");
    let processor = Processor::new(&FsReader, &project, &processed_dir, CachePolicy::Mtime);

    processor.clean().unwrap();
    assert!(!processed_dir.exists());
    processor.clean().unwrap();
}
