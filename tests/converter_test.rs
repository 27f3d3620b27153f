use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::bail;
use featureprep::constants::CONVERTED_DIR;
use featureprep::converter::{convert_all, ModelConverter};
use featureprep::error::Error;
use tempfile::TempDir;

#[derive(Default)]
struct RecordingConverter {
    calls: RefCell<Vec<(PathBuf, PathBuf, usize)>>,
}

impl ModelConverter for RecordingConverter {
    fn convert(&self, feature: &Path, output: &Path, siblings: &[PathBuf]) -> anyhow::Result<()> {
        self.calls
            .borrow_mut()
            .push((feature.to_path_buf(), output.to_path_buf(), siblings.len()));
        fs::write(output, format!("[feature name={}]", feature.display()))?;
        Ok(())
    }
}

struct FailingConverter;

impl ModelConverter for FailingConverter {
    fn convert(&self, feature: &Path, _output: &Path, _siblings: &[PathBuf]) -> anyhow::Result<()> {
        bail!("unsupported feature {}", feature.display())
    }
}

#[test]
fn test_convert_all_writes_txt_per_feature() {
    let temp_dir = TempDir::new().unwrap();
    let processed = vec![
        temp_dir.path().join("processed/boot.json"),
        temp_dir.path().join("processed/feature.json"),
    ];
    let converted_dir = temp_dir.path().join(CONVERTED_DIR);
    let converter = RecordingConverter::default();

    let outputs = convert_all(&processed, &converted_dir, &converter).unwrap();
    assert_eq!(
        outputs,
        vec![
            converted_dir.join("boot.json.txt"),
            converted_dir.join("feature.json.txt"),
        ]
    );
    assert!(outputs.iter().all(|o| o.exists()));

    let calls = converter.calls.borrow();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].0, processed[0]);
    assert!(calls.iter().all(|(_, _, siblings)| *siblings == 2));
}

#[test]
fn test_convert_all_reports_converter_failure() {
    let temp_dir = TempDir::new().unwrap();
    let processed = vec![PathBuf::from("processed/boot.json")];

    match convert_all(&processed, temp_dir.path(), &FailingConverter) {
        Err(Error::Convert(message)) => {
            assert!(message.contains("boot.json"));
            assert!(message.contains("unsupported feature"));
        }
        other => panic!("Expected Convert error, got {other:?}"),
    }
}

#[test]
fn test_convert_all_with_no_features() {
    let temp_dir = TempDir::new().unwrap();
    let converter = RecordingConverter::default();
    let outputs = convert_all(&[], temp_dir.path().join("converted"), &converter).unwrap();
    assert!(outputs.is_empty());
    assert!(temp_dir.path().join("converted").is_dir());
}
