use std::fs;
use std::path::{Path, PathBuf};

use crate::conformance::runner::verify;
use crate::conformance::{all_tests, ConformanceTest};
use crate::error::{internal_error, FirestoreResult};

/// Persists fixtures as `<name>.json` files under one directory.
#[derive(Debug)]
pub struct FixtureWriter {
    output_dir: PathBuf,
    written: usize,
}

impl FixtureWriter {
    /// Creates the output directory if it does not exist yet.
    pub fn new(output_dir: impl Into<PathBuf>) -> FirestoreResult<Self> {
        let output_dir = output_dir.into();
        fs::create_dir_all(&output_dir).map_err(|err| {
            internal_error(format!(
                "failed to create fixture directory {}: {err}",
                output_dir.display()
            ))
        })?;
        Ok(Self {
            output_dir,
            written: 0,
        })
    }

    pub fn write(&mut self, test: &ConformanceTest) -> FirestoreResult<PathBuf> {
        let path = self.output_dir.join(format!("{}.json", test.name));
        let contents = serde_json::to_string_pretty(test)
            .map_err(|err| internal_error(format!("failed to encode {}: {err}", test.name)))?;
        fs::write(&path, contents + "\n").map_err(|err| {
            internal_error(format!("failed to write {}: {err}", path.display()))
        })?;
        log::info!("wrote conformance test {}", path.display());
        self.written += 1;
        Ok(path)
    }

    pub fn write_all<'a, I>(&mut self, tests: I) -> FirestoreResult<usize>
    where
        I: IntoIterator<Item = &'a ConformanceTest>,
    {
        let before = self.written;
        for test in tests {
            self.write(test)?;
        }
        Ok(self.written - before)
    }

    pub fn written(&self) -> usize {
        self.written
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }
}

/// Builds every fixture, checks it against the compiler and writes it.
pub fn generate_all(output_dir: impl Into<PathBuf>) -> FirestoreResult<FixtureWriter> {
    let tests = all_tests()?;
    for test in &tests {
        verify(test)?;
    }
    let mut writer = FixtureWriter::new(output_dir)?;
    writer.write_all(&tests)?;
    Ok(writer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value as JsonValue;

    #[test]
    fn writes_pretty_json_named_after_the_test() {
        let dir = tempfile::tempdir().unwrap();
        let tests = all_tests().unwrap();
        let mut writer = FixtureWriter::new(dir.path().join("nested")).unwrap();
        let path = writer.write(&tests[0]).unwrap();
        assert_eq!(path.file_name().unwrap(), "get-1.json");
        assert_eq!(writer.written(), 1);

        let parsed: JsonValue =
            serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(parsed["description"], "Get a document");
        assert_eq!(
            parsed["get"]["docRefPath"],
            "projects/projectID/databases/(default)/documents/C/d"
        );
    }

    #[test]
    fn generate_all_counts_every_fixture() {
        let dir = tempfile::tempdir().unwrap();
        let writer = generate_all(dir.path()).unwrap();
        assert_eq!(writer.written(), all_tests().unwrap().len());
        assert!(writer.output_dir().join("update-paths-17.json").exists());
    }
}
