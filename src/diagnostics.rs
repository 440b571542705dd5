//! On-disk diagnostic output for mismatching pages.
//!
//! Layout under the data directory:
//!
//! ```text
//! diff/<id>.1-from-notion.html   raw reference
//! diff/<id>.2-mine.html          raw rendering
//! diff/expected/<id>.html        formatted reference
//! diff/got/<id>.html             formatted rendering
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::compare::Mismatch;
use crate::page_id::PageId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MismatchPaths {
    pub raw_expected: PathBuf,
    pub raw_got: PathBuf,
    pub expected: PathBuf,
    pub got: PathBuf,
}

#[derive(Debug, Clone)]
pub struct DiagnosticDirs {
    root: PathBuf,
    expected: PathBuf,
    got: PathBuf,
}

impl DiagnosticDirs {
    pub fn new(data_dir: &Path) -> Self {
        let root = data_dir.join("diff");
        Self {
            expected: root.join("expected"),
            got: root.join("got"),
            root,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn expected_dir(&self) -> &Path {
        &self.expected
    }

    pub fn got_dir(&self) -> &Path {
        &self.got
    }

    /// Create the directories and drop files left over from earlier runs.
    pub fn prepare(&self) -> io::Result<()> {
        for dir in [&self.root, &self.expected, &self.got] {
            fs::create_dir_all(dir)?;
            remove_files_in_dir(dir)?;
        }
        Ok(())
    }

    pub fn write_mismatch(&self, id: &PageId, mismatch: &Mismatch) -> io::Result<MismatchPaths> {
        let raw_expected = self.root.join(format!("{id}.1-from-notion.html"));
        let raw_got = self.root.join(format!("{id}.2-mine.html"));
        let file_name = format!("{id}.html");
        let expected = self.expected.join(&file_name);
        let got = self.got.join(&file_name);

        fs::write(&raw_expected, &mismatch.expected)?;
        fs::write(&raw_got, &mismatch.got)?;
        fs::write(&expected, &mismatch.expected_formatted)?;
        fs::write(&got, &mismatch.got_formatted)?;

        Ok(MismatchPaths {
            raw_expected,
            raw_got,
            expected,
            got,
        })
    }
}

fn remove_files_in_dir(dir: &Path) -> io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            fs::remove_file(entry.path())?;
        }
    }
    Ok(())
}
