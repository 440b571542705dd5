//! The service's own export, unpacked into memory as ground truth.

use std::collections::BTreeMap;
use std::io::{Cursor, Read};

use tracing::warn;

use crate::error::Result;

// Declared entry sizes come from the archive header and are not trusted.
const MAX_PREALLOC: usize = 16 * 1024 * 1024;

/// Archive-relative file name → raw bytes. Built once per run.
#[derive(Debug, Clone, Default)]
pub struct ReferenceFileSet {
    files: BTreeMap<String, Vec<u8>>,
}

impl ReferenceFileSet {
    pub fn from_zip(bytes: &[u8]) -> Result<Self> {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;
        let mut files = BTreeMap::new();
        for index in 0..archive.len() {
            let mut entry = archive.by_index(index)?;
            if entry.is_dir() {
                continue;
            }
            let name = entry.name().to_string();
            let declared = usize::try_from(entry.size()).unwrap_or(usize::MAX);
            let mut data = Vec::with_capacity(declared.min(MAX_PREALLOC));
            entry.read_to_end(&mut data)?;
            files.insert(name, data);
        }
        Ok(Self { files })
    }

    pub fn from_files<I, N>(files: I) -> Self
    where
        I: IntoIterator<Item = (N, Vec<u8>)>,
        N: Into<String>,
    {
        Self {
            files: files.into_iter().map(|(n, d)| (n.into(), d)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    /// First entry (in name order) whose name ends with `file_name`.
    ///
    /// Exports nest pages under title-derived folders, so the rendered name is
    /// only ever a suffix of the archive path. When several entries share the
    /// suffix the pairing is ambiguous; it is logged and the first one wins.
    pub fn find_by_suffix(&self, file_name: &str) -> Option<(&str, &[u8])> {
        let mut matches = self
            .files
            .iter()
            .filter(|(name, _)| name.ends_with(file_name));
        let (name, data) = matches.next()?;
        let others: Vec<&str> = matches.map(|(n, _)| n.as_str()).collect();
        if !others.is_empty() {
            warn!(
                file = file_name,
                chosen = name.as_str(),
                ignored = ?others,
                "several reference files share this suffix"
            );
        }
        Some((name.as_str(), data.as_slice()))
    }
}
