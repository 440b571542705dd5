use std::collections::HashSet;

use crate::config::KnownBadConfig;
use crate::page_id::PageId;

/// Pages whose mismatch against the reference export is accepted.
#[derive(Debug, Clone, Default)]
pub struct KnownBadSet {
    ids: HashSet<PageId>,
}

impl KnownBadSet {
    pub fn new<I: IntoIterator<Item = PageId>>(ids: I) -> Self {
        Self {
            ids: ids.into_iter().collect(),
        }
    }

    /// Global entries plus the ones listed under `root`. Unparseable entries
    /// are dropped; `Config::validate` reports them before a run starts.
    pub fn for_root(config: &KnownBadConfig, root: &PageId) -> Self {
        let per_root = config
            .roots
            .iter()
            .filter(|(key, _)| PageId::parse(key).map(|k| &k == root).unwrap_or(false))
            .flat_map(|(_, ids)| ids.iter());
        let ids = config
            .global
            .iter()
            .chain(per_root)
            .filter_map(|raw| PageId::parse(raw).ok());
        Self::new(ids)
    }

    pub fn contains(&self, id: &PageId) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}
