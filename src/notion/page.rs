use std::collections::{HashSet, VecDeque};

use serde_json::{json, Value};

use super::api_types::{Block, RecordMap};
use crate::page_id::PageId;

/// A downloaded page: the root block plus every record fetched with it.
#[derive(Debug, Clone)]
pub struct Page {
    pub id: PageId,
    pub record_map: RecordMap,
    /// Number of chunks it took to download the page.
    pub chunks: usize,
}

impl Page {
    pub fn new(id: PageId, record_map: RecordMap, chunks: usize) -> Self {
        Self {
            id,
            record_map,
            chunks,
        }
    }

    pub fn block(&self, id: &str) -> Option<&Block> {
        let key = PageId::parse(id).ok()?;
        self.record_map
            .block
            .get(&key.dashed())
            .or_else(|| self.record_map.block.get(key.no_dash()))
            .and_then(|record| record.value.as_ref())
    }

    pub fn root(&self) -> Option<&Block> {
        self.block(self.id.no_dash())
    }

    pub fn title(&self) -> String {
        self.root().map(Block::title).unwrap_or_default()
    }

    pub fn block_count(&self) -> usize {
        self.record_map.block.len()
    }

    /// Pages nested anywhere below the root's content, in document order.
    /// The walk stops at each sub-page; its own children belong to it.
    pub fn sub_pages(&self) -> Vec<PageId> {
        let Some(root) = self.root() else {
            return Vec::new();
        };

        let mut found = Vec::new();
        let mut seen: HashSet<PageId> = HashSet::new();
        seen.insert(self.id.clone());
        let mut pending: VecDeque<&str> = root.content.iter().map(String::as_str).collect();

        while let Some(child_id) = pending.pop_front() {
            let Ok(child_key) = PageId::parse(child_id) else {
                continue;
            };
            if !seen.insert(child_key.clone()) {
                continue;
            }
            let Some(block) = self.block(child_id) else {
                continue;
            };
            if !block.is_alive() {
                continue;
            }
            if block.is_page() {
                found.push(child_key);
                continue;
            }
            for (offset, nested) in block.content.iter().enumerate() {
                pending.insert(offset, nested.as_str());
            }
        }
        found
    }

    /// JSON document handed to the external converter.
    pub fn to_renderer_json(&self) -> Value {
        json!({
            "id": self.id.dashed(),
            "recordMap": self.record_map,
        })
    }
}
