use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

use super::pages::{group_pages, MemoryPage, PageKind};
use crate::config::AdapterConfig;
use crate::error::{AdapterError, AdapterResult};
use crate::hash::keccak_words;
use crate::proof::PublicMemory;
use crate::utils::ordered_map;

/// Node of the fact tree; leaves are pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactNode {
    pub node_hash: U256,
    /// Running cell count up to and including this subtree.
    pub end_offset: u64,
    /// Empty for leaves, left and right child otherwise.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<FactNode>,
}

impl FactNode {
    fn leaf(node_hash: U256, end_offset: u64) -> Self {
        FactNode {
            node_hash,
            end_offset,
            children: Vec::new(),
        }
    }

    /// `keccak256(l.hash || l.end || r.hash || r.end) + 1`.
    fn parent(left: FactNode, right: FactNode) -> Self {
        let node_hash = keccak_words(&[
            left.node_hash,
            U256::from(left.end_offset),
            right.node_hash,
            U256::from(right.end_offset),
        ])
        .wrapping_add(U256::ONE);
        FactNode {
            node_hash,
            end_offset: right.end_offset,
            children: vec![left, right],
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// How the public memory of one program combines into its fact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactTopology {
    pub page_count: usize,
    pub page_kinds: Vec<PageKind>,
    pub page_sizes: Vec<usize>,
    /// Flattened `(n_pages, n_nodes)` pairs: push `n_pages` pages onto a
    /// stack, then merge the top `n_nodes` entries into their parent.
    pub tree_structure: Vec<u64>,
    pub pages: Vec<MemoryPage>,
    pub root: Option<FactNode>,
    pub fact_hash: U256,
}

impl FactTopology {
    /// Metadata of this program as one task of the main statement:
    /// `[output_size, program_hash, n_pairs, tree_structure...]`.
    pub fn task_metadata(&self, program_hash: U256, output_size: u64) -> Vec<U256> {
        let mut words = Vec::with_capacity(3 + self.tree_structure.len());
        words.push(U256::from(output_size));
        words.push(program_hash);
        words.push(U256::from(self.tree_structure.len() / 2));
        words.extend(self.tree_structure.iter().map(|&entry| U256::from(entry)));
        words
    }
}

/// Groups public memory into pages and aggregates them into one fact.
#[derive(Debug, Clone, Copy)]
pub struct FactTreeBuilder {
    max_regular_page_size: usize,
    min_continuous_run: usize,
}

impl FactTreeBuilder {
    pub fn new(config: &AdapterConfig) -> Self {
        FactTreeBuilder {
            max_regular_page_size: config.max_regular_page_size(),
            min_continuous_run: config.min_continuous_run(),
        }
    }

    pub fn build(&self, memory: &[PublicMemory]) -> AdapterResult<FactTopology> {
        let pages = group_pages(memory, self.max_regular_page_size, self.min_continuous_run)?;
        let page_count = pages.len();
        let covered: usize = pages.iter().map(MemoryPage::len).sum();
        if covered != memory.len() {
            return Err(AdapterError::InternalInvariantViolation(format!(
                "pages cover {covered} of {} public memory cells",
                memory.len()
            )));
        }

        let hashes = ordered_map(&pages, MemoryPage::fact_hash);
        let mut end_offset = 0u64;
        let mut level: Vec<FactNode> = pages
            .iter()
            .zip(hashes)
            .map(|(page, hash)| {
                end_offset += page.len() as u64;
                FactNode::leaf(hash, end_offset)
            })
            .collect();

        while level.len() > 1 {
            let mut next = Vec::with_capacity(level.len().div_ceil(2));
            let mut nodes = level.into_iter();
            while let Some(left) = nodes.next() {
                match nodes.next() {
                    Some(right) => next.push(FactNode::parent(left, right)),
                    None => next.push(left),
                }
            }
            level = next;
        }
        let root = level.pop();

        let mut tree_structure = Vec::new();
        if let Some(root) = &root {
            let pending = post_order(root, &mut tree_structure);
            if pending > 0 {
                tree_structure.extend([pending, 0]);
            }
        }

        let topology = FactTopology {
            page_count,
            page_kinds: pages.iter().map(MemoryPage::kind).collect(),
            page_sizes: pages.iter().map(MemoryPage::len).collect(),
            tree_structure,
            fact_hash: root.as_ref().map_or(U256::ZERO, |node| node.node_hash),
            pages,
            root,
        };
        tracing::debug!(
            pages = topology.page_count,
            cells = memory.len(),
            fact = %topology.fact_hash,
            "fact tree built"
        );
        Ok(topology)
    }
}

/// Emits the `(n_pages, n_nodes)` pairs of `node`'s subtree and returns the
/// number of pages pushed since the last merge.
fn post_order(node: &FactNode, out: &mut Vec<u64>) -> u64 {
    match node.children.as_slice() {
        [left, right] => {
            let pending = post_order(left, out) + post_order(right, out);
            out.extend([pending, 2]);
            0
        }
        _ => 1,
    }
}
