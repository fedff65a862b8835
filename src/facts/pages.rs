use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

use crate::error::{AdapterError, AdapterResult};
use crate::hash::keccak_words;
use crate::proof::PublicMemory;

/// Address/value pair of a regular page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryCell {
    pub address: u64,
    pub value: U256,
}

/// Values stored at sequential addresses starting at `start_address`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContinuousMemoryPage {
    pub start_address: u64,
    pub values: Vec<U256>,
}

impl ContinuousMemoryPage {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// `keccak256(values)`.
    pub fn values_hash(&self) -> U256 {
        keccak_words(&self.values)
    }

    /// `keccak256(start_address || length || keccak256(values))`.
    pub fn fact_hash(&self) -> U256 {
        keccak_words(&[
            U256::from(self.start_address),
            U256::from(self.values.len()),
            self.values_hash(),
        ])
    }
}

/// Explicit cells, hashed in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegularMemoryPage {
    pub cells: Vec<MemoryCell>,
}

impl RegularMemoryPage {
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// `keccak256(address_0 || value_0 || address_1 || ...)`.
    pub fn fact_hash(&self) -> U256 {
        let words: Vec<U256> = self
            .cells
            .iter()
            .flat_map(|cell| [U256::from(cell.address), cell.value])
            .collect();
        keccak_words(&words)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageKind {
    Continuous,
    Regular,
}

/// A memory page is exactly one of the two layouts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MemoryPage {
    Continuous(ContinuousMemoryPage),
    Regular(RegularMemoryPage),
}

impl MemoryPage {
    pub fn kind(&self) -> PageKind {
        match self {
            MemoryPage::Continuous(_) => PageKind::Continuous,
            MemoryPage::Regular(_) => PageKind::Regular,
        }
    }

    /// Number of cells in the page.
    pub fn len(&self) -> usize {
        match self {
            MemoryPage::Continuous(page) => page.len(),
            MemoryPage::Regular(page) => page.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn fact_hash(&self) -> U256 {
        match self {
            MemoryPage::Continuous(page) => page.fact_hash(),
            MemoryPage::Regular(page) => page.fact_hash(),
        }
    }
}

/// Splits public memory into pages.
///
/// Cells are cut into runs of sequential addresses, a change of declared
/// page also ending a run. Runs of at least `min_continuous_run` cells become
/// continuous pages; shorter runs are packed whole into regular pages of at
/// most `max_regular_page_size` cells.
pub(crate) fn group_pages(
    memory: &[PublicMemory],
    max_regular_page_size: usize,
    min_continuous_run: usize,
) -> AdapterResult<Vec<MemoryPage>> {
    let mut pages = Vec::new();
    let mut pending: Vec<MemoryCell> = Vec::new();

    for run in runs(memory) {
        if run.len() >= min_continuous_run {
            flush_regular(&mut pages, &mut pending);
            pages.push(MemoryPage::Continuous(ContinuousMemoryPage {
                start_address: run[0].address,
                values: run.iter().map(|cell| cell.value).collect(),
            }));
            continue;
        }
        if run.len() > max_regular_page_size {
            return Err(AdapterError::PageSizeExceeded {
                start_address: run[0].address,
                run_len: run.len(),
                max: max_regular_page_size,
            });
        }
        if pending.len() + run.len() > max_regular_page_size {
            flush_regular(&mut pages, &mut pending);
        }
        pending.extend(run.iter().map(|cell| MemoryCell {
            address: cell.address,
            value: cell.value,
        }));
    }
    flush_regular(&mut pages, &mut pending);
    Ok(pages)
}

fn flush_regular(pages: &mut Vec<MemoryPage>, pending: &mut Vec<MemoryCell>) {
    if !pending.is_empty() {
        pages.push(MemoryPage::Regular(RegularMemoryPage {
            cells: std::mem::take(pending),
        }));
    }
}

/// Maximal runs of sequential addresses within one declared page.
fn runs(memory: &[PublicMemory]) -> impl Iterator<Item = &[PublicMemory]> {
    memory.chunk_by(|prev, next| {
        prev.page == next.page && prev.address.checked_add(1) == Some(next.address)
    })
}
