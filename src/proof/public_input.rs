use std::collections::BTreeMap;

use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

use super::header::{parse_value, HeaderTable};
use crate::annotation::parse_hex;
use crate::error::{AdapterError, AdapterResult};

/// Cairo memory segments in the order the statement contract reads them.
pub const BUILTIN_SEGMENTS: [&str; 10] = [
    "program",
    "execution",
    "output",
    "pedersen",
    "range_check",
    "ecdsa",
    "bitwise",
    "ec_op",
    "keccak",
    "poseidon",
];

/// Address range of one Cairo memory segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicSegment {
    pub begin_addr: u64,
    pub stop_ptr: u64,
}

/// Memory cell asserted public by the proof.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicMemory {
    pub page: u32,
    pub address: u64,
    pub value: U256,
}

/// Public-facing data of the proven Cairo run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicInput {
    pub layout: String,
    pub n_steps: u64,
    pub rc_min: u64,
    pub rc_max: u64,
    pub memory_segments: BTreeMap<String, PublicSegment>,
    pub public_memory: Vec<PublicMemory>,
}

impl PublicInput {
    pub(crate) fn from_header(header: &HeaderTable) -> AdapterResult<Self> {
        let mut memory_segments = BTreeMap::new();
        for (line, value) in header.repeated("segment") {
            let fields: Vec<&str> = value.split_whitespace().collect();
            let [name, begin, stop] = fields.as_slice() else {
                return Err(AdapterError::invalid_params(format!(
                    "segment header at line {line} needs `<name> <begin_addr> <stop_ptr>`"
                )));
            };
            if !BUILTIN_SEGMENTS.contains(name) {
                return Err(AdapterError::invalid_params(format!(
                    "unknown memory segment `{name}`"
                )));
            }
            let segment = PublicSegment {
                begin_addr: parse_value("segment", begin)?,
                stop_ptr: parse_value("segment", stop)?,
            };
            if memory_segments.insert(name.to_string(), segment).is_some() {
                return Err(AdapterError::invalid_params(format!(
                    "memory segment `{name}` declared twice"
                )));
            }
        }

        let mut public_memory = Vec::new();
        for (line, value) in header.repeated("memory") {
            let fields: Vec<&str> = value.split_whitespace().collect();
            let [page, address, cell] = fields.as_slice() else {
                return Err(AdapterError::invalid_params(format!(
                    "memory header at line {line} needs `<page> <address> <0xvalue>`"
                )));
            };
            public_memory.push(PublicMemory {
                page: parse_value("memory", page)?,
                address: parse_value("memory", address)?,
                value: parse_hex(*line, cell).map_err(|_| {
                    AdapterError::invalid_params(format!(
                        "memory header at line {line} has bad value `{cell}`"
                    ))
                })?,
            });
        }

        let input = PublicInput {
            layout: header.raw("layout")?.to_string(),
            n_steps: header.parse("n_steps")?,
            rc_min: header.parse("rc_min")?,
            rc_max: header.parse("rc_max")?,
            memory_segments,
            public_memory,
        };
        input.validate()?;
        Ok(input)
    }

    /// Checks the invariants the main statement encoding relies on.
    pub fn validate(&self) -> AdapterResult<()> {
        if !self.n_steps.is_power_of_two() {
            return Err(AdapterError::invalid_params(format!(
                "n_steps {} is not a power of two",
                self.n_steps
            )));
        }
        if self.rc_min > self.rc_max {
            return Err(AdapterError::invalid_params(format!(
                "rc_min {} exceeds rc_max {}",
                self.rc_min, self.rc_max
            )));
        }
        if self.layout.is_empty() || self.layout.len() > 32 {
            return Err(AdapterError::invalid_params(format!(
                "layout `{}` must be 1 to 32 bytes",
                self.layout
            )));
        }
        if self.public_memory.is_empty() {
            return Err(AdapterError::invalid_params("public memory is empty"));
        }

        let pages = self.pages();
        for (expected, page) in pages.keys().enumerate() {
            if *page as usize != expected {
                return Err(AdapterError::invalid_params(format!(
                    "memory pages must be numbered from 0 without holes, found page {page}"
                )));
            }
        }
        for (page, cells) in pages.iter().filter(|(page, _)| **page > 0) {
            let sequential = cells
                .windows(2)
                .all(|pair| pair[0].address.checked_add(1) == Some(pair[1].address));
            if !sequential {
                return Err(AdapterError::invalid_params(format!(
                    "memory page {page} has non-sequential addresses"
                )));
            }
        }
        Ok(())
    }

    /// Public memory grouped by declared page, cells in declaration order.
    pub fn pages(&self) -> BTreeMap<u32, Vec<PublicMemory>> {
        let mut pages: BTreeMap<u32, Vec<PublicMemory>> = BTreeMap::new();
        for cell in &self.public_memory {
            pages.entry(cell.page).or_default().push(*cell);
        }
        pages
    }

    /// Segment `(begin_addr, stop_ptr)` pairs in builtin order.
    pub fn ordered_segments(&self) -> Vec<(&'static str, PublicSegment)> {
        BUILTIN_SEGMENTS
            .iter()
            .filter_map(|name| {
                self.memory_segments
                    .get(*name)
                    .map(|segment| (*name, *segment))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(page: u32, address: u64, value: u64) -> PublicMemory {
        PublicMemory {
            page,
            address,
            value: U256::from(value),
        }
    }

    fn input(public_memory: Vec<PublicMemory>) -> PublicInput {
        PublicInput {
            layout: "recursive".into(),
            n_steps: 16,
            rc_min: 0,
            rc_max: 10,
            memory_segments: BTreeMap::new(),
            public_memory,
        }
    }

    #[test]
    fn pages_must_be_dense_and_continuous() {
        assert!(input(vec![cell(0, 1, 5), cell(0, 9, 6), cell(1, 20, 1), cell(1, 21, 2)])
            .validate()
            .is_ok());
        assert!(input(vec![cell(0, 1, 5), cell(2, 20, 1)]).validate().is_err());
        assert!(input(vec![cell(0, 1, 5), cell(1, 20, 1), cell(1, 22, 2)])
            .validate()
            .is_err());
        assert!(input(Vec::new()).validate().is_err());
    }

    #[test]
    fn malformed_repeated_headers_are_builder_errors() {
        use crate::annotation::{lex_annotations, LexMode};
        use crate::error::Stage;

        let base = "H: layout = recursive\nH: n_steps = 16\nH: rc_min = 0\nH: rc_max = 4";
        for extra in [
            "H: segment = program 1",
            "H: memory = 0 1",
            "H: memory = 0 1 0xZZ",
        ] {
            let records = lex_annotations(&format!("{base}\n{extra}"), LexMode::Strict).unwrap();
            let header = HeaderTable::collect(&records).unwrap();
            let err = PublicInput::from_header(&header).unwrap_err();
            assert!(
                matches!(err, AdapterError::InvalidParameters { ref reason } if reason.contains("line 5")),
                "{extra}: {err:?}"
            );
            assert_eq!(err.stage(), Stage::Builder);
        }
    }

    #[test]
    fn segments_follow_builtin_order() {
        let mut public_input = input(vec![cell(0, 1, 1)]);
        for (name, begin) in [("output", 30u64), ("program", 1), ("pedersen", 40)] {
            public_input.memory_segments.insert(
                name.to_string(),
                PublicSegment {
                    begin_addr: begin,
                    stop_ptr: begin + 2,
                },
            );
        }
        let names: Vec<_> = public_input
            .ordered_segments()
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        assert_eq!(names, ["program", "output", "pedersen"]);
    }
}
