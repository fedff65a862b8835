use std::collections::BTreeMap;
use std::str::FromStr;

use crate::annotation::{AnnotationRecord, RecordKind};
use crate::error::{AdapterError, AdapterResult};

/// Keys that may appear more than once, in annotation order.
const REPEATABLE: [&str; 2] = ["segment", "memory"];

/// Header lines of one annotation log, keyed for lookup.
#[derive(Debug, Default)]
pub(crate) struct HeaderTable {
    scalars: BTreeMap<String, (usize, String)>,
    repeated: BTreeMap<&'static str, Vec<(usize, String)>>,
}

impl HeaderTable {
    pub(crate) fn collect(records: &[AnnotationRecord]) -> AdapterResult<Self> {
        let mut table = HeaderTable::default();
        for record in records {
            let RecordKind::Header(header) = &record.kind else {
                continue;
            };
            if let Some(key) = REPEATABLE.iter().find(|key| **key == header.key) {
                table
                    .repeated
                    .entry(*key)
                    .or_default()
                    .push((record.line, header.value.clone()));
                continue;
            }
            if let Some((first, _)) = table
                .scalars
                .insert(header.key.clone(), (record.line, header.value.clone()))
            {
                return Err(AdapterError::invalid_params(format!(
                    "header `{}` repeated at lines {first} and {}",
                    header.key, record.line
                )));
            }
        }
        Ok(table)
    }

    pub(crate) fn raw(&self, key: &str) -> AdapterResult<&str> {
        self.scalars
            .get(key)
            .map(|(_, value)| value.as_str())
            .ok_or_else(|| AdapterError::invalid_params(format!("missing header `{key}`")))
    }

    pub(crate) fn parse<T: FromStr>(&self, key: &str) -> AdapterResult<T> {
        let value = self.raw(key)?;
        parse_value(key, value)
    }

    pub(crate) fn parse_or<T: FromStr>(&self, key: &str, default: T) -> AdapterResult<T> {
        match self.scalars.get(key) {
            Some((_, value)) => parse_value(key, value),
            None => Ok(default),
        }
    }

    /// Values of a repeatable key with their annotation lines.
    pub(crate) fn repeated(&self, key: &str) -> &[(usize, String)] {
        self.repeated
            .get(key)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

pub(crate) fn parse_value<T: FromStr>(key: &str, value: &str) -> AdapterResult<T> {
    value.trim().parse::<T>().map_err(|_| {
        AdapterError::invalid_params(format!("header `{key}` has unparsable value `{value}`"))
    })
}
