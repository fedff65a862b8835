use alloy_primitives::U256;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::records::{
    AnnotationRecord, ByteSpan, CommitmentRecord, DecommitmentEntry, DecommitmentRecord,
    HeaderRecord, LayerBoundary, QueryIndices, RecordKind, RecordSource,
};
use crate::error::{AdapterError, AdapterResult};

/// Handling of lines the grammar does not know.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LexMode {
    /// Unknown lines abort the run.
    #[default]
    Strict,
    /// Unknown lines are skipped, for prover versions emitting extra
    /// informational lines.
    Lenient,
}

const HEX: &str = r"0x[0-9a-fA-F]+";

static PROOF_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^P->V\[([^\]]*)\]:\s*(.*)$").expect("static regex"));
static NODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"^For node (\d+): Hash\(({HEX})\)$")).expect("static regex"));
static DATA: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"^element #(\d+): Data\(({HEX})\)$")).expect("static regex")
});
static ROW: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"^Row (\d+), Column (\d+): Field Element\(({HEX})\)$"))
        .expect("static regex")
});
static INVERSE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"^xInv for index (\d+): Field Element\(({HEX})\)$"))
        .expect("static regex")
});
static EVAL_POINT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"^Evaluation point: Field Element\(({HEX})\)$")).expect("static regex")
});
static INTERACTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"^Interaction element #(\d+): Field Element\(({HEX})\)$"
    ))
    .expect("static regex")
});
static HASH: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"^Hash\(({HEX})\)$")).expect("static regex"));
static LAYER_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^Layer (\d+)$").expect("static regex"));

/// Single-pass classifier turning annotation text into typed records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AnnotationLexer {
    mode: LexMode,
}

impl AnnotationLexer {
    pub fn new(mode: LexMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> LexMode {
        self.mode
    }

    /// Classifies every line of `text`, preserving order.
    pub fn lex(&self, text: &str) -> AdapterResult<Vec<AnnotationRecord>> {
        let mut records = Vec::new();
        let mut trace_commitments = 0usize;
        let mut skipped = 0usize;

        for (index, raw) in text.lines().enumerate() {
            let line = index + 1;
            let trimmed = raw.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            match classify(line, trimmed, &mut trace_commitments)? {
                Some(kind) => records.push(AnnotationRecord { line, kind }),
                None => match self.mode {
                    LexMode::Strict => {
                        return Err(AdapterError::malformed(line, "unrecognized line"));
                    }
                    LexMode::Lenient => {
                        skipped += 1;
                        tracing::debug!(line, "skipping unrecognized annotation line");
                    }
                },
            }
        }

        tracing::debug!(records = records.len(), skipped, "annotations lexed");
        Ok(records)
    }
}

/// Lexes `text` with the given mode.
pub fn lex_annotations(text: &str, mode: LexMode) -> AdapterResult<Vec<AnnotationRecord>> {
    AnnotationLexer::new(mode).lex(text)
}

/// Returns `Ok(None)` for lines outside the grammar.
fn classify(
    line: usize,
    text: &str,
    trace_commitments: &mut usize,
) -> AdapterResult<Option<RecordKind>> {
    if let Some(rest) = text.strip_prefix("H:") {
        return classify_header(line, rest).map(Some);
    }
    if let Some(rest) = text.strip_prefix("V->P:") {
        return classify_challenge(line, rest).map(Some);
    }
    if let Some(rest) = text.strip_prefix("X:") {
        return classify_extra(line, rest);
    }
    if text.starts_with("P->V[") {
        return classify_proof(line, text, trace_commitments).map(Some);
    }
    Ok(None)
}

fn classify_header(line: usize, rest: &str) -> AdapterResult<RecordKind> {
    let (key, value) = rest
        .split_once('=')
        .ok_or_else(|| AdapterError::malformed(line, "header without `=`"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(AdapterError::malformed(line, "header with empty key"));
    }
    Ok(RecordKind::Header(HeaderRecord {
        key: key.to_string(),
        value: value.trim().to_string(),
    }))
}

fn classify_proof(
    line: usize,
    text: &str,
    trace_commitments: &mut usize,
) -> AdapterResult<RecordKind> {
    let captures = PROOF_PREFIX
        .captures(text)
        .ok_or_else(|| AdapterError::malformed(line, "unterminated byte range"))?;
    let span = parse_span(line, &captures[1])?;
    let (path, payload) = split_body(line, &captures[2])?;

    if payload.starts_with("Hash(") {
        let components: Vec<&str> = path.split('/').collect();
        let last = components.last().copied().unwrap_or_default();
        let parent = components.iter().rev().nth(1).copied();
        let name = if last == "Commit on Trace" {
            Some(format!("Trace {}", *trace_commitments))
        } else if parent == Some("Commitment") {
            Some(last.to_string())
        } else {
            None
        };
        if let Some(name) = name {
            let digest = hash_payload(line, payload)?;
            if last == "Commit on Trace" {
                *trace_commitments += 1;
            }
            return Ok(RecordKind::Commitment(CommitmentRecord { name, digest, span }));
        }
    }

    if is_decommitment_path(path) {
        if let Some(entry) = decommitment_entry(line, path, payload)? {
            return Ok(RecordKind::Decommitment(DecommitmentRecord {
                name: record_name(path),
                source: RecordSource::Proof(span),
                entry,
            }));
        }
    }

    Ok(RecordKind::ProofData {
        path: path.to_string(),
        label: payload.to_string(),
        span,
    })
}

fn classify_challenge(line: usize, rest: &str) -> AdapterResult<RecordKind> {
    let (path, payload) = split_body(line, rest)?;

    if payload.starts_with("Evaluation point") {
        let captures = EVAL_POINT
            .captures(payload)
            .ok_or_else(|| AdapterError::malformed(line, "bad evaluation point payload"))?;
        let name = record_name(path);
        let layer = LAYER_NAME
            .captures(&name)
            .ok_or_else(|| {
                AdapterError::malformed(line, format!("evaluation point outside a layer: `{name}`"))
            })
            .and_then(|layer| parse_decimal::<usize>(line, &layer[1], "layer"))?;
        return Ok(RecordKind::LayerBoundary(LayerBoundary {
            layer,
            evaluation_point: parse_hex(line, &captures[1])?,
        }));
    }

    if payload.starts_with("Interaction element #") {
        let captures = INTERACTION
            .captures(payload)
            .ok_or_else(|| AdapterError::malformed(line, "bad interaction element payload"))?;
        return Ok(RecordKind::InteractionElement {
            index: parse_decimal(line, &captures[1], "interaction index")?,
            value: parse_hex(line, &captures[2])?,
        });
    }

    if let Some(list) = payload.strip_prefix("Query indices:") {
        let indices = list
            .split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(|item| parse_decimal::<u64>(line, item, "query index"))
            .collect::<AdapterResult<Vec<_>>>()?;
        return Ok(RecordKind::QueryIndices(QueryIndices { indices }));
    }

    Ok(RecordKind::Challenge {
        path: path.to_string(),
        label: payload.to_string(),
    })
}

fn classify_extra(line: usize, rest: &str) -> AdapterResult<Option<RecordKind>> {
    let (path, payload) = split_body(line, rest)?;
    if !is_decommitment_path(path) {
        return Ok(None);
    }
    Ok(decommitment_entry(line, path, payload)?.map(|entry| {
        RecordKind::Decommitment(DecommitmentRecord {
            name: record_name(path),
            source: RecordSource::Extra,
            entry,
        })
    }))
}

/// Decodes the decommitment payload kinds; `Ok(None)` when the payload is
/// none of them.
fn decommitment_entry(
    line: usize,
    path: &str,
    payload: &str,
) -> AdapterResult<Option<DecommitmentEntry>> {
    if payload.starts_with("For node ") {
        let captures = NODE
            .captures(payload)
            .ok_or_else(|| AdapterError::malformed(line, "bad node payload"))?;
        return Ok(Some(DecommitmentEntry::Node {
            index: parse_decimal_word(line, &captures[1])?,
            digest: parse_hex(line, &captures[2])?,
        }));
    }
    if payload.starts_with("element #") {
        let captures = DATA
            .captures(payload)
            .ok_or_else(|| AdapterError::malformed(line, "bad data payload"))?;
        return Ok(Some(DecommitmentEntry::Data {
            index: parse_decimal_word(line, &captures[1])?,
            value: parse_hex(line, &captures[2])?,
        }));
    }
    if payload.starts_with("Row ") {
        let captures = ROW
            .captures(payload)
            .ok_or_else(|| AdapterError::malformed(line, "bad row payload"))?;
        return Ok(Some(DecommitmentEntry::Row {
            row: parse_decimal(line, &captures[1], "row")?,
            column: parse_decimal(line, &captures[2], "column")?,
            value: parse_hex(line, &captures[3])?,
            oracle: path.split('/').any(|component| component == "Virtual Oracle"),
        }));
    }
    if payload.starts_with("xInv") {
        let captures = INVERSE
            .captures(payload)
            .ok_or_else(|| AdapterError::malformed(line, "bad xInv payload"))?;
        return Ok(Some(DecommitmentEntry::Inverse {
            index: parse_decimal(line, &captures[1], "xInv index")?,
            value: parse_hex(line, &captures[2])?,
        }));
    }
    Ok(None)
}

fn split_body(line: usize, body: &str) -> AdapterResult<(&str, &str)> {
    let (path, payload) = body
        .split_once(": ")
        .ok_or_else(|| AdapterError::malformed(line, "missing `path: payload` separator"))?;
    Ok((path.trim(), payload.trim()))
}

fn is_decommitment_path(path: &str) -> bool {
    path.split('/').any(|component| component == "Decommitment")
}

fn record_name(path: &str) -> String {
    path.rsplit('/').next().unwrap_or_default().trim().to_string()
}

fn parse_span(line: usize, range: &str) -> AdapterResult<ByteSpan> {
    let (start, end) = range
        .split_once(':')
        .ok_or_else(|| AdapterError::malformed(line, "byte range without `:`"))?;
    let start = parse_decimal::<usize>(line, start.trim(), "range start")?;
    let end = parse_decimal::<usize>(line, end.trim(), "range end")?;
    if end < start {
        return Err(AdapterError::malformed(
            line,
            format!("byte range ends before it starts ({start}:{end})"),
        ));
    }
    Ok(ByteSpan::new(start, end))
}

fn hash_payload(line: usize, payload: &str) -> AdapterResult<U256> {
    let captures = HASH
        .captures(payload)
        .ok_or_else(|| AdapterError::malformed(line, "bad hash payload"))?;
    parse_hex(line, &captures[1])
}

fn parse_decimal<T: core::str::FromStr>(line: usize, text: &str, what: &str) -> AdapterResult<T> {
    text.parse::<T>()
        .map_err(|_| AdapterError::malformed(line, format!("{what} `{text}` is not an integer")))
}

fn parse_decimal_word(line: usize, text: &str) -> AdapterResult<U256> {
    U256::from_str_radix(text, 10)
        .map_err(|_| AdapterError::malformed(line, format!("node index `{text}` out of range")))
}

/// Parses a `0x`-prefixed value of at most 64 hex digits.
pub(crate) fn parse_hex(line: usize, text: &str) -> AdapterResult<U256> {
    let digits = text.strip_prefix("0x").unwrap_or(text);
    if digits.is_empty() || digits.len() > 64 {
        return Err(AdapterError::malformed(
            line,
            format!("hex value `{text}` must have 1 to 64 digits"),
        ));
    }
    U256::from_str_radix(digits, 16)
        .map_err(|_| AdapterError::malformed(line, format!("`{text}` is not a hex value")))
}
