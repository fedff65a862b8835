#![allow(dead_code)]

use alloy_primitives::U256;
use once_cell::sync::Lazy;
use stark_evm_adapter::AdapterConfig;

const AIR: &str = "/cpu air/STARK";
const WORD: usize = 32;

/// Queries sampled by every fixture; also the declared `fri.n_queries`.
pub const N_QUERIES: usize = 2;

/// Trace commitments every fixture decommits.
pub const TRACE_COMMITMENTS: usize = 2;

/// Annotation log and proof buffer of a synthetic stone-style run.
///
/// Every prover message claims one 32-byte word holding the value printed in
/// its annotation line, so the buffer is tiled exactly in annotation order.
#[derive(Debug, Clone)]
pub struct AnnotatedFixture {
    pub text: String,
    pub proof: Vec<u8>,
    pub fri_layers: usize,
    /// Words the main statement receives from the buffer.
    pub main_words: usize,
    /// Annotation line of the last prover message.
    pub last_prover_line: usize,
    /// Buffer offset and annotation line where each committed layer's
    /// prover decommitment starts, indexed by `layer - 1`.
    pub layer_starts: Vec<(usize, usize)>,
}

impl AnnotatedFixture {
    pub fn with_layers(fri_layers: usize) -> Self {
        FixtureWriter::default().write(fri_layers)
    }

    /// Every layer past the first decommits `Row 0, Column 1` by pointing at
    /// the bytes the previous layer already sent for it.
    pub fn with_aliased_rows(fri_layers: usize) -> Self {
        FixtureWriter {
            alias_rows: true,
            ..FixtureWriter::default()
        }
        .write(fri_layers)
    }

    /// Same fixture with every line containing `needle` removed.
    pub fn without_lines(&self, needle: &str) -> String {
        self.text
            .lines()
            .filter(|line| !line.contains(needle))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Same fixture with the header `key` set to `value`.
    pub fn with_header(&self, key: &str, value: &str) -> String {
        let prefix = format!("H: {key} =");
        self.text
            .lines()
            .map(|line| {
                if line.starts_with(&prefix) {
                    format!("H: {key} = {value}")
                } else {
                    line.to_string()
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

pub static ZERO_LAYERS: Lazy<AnnotatedFixture> = Lazy::new(|| AnnotatedFixture::with_layers(0));
pub static TWO_LAYERS: Lazy<AnnotatedFixture> = Lazy::new(|| AnnotatedFixture::with_layers(2));
pub static THREE_LAYERS: Lazy<AnnotatedFixture> =
    Lazy::new(|| AnnotatedFixture::with_layers(3));

pub fn default_config() -> AdapterConfig {
    AdapterConfig::default()
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[derive(Default)]
struct FixtureWriter {
    lines: Vec<String>,
    proof: Vec<u8>,
    counter: u64,
    main_words: usize,
    last_prover_line: usize,
    alias_rows: bool,
    /// Span and value of the previous layer's `Row 0, Column 1`.
    shared_row: Option<(usize, usize, u64)>,
    layer_starts: Vec<(usize, usize)>,
}

impl FixtureWriter {
    fn write(mut self, fri_layers: usize) -> AnnotatedFixture {
        self.lines.push("# synthetic stone annotations".to_string());
        self.headers(fri_layers);

        self.send(&format!("{AIR}/Original/Commit on Trace"), hash, true);
        for index in 0..2 {
            self.challenge(
                &format!("{AIR}/Interaction"),
                &format!("Interaction element #{index}: Field Element(0x{:x})", 0x51 + index),
            );
        }
        self.send(&format!("{AIR}/Interaction/Commit on Trace"), hash, true);
        for _ in 0..2 {
            self.send(
                &format!("{AIR}/Out Of Domain Sampling/OODS values"),
                |value| format!("Field Elements({value})"),
                true,
            );
        }

        for layer in 1..=fri_layers {
            let point = self.fresh();
            self.challenge(
                &format!("{AIR}/FRI/Commitment/Layer {layer}"),
                &format!("Evaluation point: Field Element(0x{point:x})"),
            );
            self.send(&format!("{AIR}/FRI/Commitment/Layer {layer}"), hash, true);
        }
        self.send(
            &format!("{AIR}/FRI/Commitment/Last Layer"),
            |value| format!("Coefficients: Field Elements({value})"),
            true,
        );
        self.send(
            &format!("{AIR}/FRI/Proof of Work"),
            |value| format!("POW({value})"),
            true,
        );
        self.challenge(&format!("{AIR}/FRI/QueryPhase"), "Query indices: 0, 3");

        for trace in 0..TRACE_COMMITMENTS {
            self.trace_decommitment(trace);
        }
        for layer in 1..=fri_layers {
            self.layer_decommitment(layer, fri_layers);
        }
        if fri_layers > 0 {
            self.last_layer_decommitment();
        }

        AnnotatedFixture {
            text: self.lines.join("\n"),
            proof: self.proof,
            fri_layers,
            main_words: self.main_words,
            last_prover_line: self.last_prover_line,
            layer_starts: self.layer_starts,
        }
    }

    fn headers(&mut self, fri_layers: usize) {
        let mut steps = vec!["0".to_string()];
        steps.extend((0..fri_layers).map(|_| "1".to_string()));
        let headers = [
            ("layout", "recursive".to_string()),
            ("n_steps", "16".to_string()),
            ("rc_min", "0".to_string()),
            ("rc_max", "10".to_string()),
            ("log_n_cosets", "2".to_string()),
            // last layer degree bound 2 plus one halving per layer
            ("log_trace_length", (1 + fri_layers).to_string()),
            ("fri.fri_step_list", steps.join(", ")),
            ("fri.last_layer_degree_bound", "2".to_string()),
            ("fri.n_queries", N_QUERIES.to_string()),
            ("fri.proof_of_work_bits", "0".to_string()),
            ("commitment_hash", "keccak256_masked160_lsb".to_string()),
            ("channel_hash", "keccak256".to_string()),
            ("segment", "program 1 6".to_string()),
            ("segment", "execution 40 90".to_string()),
            ("segment", "output 20 23".to_string()),
        ];
        for (key, value) in headers {
            self.lines.push(format!("H: {key} = {value}"));
        }
        for address in [1u64, 2, 3, 4, 5, 10] {
            self.lines
                .push(format!("H: memory = 0 {address} 0x{:x}", 0x100 + address));
        }
        for address in 20u64..23 {
            self.lines
                .push(format!("H: memory = 1 {address} 0x{:x}", 0x200 + address));
        }
    }

    fn trace_decommitment(&mut self, trace: usize) {
        let path = format!("{AIR}/FRI/Decommitment/Layer 0/Virtual Oracle/Trace {trace}");
        for index in [8u64, 11] {
            let digest = self.fresh();
            self.extra(&path, &format!("For node {index}: Hash(0x{digest:x})"));
        }
        for row in [0u64, 3] {
            for column in 0..2 {
                self.send(
                    &path,
                    |value| format!("Row {row}, Column {column}: Field Element({value})"),
                    true,
                );
            }
        }
        for index in [9u64, 10, 2, 3] {
            self.send(&path, |value| format!("For node {index}: Hash({value})"), false);
        }
    }

    fn layer_decommitment(&mut self, layer: usize, fri_layers: usize) {
        let path = format!("{AIR}/FRI/Decommitment/Layer {layer}");
        let height = fri_layers + 2 - layer;
        let base = 1u64 << height;
        let offset = self.proof.len();
        let mut first_line = None;
        for query in 0..N_QUERIES as u64 {
            let inverse = self.fresh();
            self.extra(
                &path,
                &format!("xInv for index {query}: Field Element(0x{inverse:x})"),
            );
            let queried = self.fresh();
            self.extra(
                &path,
                &format!("Row {query}, Column 0: Field Element(0x{queried:x})"),
            );
            let reused = if query == 0 && self.alias_rows {
                self.shared_row
            } else {
                None
            };
            match reused {
                Some((start, end, value)) => self.lines.push(format!(
                    "P->V[{start}:{end}]: {path}: Row 0, Column 1: Field Element(0x{value:x})"
                )),
                None => {
                    let start = self.proof.len();
                    let value = self.send(
                        &path,
                        |value| format!("Row {query}, Column 1: Field Element({value})"),
                        false,
                    );
                    first_line.get_or_insert(self.last_prover_line);
                    if query == 0 {
                        self.shared_row = Some((start, self.proof.len(), value));
                    }
                }
            }
        }
        for query in 0..N_QUERIES as u64 {
            let digest = self.fresh();
            self.extra(
                &path,
                &format!("For node {}: Hash(0x{digest:x})", base + query),
            );
        }
        for query in 0..N_QUERIES as u64 {
            self.send(
                &path,
                |value| format!("For node {}: Hash({value})", base + N_QUERIES as u64 + query),
                false,
            );
            first_line.get_or_insert(self.last_prover_line);
        }
        self.layer_starts
            .push((offset, first_line.unwrap_or(self.last_prover_line)));
    }

    fn last_layer_decommitment(&mut self) {
        let path = format!("{AIR}/FRI/Decommitment/Last Layer");
        for query in 0..N_QUERIES as u64 {
            let inverse = self.fresh();
            self.extra(
                &path,
                &format!("xInv for index {query}: Field Element(0x{inverse:x})"),
            );
            let value = self.fresh();
            self.extra(
                &path,
                &format!("Row {query}, Column 0: Field Element(0x{value:x})"),
            );
        }
    }

    fn fresh(&mut self) -> u64 {
        self.counter += 1;
        0x1000 + self.counter
    }

    fn send(&mut self, path: &str, payload: impl FnOnce(&str) -> String, main: bool) -> u64 {
        let value = self.fresh();
        let start = self.proof.len();
        self.proof
            .extend_from_slice(&U256::from(value).to_be_bytes::<WORD>());
        let end = self.proof.len();
        let payload = payload(&format!("0x{value:x}"));
        self.lines
            .push(format!("P->V[{start}:{end}]: {path}: {payload}"));
        self.last_prover_line = self.lines.len();
        if main {
            self.main_words += 1;
        }
        value
    }

    fn challenge(&mut self, path: &str, payload: &str) {
        self.lines.push(format!("V->P: {path}: {payload}"));
    }

    fn extra(&mut self, path: &str, payload: &str) {
        self.lines.push(format!("X: {path}: {payload}"));
    }
}

fn hash(value: &str) -> String {
    format!("Hash({value})")
}
