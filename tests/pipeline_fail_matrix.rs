mod _fixtures;

use _fixtures::{default_config, init_tracing, N_QUERIES, THREE_LAYERS, TWO_LAYERS};
use stark_evm_adapter::annotation::ByteSpan;
use stark_evm_adapter::{parse_and_split, AdapterConfig, AdapterError, LexMode, Stage};

fn fail(proof: &[u8], text: &str) -> AdapterError {
    init_tracing();
    parse_and_split(proof, text, &default_config()).expect_err("run must abort")
}

#[test]
fn truncated_buffer_reports_the_first_unbacked_record() {
    let fixture = &*THREE_LAYERS;
    // cut where layer 3 starts sending its decommitment
    let (start, line) = fixture.layer_starts[2];
    let proof = &fixture.proof[..start];
    let err = fail(proof, &fixture.text);
    assert_eq!(
        err,
        AdapterError::SegmentOutOfRange {
            line,
            span: ByteSpan::new(start, start + 32),
            buffer_len: start,
        }
    );
    assert_eq!(err.stage(), Stage::Reader);
}

#[test]
fn trailing_bytes_are_a_coverage_gap() {
    let fixture = &*TWO_LAYERS;
    let mut proof = fixture.proof.clone();
    proof.extend_from_slice(&[0u8; 8]);
    let err = fail(&proof, &fixture.text);
    assert_eq!(
        err,
        AdapterError::CoverageGap {
            span: ByteSpan::new(fixture.proof.len(), fixture.proof.len() + 8),
        }
    );
}

#[test]
fn dropped_prover_message_leaves_a_gap() {
    let fixture = &*TWO_LAYERS;
    let text = fixture.without_lines("Proof of Work");
    let err = fail(&fixture.proof, &text);
    assert!(matches!(err, AdapterError::CoverageGap { span } if span.len() == 32));
}

#[test]
fn unknown_lines_abort_only_strict_runs() {
    let fixture = &*TWO_LAYERS;
    let text = format!("{}\nINFO: prover finished", fixture.text);
    let err = fail(&fixture.proof, &text);
    assert!(matches!(err, AdapterError::MalformedAnnotation { .. }));
    assert_eq!(err.stage(), Stage::Lexer);

    let lenient = AdapterConfig::builder()
        .lex_mode(LexMode::Lenient)
        .build()
        .unwrap();
    let tolerated = parse_and_split(&fixture.proof, &text, &lenient).unwrap();
    let strict = parse_and_split(&fixture.proof, &fixture.text, &default_config()).unwrap();
    assert_eq!(tolerated, strict);
}

#[test]
fn missing_evaluation_point_breaks_the_layer_count() {
    let fixture = &*THREE_LAYERS;
    let text = fixture.without_lines("Layer 2: Evaluation point");
    let err = fail(&fixture.proof, &text);
    assert_eq!(
        err,
        AdapterError::InconsistentLayerCount {
            declared: 3,
            found: 2,
        }
    );
}

#[test]
fn oversized_query_set_is_rejected() {
    let fixture = &*TWO_LAYERS;
    let text = fixture.with_header("fri.n_queries", "1");
    let err = fail(&fixture.proof, &text);
    assert!(matches!(
        err,
        AdapterError::QueryCountExceeded { found, declared: 1, .. } if found == N_QUERIES
    ));
}

#[test]
fn inconsistent_degree_reduction_is_rejected() {
    let fixture = &*TWO_LAYERS;
    let text = fixture.with_header("log_trace_length", "9");
    let err = fail(&fixture.proof, &text);
    assert!(matches!(err, AdapterError::InvalidParameters { .. }));
    assert_eq!(err.stage(), Stage::Builder);
}

#[test]
fn missing_interaction_element_is_rejected() {
    let fixture = &*TWO_LAYERS;
    let text = fixture.without_lines("Interaction element #1");
    let err = fail(&fixture.proof, &text);
    assert!(matches!(err, AdapterError::InvalidParameters { .. }));
}

#[test]
fn missing_last_layer_values_are_inconsistent() {
    let fixture = &*TWO_LAYERS;
    let text = fixture.without_lines("Decommitment/Last Layer");
    let err = fail(&fixture.proof, &text);
    assert!(matches!(
        err,
        AdapterError::InconsistentStatement { ref statement, .. } if statement == "Layer 2"
    ));
    assert_eq!(err.stage(), Stage::Splitter);
}

#[test]
fn orphaned_layer_decommitment_breaks_the_layer_count() {
    let fixture = &*TWO_LAYERS;
    let text = format!(
        "{}\nX: /cpu air/STARK/FRI/Decommitment/Layer 5: For node 4: Hash(0x1)",
        fixture.text
    );
    let err = fail(&fixture.proof, &text);
    assert_eq!(
        err,
        AdapterError::InconsistentLayerCount {
            declared: 2,
            found: 3,
        }
    );
}
