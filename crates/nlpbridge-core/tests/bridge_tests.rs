//! End-to-end tests of the bridge against the in-process stub engine
//!
//! The engine is process-wide, so every test here runs serially.

use std::sync::Arc;
use std::thread;

use nlpbridge_core::{stub, Entity, Error, HandleState, Nlp, Token};
use serial_test::serial;

const MODEL: &str = "en_core_web_sm";

fn open() -> Nlp {
    stub::reset();
    Nlp::stub(MODEL).expect("stub engine should initialize")
}

fn token(text: &str, pos: &str, dep: &str, lemma: &str) -> Token {
    Token {
        text: text.to_string(),
        lemma: lemma.to_string(),
        pos: pos.to_string(),
        tag: "XX".to_string(),
        dep: dep.to_string(),
        is_stop: false,
        is_punct: false,
    }
}

#[test]
#[serial]
fn test_tokenize_sentence() {
    let nlp = open();
    let tokens = nlp.tokenize("The quick brown fox jumps over the lazy dog.").unwrap();
    let texts: Vec<&str> = tokens.iter().map(|t| t.text.as_str()).collect();
    assert_eq!(
        texts,
        ["The", "quick", "brown", "fox", "jumps", "over", "the", "lazy", "dog", "."]
    );
    assert!(tokens[0].is_stop);
    assert!(tokens[9].is_punct);
    assert_eq!(tokens[9].pos, "PUNCT");
}

#[test]
#[serial]
fn test_empty_text_yields_empty_results() {
    let nlp = open();
    assert!(nlp.tokenize("").unwrap().is_empty());
    assert!(nlp.extract_entities("").unwrap().is_empty());
    assert!(nlp.split_sentences("").unwrap().is_empty());
    assert!(nlp.pos_tags("").unwrap().is_empty());
}

#[test]
#[serial]
fn test_sentence_order_preserved() {
    let nlp = open();
    let sentences = nlp.split_sentences("First. Second. Third.").unwrap();
    assert_eq!(sentences, ["First.", "Second.", "Third."]);
}

#[test]
#[serial]
fn test_multibyte_text_round_trips() {
    let nlp = open();
    let text = "Café Müller opened in Zürich.";
    let tokens = nlp.tokenize(text).unwrap();
    assert_eq!(tokens[0].text, "Café");
    assert_eq!(tokens[1].text, "Müller");

    for entity in nlp.extract_entities(text).unwrap() {
        assert!(entity.start < entity.end);
        assert!(entity.end <= text.chars().count());
        assert_eq!(entity.span_in(text), Some(entity.text.as_str()));
    }
}

#[test]
#[serial]
fn test_map_collapse_last_wins() {
    let nlp = open();
    stub::script_tokens(
        "a a b",
        vec![
            token("a", "DET", "det", "a"),
            token("a", "NOUN", "dobj", "a"),
            token("b", "NOUN", "pobj", "b"),
        ],
    );

    let tags = nlp.pos_tags("a a b").unwrap();
    assert_eq!(tags.len(), 2);
    assert_eq!(tags["a"], "NOUN");
    assert_eq!(tags["b"], "NOUN");

    let deps = nlp.dependencies("a a b").unwrap();
    assert_eq!(deps["a"], "dobj");
    assert_eq!(nlp.lemmas("a a b").unwrap().len(), 2);
}

#[test]
#[serial]
fn test_entity_past_text_end_is_rejected() {
    let nlp = open();
    stub::script_entities(
        "Short",
        vec![Entity {
            text: "Short text".to_string(),
            label: "MISC".to_string(),
            start: 0,
            end: 10,
        }],
    );

    let before = stub::stats();
    let err = nlp.extract_entities("Short").unwrap_err();
    assert!(matches!(err, Error::ForeignCall { .. }));
    // The descriptor is still handed back.
    assert_eq!(stub::stats().entity_frees, before.entity_frees + 1);
    assert_eq!(stub::stats().live_strings, before.live_strings);
}

#[test]
#[serial]
fn test_dangling_empty_results() {
    let nlp = open();
    stub::set_dangling_empty(true);
    let before = stub::stats();

    assert!(nlp.tokenize("   ").unwrap().is_empty());
    assert!(nlp.split_sentences("   ").unwrap().is_empty());
    assert!(nlp.extract_entities("lowercase only").unwrap().is_empty());

    let after = stub::stats();
    assert_eq!(after.total_frees(), before.total_frees() + 3);
    assert_eq!(after.live_blocks, before.live_blocks);
    stub::reset();
}

#[test]
#[serial]
fn test_interior_nul_is_encoding_error() {
    let nlp = open();
    let before = stub::stats();
    let err = nlp.tokenize("before\0after").unwrap_err();
    assert_eq!(err.kind(), "encoding");
    // Nothing crossed the boundary, so nothing was released.
    assert_eq!(stub::stats().token_frees, before.token_frees);
}

#[test]
#[serial]
fn test_second_initialize_is_busy() {
    let nlp = open();
    let err = Nlp::stub("en_core_web_lg").unwrap_err();
    match err {
        Error::EngineBusy {
            active_model,
            requested_model,
        } => {
            assert_eq!(active_model, MODEL);
            assert_eq!(requested_model, "en_core_web_lg");
        }
        other => panic!("unexpected error: {other}"),
    }

    // The live handle is unaffected.
    assert!(nlp.tokenize("still works").is_ok());
    nlp.close();
    let nlp = Nlp::stub("en_core_web_lg").unwrap();
    assert_eq!(nlp.model(), "en_core_web_lg");
}

#[test]
#[serial]
fn test_init_failure() {
    stub::reset();
    let err = Nlp::stub(stub::FAILING_MODEL).unwrap_err();
    assert_eq!(err.kind(), "init");
    let err = Nlp::stub("").unwrap_err();
    assert_eq!(err.kind(), "init");
}

#[test]
#[serial]
fn test_double_close() {
    let before = stub::stats();
    let nlp = open();
    assert!(nlp.close());
    assert!(!nlp.close());
    assert_eq!(nlp.state(), HandleState::Closed);
    assert!(matches!(
        nlp.tokenize("after close").unwrap_err(),
        Error::NotReady { .. }
    ));
    drop(nlp);
    assert_eq!(stub::stats().cleanup_calls, before.cleanup_calls + 1);
}

#[test]
#[serial]
fn test_drop_closes_engine() {
    {
        let _nlp = open();
        assert!(stub::loaded_model().is_some());
    }
    assert!(stub::loaded_model().is_none());
}

#[test]
#[serial]
fn test_analyze() {
    let nlp = open();
    let analysis = nlp
        .analyze("Apple Inc was founded by Steve Jobs. It grew quickly.")
        .unwrap();
    assert_eq!(analysis.token_count, analysis.tokens.len());
    assert_eq!(analysis.entity_count, analysis.entities.len());
    assert_eq!(analysis.sentence_count, 2);
    assert!(analysis
        .entities
        .iter()
        .any(|e| e.text == "Apple Inc" && e.label == "ORG"));
}

#[test]
#[serial]
fn test_concurrent_callers_are_serialized() {
    let nlp = Arc::new(open());
    let before = stub::stats();

    let workers: Vec<_> = (0..4)
        .map(|i| {
            let nlp = Arc::clone(&nlp);
            thread::spawn(move || {
                for _ in 0..25 {
                    let text = format!("Worker {} says hello. Again!", i);
                    assert_eq!(nlp.split_sentences(&text).unwrap().len(), 2);
                    assert_eq!(nlp.tokenize(&text).unwrap().len(), 7);
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    let after = stub::stats();
    assert_eq!(after.total_frees(), before.total_frees() + 200);
    assert_eq!(after.live_strings, before.live_strings);
    assert_eq!(after.live_blocks, before.live_blocks);
}
