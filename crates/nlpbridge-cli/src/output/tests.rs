// Tests for output formatting
//
// These tests check the human tables and the machine formats produced for
// annotation results, and the writer's quiet and format handling.

use super::*;
use chrono::{TimeZone, Utc};
use pretty_assertions::assert_eq;
use std::sync::{Arc, Mutex};

#[derive(Clone, Default)]
struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    fn contents(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn writer(format: OutputFormat, quiet: bool) -> (OutputWriter, SharedBuffer) {
    let buffer = SharedBuffer::default();
    let writer = OutputWriter::with_writer(format, false, quiet, Box::new(buffer.clone()));
    (writer, buffer)
}

fn token(text: &str, pos: &str) -> Token {
    Token {
        text: text.to_string(),
        lemma: text.to_lowercase(),
        pos: pos.to_string(),
        tag: "NN".to_string(),
        dep: "ROOT".to_string(),
        is_stop: false,
        is_punct: pos == "PUNCT",
    }
}

#[test]
fn test_render_table_aligns_multibyte() {
    let table = render_table(
        &["TOKEN", "POS"],
        vec![
            vec!["Zürich".to_string(), "PROPN".to_string()],
            vec!["in".to_string(), "ADP".to_string()],
        ],
    );
    let expected = "\
TOKEN  │ POS
───────┼──────
Zürich │ PROPN
in     │ ADP
";
    assert_eq!(table, expected);
}

#[test]
fn test_map_is_sorted() {
    let map: HashMap<String, String> = [("b", "NOUN"), ("a", "DET"), ("c", "VERB")]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

    let json = OutputFormat::Json.format_map("POS", &map).unwrap();
    assert_eq!(json, r#"{"a":"DET","b":"NOUN","c":"VERB"}"#);

    let human = OutputFormat::Human.format_map("POS", &map).unwrap();
    let keys: Vec<&str> = human
        .lines()
        .skip(2)
        .map(|line| line.split_whitespace().next().unwrap())
        .collect();
    assert_eq!(keys, ["a", "b", "c"]);
}

#[test]
fn test_tokens_human_and_json() {
    let tokens = vec![token("Hello", "INTJ"), token(".", "PUNCT")];

    let human = OutputFormat::Human.format_tokens(&tokens).unwrap();
    assert!(human.starts_with("TEXT"));
    assert!(human.contains("INTJ"));
    assert_eq!(human.lines().count(), 4);

    let json = OutputFormat::Json.format_tokens(&tokens).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value[1]["is_punct"], true);
    assert_eq!(value[0]["lemma"], "hello");
}

#[test]
fn test_empty_results_human() {
    assert_eq!(OutputFormat::Human.format_tokens(&[]).unwrap(), "No tokens\n");
    assert_eq!(OutputFormat::Human.format_entities(&[]).unwrap(), "No entities\n");
    assert_eq!(OutputFormat::Json.format_sentences(&[]).unwrap(), "[]");
}

#[test]
fn test_sentences_numbered() {
    let sentences = vec!["First.".to_string(), "Second.".to_string()];
    let human = OutputFormat::Human.format_sentences(&sentences).unwrap();
    assert_eq!(human, "  1. First.\n  2. Second.\n");

    let yaml = OutputFormat::Yaml.format_sentences(&sentences).unwrap();
    assert_eq!(yaml, "- First.\n- Second.\n");
}

#[test]
fn test_analysis_human() {
    let mut analysis = Analysis::new(
        vec![token("Apple", "PROPN")],
        vec![Entity {
            text: "Apple".to_string(),
            label: "ORG".to_string(),
            start: 0,
            end: 5,
        }],
        vec!["Apple.".to_string()],
    );
    analysis.processed_at = Utc.with_ymd_and_hms(2025, 1, 17, 10, 30, 0).unwrap();

    let human = OutputFormat::Human.format_analysis(&analysis).unwrap();
    assert!(human.contains("Tokens:    1"));
    assert!(human.contains("Processed: 2025-01-17 10:30:00 UTC"));
    assert!(human.contains("ORG"));
}

#[test]
fn test_writer_emits_single_newline() {
    let (mut out, buffer) = writer(OutputFormat::Json, false);
    out.sentences(&["One.".to_string()]).unwrap();
    assert_eq!(buffer.contents(), "[\"One.\"]\n");

    let (mut out, buffer) = writer(OutputFormat::Human, false);
    out.sentences(&["One.".to_string()]).unwrap();
    assert_eq!(buffer.contents(), "  1. One.\n");
}

#[test]
fn test_quiet_suppresses_messages() {
    let (mut out, buffer) = writer(OutputFormat::Human, true);
    out.info("loading").unwrap();
    out.success("done").unwrap();
    out.sentences(&["One.".to_string()]).unwrap();
    assert_eq!(buffer.contents(), "  1. One.\n");
}

#[test]
fn test_messages_only_in_human_format() {
    let (mut out, buffer) = writer(OutputFormat::Yaml, false);
    out.info("loading").unwrap();
    out.warning("careful").unwrap();
    assert_eq!(buffer.contents(), "");

    let (mut out, buffer) = writer(OutputFormat::Human, false);
    out.info("loading").unwrap();
    out.warning("careful").unwrap();
    assert_eq!(buffer.contents(), "INFO: loading\nWARNING: careful\n");
}
