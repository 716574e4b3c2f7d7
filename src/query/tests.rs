use super::*;
use crate::RagError;
use crate::database::ChunkRecord;
use crate::database::memory::MemoryStore;
use std::io::Cursor;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

struct FakeEmbedder {
    vector: Vec<f32>,
    calls: AtomicUsize,
    fail: bool,
}

impl FakeEmbedder {
    fn returning(vector: Vec<f32>) -> Self {
        Self {
            vector,
            calls: AtomicUsize::new(0),
            fail: false,
        }
    }

    fn failing() -> Self {
        Self {
            vector: Vec::new(),
            calls: AtomicUsize::new(0),
            fail: true,
        }
    }
}

impl Embedder for FakeEmbedder {
    fn embed(&self, _text: &str) -> crate::Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(RagError::Embedding("embedding provider offline".to_string()));
        }
        Ok(self.vector.clone())
    }

    fn embed_batch(&self, texts: &[String]) -> crate::Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed(t)).collect()
    }
}

/// Language model stub that only "knows" about content present in the
/// supplied context
struct ContextualLlm {
    prompts: Mutex<Vec<String>>,
}

impl ContextualLlm {
    fn new() -> Self {
        Self {
            prompts: Mutex::new(Vec::new()),
        }
    }

    fn last_prompt(&self) -> String {
        self.prompts
            .lock()
            .expect("lock should not be poisoned")
            .last()
            .cloned()
            .unwrap_or_default()
    }
}

impl LanguageModel for ContextualLlm {
    fn complete(&self, prompt: &str) -> crate::Result<String> {
        self.prompts
            .lock()
            .expect("lock should not be poisoned")
            .push(prompt.to_string());

        if prompt.contains("the universe is change") {
            Ok("The universe is change.".to_string())
        } else {
            Ok("I don't know.".to_string())
        }
    }
}

struct FailingLlm;

impl LanguageModel for FailingLlm {
    fn complete(&self, _prompt: &str) -> crate::Result<String> {
        Err(RagError::Llm("model unavailable".to_string()))
    }
}

fn record(content: &str, page: u32, index: u32, vector: Vec<f32>) -> ChunkRecord {
    ChunkRecord {
        id: format!("chunk-{}", index),
        vector,
        content: content.to_string(),
        source: "meditations.pdf".to_string(),
        page_number: page,
        chunk_index: index,
        created_at: "2024-01-01T00:00:00Z".to_string(),
    }
}

async fn populated_store(contents: &[&str]) -> MemoryStore {
    let mut store = MemoryStore::new();
    let records: Vec<ChunkRecord> = contents
        .iter()
        .enumerate()
        .map(|(i, content)| {
            record(
                content,
                (i + 1) as u32,
                i as u32,
                vec![1.0, i as f32 * 0.1],
            )
        })
        .collect();
    store
        .add_chunks(records)
        .await
        .expect("insert should succeed");
    store
}

fn engine_with(
    store: MemoryStore,
    llm: Arc<dyn LanguageModel>,
    embedder: Arc<dyn Embedder>,
) -> QueryEngine {
    QueryEngine::new(embedder, llm, Box::new(store), 3)
}

#[test]
fn prompt_rendering() {
    let prompt = render_prompt("some context", "some question");

    assert!(prompt.contains("Context: some context"));
    assert!(prompt.contains("Question: some question"));
    assert!(prompt.contains("just say that you don't know"));
    assert!(prompt.contains("three sentences maximum"));
    assert!(prompt.ends_with("Answer:"));
}

#[test]
fn context_joins_chunks_with_blank_lines() {
    let chunks = vec![
        ScoredChunk {
            content: "first".to_string(),
            source: "a.pdf".to_string(),
            page_number: 1,
            chunk_index: 0,
            distance: 0.0,
            similarity: 1.0,
        },
        ScoredChunk {
            content: "second".to_string(),
            source: "a.pdf".to_string(),
            page_number: 2,
            chunk_index: 1,
            distance: 0.1,
            similarity: 0.9,
        },
    ];

    assert_eq!(format_context(&chunks), "first\n\nsecond");
}

#[tokio::test]
async fn ask_retrieves_top_k_chunks() {
    let store = populated_store(&["one", "two", "three", "four", "five"]).await;
    let llm = Arc::new(ContextualLlm::new());
    let engine = engine_with(
        store,
        llm,
        Arc::new(FakeEmbedder::returning(vec![1.0, 0.0])),
    );

    let (_answer, sources) = engine.ask("anything").await.expect("ask should succeed");

    assert_eq!(sources.len(), 3);
}

#[tokio::test]
async fn ask_with_small_store_returns_all_chunks() {
    let store = populated_store(&["one", "two"]).await;
    let llm = Arc::new(ContextualLlm::new());
    let engine = engine_with(
        store,
        llm,
        Arc::new(FakeEmbedder::returning(vec![1.0, 0.0])),
    );

    let (_answer, sources) = engine.ask("anything").await.expect("ask should succeed");

    assert_eq!(sources.len(), 2);
}

#[tokio::test]
async fn ask_feeds_retrieved_context_to_the_model() {
    let store = populated_store(&["the universe is change", "life is opinion"]).await;
    let llm = Arc::new(ContextualLlm::new());
    let engine = engine_with(
        store,
        Arc::clone(&llm) as Arc<dyn LanguageModel>,
        Arc::new(FakeEmbedder::returning(vec![1.0, 0.0])),
    );

    let (answer, _sources) = engine
        .ask("what is the universe?")
        .await
        .expect("ask should succeed");

    assert_eq!(answer, "The universe is change.");

    let prompt = llm.last_prompt();
    assert!(prompt.contains("the universe is change"));
    assert!(prompt.contains("life is opinion"));
    assert!(prompt.contains("Question: what is the universe?"));
}

#[tokio::test]
async fn unsupported_question_yields_dont_know() {
    let store = populated_store(&["chapter one discusses gratitude"]).await;
    let llm = Arc::new(ContextualLlm::new());
    let engine = engine_with(
        store,
        llm,
        Arc::new(FakeEmbedder::returning(vec![1.0, 0.0])),
    );

    let (answer, _sources) = engine
        .ask("question with no relevant content")
        .await
        .expect("ask should succeed");

    assert!(answer.contains("don't know"));
}

#[tokio::test]
async fn ask_with_sources_prints_pages_and_previews() {
    let long_text = "virtue ".repeat(40);
    let store = populated_store(&[long_text.as_str(), "short chunk"]).await;
    let llm = Arc::new(ContextualLlm::new());
    let engine = engine_with(
        store,
        llm,
        Arc::new(FakeEmbedder::returning(vec![1.0, 0.0])),
    );

    let mut out = Vec::new();
    engine
        .ask_with_sources("what is virtue?", &mut out)
        .await
        .expect("ask_with_sources should succeed");

    let output = String::from_utf8(out).expect("output should be UTF-8");
    assert!(output.contains("Question: what is virtue?"));
    assert!(output.contains("Answer: "));
    assert!(output.contains("Sources:"));
    assert!(output.contains("[1] Page 1: "));
    assert!(output.contains("[2] Page 2: short chunk..."));

    // Previews are capped at 150 characters
    let preview_line = output
        .lines()
        .find(|l| l.trim_start().starts_with("[1]"))
        .expect("should print a first source");
    let preview_text = preview_line
        .split(": ")
        .nth(1)
        .expect("source line should have a preview");
    assert!(preview_text.trim_end_matches("...").chars().count() <= 150);
}

#[tokio::test]
async fn interactive_loop_quit_terminates() {
    for quit_word in ["quit", "exit", "q", "QUIT", "Exit"] {
        let store = populated_store(&["content"]).await;
        let llm = Arc::new(ContextualLlm::new());
        let engine = engine_with(
            store,
            llm,
            Arc::new(FakeEmbedder::returning(vec![1.0, 0.0])),
        );

        let mut input = Cursor::new(format!("{}\n", quit_word));
        let mut out = Vec::new();
        engine
            .run_interactive(&mut input, &mut out)
            .await
            .expect("interactive loop should succeed");

        let output = String::from_utf8(out).expect("output should be UTF-8");
        assert!(output.contains("Goodbye!"), "no goodbye for {}", quit_word);
        assert_eq!(output.matches("You: ").count(), 1);
    }
}

#[tokio::test]
async fn interactive_loop_skips_empty_lines() {
    let store = populated_store(&["content"]).await;
    let llm = Arc::new(ContextualLlm::new());
    let engine = engine_with(
        store,
        llm,
        Arc::new(FakeEmbedder::returning(vec![1.0, 0.0])),
    );

    let mut input = Cursor::new("\n   \nquit\n");
    let mut out = Vec::new();
    engine
        .run_interactive(&mut input, &mut out)
        .await
        .expect("interactive loop should succeed");

    let output = String::from_utf8(out).expect("output should be UTF-8");
    // Two empty lines re-prompt, then quit
    assert_eq!(output.matches("You: ").count(), 3);
    assert!(!output.contains("Question:"));
}

#[tokio::test]
async fn interactive_loop_answers_questions() {
    let store = populated_store(&["the universe is change"]).await;
    let llm = Arc::new(ContextualLlm::new());
    let engine = engine_with(
        store,
        llm,
        Arc::new(FakeEmbedder::returning(vec![1.0, 0.0])),
    );

    let mut input = Cursor::new("what is the universe?\nquit\n");
    let mut out = Vec::new();
    engine
        .run_interactive(&mut input, &mut out)
        .await
        .expect("interactive loop should succeed");

    let output = String::from_utf8(out).expect("output should be UTF-8");
    assert!(output.contains("RAG PDF Query System - Interactive Mode"));
    assert!(output.contains("Question: what is the universe?"));
    assert!(output.contains("Answer: The universe is change."));
    assert!(output.contains("Goodbye!"));
}

#[tokio::test]
async fn interactive_loop_survives_a_failing_question() {
    let store = populated_store(&["content"]).await;
    let engine = engine_with(
        store,
        Arc::new(FailingLlm),
        Arc::new(FakeEmbedder::returning(vec![1.0, 0.0])),
    );

    let mut input = Cursor::new("first question\nsecond question\nquit\n");
    let mut out = Vec::new();
    engine
        .run_interactive(&mut input, &mut out)
        .await
        .expect("interactive loop should succeed");

    let output = String::from_utf8(out).expect("output should be UTF-8");
    // Both questions fail, both are isolated, loop still reaches quit
    assert_eq!(output.matches("Error: ").count(), 2);
    assert!(output.contains("Goodbye!"));
    assert_eq!(output.matches("You: ").count(), 3);
}

#[tokio::test]
async fn interactive_loop_ends_at_eof() {
    let store = populated_store(&["content"]).await;
    let llm = Arc::new(ContextualLlm::new());
    let engine = engine_with(
        store,
        llm,
        Arc::new(FakeEmbedder::returning(vec![1.0, 0.0])),
    );

    let mut input = Cursor::new("");
    let mut out = Vec::new();
    engine
        .run_interactive(&mut input, &mut out)
        .await
        .expect("interactive loop should succeed");

    let output = String::from_utf8(out).expect("output should be UTF-8");
    assert_eq!(output.matches("You: ").count(), 1);
}

#[tokio::test]
async fn single_query_returns_answer() {
    let store = populated_store(&["the universe is change"]).await;
    let llm = Arc::new(ContextualLlm::new());
    let engine = engine_with(
        store,
        llm,
        Arc::new(FakeEmbedder::returning(vec![1.0, 0.0])),
    );

    let mut out = Vec::new();
    let answer = engine.single_query("what is the universe?", &mut out).await;

    assert_eq!(answer, Some("The universe is change.".to_string()));
}

#[tokio::test]
async fn single_query_failure_returns_none() {
    let store = populated_store(&["content"]).await;
    let engine = engine_with(
        store,
        Arc::new(ContextualLlm::new()),
        Arc::new(FakeEmbedder::failing()),
    );

    let mut out = Vec::new();
    let answer = engine.single_query("anything", &mut out).await;

    assert_eq!(answer, None);
    let output = String::from_utf8(out).expect("output should be UTF-8");
    assert!(output.contains("Error: "));
}
