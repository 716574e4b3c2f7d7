// Query engine
// Retrieval-augmented answering over a populated vector store

#[cfg(test)]
mod tests;

use std::io::{BufRead, Write};
use std::sync::Arc;

use tracing::debug;

use crate::Result;
use crate::database::{ScoredChunk, VectorIndex};
use crate::embeddings::Embedder;

/// Capability seam for answer generation.
///
/// The network-backed implementation is
/// [`crate::embeddings::ollama::OllamaClient`]; tests use in-memory fakes.
pub trait LanguageModel: Send + Sync {
    fn complete(&self, prompt: &str) -> Result<String>;
}

/// Prompt contract: answer only from the supplied context, admit not
/// knowing, cap the answer at three sentences, keep it concise
pub const PROMPT_TEMPLATE: &str = "\
Answer the question based only on the following context.
If you don't know the answer, just say that you don't know, don't try to make up an answer.
Use three sentences maximum and keep the answer as concise as possible.

Context: {context}

Question: {question}

Answer:";

const PREVIEW_CHARS: usize = 150;
const RULE_WIDTH: usize = 80;

/// Render the prompt template over `{context, question}`
#[inline]
pub fn render_prompt(context: &str, question: &str) -> String {
    PROMPT_TEMPLATE
        .replace("{context}", context)
        .replace("{question}", question)
}

/// Concatenate retrieved chunk texts, double-newline separated
#[inline]
pub fn format_context(chunks: &[ScoredChunk]) -> String {
    chunks
        .iter()
        .map(|c| c.content.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn preview(text: &str) -> String {
    text.chars()
        .take(PREVIEW_CHARS)
        .map(|c| if c == '\n' { ' ' } else { c })
        .collect()
}

/// Answers questions by retrieving the nearest chunks and prompting a
/// language model with them
pub struct QueryEngine {
    embedder: Arc<dyn Embedder>,
    llm: Arc<dyn LanguageModel>,
    store: Box<dyn VectorIndex>,
    top_k: usize,
}

impl QueryEngine {
    #[inline]
    pub fn new(
        embedder: Arc<dyn Embedder>,
        llm: Arc<dyn LanguageModel>,
        store: Box<dyn VectorIndex>,
        top_k: usize,
    ) -> Self {
        Self {
            embedder,
            llm,
            store,
            top_k,
        }
    }

    /// Answer a question from the indexed document.
    ///
    /// Returns the generated answer plus the retrieved source chunks, ranked
    /// best-first. Retrieves `top_k` chunks, or fewer when the store holds
    /// fewer.
    #[inline]
    pub async fn ask(&self, question: &str) -> Result<(String, Vec<ScoredChunk>)> {
        debug!("Answering question: {}", question);

        let query_vector = self.embedder.embed(question)?;
        let sources = self.store.search(&query_vector, self.top_k).await?;

        let context = format_context(&sources);
        let prompt = render_prompt(&context, question);
        let answer = self.llm.complete(&prompt)?;

        debug!("Generated answer from {} source chunks", sources.len());
        Ok((answer, sources))
    }

    /// Answer a question and print the answer plus source information
    #[inline]
    pub async fn ask_with_sources<W: Write>(&self, question: &str, out: &mut W) -> Result<String> {
        writeln!(out)?;
        writeln!(out, "Question: {}", question)?;
        writeln!(out, "{}", "-".repeat(RULE_WIDTH))?;

        let (answer, sources) = self.ask(question).await?;

        writeln!(out, "Answer: {}", answer)?;
        writeln!(out)?;

        if !sources.is_empty() {
            writeln!(out, "Sources:")?;
            for (i, chunk) in sources.iter().enumerate() {
                writeln!(
                    out,
                    "  [{}] Page {}: {}...",
                    i + 1,
                    chunk.page_number,
                    preview(&chunk.content)
                )?;
            }
        }

        writeln!(out, "{}", "-".repeat(RULE_WIDTH))?;

        Ok(answer)
    }

    /// Blocking read-loop on `input`; each non-empty line is a question.
    ///
    /// `quit`/`exit`/`q` (case-insensitive) or end of input terminates the
    /// loop. An error while answering one question is printed and the loop
    /// continues; a single bad query never ends the session.
    #[inline]
    pub async fn run_interactive<R: BufRead, W: Write>(
        &self,
        input: &mut R,
        out: &mut W,
    ) -> Result<()> {
        writeln!(out, "{}", "=".repeat(RULE_WIDTH))?;
        writeln!(out, "RAG PDF Query System - Interactive Mode")?;
        writeln!(out, "{}", "=".repeat(RULE_WIDTH))?;
        writeln!(out, "Type your questions below. Type 'quit' or 'exit' to stop.")?;
        writeln!(out)?;

        loop {
            write!(out, "You: ")?;
            out.flush()?;

            let mut line = String::new();
            if input.read_line(&mut line)? == 0 {
                break;
            }

            let question = line.trim();

            if matches!(question.to_lowercase().as_str(), "quit" | "exit" | "q") {
                writeln!(out, "Goodbye!")?;
                break;
            }

            if question.is_empty() {
                continue;
            }

            if let Err(e) = self.ask_with_sources(question, out).await {
                writeln!(out, "Error: {}", e)?;
            }
        }

        Ok(())
    }

    /// Answer exactly one question non-interactively.
    ///
    /// Returns the answer, or `None` after printing the error on failure.
    #[inline]
    pub async fn single_query<W: Write>(&self, question: &str, out: &mut W) -> Option<String> {
        match self.ask_with_sources(question, out).await {
            Ok(answer) => Some(answer),
            Err(e) => {
                let _ = writeln!(out, "Error: {}", e);
                None
            }
        }
    }
}
