//! System-prompt assembly for grounded chat turns.

/// Default retrieval-augmented instructions, used when the caller supplies
/// no custom prompt.
pub const DEFAULT_RAG_PROMPT: &str = "You are a reading assistant answering questions about \
the web page the user is currently viewing. Ground every answer in the page context below. \
If the context does not contain the answer, say so instead of guessing. \
Answer in the language of the user's question.";

/// Assemble the full system prompt in the fixed textual layout:
/// instructions, then `Page Context:`, then `Page URL:`.
///
/// A custom prompt replaces the default instructions; the context and URL
/// sections are always appended.
#[must_use]
pub fn assemble(custom_prompt: Option<&str>, context: &str, page_url: &str) -> String {
    format!(
        "{}\nPage Context:\n{}\nPage URL: {}",
        custom_prompt.unwrap_or(DEFAULT_RAG_PROMPT),
        context,
        page_url
    )
}
