//! Prompt templates for news question answering

use crate::types::ScoredEntry;

/// Prompt builder for grounded news answers
pub struct PromptBuilder;

impl PromptBuilder {
    /// Build the context block from retrieval hits, in the order given
    pub fn build_context(hits: &[ScoredEntry]) -> String {
        hits.iter()
            .enumerate()
            .map(|(i, hit)| {
                let meta = &hit.entry.metadata;
                let date = meta.published_label();
                format!(
                    "[Article {}]\nTitle: {}\nSource: {}\nDate: {}\nURL: {}\nContent: {}\n",
                    i + 1,
                    meta.title,
                    meta.source,
                    if date.is_empty() { "unknown" } else { date.as_str() },
                    meta.url,
                    hit.entry.text
                )
            })
            .collect::<Vec<_>>()
            .join("\n---\n")
    }

    /// Build the full prompt for a question
    pub fn build_news_prompt(question: &str, context: &str) -> String {
        format!(
            r#"You are a news analyst assistant. You answer questions using ONLY the news articles provided below.

CONTEXT (Retrieved News Articles):
{context}

USER QUESTION: {question}

INSTRUCTIONS:
1. Base every statement on the articles above; never add facts that are not in them
2. Synthesize information across sources when several articles cover the question
3. Cite the source of each key fact, e.g. (Source: BBC World, "Article title")
4. If the articles do not contain enough information, say so plainly instead of guessing
5. Use bullet points for key facts when appropriate

ANSWER:"#,
            context = context,
            question = question
        )
    }
}
