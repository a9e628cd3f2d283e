//! news-rag command line
//!
//! Run with: cargo run -p news-rag -- ask "What's new in AI?"

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use news_rag::{Article, BackendStatus, NewsRag, RagConfig};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(
    name = "news-rag",
    version,
    about = "Ask questions about indexed news articles"
)]
struct Cli {
    /// TOML configuration file (defaults apply when omitted).
    #[arg(long, global = true, env = "NEWS_RAG_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Index articles from a JSON array or JSON Lines file.
    Ingest {
        /// Path to the article file.
        file: PathBuf,
    },
    /// Answer a question from the indexed articles.
    Ask {
        /// The question.
        query: String,
        /// Number of chunks to retrieve.
        #[arg(short, long)]
        k: Option<usize>,
        /// Print the answer as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Show the chunks most similar to a query.
    Search {
        /// The query text.
        query: String,
        /// Number of chunks to return.
        #[arg(short, long)]
        k: Option<usize>,
    },
    /// Show collection statistics.
    Stats,
    /// Remove every indexed entry.
    Clear,
    /// Check that the generation backend is reachable.
    Check,
}

/// Article as produced by the feed fetcher
#[derive(Debug, Deserialize)]
struct RawArticle {
    title: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    summary: Option<String>,
    source: String,
    url: String,
    #[serde(default)]
    published_at: Option<DateTime<Utc>>,
}

impl From<RawArticle> for Article {
    fn from(raw: RawArticle) -> Self {
        let summary = raw.summary.unwrap_or_default();
        // Feeds without full text still carry a summary worth indexing
        let content = match raw.content {
            Some(content) if !content.trim().is_empty() => content,
            _ => summary.clone(),
        };
        Article::new(raw.title, content, summary, raw.source, raw.url, raw.published_at)
    }
}

/// Articles read from a file, plus records that could not be parsed
#[derive(Debug, Default)]
struct ArticleFile {
    articles: Vec<Article>,
    malformed: usize,
}

impl ArticleFile {
    fn push(&mut self, origin: &str, parsed: serde_json::Result<RawArticle>) {
        match parsed {
            Ok(raw) => self.articles.push(raw.into()),
            Err(e) => {
                tracing::warn!(record = origin, error = %e, "Skipping malformed article");
                self.malformed += 1;
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "news_rag=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = RagConfig::load(cli.config.as_deref()).context("loading configuration")?;

    tracing::info!("Configuration loaded");
    tracing::info!("  - Embedding provider: {:?}", config.embeddings.provider);
    tracing::info!("  - LLM model: {}", config.llm.generate_model);
    tracing::info!("  - Index: {}", config.vector_db.storage_path.display());

    let rag = NewsRag::from_config(config)
        .await
        .context("initializing pipeline")?;

    match cli.command {
        Command::Ingest { file } => {
            let input = read_articles(&file)?;
            let report = rag.index_articles(&input.articles).await?;
            println!(
                "Indexed {} articles ({} chunks, {} stale removed) in {} ms",
                report.articles_indexed,
                report.chunks_indexed,
                report.chunks_pruned,
                report.processing_time_ms
            );
            if input.malformed > 0 {
                println!("  skipped {} malformed records", input.malformed);
            }
            for skipped in &report.skipped {
                println!("  skipped \"{}\": {:?}", skipped.title, skipped.reason);
            }
        }
        Command::Ask { query, k, json } => {
            let answer = rag.answer(&query, k).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&answer)?);
            } else {
                println!("{}\n", answer.text);
                if !answer.sources.is_empty() {
                    println!("Sources:");
                    for source in &answer.sources {
                        println!("  - {}", source.format_inline());
                    }
                }
            }
        }
        Command::Search { query, k } => {
            let hits = rag.search(&query, k).await?;
            if hits.is_empty() {
                println!("No matching chunks.");
            }
            for (i, hit) in hits.iter().enumerate() {
                let meta = &hit.entry.metadata;
                println!(
                    "{}. [{:.3}] {} ({}) chunk {}",
                    i + 1,
                    hit.similarity,
                    meta.title,
                    meta.source,
                    meta.chunk_index
                );
                println!("   {}", preview(&hit.entry.text, 160));
            }
        }
        Command::Stats => {
            let stats = rag.stats().await?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        Command::Clear => {
            let removed = rag.clear().await?;
            println!("Removed {} entries", removed);
        }
        Command::Check => match rag.backend_status().await? {
            BackendStatus::Ready(message) => println!("ready: {}", message),
            status => bail!("{}", status.message()),
        },
    }

    Ok(())
}

/// Read a JSON array or JSON Lines file of articles
fn read_articles(path: &Path) -> Result<ArticleFile> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    parse_articles(&raw).with_context(|| format!("parsing {}", path.display()))
}

/// Parse articles record by record; a bad record never sinks the batch
fn parse_articles(raw: &str) -> Result<ArticleFile> {
    let mut file = ArticleFile::default();

    if raw.trim_start().starts_with('[') {
        let records: Vec<serde_json::Value> = serde_json::from_str(raw)?;
        for (i, record) in records.into_iter().enumerate() {
            file.push(&format!("element {}", i), serde_json::from_value(record));
        }
    } else {
        for (n, line) in raw.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            file.push(&format!("line {}", n + 1), serde_json::from_str(line));
        }
    }

    Ok(file)
}

fn preview(text: &str, max_chars: usize) -> String {
    let flat: String = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max_chars {
        flat
    } else {
        let cut: String = flat.chars().take(max_chars).collect();
        format!("{}...", cut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_content_falls_back_to_summary() {
        let raw = r#"{"title":"Dam opens","content":null,"summary":"The dam opened.","source":"Wire","url":"https://wire.example/dam"}"#;
        let file = parse_articles(raw).unwrap();
        assert_eq!(file.malformed, 0);
        assert_eq!(file.articles[0].content, "The dam opened.");
    }

    #[test]
    fn test_bad_line_does_not_drop_the_batch() {
        let raw = [
            r#"{"title":"Good","content":"Body text.","source":"Wire","url":"https://wire.example/good"}"#,
            r#"{"title":"No url","content":"Body text.","source":"Wire"}"#,
            "not json at all",
            "",
            r#"{"title":"Also good","content":null,"source":"Wire","url":"https://wire.example/also"}"#,
        ]
        .join("\n");

        let file = parse_articles(&raw).unwrap();
        assert_eq!(file.malformed, 2);
        let titles: Vec<&str> = file.articles.iter().map(|a| a.title.as_str()).collect();
        assert_eq!(titles, vec!["Good", "Also good"]);
        // Null content and no summary stays empty and is skipped at indexing
        assert!(file.articles[1].content.is_empty());
    }

    #[test]
    fn test_array_skips_malformed_elements() {
        let raw = r#"[
            {"title":"Kept","content":"Body.","source":"Wire","url":"https://wire.example/kept"},
            {"title":42,"content":"Body.","source":"Wire","url":"https://wire.example/bad"}
        ]"#;
        let file = parse_articles(raw).unwrap();
        assert_eq!(file.articles.len(), 1);
        assert_eq!(file.malformed, 1);
    }

    #[test]
    fn test_unparseable_array_is_an_error() {
        assert!(parse_articles("[{").is_err());
    }
}
