//! Query command implementation

use crate::error::Result;
use crate::service::GrowthGuide;
use crate::store::ScoredChunk;
use serde::Serialize;
use tracing::info;

/// Retrieval results for one query
#[derive(Debug, Clone, Serialize)]
pub struct QueryResult {
    pub query: String,
    pub results: Vec<ScoredChunk>,
}

pub async fn cmd_query(guide: &GrowthGuide, query: &str, limit: Option<usize>) -> Result<QueryResult> {
    let k = limit.unwrap_or(guide.config().rag.top_k);
    let results = guide.query(query, k).await?;
    info!("Returning {} results", results.len());

    Ok(QueryResult {
        query: query.to_string(),
        results,
    })
}

/// Print query results to console
pub fn print_query_results(result: &QueryResult) {
    println!("\n🔍 Query: {}\n", result.query);
    println!("Found {} results:\n", result.results.len());

    for (i, r) in result.results.iter().enumerate() {
        println!("{}. [score: {:.3}] {}", i + 1, r.score, r.chunk.citation());
        println!("   {}\n", preview(&r.chunk.text, 200));
    }
}

fn preview(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        let head: String = text.chars().take(max_chars).collect();
        format!("{}...", head.trim_end())
    } else {
        text.to_string()
    }
}
