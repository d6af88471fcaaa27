//! Index build and status commands

use crate::error::Result;
use crate::service::{GrowthGuide, IndexBuildStats, IndexStatus};
use tracing::info;

pub async fn cmd_index_build(guide: &GrowthGuide, rebuild: bool) -> Result<IndexBuildStats> {
    info!(
        "Building guideline index{}",
        if rebuild { " from scratch" } else { "" }
    );
    guide.build_index(rebuild).await
}

pub fn print_build_stats(stats: &IndexBuildStats) {
    println!("\n✓ Index build complete");
    println!("  Docs: {}", stats.docs_dir.display());
    println!("  Index: {}", stats.persist_dir.display());
    println!("  Collection: {}", stats.collection);
    println!("  Files seen: {}", stats.files_seen);
    println!("  Documents loaded: {}", stats.loaded_docs);
    println!("  Chunks: {}", stats.chunks);
    println!("  Chunks added: {}", stats.chunks_upserted);
    if let Some(note) = &stats.note {
        println!("  ⚠ {}", note);
    }
}

pub async fn cmd_index_status(guide: &GrowthGuide) -> Result<IndexStatus> {
    guide.index_status().await
}

pub fn print_index_status(status: &IndexStatus) {
    println!("\n📊 Guideline index\n");
    println!("Backend: {}", status.backend);
    println!("Collection: {}", status.collection);
    let state = if status.exists {
        "✓ Built"
    } else {
        "⚠ Not built (run 'growthwise index build')"
    };
    println!("Status: {}", state);
    println!("Records: {}", status.records);
    println!("\nDocs directory: {}", status.docs_dir.display());
    println!("Persist directory: {}", status.persist_dir.display());
}
