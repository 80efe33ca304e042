//! Knowledge base inspection

use clap::Subcommand;
use mathroute_core::{analysis::QueryAnalyzer, error::Result, InMemoryKnowledgeBase};

use super::helpers::{load_config, GlobalOpts};

#[derive(Subcommand)]
pub enum KbAction {
    /// Search the knowledge base without routing
    Search {
        /// Question text
        query: String,

        /// Maximum results
        #[arg(short, long, default_value = "5")]
        limit: usize,
    },

    /// List all entries
    List,
}

/// Handle knowledge base command
pub async fn handle(action: KbAction, opts: &GlobalOpts) -> Result<()> {
    let config = load_config(opts)?;
    let min_relevance = config.knowledge_base.min_relevance;
    let kb = match &config.knowledge_base.dataset_path {
        Some(path) => InMemoryKnowledgeBase::from_file(path, min_relevance)?,
        None => InMemoryKnowledgeBase::seeded(min_relevance),
    };

    match action {
        KbAction::Search { query, limit } => {
            let analyzer = QueryAnalyzer::new(&config.analysis.topic_rules)?;
            let topic = analyzer.classify(&query);
            let hits = kb.search_ranked(&query, Some(topic), limit);

            if hits.is_empty() {
                println!("No entries above relevance {:.2}", min_relevance);
                return Ok(());
            }
            for hit in hits {
                println!(
                    "{:.3}  {:<10} {}",
                    hit.score, hit.entry.id, hit.entry.question
                );
            }
        }
        KbAction::List => {
            println!("{} entries", kb.len());
            for entry in kb.entries() {
                println!(
                    "  {:<10} {:<15} {:<13} {}",
                    entry.id,
                    entry.topic.to_string(),
                    entry.difficulty,
                    entry.question
                );
            }
        }
    }
    Ok(())
}
