//! Learning insights report

use mathroute_core::{error::Result, LearningInsights, Trend};

use super::helpers::{load_agent, print_json, GlobalOpts};

/// Handle insights command
pub async fn handle(format: String, opts: &GlobalOpts) -> Result<()> {
    let (agent, _) = load_agent(opts)?;
    let insights = agent.get_insights().await?;

    if format == "json" {
        return print_json(&insights);
    }
    print_insights(&insights);
    Ok(())
}

fn print_insights(insights: &LearningInsights) {
    println!("Interactions: {}", insights.total_interactions);
    println!("Feedback:     {}", insights.feedback_count);
    match insights.average_rating {
        Some(avg) => println!("Avg rating:   {:.2}", avg),
        None => println!("Avg rating:   -"),
    }

    if !insights.rating_distribution.is_empty() {
        let dist: Vec<String> = insights
            .rating_distribution
            .iter()
            .map(|(rating, count)| format!("{}★ {}", rating, count))
            .collect();
        println!("Ratings:      {}", dist.join("  "));
    }

    println!();
    println!("Source usage:");
    for usage in &insights.source_usage {
        println!("  {:<16} {}", usage.source.to_string(), usage.count);
    }

    if !insights.buckets.is_empty() {
        println!();
        println!(
            "  {:<16} {:<16} {:>5} {:>7} {:>7} {:>7}",
            "topic", "source", "n", "rating", "conf", "adj"
        );
        for b in &insights.buckets {
            println!(
                "  {:<16} {:<16} {:>5} {:>7.2} {:>7.2} {:>+7.3}",
                b.topic.to_string(),
                b.source.to_string(),
                b.count,
                b.avg_rating,
                b.avg_confidence,
                b.threshold_adjustment
            );
        }
    }

    if !insights.common_improvements.is_empty() {
        println!();
        println!("Common improvements:");
        for tag in &insights.common_improvements {
            println!("  {} ({})", tag.tag, tag.count);
        }
    }

    if let Some(eval) = &insights.evaluation {
        println!();
        println!(
            "Evaluations ({}): accuracy {:.2}, clarity {:.2}, completeness {:.2}",
            eval.samples, eval.accuracy, eval.clarity, eval.completeness
        );
    }

    println!();
    match &insights.trend {
        Trend::InsufficientData => println!("Trend: insufficient data"),
        Trend::Improving { recent, previous } => {
            println!("Trend: improving ({:.2} -> {:.2})", previous, recent)
        }
        Trend::Declining { recent, previous } => {
            println!("Trend: declining ({:.2} -> {:.2})", previous, recent)
        }
        Trend::Stable { recent, .. } => println!("Trend: stable ({:.2})", recent),
    }
}
