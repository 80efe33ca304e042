//! Ask a question

use mathroute_core::{error::Result, Session};

use super::helpers::{load_agent, print_json, save_agent, GlobalOpts};

/// Handle ask command
pub async fn handle(question: String, format: String, opts: &GlobalOpts) -> Result<()> {
    let (agent, state_path) = load_agent(opts)?;

    let session = agent.ask(&question).await?;
    save_agent(&agent, &state_path).await?;

    if format == "json" {
        return print_json(&session);
    }
    print_session(&session);
    Ok(())
}

fn print_session(session: &Session) {
    let decision = &session.routing_decision;
    let solution = &session.solution;

    println!("Session:  {}", session.id);
    println!(
        "Topic:    {} (complexity {:.2})",
        session.question.topic(),
        session.question.complexity()
    );
    println!(
        "Source:   {} ({}, confidence {:.2})",
        decision.chosen_source, decision.reasoning, solution.confidence
    );
    println!();

    if !solution.steps.is_empty() {
        println!("Steps:");
        for (i, step) in solution.steps.iter().enumerate() {
            println!("  {}. {}", i + 1, step);
        }
        println!();
    }

    println!("Answer:   {}", solution.answer);
    println!("{}", solution.explanation);

    let warnings: Vec<&String> = session
        .input_warnings
        .iter()
        .chain(solution.warnings.iter())
        .collect();
    if !warnings.is_empty() {
        println!();
        for warning in warnings {
            println!("  ⚠ {}", warning);
        }
    }

    println!();
    println!(
        "Rate this answer: mathroute feedback {} <1-5>",
        session.id
    );
}
