use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use console::style;
use dialoguer::Input;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{error, info, warn};

use crate::config::Config;
use crate::documents::load_documents;
use crate::embeddings::{EmbeddingCache, EmbeddingProvider, OllamaClient};
use crate::faq::{Confidence, FaqMatcher};
use crate::index::SearchResult;
use crate::orchestrator::{Answer, AnswerSource, Orchestrator};

/// Outcome of answering a batch of questions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AskSummary {
    pub answered: usize,
    pub failed: usize,
}

/// Load the FAQ table with the configured candidacy threshold
#[inline]
pub fn load_faq(config: &Config) -> FaqMatcher {
    FaqMatcher::load(&config.faq_path())
        .with_candidacy_threshold(config.retrieval.faq_candidacy_threshold)
}

/// Load documents, embed the corpus and wire up the Ollama providers.
///
/// Fails when the primary documentation cannot be read or the corpus cannot be embedded.
#[inline]
pub fn build_orchestrator(config: &Config) -> crate::Result<Orchestrator> {
    let mode = config.retrieval.mode;
    let documents = load_documents(&config.documents)?;
    let client = Arc::new(
        OllamaClient::new(&config.ollama)
            .context("Failed to create Ollama client")?
            .with_profile(&mode.profile()),
    );

    let spinner = spinner(format!(
        "Embedding {} documents with {} ({} mode)",
        documents.len(),
        config.ollama.embedding_model,
        mode
    ));

    let orchestrator = Orchestrator::build(
        mode,
        load_faq(config),
        &documents,
        EmbeddingCache::load_all(config.cache_path()),
        Arc::clone(&client) as Arc<dyn EmbeddingProvider>,
        client,
    );
    spinner.finish_and_clear();

    Ok(orchestrator?.with_acceptance_threshold(config.retrieval.faq_acceptance_threshold))
}

/// Answer every question in turn; a failed question does not stop the rest
#[inline]
pub fn answer_questions<S: AsRef<str>>(orchestrator: &Orchestrator, questions: &[S]) -> AskSummary {
    let mut summary = AskSummary::default();

    for question in questions {
        let question = question.as_ref();
        if question.trim().is_empty() {
            warn!("Skipping blank question");
            continue;
        }
        eprintln!("{} {}", style("❓").bold(), style(question).bold());

        match orchestrator.ask(question) {
            Ok(answer) => {
                print_answer(&answer);
                summary.answered += 1;
            }
            Err(e) => {
                error!("Failed to answer '{}': {}", question, e);
                eprintln!("{} {}", style("❌ Error processing question:").red(), e);
                summary.failed += 1;
            }
        }
        eprintln!();
    }

    info!(
        "Answered {} questions, {} failed",
        summary.answered, summary.failed
    );
    summary
}

/// Answer questions given on the command line
#[inline]
pub fn ask(config: &Config, questions: &[String]) -> crate::Result<()> {
    let orchestrator = build_orchestrator(config)?;
    let summary = answer_questions(&orchestrator, questions);

    if summary.failed > 0 {
        warn!("{} of {} questions failed", summary.failed, questions.len());
    }
    Ok(())
}

/// Interactive question loop until `exit` or `quit`
#[inline]
pub fn chat(config: &Config) -> crate::Result<()> {
    let orchestrator = build_orchestrator(config)?;

    eprintln!(
        "{}",
        style(format!(
            "💬 Ask about the documentation ({} mode). Type 'exit' to leave.",
            orchestrator.mode()
        ))
        .bold()
        .cyan()
    );

    loop {
        let line: String = Input::new()
            .with_prompt("Question")
            .allow_empty(true)
            .interact_text()
            .context("Failed to read question")?;
        let question = line.trim();

        if question.is_empty() {
            continue;
        }
        if question.eq_ignore_ascii_case("exit") || question.eq_ignore_ascii_case("quit") {
            break;
        }

        answer_questions(&orchestrator, &[question]);
    }

    eprintln!("{}", style("👋 Goodbye").cyan());
    Ok(())
}

/// Print the retrieved chunks for a question without generating an answer
#[inline]
pub fn search(config: &Config, question: &str) -> crate::Result<()> {
    let orchestrator = build_orchestrator(config)?;
    let results = orchestrator.retrieve(question)?;

    if results.is_empty() {
        println!("No indexed content to search.");
        return Ok(());
    }

    println!("Top {} chunks for: {}", results.len(), question);
    println!();
    for (rank, result) in results.iter().enumerate() {
        println!(
            "{}",
            style(format!(
                "#{} [{:.3}] {}",
                rank + 1,
                result.similarity_score,
                result.record.source
            ))
            .bold()
        );
        println!("{}", result.record.text);
        println!();
    }

    Ok(())
}

/// Show how a question scores against the FAQ table
#[inline]
pub fn faq(config: &Config, question: &str) -> crate::Result<()> {
    let matcher = load_faq(config);

    if matcher.is_empty() {
        println!(
            "No FAQ categories loaded from {}",
            config.faq_path().display()
        );
        return Ok(());
    }

    let Some(instant) = matcher.instant_answer(question) else {
        println!("No FAQ candidate for: {}", question);
        return Ok(());
    };

    let accepted = instant.score() > config.retrieval.faq_acceptance_threshold;
    let result = &instant.result;
    println!("Category: {}", style(&result.category).cyan());
    println!("Matched question: {}", result.matched_question);
    println!(
        "Score: {:.3} ({}, {})",
        instant.score(),
        match instant.confidence {
            Confidence::High => "high confidence",
            Confidence::Partial => "partial match",
        },
        if accepted {
            style("accepted").green()
        } else {
            style("below acceptance threshold").yellow()
        }
    );
    println!("Answer: {}", result.answer);
    if let Some(command) = &result.command {
        println!("Command: {}", style(command).cyan());
    }

    Ok(())
}

fn print_answer(answer: &Answer) {
    match &answer.source {
        AnswerSource::Faq(instant) => {
            println!("{} {}", style("⚡").yellow(), answer.text);
            if let Some(command) = &instant.result.command {
                let note = if instant.result.executable {
                    "run"
                } else {
                    "see"
                };
                println!("   {}: {}", note, style(command).cyan());
            }
            println!(
                "   {}",
                style(format!(
                    "(FAQ '{}', score {:.2})",
                    instant.result.category,
                    instant.score()
                ))
                .dim()
            );
        }
        AnswerSource::Retrieval { context } => {
            println!("{} {}", style("🤖").cyan(), answer.text);
            print_sources(context);
        }
    }
}

fn print_sources(results: &[SearchResult]) {
    for result in results {
        println!(
            "   {}",
            style(format!(
                "{} ({}, {:.3})",
                result.record.source, result.record.kind, result.similarity_score
            ))
            .dim()
        );
    }
}

fn spinner(message: String) -> ProgressBar {
    let bar = if console::user_attended_stderr() {
        ProgressBar::new_spinner().with_style(
            ProgressStyle::with_template("{spinner} {msg} [{elapsed}]")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        )
    } else {
        ProgressBar::hidden()
    };
    bar.set_message(message);
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}
