use std::process::ExitCode;
use std::sync::Arc;

use inbox_digest::artifact::MarkdownWriter;
use inbox_digest::config::Config;
use inbox_digest::filter::RecipientFilterSet;
use inbox_digest::ledger::{Database, ProcessedLedger};
use inbox_digest::mail;
use inbox_digest::pipeline::{IngestPipeline, RunOptions};
use inbox_digest::report::HtmlReport;
use inbox_digest::summarizer::create_summarizer;

enum Command {
    Process { unread_only: bool, prune: bool },
    Prune,
    Stats,
    Reset,
}

fn parse_args() -> Result<Command, String> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let mut command = None;
    let mut unread_only = false;
    let mut prune_flag = false;

    for arg in &args {
        match arg.as_str() {
            "process" | "prune" | "stats" | "reset" => {
                if command.replace(arg.clone()).is_some() {
                    return Err(format!("unexpected extra command {arg:?}"));
                }
            }
            "--unread" => unread_only = true,
            "--prune" => prune_flag = true,
            other => return Err(format!("unknown argument {other:?}")),
        }
    }

    match command.as_deref().unwrap_or("process") {
        "process" => Ok(Command::Process {
            unread_only,
            prune: prune_flag,
        }),
        "prune" if !unread_only && !prune_flag => Ok(Command::Prune),
        "stats" if !unread_only && !prune_flag => Ok(Command::Stats),
        "reset" if !unread_only && !prune_flag => Ok(Command::Reset),
        other => Err(format!("{other} takes no flags")),
    }
}

fn usage() {
    eprintln!("Usage: inbox-digest [process [--unread] [--prune] | prune | stats | reset]");
    eprintln!("  process   Search, summarize and record new messages (default)");
    eprintln!("            --unread  restrict the search to unread messages");
    eprintln!("            --prune   delete each message after it is recorded");
    eprintln!("  prune     Delete every mailbox message the ledger has recorded");
    eprintln!("  stats     Print the number of processed messages");
    eprintln!("  reset     Clear the ledger (messages will be reprocessed)");
}

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let command = match parse_args() {
        Ok(command) => command,
        Err(e) => {
            eprintln!("Error: {e}");
            usage();
            return ExitCode::FAILURE;
        }
    };

    match run(command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Command) -> inbox_digest::Result<()> {
    let config = Config::from_env()?;

    let db = Arc::new(Database::open(&config.ledger_path)?);
    let ledger = ProcessedLedger::new(db);

    // Ledger-only commands skip the mailbox and LLM entirely.
    match command {
        Command::Stats => {
            let count = ledger.count()?;
            println!("{count} messages processed");
            println!("Ledger: {}", config.ledger_path.display());
            return Ok(());
        }
        Command::Reset => {
            let count = ledger.count()?;
            ledger.clear()?;
            println!("Cleared {count} ledger records");
            return Ok(());
        }
        _ => {}
    }

    eprintln!("inbox-digest v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("  Mailbox:    {}@{} ({})", config.imap.username, config.imap.host, config.imap.folder);
    eprintln!("  Recipients: {}", config.imap.recipient_filters);
    eprintln!("  Ledger:     {}", config.ledger_path.display());
    eprintln!("  Summaries:  {}", config.summaries_dir.display());

    let filters = RecipientFilterSet::parse(&config.imap.recipient_filters);
    let summarizer = create_summarizer(&config.llm)?;
    let artifacts = Arc::new(MarkdownWriter::new(&config.summaries_dir));
    let report = Arc::new(HtmlReport::new(&config.summaries_dir));

    let pipeline = IngestPipeline::new(
        ledger,
        filters,
        summarizer,
        artifacts,
        Some(report),
        config.imap.max_candidates,
    );

    let mut session = mail::connect(&config.imap).await?;

    match command {
        Command::Process { unread_only, prune } => {
            let outcome = pipeline
                .execute(&mut session, RunOptions { unread_only, prune })
                .await?;
            println!(
                "Processed {} of {} candidates ({} duplicates, {} failed)",
                outcome.processed, outcome.candidates, outcome.duplicates, outcome.failed
            );
            if prune {
                println!("Pruned {} messages", outcome.pruned);
            }
        }
        Command::Prune => {
            let flagged = pipeline.prune_all(&mut session).await?;
            println!("Pruned {flagged} messages");
        }
        Command::Stats | Command::Reset => unreachable!("handled above"),
    }

    Ok(())
}
