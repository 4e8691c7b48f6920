//! SynthBio - GraphRAG query gateway CLI
//!
//! The `synthbio` command talks to a running `synthbiod`, or to the engine
//! directly.
//!
//! ## Commands
//!
//! - `query`: ask one question through the gateway
//! - `chat`: ask questions line by line from stdin
//! - `ask`: run the engine locally, bypassing HTTP
//! - `prepare`: convert PMC XML articles into engine input text

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use synthbio_client::transport::DEFAULT_API_URL;
use synthbio_client::{
    citation_label, render_state, QueryClient, QuerySession, RequestState,
};
use synthbio_core::{Answer, Citation, Query};
use synthbio_corpus::{prepare_dir, PrepareReport, TableFormat};
use synthbio_engine::{CliEngine, QueryService};
use synthbiod::EngineArgs;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, Level};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "synthbio")]
#[command(author = "SynthBio Researcher Team")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Query a GraphRAG index over the SynthBio corpus", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask one question through the gateway
    Query {
        /// The question
        question: String,

        /// Gateway base URL
        #[arg(long, env = "SYNTHBIO_API_URL", default_value = DEFAULT_API_URL)]
        server: String,
    },

    /// Ask questions interactively, one per line
    Chat {
        /// Gateway base URL
        #[arg(long, env = "SYNTHBIO_API_URL", default_value = DEFAULT_API_URL)]
        server: String,
    },

    /// Run the engine directly and print a smoke-test report
    Ask {
        /// The question
        #[arg(short, long)]
        query: String,

        /// Community level in the report hierarchy
        #[arg(long)]
        community_level: Option<u32>,

        /// Disable dynamic community selection (global search)
        #[arg(long)]
        no_dynamic: bool,

        #[command(flatten)]
        engine: EngineArgs,
    },

    /// Convert PMC JATS XML articles into plain-text engine input
    Prepare {
        /// Directory containing .xml files
        #[arg(long)]
        source: PathBuf,

        /// Destination directory for .txt outputs
        #[arg(long)]
        dest: PathBuf,

        /// Table layout: markdown, tsv or csv
        #[arg(long, default_value = "markdown")]
        table_format: TableFormat,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::WARN
    };
    synthbio_core::init_tracing(cli.json, level);

    match cli.command {
        Commands::Query { question, server } => cmd_query(&server, &question).await,
        Commands::Chat { server } => cmd_chat(&server).await,
        Commands::Ask {
            query,
            community_level,
            no_dynamic,
            engine,
        } => cmd_ask(&engine, &query, community_level, !no_dynamic).await,
        Commands::Prepare {
            source,
            dest,
            table_format,
        } => cmd_prepare(&source, &dest, table_format),
    }
}

/// Submit one question through a session and wait for its resolution.
async fn run_submission(
    client: &QueryClient,
    session: &mut QuerySession,
    question: &str,
) -> Result<()> {
    let ticket = session.begin(question)?;
    let outcome = client.query(question).await;
    session.resolve(ticket, outcome);
    if let RequestState::Success(answer) = session.state() {
        if let Some(run_dir) = answer.run_dir.as_deref() {
            debug!(run_dir, "answer produced");
        }
    }
    Ok(())
}

async fn cmd_query(server: &str, question: &str) -> Result<()> {
    let client = QueryClient::new(server).context("Failed to create HTTP client")?;
    let mut session = QuerySession::new();

    run_submission(&client, &mut session, question).await?;
    match session.state() {
        RequestState::Error(message) => bail!("{message}"),
        state => {
            println!("{}", render_state(state));
            Ok(())
        }
    }
}

async fn cmd_chat(server: &str) -> Result<()> {
    let client = QueryClient::new(server).context("Failed to create HTTP client")?;
    if !client.health().await {
        eprintln!("✗ {} is not answering /health", client.base_url());
    }
    let mut session = QuerySession::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("Connected to {}. One question per line, Ctrl-D to exit.", client.base_url());
    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        run_submission(&client, &mut session, &line).await?;
        println!("{}", render_state(session.state()));
        println!();
    }
    Ok(())
}

async fn cmd_ask(
    args: &EngineArgs,
    question: &str,
    community_level: Option<u32>,
    dynamic: bool,
) -> Result<()> {
    let config = args.engine_config();
    let policy = config.citation_policy;
    let timeout_secs = config.timeout_secs;
    let engine = CliEngine::new(config);
    let workspace = engine
        .resolve_workspace()
        .context("Failed to resolve GraphRAG project")?;

    let mut query = Query::new(question)?.with_dynamic_selection(dynamic);
    if let Some(level) = community_level {
        query = query.with_community_level(level);
    }

    println!("Root:    {}", workspace.root.display());
    println!("Method:  {}", args.method);

    let service = QueryService::new(Arc::new(engine), policy, timeout_secs);
    let request_id = Uuid::new_v4().to_string();
    let answer = service.answer(&request_id, &query).await?;

    print!("{}", format_smoke_report(&answer, policy.limit));
    Ok(())
}

fn cmd_prepare(source: &Path, dest: &Path, format: TableFormat) -> Result<()> {
    let report = prepare_dir(source, dest, format).context("Failed to prepare corpus")?;
    print!("{}", format_prepare_report(&report, dest));
    Ok(())
}

fn format_prepare_report(report: &PrepareReport, dest: &Path) -> String {
    let mut out = String::new();
    for (path, error) in &report.failed {
        out.push_str(&format!("✗ {}: {error}\n", path.display()));
    }
    out.push_str(&format!(
        "✓ Converted {} XML file(s) -> {}\n",
        report.converted(),
        dest.display()
    ));
    out
}

fn format_smoke_report(answer: &Answer, limit: usize) -> String {
    let mut out = String::new();
    out.push_str("\n=== Answer ===\n");
    out.push_str(answer.answer.trim());
    out.push_str("\n\n");
    out.push_str(&format!(
        "Run dir: {}\n",
        answer.run_dir.as_deref().unwrap_or("-")
    ));
    let shown = if limit == 0 {
        "all".to_string()
    } else {
        format!("top {limit}")
    };
    out.push_str(&format!(
        "Citations ({shown} shown): {}\n",
        answer.citations.len()
    ));
    for citation in &answer.citations {
        out.push_str(&format_citation_line(citation));
        out.push('\n');
    }
    out
}

fn format_citation_line(citation: &Citation) -> String {
    let rank = citation
        .rank
        .map(|r| r.to_string())
        .unwrap_or_else(|| "-".to_string());
    format!(
        " - [{}] rank={} :: {}",
        citation.id,
        rank,
        citation_label(citation)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_query_command() {
        let cli = Cli::try_parse_from([
            "synthbio",
            "query",
            "What therapies are discussed?",
            "--server",
            "http://gateway:5000",
        ])
        .unwrap();
        match cli.command {
            Commands::Query { question, server } => {
                assert_eq!(question, "What therapies are discussed?");
                assert_eq!(server, "http://gateway:5000");
            }
            _ => panic!("expected query command"),
        }
    }

    #[test]
    fn test_parse_ask_command() {
        let cli = Cli::try_parse_from([
            "synthbio",
            "-v",
            "ask",
            "-q",
            "CRISPR?",
            "--method",
            "local",
            "--community-level",
            "2",
            "--no-dynamic",
        ])
        .unwrap();
        assert!(cli.verbose);
        match cli.command {
            Commands::Ask {
                query,
                community_level,
                no_dynamic,
                engine,
            } => {
                assert_eq!(query, "CRISPR?");
                assert_eq!(community_level, Some(2));
                assert!(no_dynamic);
                assert_eq!(engine.method.name(), "local");
            }
            _ => panic!("expected ask command"),
        }
    }

    #[test]
    fn test_parse_prepare_command() {
        let cli = Cli::try_parse_from([
            "synthbio",
            "prepare",
            "--source",
            "PMCFiles",
            "--dest",
            "rag/input",
            "--table-format",
            "tsv",
        ])
        .unwrap();
        match cli.command {
            Commands::Prepare {
                source,
                dest,
                table_format,
            } => {
                assert_eq!(source, PathBuf::from("PMCFiles"));
                assert_eq!(dest, PathBuf::from("rag/input"));
                assert_eq!(table_format, TableFormat::Tsv);
            }
            _ => panic!("expected prepare command"),
        }

        let cli = Cli::try_parse_from(["synthbio", "prepare", "--source", "a", "--dest", "b"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Prepare { table_format: TableFormat::Markdown, .. }
        ));
        assert!(Cli::try_parse_from([
            "synthbio", "prepare", "--source", "a", "--dest", "b", "--table-format", "xlsx"
        ])
        .is_err());
    }

    #[test]
    fn test_prepare_report_output() {
        let src = tempfile::tempdir().unwrap();
        let dest = tempfile::tempdir().unwrap();
        std::fs::write(
            src.path().join("PMC1.xml"),
            "<article><front><article-meta><title-group><article-title>T</article-title></title-group></article-meta></front></article>",
        )
        .unwrap();
        std::fs::write(src.path().join("bad.xml"), "<article>").unwrap();

        let report = prepare_dir(src.path(), dest.path(), TableFormat::Markdown).unwrap();
        let out = format_prepare_report(&report, dest.path());
        assert!(out.starts_with("✗ "));
        assert!(out.contains("bad.xml: malformed XML"));
        assert!(out.ends_with(&format!(
            "✓ Converted 1 XML file(s) -> {}\n",
            dest.path().display()
        )));
    }

    #[test]
    fn test_citation_line_format() {
        let line = format_citation_line(&Citation::new("12").with_title("CRISPR trials").with_rank(3.5));
        assert_eq!(line, " - [12] rank=3.5 :: CRISPR trials");

        let line = format_citation_line(&Citation::new("4"));
        assert_eq!(line, " - [4] rank=- :: Report 4");
    }

    #[test]
    fn test_smoke_report_layout() {
        let answer = Answer::new("Gene therapy.\n")
            .with_citations(vec![Citation::new("1").with_rank(1.0)])
            .with_run_dir("output/run-1");
        let report = format_smoke_report(&answer, 5);
        assert!(report.contains("=== Answer ===\nGene therapy.\n"));
        assert!(report.contains("Run dir: output/run-1"));
        assert!(report.contains("Citations (top 5 shown): 1"));
        assert!(report.contains(" - [1] rank=1 :: Report 1"));
    }
}
