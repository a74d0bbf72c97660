//! Command-line surface: `analyst serve` and `analyst analyze <FILE>`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::agent::conversation::{ConversationTurn, Role};
use crate::agent::{Agent, AnalysisSession, RunRequest};

/// Characters of a tool result shown when streaming.
const STREAM_PREVIEW_CHARS: usize = 400;

#[derive(Parser)]
#[command(name = "analyst", version)]
#[command(about = "Resume analysis agent: reads a resume, extracts its data, and reports on it")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the HTTP server
    Serve {
        /// Overrides PORT
        #[arg(long)]
        port: Option<u16>,
    },
    /// Analyze one resume file and print the result
    Analyze(AnalyzeArgs),
}

#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Resume file (pdf, docx, txt or md)
    pub file: PathBuf,

    /// Job requirements to match against, comma or newline separated
    #[arg(long, short = 'j')]
    pub job_requirements: Option<String>,

    /// Custom instruction; defaults to a full analysis
    #[arg(long, short = 'i')]
    pub instruction: Option<String>,

    /// Overrides MAX_TURNS for this run
    #[arg(long)]
    pub max_turns: Option<usize>,

    /// Print every turn as it happens
    #[arg(long)]
    pub stream: bool,

    /// Write the final answer to this Markdown file
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,
}

pub async fn run_analyze(agent: &Agent, args: AnalyzeArgs) -> Result<()> {
    if args.max_turns == Some(0) {
        anyhow::bail!("--max-turns must be at least 1");
    }

    let request = RunRequest {
        instruction: args.instruction.unwrap_or_default(),
        file_path: Some(args.file.display().to_string()),
        job_requirements: args.job_requirements.filter(|r| !r.trim().is_empty()),
        max_turns: args.max_turns,
    };

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, cancelling run");
                cancel.cancel();
            }
        });
    }

    let (events, printer) = if args.stream {
        let (tx, mut rx) = mpsc::unbounded_channel::<ConversationTurn>();
        let printer = tokio::spawn(async move {
            while let Some(turn) = rx.recv().await {
                println!("{}\n", render_turn(&turn));
            }
        });
        (Some(tx), Some(printer))
    } else {
        (None, None)
    };

    let mut session = AnalysisSession::default();
    let result = agent.run(&mut session, request, cancel, events).await;

    if let Some(printer) = printer {
        printer.await.context("stream printer failed")?;
    }

    let outcome = result.map_err(|failure| {
        anyhow::anyhow!(
            "analysis failed after {} recorded turns [{}]: {}",
            failure.conversation.len(),
            failure.error.code(),
            failure.error
        )
    })?;

    if !args.stream {
        println!("{}", outcome.answer);
    }

    if let Some(path) = args.output {
        let report = markdown_report(&args.file, &outcome.answer);
        tokio::fs::write(&path, report)
            .await
            .with_context(|| format!("failed to write {}", path.display()))?;
        info!("Report written to {}", path.display());
    }

    Ok(())
}

/// One streamed turn as terminal text.
pub fn render_turn(turn: &ConversationTurn) -> String {
    match (turn.role, &turn.tool_call) {
        (Role::User, _) => format!("▶ {}", turn.content),
        (Role::Agent, Some(call)) => {
            let mut out = String::new();
            if !turn.content.is_empty() {
                out.push_str(&turn.content);
                out.push('\n');
            }
            out.push_str(&format!("🔧 {} {}", call.name, call.arguments));
            out
        }
        (Role::Agent, None) => turn.content.clone(),
        (Role::Tool, call) => {
            let name = call.as_ref().map(|c| c.name.as_str()).unwrap_or("tool");
            let marker = if turn.is_error { "✗" } else { "✓" };
            format!("{marker} {name}: {}", preview(&turn.content))
        }
    }
}

fn preview(text: &str) -> String {
    if text.chars().count() <= STREAM_PREVIEW_CHARS {
        return text.to_string();
    }
    let cut: String = text.chars().take(STREAM_PREVIEW_CHARS).collect();
    format!("{cut}…")
}

pub fn markdown_report(file: &Path, answer: &str) -> String {
    let name = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| file.display().to_string());
    format!(
        "# Resume Analysis: {name}\n\n_Generated {}_\n\n{}\n",
        Utc::now().format("%Y-%m-%d %H:%M UTC"),
        answer.trim_end()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::conversation::{Conversation, ToolInvocation};
    use serde_json::json;

    #[test]
    fn test_cli_parses_analyze_flags() {
        let cli = Cli::try_parse_from([
            "analyst",
            "analyze",
            "cv.pdf",
            "--job-requirements",
            "Python, AWS",
            "--stream",
            "-o",
            "out.md",
        ])
        .unwrap();
        let Command::Analyze(args) = cli.command else {
            panic!("expected analyze");
        };
        assert_eq!(args.file, PathBuf::from("cv.pdf"));
        assert_eq!(args.job_requirements.as_deref(), Some("Python, AWS"));
        assert!(args.stream);
        assert_eq!(args.output, Some(PathBuf::from("out.md")));
    }

    #[test]
    fn test_cli_requires_file() {
        assert!(Cli::try_parse_from(["analyst", "analyze"]).is_err());
    }

    #[test]
    fn test_render_tool_turns() {
        let call = ToolInvocation {
            id: "c1".to_string(),
            name: "read_resume".to_string(),
            arguments: json!({"file_path": "cv.pdf"}),
        };
        let mut conversation = Conversation::new();
        let request = conversation.push_tool_call(None, call.clone()).clone();
        let failed = conversation
            .push_tool_result(&call, "Error [FILE_NOT_FOUND]: gone", true)
            .clone();

        assert_eq!(render_turn(&request), r#"🔧 read_resume {"file_path":"cv.pdf"}"#);
        assert_eq!(render_turn(&failed), "✗ read_resume: Error [FILE_NOT_FOUND]: gone");
    }

    #[test]
    fn test_long_tool_output_is_truncated() {
        let long = "x".repeat(STREAM_PREVIEW_CHARS + 10);
        let shown = preview(&long);
        assert_eq!(shown.chars().count(), STREAM_PREVIEW_CHARS + 1);
    }

    #[test]
    fn test_markdown_report_has_title_and_answer() {
        let report = markdown_report(Path::new("/tmp/Ada_CV.pdf"), "## Summary\nGreat.\n\n");
        assert!(report.starts_with("# Resume Analysis: Ada_CV.pdf\n"));
        assert!(report.ends_with("## Summary\nGreat.\n"));
    }
}
