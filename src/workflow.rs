//! Command flows
//!
//! Every command runs the same pipeline: resolve the target, assemble the
//! prompt, spin while the model answers, present the reply. A [`Flow`]
//! supplies the per-command pieces and [`run_flow`] drives them.

use crate::ai::CompletionClient;
use crate::cli::{CommandInvocation, CommandKind, ScanScope};
use crate::config::{Config, Credentials};
use crate::error::RewerError;
use crate::git_ops::VersionControl;
use crate::prompt;
use crate::resolve::{self, Resolution, ResolvedTarget, SourceKind};
use crate::spinner::{SharedWriter, Spinner};
use crate::ui::{self, markdown, theme::Theme};
use anyhow::anyhow;
use chrono::{DateTime, Local};
use crossterm::style::Stylize;
use std::future::Future;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// Everything a flow may read. Built once in `main`.
pub struct Workspace<'a> {
    /// `None` when the working directory is not inside a repository
    pub vcs: Option<&'a dyn VersionControl>,
    pub config: &'a Config,
    pub cwd: PathBuf,
    pub now: DateTime<Local>,
}

impl<'a> Workspace<'a> {
    pub fn vcs(&self) -> Result<&'a dyn VersionControl, RewerError> {
        self.vcs
            .ok_or_else(|| RewerError::Resolution(anyhow!("Not inside a git repository.")))
    }

    pub fn trunk(&self) -> Result<String, RewerError> {
        resolve::trunk_branch(self.vcs()?, self.config.trunk_branch.as_deref())
    }
}

/// How a run ended, short of an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Completed,
    NothingToDo,
}

impl Outcome {
    /// Having nothing to review is a normal end, not a failure.
    pub fn exit_code(&self) -> u8 {
        0
    }
}

/// Process exit status for a finished run.
pub fn exit_code(result: &Result<Outcome, RewerError>) -> u8 {
    match result {
        Ok(outcome) => outcome.exit_code(),
        Err(err) => err.exit_code(),
    }
}

/// Check the API key, then hand it to `session`. Without a key `session`
/// never runs, so nothing is resolved, spun or sent.
pub async fn gated<L, S, Fut>(lookup: L, session: S) -> Result<Outcome, RewerError>
where
    L: Fn(&str) -> Option<String>,
    S: FnOnce(Credentials) -> Fut,
    Fut: Future<Output = Result<Outcome, RewerError>>,
{
    let credentials = Credentials::from_lookup(lookup)?;
    session(credentials).await
}

pub trait Flow {
    fn kind(&self) -> CommandKind;

    fn resolve(&self, ws: &Workspace<'_>) -> Result<Resolution, RewerError>;

    fn spinner_label(&self, target: &ResolvedTarget) -> String;

    /// Terminal text for a successful reply.
    fn present(&self, target: &ResolvedTarget, reply: &str, ws: &Workspace<'_>) -> String;
}

pub fn flow_for(invocation: &CommandInvocation) -> Box<dyn Flow> {
    match invocation {
        CommandInvocation::Review { branch } => Box::new(ReviewFlow {
            branch: branch.clone(),
        }),
        CommandInvocation::Commit => Box::new(CommitFlow),
        CommandInvocation::Explain { file } => Box::new(ExplainFlow { file: file.clone() }),
        CommandInvocation::Daily => Box::new(DailyFlow),
        CommandInvocation::SecurityScan { scope } => Box::new(SecurityScanFlow {
            scope: scope.clone(),
        }),
    }
}

/// Run one flow end to end. The indicator is stopped before anything is
/// written to `out`, on success and on failure.
pub async fn run_flow(
    flow: &dyn Flow,
    ws: &Workspace<'_>,
    client: &dyn CompletionClient,
    indicator: &SharedWriter,
    out: &mut dyn Write,
) -> Result<Outcome, RewerError> {
    let target = match flow.resolve(ws)? {
        Resolution::Target(target) => target,
        Resolution::NoChanges(nothing) => {
            debug!(command = flow.kind().as_str(), "nothing to do");
            out.write_all(nothing.render().as_bytes())?;
            out.flush()?;
            return Ok(Outcome::NothingToDo);
        }
    };

    let request = prompt::assemble(flow.kind(), &target);
    debug!(
        command = flow.kind().as_str(),
        label = %target.label,
        prompt_bytes = request.text.len(),
        "prompt assembled"
    );

    let mut spinner = Spinner::start(flow.spinner_label(&target), Arc::clone(indicator));
    let reply = client.complete(&request.text, request.max_tokens).await;
    spinner.stop();
    let reply = reply?;

    out.write_all(flow.present(&target, &reply, ws).as_bytes())?;
    out.flush()?;
    Ok(Outcome::Completed)
}

/// Surrounding blank lines dropped; the first line keeps its indentation.
fn reply_body(reply: &str) -> &str {
    reply.trim_start_matches(['\r', '\n']).trim_end()
}

/// Title, rule, body, rule: the frame shared by the long-form replies.
fn framed(header: &[String], rule: &str, body: &str) -> String {
    let mut s = String::from("\n");
    for line in header {
        s.push_str(line);
        s.push('\n');
    }
    s.push('\n');
    s.push_str(rule);
    s.push_str("\n\n");
    s.push_str(body);
    s.push_str("\n\n");
    s.push_str(rule);
    s.push('\n');
    s
}

// ─────────────────────────────────────────────────────────────────────────
// Review
// ─────────────────────────────────────────────────────────────────────────

pub struct ReviewFlow {
    pub branch: String,
}

impl Flow for ReviewFlow {
    fn kind(&self) -> CommandKind {
        CommandKind::Review
    }

    fn resolve(&self, ws: &Workspace<'_>) -> Result<Resolution, RewerError> {
        let trunk = ws.trunk()?;
        resolve::branch_diff(ws.vcs()?, &trunk, &self.branch)
    }

    fn spinner_label(&self, target: &ResolvedTarget) -> String {
        format!("Analyzing code changes in branch \"{}\"...", target.label)
    }

    fn present(&self, target: &ResolvedTarget, reply: &str, _ws: &Workspace<'_>) -> String {
        framed(
            &[ui::title(&format!("📝 Code Review for branch \"{}\"", target.label))],
            &ui::light_rule(),
            &markdown::render(reply_body(reply)),
        )
    }
}

// ─────────────────────────────────────────────────────────────────────────
// Commit message
// ─────────────────────────────────────────────────────────────────────────

pub struct CommitFlow;

impl Flow for CommitFlow {
    fn kind(&self) -> CommandKind {
        CommandKind::Commit
    }

    fn resolve(&self, ws: &Workspace<'_>) -> Result<Resolution, RewerError> {
        resolve::working_changes(ws.vcs()?)
    }

    fn spinner_label(&self, target: &ResolvedTarget) -> String {
        format!("Generating commit message from {} changes...", target.label)
    }

    /// The message is printed as-is so it can be copied straight into git.
    fn present(&self, target: &ResolvedTarget, reply: &str, _ws: &Workspace<'_>) -> String {
        let message = reply.trim();
        let subject = message.lines().next().unwrap_or_default();

        let mut s = framed(
            &[ui::title(&format!(
                "💬 Generated Commit Message (from {} changes)",
                target.label
            ))],
            &ui::light_rule(),
            message,
        );
        s.push_str("\nTo use this message:\n");
        s.push_str(&format!(
            "  {}\n",
            format!("git commit -m {}", shell_quote(subject)).with(Theme::SUCCESS)
        ));
        s
    }
}

/// Single-quote `text` for a POSIX shell so nothing in it expands.
fn shell_quote(text: &str) -> String {
    format!("'{}'", text.replace('\'', "'\\''"))
}

// ─────────────────────────────────────────────────────────────────────────
// Explain
// ─────────────────────────────────────────────────────────────────────────

pub struct ExplainFlow {
    pub file: PathBuf,
}

impl Flow for ExplainFlow {
    fn kind(&self) -> CommandKind {
        CommandKind::Explain
    }

    fn resolve(&self, ws: &Workspace<'_>) -> Result<Resolution, RewerError> {
        resolve::single_file(&self.file, &ws.cwd)
    }

    fn spinner_label(&self, target: &ResolvedTarget) -> String {
        format!("Explaining \"{}\"...", target.label)
    }

    fn present(&self, target: &ResolvedTarget, reply: &str, _ws: &Workspace<'_>) -> String {
        framed(
            &[ui::title(&format!("📖 Explanation of \"{}\"", target.label))],
            &ui::heavy_rule(),
            &markdown::render(reply_body(reply)),
        )
    }
}

// ─────────────────────────────────────────────────────────────────────────
// Daily report
// ─────────────────────────────────────────────────────────────────────────

pub struct DailyFlow;

impl DailyFlow {
    fn heading(ws: &Workspace<'_>) -> String {
        format!(
            "📅 {} – {} | {} – {}",
            ws.now.format("%Y-%m-%d"),
            ws.now.format("%A"),
            ws.config.work_start,
            ws.config.work_end
        )
    }
}

/// Non-empty reply lines, in order.
pub fn task_titles(reply: &str) -> Vec<&str> {
    reply
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect()
}

impl Flow for DailyFlow {
    fn kind(&self) -> CommandKind {
        CommandKind::Daily
    }

    fn resolve(&self, ws: &Workspace<'_>) -> Result<Resolution, RewerError> {
        let trunk = ws.trunk()?;
        let since = resolve::local_midnight(ws.now);
        resolve::active_branches(ws.vcs()?, &trunk, since)
    }

    fn spinner_label(&self, _target: &ResolvedTarget) -> String {
        "Generating daily report...".to_string()
    }

    fn present(&self, _target: &ResolvedTarget, reply: &str, ws: &Workspace<'_>) -> String {
        let heading = Self::heading(ws);
        let titles = task_titles(reply);
        let mut s = String::from("\n");

        s.push_str(&format!("{}\n\n", heading.as_str().bold()));
        s.push_str(&format!("{}\n", "🚀 Completed Today".bold()));
        for title in &titles {
            s.push_str(&format!(
                "{}\n",
                format!("{} {}", Theme::SUCCESS_GLYPH, title).with(Theme::SUCCESS)
            ));
        }
        s.push('\n');

        s.push_str(&ui::light_rule());
        s.push('\n');
        s.push_str(&format!("{}\n\n", "📋 Copy-friendly version:".dim()));
        s.push_str(&format!("{}\n\n🚀 Completed Today\n", heading));
        for title in &titles {
            s.push_str(&format!("{} {}\n", Theme::SUCCESS_GLYPH, title));
        }
        s.push('\n');
        s
    }
}

// ─────────────────────────────────────────────────────────────────────────
// Security scan
// ─────────────────────────────────────────────────────────────────────────

pub struct SecurityScanFlow {
    pub scope: ScanScope,
}

impl Flow for SecurityScanFlow {
    fn kind(&self) -> CommandKind {
        CommandKind::SecurityScan
    }

    fn resolve(&self, ws: &Workspace<'_>) -> Result<Resolution, RewerError> {
        match &self.scope {
            ScanScope::ChangedFiles => resolve::changed_file_set(ws.vcs()?),
            ScanScope::Branch(branch) => {
                let trunk = ws.trunk()?;
                resolve::branch_diff(ws.vcs()?, &trunk, branch)
            }
            ScanScope::File(file) => resolve::single_file(file, &ws.cwd),
        }
    }

    fn spinner_label(&self, target: &ResolvedTarget) -> String {
        match target.source {
            SourceKind::FileSet => format!(
                "Scanning {} changed file(s) for vulnerabilities...",
                target.items.len()
            ),
            SourceKind::BranchDiff => format!(
                "Scanning branch \"{}\" for vulnerabilities...",
                target.label
            ),
            _ => format!("Scanning \"{}\" for vulnerabilities...", target.label),
        }
    }

    fn present(&self, target: &ResolvedTarget, reply: &str, _ws: &Workspace<'_>) -> String {
        let (what, detail) = match target.source {
            SourceKind::FileSet => (target.label.clone(), format!("Files: {}", target.items.join(", "))),
            SourceKind::BranchDiff => (
                format!("branch \"{}\"", target.label),
                format!("Branch: {}", target.label),
            ),
            _ => (
                format!("\"{}\"", target.label),
                format!("File: {}", target.items.join(", ")),
            ),
        };

        framed(
            &[
                ui::title(&format!("🔒 Security Scan — {}", what)),
                ui::subtitle(&detail),
            ],
            &ui::heavy_rule(),
            &markdown::render(reply_body(reply)),
        )
    }
}
