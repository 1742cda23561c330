//! Diff/content resolution
//!
//! Decides *what text* a command operates on. Each function returns either a
//! [`ResolvedTarget`] with a non-empty payload or [`Resolution::NoChanges`];
//! an empty payload never escapes this module.

use crate::error::RewerError;
use crate::git_ops::VersionControl;
use crate::ui::theme::Theme;
use anyhow::Context;
use chrono::{DateTime, Local, TimeZone, Timelike};
use crossterm::style::Stylize;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

pub const DEFAULT_TRUNK: &str = "main";
const FALLBACK_TRUNK: &str = "master";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    BranchDiff,
    StagedDiff,
    UnstagedDiff,
    SingleFile,
    FileSet,
    BranchNames,
}

/// The concrete text a command sends to the model, plus how to describe it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget {
    /// Short display label (branch name, file name, "staged"/"unstaged", ...)
    pub label: String,
    /// Text embedded in the prompt
    pub payload: String,
    pub source: SourceKind,
    /// Files or branches that made it into the payload, in payload order
    pub items: Vec<String>,
}

/// A legitimate "nothing to do" outcome. Exits 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoChanges {
    pub message: String,
    pub hint: Option<String>,
}

impl NoChanges {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            hint: None,
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    /// Terminal text for this outcome, newline-terminated.
    pub fn render(&self) -> String {
        match &self.hint {
            Some(hint) => format!("{}\n{}\n", self.message, hint.as_str().with(Theme::MUTED)),
            None => format!("{}\n", self.message),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Target(ResolvedTarget),
    NoChanges(NoChanges),
}

/// Trunk policy shared by every flow: explicit configuration first, then
/// `main`, then `master`, defaulting to `main` when neither exists.
pub fn trunk_branch(vcs: &dyn VersionControl, configured: Option<&str>) -> Result<String, RewerError> {
    if let Some(name) = configured.map(str::trim).filter(|n| !n.is_empty()) {
        return Ok(name.to_string());
    }

    let branches = vcs.local_branches().context("Failed to list local branches")?;
    let has = |name: &str| branches.iter().any(|b| b == name);
    let trunk = if !has(DEFAULT_TRUNK) && has(FALLBACK_TRUNK) {
        FALLBACK_TRUNK
    } else {
        DEFAULT_TRUNK
    };
    Ok(trunk.to_string())
}

/// Changes a branch carries relative to trunk.
///
/// Reviewing the checked-out branch diffs trunk against the working tree, so
/// uncommitted edits are included. Any other branch uses the three-dot form,
/// which leaves out commits that only landed on trunk.
pub fn branch_diff(vcs: &dyn VersionControl, trunk: &str, branch: &str) -> Result<Resolution, RewerError> {
    let current = vcs.current_branch().context("Failed to determine current branch")?;

    let diff = if current == branch {
        debug!(branch, trunk, "diffing checked-out branch against trunk");
        vcs.diff_against_workdir(trunk)?
    } else {
        debug!(branch, trunk, current = %current, "three-dot diff from trunk");
        vcs.diff_merge_base(trunk, branch)?
    };

    let diff = diff.trim();
    if diff.is_empty() {
        return Ok(Resolution::NoChanges(NoChanges::new(format!(
            "No changes found in branch \"{}\".",
            branch
        ))));
    }

    Ok(Resolution::Target(ResolvedTarget {
        label: branch.to_string(),
        payload: diff.to_string(),
        source: SourceKind::BranchDiff,
        items: vec![branch.to_string()],
    }))
}

/// Staged changes, falling back to unstaged ones.
pub fn working_changes(vcs: &dyn VersionControl) -> Result<Resolution, RewerError> {
    let staged = vcs.staged_diff()?;
    let (diff, source) = if staged.trim().is_empty() {
        (vcs.unstaged_diff()?, SourceKind::UnstagedDiff)
    } else {
        (staged, SourceKind::StagedDiff)
    };

    let diff = diff.trim();
    if diff.is_empty() {
        return Ok(Resolution::NoChanges(NoChanges::new(
            "No changes found. Stage your changes with `git add` first.",
        )));
    }

    let label = match source {
        SourceKind::StagedDiff => "staged",
        _ => "unstaged",
    };
    info!(source = label, "using {} changes", label);

    Ok(Resolution::Target(ResolvedTarget {
        label: label.to_string(),
        payload: diff.to_string(),
        source,
        items: Vec::new(),
    }))
}

/// One file, resolved against `cwd` when relative.
pub fn single_file(path: &Path, cwd: &Path) -> Result<Resolution, RewerError> {
    let resolved = if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    };

    if !resolved.exists() {
        return Err(RewerError::NotFound(resolved));
    }

    let content = read_lossy(&resolved)?;
    let name = resolved
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| resolved.display().to_string());

    if content.trim().is_empty() {
        return Ok(Resolution::NoChanges(NoChanges::new(format!(
            "Nothing to explain: \"{}\" is empty.",
            name
        ))));
    }

    Ok(Resolution::Target(ResolvedTarget {
        label: name,
        payload: content,
        source: SourceKind::SingleFile,
        items: vec![resolved.display().to_string()],
    }))
}

/// Full current content of every staged or unstaged file, as
/// `=== <path> ===` blocks. Files that no longer exist are skipped.
pub fn changed_file_set(vcs: &dyn VersionControl) -> Result<Resolution, RewerError> {
    let staged = vcs.staged_files()?;
    let unstaged = vcs.unstaged_files()?;

    let mut seen = HashSet::new();
    let files: Vec<String> = staged
        .into_iter()
        .chain(unstaged)
        .filter(|f| !f.is_empty() && seen.insert(f.clone()))
        .collect();

    if files.is_empty() {
        return Ok(Resolution::NoChanges(NoChanges::new(
            "No changed files found. Stage or modify files first.",
        )));
    }

    let mut blocks = Vec::new();
    let mut survivors = Vec::new();
    for file in files {
        let path = vcs.workdir().join(&file);
        if !path.exists() {
            debug!(file = %file, "skipping vanished file");
            continue;
        }
        let content = read_lossy(&path)?;
        blocks.push(format!("=== {} ===\n{}", file, content));
        survivors.push(file);
    }

    if blocks.is_empty() {
        return Ok(Resolution::NoChanges(NoChanges::new(
            "Changed files could not be read (deleted?).",
        )));
    }

    Ok(Resolution::Target(ResolvedTarget {
        label: format!("{} changed file(s)", survivors.len()),
        payload: blocks.join("\n\n"),
        source: SourceKind::FileSet,
        items: survivors,
    }))
}

/// Non-trunk branches with at least one commit of their own authored at or
/// after `since`. A branch whose lookup fails simply does not qualify.
pub fn active_branches(vcs: &dyn VersionControl, trunk: &str, since: i64) -> Result<Resolution, RewerError> {
    let branches = vcs.local_branches().context("Failed to list local branches")?;

    let active: Vec<String> = branches
        .into_iter()
        .filter(|b| b != trunk)
        .filter(|b| match vcs.count_commits_since(b, trunk, since) {
            Ok(count) => count > 0,
            Err(err) => {
                debug!(branch = %b, "skipping branch: {:#}", err);
                false
            }
        })
        .collect();

    if active.is_empty() {
        return Ok(Resolution::NoChanges(
            NoChanges::new("No branch activity found for today.")
                .with_hint(format!(
                    "Tip: This checks for commits on non-{} branches made since midnight.",
                    trunk
                )),
        ));
    }

    Ok(Resolution::Target(ResolvedTarget {
        label: format!("{} branch(es)", active.len()),
        payload: active
            .iter()
            .map(|b| format!("- {}", b))
            .collect::<Vec<_>>()
            .join("\n"),
        source: SourceKind::BranchNames,
        items: active,
    }))
}

/// Unix timestamp of the most recent local midnight.
pub fn local_midnight(now: DateTime<Local>) -> i64 {
    now.date_naive()
        .and_hms_opt(0, 0, 0)
        .and_then(|midnight| Local.from_local_datetime(&midnight).earliest())
        .map(|dt| dt.timestamp())
        .unwrap_or_else(|| now.timestamp() - i64::from(now.num_seconds_from_midnight()))
}

fn read_lossy(path: &Path) -> Result<String, RewerError> {
    let bytes = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
