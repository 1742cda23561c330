//! Read-only git queries
//!
//! [`VersionControl`] is the seam the resolver works against; [`GitRepo`]
//! implements it on top of libgit2. Nothing here writes to the repository.

use anyhow::{Context, Result};
use git2::{BranchType, Diff, DiffFormat, DiffOptions, ErrorCode, Oid, Repository, Tree};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Queries the resolver needs from version control.
pub trait VersionControl {
    /// Root of the working tree; changed-file paths are relative to it.
    fn workdir(&self) -> &Path;

    /// Name of the checked-out branch. Empty when HEAD is detached.
    fn current_branch(&self) -> Result<String>;

    /// Local branch names, sorted by name.
    fn local_branches(&self) -> Result<Vec<String>>;

    /// `git diff <base>`: the base revision against the working tree.
    fn diff_against_workdir(&self, base: &str) -> Result<String>;

    /// `git diff <base>...<branch>`: what `branch` introduces since its
    /// merge-base with `base`.
    fn diff_merge_base(&self, base: &str, branch: &str) -> Result<String>;

    /// `git diff --cached`
    fn staged_diff(&self) -> Result<String>;

    /// `git diff`
    fn unstaged_diff(&self) -> Result<String>;

    /// `git diff --cached --name-only`
    fn staged_files(&self) -> Result<Vec<String>>;

    /// `git diff --name-only`
    fn unstaged_files(&self) -> Result<Vec<String>>;

    /// Commits reachable from `branch` but not from `hidden`, authored at or
    /// after `since` (unix seconds).
    fn count_commits_since(&self, branch: &str, hidden: &str, since: i64) -> Result<usize>;
}

/// A repository opened with libgit2.
pub struct GitRepo {
    repo: Repository,
    workdir: PathBuf,
}

impl GitRepo {
    /// Open the repository containing `path` (searching parent directories).
    pub fn discover(path: &Path) -> Result<Self> {
        let repo = Repository::discover(path).with_context(|| {
            format!("Failed to open repository from path '{}'", path.display())
        })?;
        let workdir = repo
            .workdir()
            .map(Path::to_path_buf)
            .ok_or_else(|| anyhow::anyhow!("Bare repositories have no working tree"))?;
        Ok(Self { repo, workdir })
    }

    fn commit_oid(&self, spec: &str) -> Result<Oid> {
        let commit = self
            .repo
            .revparse_single(spec)
            .and_then(|obj| obj.peel_to_commit())
            .with_context(|| format!("Unknown revision '{}'", spec))?;
        Ok(commit.id())
    }

    fn tree_of(&self, spec: &str) -> Result<Tree<'_>> {
        self.repo
            .revparse_single(spec)
            .and_then(|obj| obj.peel_to_tree())
            .with_context(|| format!("Unknown revision '{}'", spec))
    }

    /// HEAD's tree, or None on an unborn branch (no commits yet).
    fn head_tree(&self) -> Result<Option<Tree<'_>>> {
        match self.repo.head() {
            Ok(head) => Ok(Some(head.peel_to_tree().context("Failed to read HEAD tree")?)),
            Err(e) if e.code() == ErrorCode::UnbornBranch => Ok(None),
            Err(e) => Err(e).context("Failed to get HEAD"),
        }
    }

    fn index_diff(&self) -> Result<Diff<'_>> {
        let head_tree = self.head_tree()?;
        self.repo
            .diff_tree_to_index(head_tree.as_ref(), None, Some(&mut diff_options()))
            .context("Failed to diff staged changes")
    }

    fn workdir_diff(&self) -> Result<Diff<'_>> {
        self.repo
            .diff_index_to_workdir(None, Some(&mut diff_options()))
            .context("Failed to diff unstaged changes")
    }
}

impl VersionControl for GitRepo {
    fn workdir(&self) -> &Path {
        &self.workdir
    }

    fn current_branch(&self) -> Result<String> {
        match self.repo.head() {
            Ok(head) if head.is_branch() => Ok(head.shorthand().unwrap_or_default().to_string()),
            Ok(_) => Ok(String::new()),
            Err(e) if e.code() == ErrorCode::UnbornBranch => {
                let head = self.repo.find_reference("HEAD").context("Failed to read HEAD")?;
                let target = head.symbolic_target().unwrap_or_default();
                Ok(target.strip_prefix("refs/heads/").unwrap_or(target).to_string())
            }
            Err(e) => Err(e).context("Failed to get HEAD"),
        }
    }

    fn local_branches(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in self.repo.branches(Some(BranchType::Local))? {
            let (branch, _) = entry?;
            if let Some(name) = branch.name()? {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    fn diff_against_workdir(&self, base: &str) -> Result<String> {
        let tree = self.tree_of(base)?;
        let diff = self
            .repo
            .diff_tree_to_workdir_with_index(Some(&tree), Some(&mut diff_options()))
            .with_context(|| format!("Failed to diff working tree against '{}'", base))?;
        patch_text(&diff)
    }

    fn diff_merge_base(&self, base: &str, branch: &str) -> Result<String> {
        let base_oid = self.commit_oid(base)?;
        let branch_oid = self.commit_oid(branch)?;
        let merge_base = self
            .repo
            .merge_base(base_oid, branch_oid)
            .with_context(|| format!("No merge base between '{}' and '{}'", base, branch))?;
        debug!(%merge_base, base, branch, "three-dot diff");

        let old_tree = self.repo.find_commit(merge_base)?.tree()?;
        let new_tree = self.repo.find_commit(branch_oid)?.tree()?;
        let diff = self
            .repo
            .diff_tree_to_tree(Some(&old_tree), Some(&new_tree), Some(&mut diff_options()))
            .with_context(|| format!("Failed to diff '{}...{}'", base, branch))?;
        patch_text(&diff)
    }

    fn staged_diff(&self) -> Result<String> {
        patch_text(&self.index_diff()?)
    }

    fn unstaged_diff(&self) -> Result<String> {
        patch_text(&self.workdir_diff()?)
    }

    fn staged_files(&self) -> Result<Vec<String>> {
        Ok(changed_paths(&self.index_diff()?))
    }

    fn unstaged_files(&self) -> Result<Vec<String>> {
        Ok(changed_paths(&self.workdir_diff()?))
    }

    fn count_commits_since(&self, branch: &str, hidden: &str, since: i64) -> Result<usize> {
        let mut walk = self.repo.revwalk()?;
        walk.push(self.commit_oid(branch)?)?;
        walk.hide(self.commit_oid(hidden)?)?;

        let mut count = 0;
        for oid in walk {
            let commit = self.repo.find_commit(oid?)?;
            if commit.author().when().seconds() >= since {
                count += 1;
            }
        }
        Ok(count)
    }
}

fn diff_options() -> DiffOptions {
    let mut opts = DiffOptions::new();
    opts.include_untracked(false);
    opts
}

/// Render a diff in `git diff` patch format.
fn patch_text(diff: &Diff<'_>) -> Result<String> {
    let mut text = String::new();
    diff.print(DiffFormat::Patch, |_delta, _hunk, line| {
        if matches!(line.origin(), '+' | '-' | ' ') {
            text.push(line.origin());
        }
        text.push_str(&String::from_utf8_lossy(line.content()));
        true
    })
    .context("Failed to format diff")?;
    Ok(text)
}

fn changed_paths(diff: &Diff<'_>) -> Vec<String> {
    diff.deltas()
        .filter_map(|delta| {
            delta
                .new_file()
                .path()
                .or_else(|| delta.old_file().path())
                .map(|p| p.to_string_lossy().into_owned())
        })
        .collect()
}
