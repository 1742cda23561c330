//! Command-line surface
//!
//! `clap` does the parsing; [`Cli::into_invocation`] turns the parsed
//! arguments into exactly one [`CommandInvocation`] or a usage error.

use crate::error::RewerError;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub const USAGE: &str = "\
Usage:
  rewer -b <branch-name>                        Review branch changes
  rewer commit --msg                            Generate a commit message from staged changes
  rewer explain <file>                          Explain a file
  rewer daily                                   Daily report from today's branch activity
  rewer security-scan [-b <branch> | --file <file>]
                                                Scan changes for security vulnerabilities";

#[derive(Parser, Debug)]
#[command(
    name = "rewer",
    about = "AI code reviews, commit messages and reports from your git state",
    version
)]
pub struct Cli {
    /// Review the changes a branch introduces relative to trunk (with
    /// `security-scan`, scan them instead)
    #[arg(short = 'b', long = "branch", value_name = "BRANCH", global = true)]
    pub branch: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate a commit message from staged (or unstaged) changes
    Commit {
        /// Print a generated commit message
        #[arg(long)]
        msg: bool,
    },
    /// Explain what a file does
    Explain {
        /// File to explain
        file: Option<PathBuf>,
    },
    /// Turn today's branch activity into a report
    Daily,
    /// Scan changes for security vulnerabilities
    SecurityScan {
        /// Scan a single file
        #[arg(long, value_name = "FILE")]
        file: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Review,
    Commit,
    Explain,
    Daily,
    SecurityScan,
}

impl CommandKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandKind::Review => "review",
            CommandKind::Commit => "commit",
            CommandKind::Explain => "explain",
            CommandKind::Daily => "daily",
            CommandKind::SecurityScan => "security-scan",
        }
    }
}

/// What the security scan looks at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanScope {
    /// Every staged or unstaged file, read whole from disk
    ChangedFiles,
    /// The diff a branch introduces
    Branch(String),
    /// One file
    File(PathBuf),
}

/// One validated command. Built once per run and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandInvocation {
    Review { branch: String },
    Commit,
    Explain { file: PathBuf },
    Daily,
    SecurityScan { scope: ScanScope },
}

impl CommandInvocation {
    pub fn kind(&self) -> CommandKind {
        match self {
            CommandInvocation::Review { .. } => CommandKind::Review,
            CommandInvocation::Commit => CommandKind::Commit,
            CommandInvocation::Explain { .. } => CommandKind::Explain,
            CommandInvocation::Daily => CommandKind::Daily,
            CommandInvocation::SecurityScan { .. } => CommandKind::SecurityScan,
        }
    }
}

impl Cli {
    /// Pick the single command to run. Rules are tried in order and the
    /// first that applies wins: `commit --msg`, `explain <file>`, `daily`,
    /// `security-scan`, then `-b` on its own.
    pub fn into_invocation(self) -> Result<CommandInvocation, RewerError> {
        let Cli { branch, command } = self;

        let unmet = match command {
            Some(Commands::Commit { msg: true }) => return Ok(CommandInvocation::Commit),
            Some(Commands::Explain { file: Some(file) }) => {
                return Ok(CommandInvocation::Explain { file })
            }
            Some(Commands::Daily) => return Ok(CommandInvocation::Daily),
            Some(Commands::SecurityScan { file }) => {
                let scope = match (branch, file) {
                    (Some(_), Some(_)) => {
                        return Err(RewerError::Usage(
                            "`security-scan` takes either -b or --file, not both.".to_string(),
                        ))
                    }
                    (Some(branch), None) => ScanScope::Branch(required_name(branch, "-b")?),
                    (None, Some(file)) => ScanScope::File(file),
                    (None, None) => ScanScope::ChangedFiles,
                };
                return Ok(CommandInvocation::SecurityScan { scope });
            }
            Some(Commands::Commit { msg: false }) => "`commit` requires the --msg flag.",
            Some(Commands::Explain { file: None }) => "`explain` requires a file path.",
            None => "No command given.",
        };

        match branch {
            Some(branch) => Ok(CommandInvocation::Review {
                branch: required_name(branch, "-b")?,
            }),
            None => Err(RewerError::Usage(unmet.to_string())),
        }
    }
}

fn required_name(value: String, flag: &str) -> Result<String, RewerError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(RewerError::Usage(format!("{} requires a branch name.", flag)));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invocation(args: &[&str]) -> Result<CommandInvocation, RewerError> {
        let mut argv = vec!["rewer"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv)
            .map_err(|e| RewerError::Usage(e.to_string()))?
            .into_invocation()
    }

    #[test]
    fn test_review_flag() {
        assert_eq!(
            invocation(&["-b", "feature-x"]).unwrap(),
            CommandInvocation::Review {
                branch: "feature-x".to_string()
            }
        );
    }

    #[test]
    fn test_review_flag_requires_value() {
        assert!(Cli::try_parse_from(["rewer", "-b"]).is_err());
        assert!(matches!(invocation(&["-b", " "]), Err(RewerError::Usage(_))));
    }

    #[test]
    fn test_commit_requires_msg_flag() {
        assert_eq!(invocation(&["commit", "--msg"]).unwrap(), CommandInvocation::Commit);
        assert!(matches!(invocation(&["commit"]), Err(RewerError::Usage(_))));
    }

    #[test]
    fn test_explain_requires_file() {
        assert_eq!(
            invocation(&["explain", "src/main.rs"]).unwrap(),
            CommandInvocation::Explain {
                file: PathBuf::from("src/main.rs")
            }
        );
        assert!(matches!(invocation(&["explain"]), Err(RewerError::Usage(_))));
    }

    #[test]
    fn test_security_scan_scopes() {
        assert_eq!(
            invocation(&["security-scan"]).unwrap().kind(),
            CommandKind::SecurityScan
        );
        assert_eq!(
            invocation(&["security-scan"]).unwrap(),
            CommandInvocation::SecurityScan {
                scope: ScanScope::ChangedFiles
            }
        );
        assert_eq!(
            invocation(&["security-scan", "-b", "feature"]).unwrap(),
            CommandInvocation::SecurityScan {
                scope: ScanScope::Branch("feature".to_string())
            }
        );
        assert_eq!(
            invocation(&["security-scan", "--file", "app.js"]).unwrap(),
            CommandInvocation::SecurityScan {
                scope: ScanScope::File(PathBuf::from("app.js"))
            }
        );
        assert!(matches!(
            invocation(&["security-scan", "-b", "x", "--file", "y"]),
            Err(RewerError::Usage(_))
        ));
    }

    #[test]
    fn test_commit_wins_over_branch_flag() {
        assert_eq!(
            invocation(&["commit", "--msg", "-b", "feature"]).unwrap(),
            CommandInvocation::Commit
        );
        assert_eq!(
            invocation(&["-b", "feature", "commit", "--msg"]).unwrap(),
            CommandInvocation::Commit
        );
    }

    #[test]
    fn test_incomplete_subcommand_falls_through_to_review() {
        let review = CommandInvocation::Review {
            branch: "feature".to_string(),
        };
        assert_eq!(invocation(&["commit", "-b", "feature"]).unwrap(), review);
        assert_eq!(invocation(&["explain", "-b", "feature"]).unwrap(), review);
    }

    #[test]
    fn test_subcommands_win_over_branch_flag() {
        assert_eq!(
            invocation(&["-b", "feature", "explain", "lib.rs"]).unwrap(),
            CommandInvocation::Explain {
                file: PathBuf::from("lib.rs")
            }
        );
        assert_eq!(
            invocation(&["daily", "-b", "feature"]).unwrap(),
            CommandInvocation::Daily
        );
        assert_eq!(
            invocation(&["-b", "feature", "security-scan"]).unwrap(),
            CommandInvocation::SecurityScan {
                scope: ScanScope::Branch("feature".to_string())
            }
        );
    }

    #[test]
    fn test_no_command_is_usage_error() {
        assert!(matches!(invocation(&[]), Err(RewerError::Usage(_))));
        assert!(Cli::try_parse_from(["rewer", "frobnicate"]).is_err());
    }

    #[test]
    fn test_daily() {
        assert_eq!(invocation(&["daily"]).unwrap(), CommandInvocation::Daily);
        assert_eq!(CommandKind::Daily.as_str(), "daily");
    }
}
