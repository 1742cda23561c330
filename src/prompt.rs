//! Prompt assembly
//!
//! One fixed instruction template per command kind. [`assemble`] is pure:
//! the resolved payload is embedded verbatim inside a single fenced block,
//! never truncated or rewritten.

use crate::cli::CommandKind;
use crate::resolve::{ResolvedTarget, SourceKind};

pub const REVIEW_INSTRUCTIONS: &str = r#"You are a senior code reviewer. Review the following git diff and provide actionable feedback to make the code cleaner, more maintainable, and follow best practices.

For each issue found:
- Specify the file and line
- Explain the problem
- Suggest the improved code

Focus on: code quality, best practices, potential bugs, performance, readability, and security."#;

pub const COMMIT_INSTRUCTIONS: &str = r#"You are an expert at writing concise, meaningful git commit messages following the Conventional Commits specification.

Analyze the following git diff and generate a commit message.

Rules:
- First line: type(scope): short description (max 72 chars)
  - Types: feat, fix, refactor, docs, style, test, chore, perf, ci, build
  - Scope is optional but recommended
- Leave a blank line after the first line
- Body: briefly explain WHAT changed and WHY (not HOW), wrap at 72 chars
- If there are multiple logical changes, mention each briefly in the body
- Do NOT include any markdown formatting, code fences, or extra commentary
- Output ONLY the commit message, nothing else"#;

pub const EXPLAIN_INSTRUCTIONS: &str = r#"You are a senior software engineer. Explain the following file in a clear and structured way.

Cover:
- **Purpose**: What this file does and its role in the project
- **Key Components**: Important functions, classes, variables, and their responsibilities
- **Logic Flow**: How the code works step by step
- **Dependencies**: External modules or files it relies on"#;

pub const SECURITY_SCAN_INSTRUCTIONS: &str = r#"You are a senior application security engineer performing a focused security audit on code that is about to be committed.

Analyze the following code and report any security vulnerabilities or risks.

For each finding, provide:
- **Severity**: Critical / High / Medium / Low / Info
- **Category**: (e.g. Injection, Auth, Data Exposure, XSS, CSRF, Insecure Config, etc.)
- **Location**: File name and line or code snippet where the issue occurs
- **Description**: What the vulnerability is and why it matters
- **Recommendation**: How to fix it, with a code example if applicable

Focus on OWASP Top 10 and common vulnerabilities:
- SQL/NoSQL/Command injection
- Cross-Site Scripting (XSS)
- Broken authentication & session management
- Sensitive data exposure (hardcoded secrets, API keys, tokens)
- Security misconfiguration
- Insecure deserialization
- Missing input validation
- Path traversal
- Insecure dependencies usage
- Improper error handling that leaks information

If no vulnerabilities are found, state that the code looks secure and suggest any hardening tips.

Order findings by severity (Critical first)."#;

pub const DAILY_INSTRUCTIONS: &str = r#"Convert these git branch names into clean, professional task titles.

Rules:
- Output ONLY the task titles, one per line, in the same order
- Make them concise and professional (e.g. "feature/swap-bridge-api" → "Swap & Bridge API Integration")
- Use Title Case
- No numbering, bullets, or extra text"#;

/// Output budget for long-form replies (review, explain, security scan)
pub const LONG_FORM_MAX_TOKENS: u32 = 4096;
/// Output budget for short replies (commit message, daily titles)
pub const SHORT_FORM_MAX_TOKENS: u32 = 1024;

/// The single user message sent for one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptRequest {
    pub kind: CommandKind,
    pub text: String,
    pub max_tokens: u32,
}

pub fn instructions(kind: CommandKind) -> &'static str {
    match kind {
        CommandKind::Review => REVIEW_INSTRUCTIONS,
        CommandKind::Commit => COMMIT_INSTRUCTIONS,
        CommandKind::Explain => EXPLAIN_INSTRUCTIONS,
        CommandKind::SecurityScan => SECURITY_SCAN_INSTRUCTIONS,
        CommandKind::Daily => DAILY_INSTRUCTIONS,
    }
}

pub fn max_tokens(kind: CommandKind) -> u32 {
    match kind {
        CommandKind::Review | CommandKind::Explain | CommandKind::SecurityScan => {
            LONG_FORM_MAX_TOKENS
        }
        CommandKind::Commit | CommandKind::Daily => SHORT_FORM_MAX_TOKENS,
    }
}

/// Line introducing the fenced payload.
fn payload_heading(target: &ResolvedTarget) -> String {
    match target.source {
        SourceKind::BranchDiff | SourceKind::StagedDiff | SourceKind::UnstagedDiff => {
            "Git diff:".to_string()
        }
        SourceKind::SingleFile => format!("File: {}", target.label),
        SourceKind::FileSet => "Changed files:".to_string(),
        SourceKind::BranchNames => "Branch names:".to_string(),
    }
}

/// Build the prompt for `kind` around `target`'s payload.
pub fn assemble(kind: CommandKind, target: &ResolvedTarget) -> PromptRequest {
    let text = format!(
        "{}\n\n{}\n```\n{}\n```",
        instructions(kind),
        payload_heading(target),
        target.payload
    );

    PromptRequest {
        kind,
        text,
        max_tokens: max_tokens(kind),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(source: SourceKind, label: &str, payload: &str) -> ResolvedTarget {
        ResolvedTarget {
            label: label.to_string(),
            payload: payload.to_string(),
            source,
            items: Vec::new(),
        }
    }

    #[test]
    fn test_payload_embedded_verbatim_once() {
        let payload = "diff --git a/x b/x\n+  **not markdown**\n-```inner```";
        let request = assemble(CommandKind::Review, &target(SourceKind::BranchDiff, "feat", payload));

        assert_eq!(request.text.matches(payload).count(), 1);
        assert!(request.text.starts_with(REVIEW_INSTRUCTIONS));
        assert!(request.text.ends_with(&format!("Git diff:\n```\n{}\n```", payload)));
    }

    #[test]
    fn test_assemble_is_deterministic() {
        let t = target(SourceKind::FileSet, "2 changed file(s)", "=== a.js ===\nx");
        assert_eq!(
            assemble(CommandKind::SecurityScan, &t),
            assemble(CommandKind::SecurityScan, &t)
        );
    }

    #[test]
    fn test_token_budgets() {
        let t = target(SourceKind::StagedDiff, "staged", "+x");
        assert_eq!(assemble(CommandKind::Commit, &t).max_tokens, 1024);
        assert_eq!(assemble(CommandKind::Daily, &t).max_tokens, 1024);
        assert_eq!(assemble(CommandKind::Review, &t).max_tokens, 4096);
        assert_eq!(assemble(CommandKind::Explain, &t).max_tokens, 4096);
        assert_eq!(assemble(CommandKind::SecurityScan, &t).max_tokens, 4096);
    }

    #[test]
    fn test_headings_follow_source() {
        let explain = assemble(CommandKind::Explain, &target(SourceKind::SingleFile, "main.rs", "fn main() {}"));
        assert!(explain.text.contains("File: main.rs\n```\nfn main() {}\n```"));
        assert!(explain.text.contains("**Key Components**"));

        let daily = assemble(
            CommandKind::Daily,
            &target(SourceKind::BranchNames, "2 branch(es)", "- feature/a\n- fix/b"),
        );
        assert!(daily.text.contains("Branch names:\n```\n- feature/a\n- fix/b\n```"));

        let scan = assemble(CommandKind::SecurityScan, &target(SourceKind::FileSet, "1", "=== a ===\n"));
        assert!(scan.text.contains("Changed files:"));
        assert!(scan.text.contains("Order findings by severity (Critical first)."));
    }

    #[test]
    fn test_commit_rules_present() {
        let request = assemble(CommandKind::Commit, &target(SourceKind::UnstagedDiff, "unstaged", "+x"));
        assert!(request.text.contains("Conventional Commits"));
        assert!(request.text.contains("Output ONLY the commit message"));
    }
}
