//! Security blocker
//!
//! PreToolUse handler over Bash, Write and Edit:
//! - Blocks dangerous shell commands (root deletes, raw disk writes, fork
//!   bombs, force pushes to main, package publishing)
//! - Blocks commands that look like they carry a secret
//! - Blocks writes to credential files
//! - Blocks writes outside the project and scratch directories
//!
//! Everything is decided from the event alone; nothing touches the
//! filesystem.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use regex::{Regex, RegexBuilder};

use crate::core::{paths, GuardError, GuardResult};
use crate::hooks::{CallEvent, Handler, Phase, ToolCall, Verdict};

/// Default scratch directory writes may also target
pub const DEFAULT_SCRATCH_DIR: &str = "/tmp";

/// File names that may never be written, wherever they live
pub const PROTECTED_FILES: &[&str] = &[
    ".env",
    ".env.local",
    ".env.production",
    ".env.development",
    ".env.staging",
    "credentials.json",
    "serviceAccountKey.json",
    "id_rsa",
    "id_ed25519",
    "id_ecdsa",
    ".npmrc",
    ".pypirc",
    "secrets.yml",
    "secrets.yaml",
];

/// How a rule recognises a command
#[derive(Debug, Clone)]
pub enum RulePattern {
    /// Plain substring
    Literal(&'static str),
    /// Regular expression
    Regex(Regex),
}

/// A named pattern checked against shell commands
#[derive(Debug, Clone)]
pub struct PolicyRule {
    name: &'static str,
    pattern: RulePattern,
}

impl PolicyRule {
    /// Rule matching a literal substring
    pub fn literal(name: &'static str, text: &'static str) -> Self {
        Self {
            name,
            pattern: RulePattern::Literal(text),
        }
    }

    /// Rule matching a regular expression
    pub fn regex(name: &'static str, pattern: &str) -> GuardResult<Self> {
        Ok(Self {
            name,
            pattern: RulePattern::Regex(Regex::new(pattern)?),
        })
    }

    /// Rule matching a regular expression, ignoring case
    pub fn regex_ignore_case(name: &'static str, pattern: &str) -> GuardResult<Self> {
        let regex = RegexBuilder::new(pattern).case_insensitive(true).build()?;
        Ok(Self {
            name,
            pattern: RulePattern::Regex(regex),
        })
    }

    pub fn name(&self) -> &str {
        self.name
    }

    /// Pattern source as written
    pub fn source(&self) -> &str {
        match &self.pattern {
            RulePattern::Literal(text) => text,
            RulePattern::Regex(regex) => regex.as_str(),
        }
    }

    pub fn matches(&self, command: &str) -> bool {
        match &self.pattern {
            RulePattern::Literal(text) => command.contains(text),
            RulePattern::Regex(regex) => regex.is_match(command),
        }
    }
}

/// Destructive operations, most severe category, checked first
pub fn dangerous_command_rules() -> GuardResult<Vec<PolicyRule>> {
    Ok(vec![
        PolicyRule::literal("recursive delete of filesystem root", "rm -rf /"),
        PolicyRule::literal("recursive delete of home directory", "rm -rf ~"),
        PolicyRule::literal("recursive delete of home directory", "rm -rf $HOME"),
        PolicyRule::literal("raw disk overwrite", "> /dev/sda"),
        PolicyRule::literal("raw disk copy", "dd if="),
        PolicyRule::literal("filesystem format", "mkfs"),
        PolicyRule::literal("fork bomb", ":(){:|:&};:"),
        PolicyRule::literal("root protection override", "--no-preserve-root"),
        PolicyRule::literal("world-writable filesystem root", "chmod -R 777 /"),
        PolicyRule::literal("database drop", "DROP DATABASE"),
        PolicyRule::literal("table drop", "DROP TABLE"),
        PolicyRule::regex(
            "force push to protected branch",
            r"git push.+(-f|--force).+(main|master)",
        )?,
        PolicyRule::regex("package publish", r"npm publish|pnpm publish|yarn publish")?,
    ])
}

/// Assignment-style secrets and provider key shapes
pub fn secret_rules() -> GuardResult<Vec<PolicyRule>> {
    Ok(vec![
        PolicyRule::regex_ignore_case("password", r"password=")?,
        PolicyRule::regex_ignore_case("secret", r"secret=")?,
        PolicyRule::regex_ignore_case("api key", r"api_key=")?,
        PolicyRule::regex_ignore_case("api key", r"apikey=")?,
        PolicyRule::regex_ignore_case("token", r"token=")?,
        PolicyRule::regex_ignore_case("AWS access key", r"aws_access_key")?,
        PolicyRule::regex_ignore_case("AWS secret", r"aws_secret")?,
        PolicyRule::regex_ignore_case("private key", r"private_key")?,
        PolicyRule::regex("provider API key", r"sk-[a-zA-Z0-9]{20,}")?,
    ])
}

/// PreToolUse security handler
#[derive(Debug, Clone)]
pub struct SecurityBlockerHook {
    project_root: PathBuf,
    scratch_dir: PathBuf,
    dangerous: Vec<PolicyRule>,
    secrets: Vec<PolicyRule>,
    protected_files: HashSet<&'static str>,
}

impl SecurityBlockerHook {
    /// Create the handler for a project
    ///
    /// `project_root` must be absolute. Relative paths in events are
    /// resolved against it.
    pub fn new(project_root: impl Into<PathBuf>) -> GuardResult<Self> {
        let project_root = project_root.into();
        if !project_root.is_absolute() {
            return Err(GuardError::invalid_config(format!(
                "project root must be absolute: {}",
                project_root.display()
            )));
        }

        Ok(Self {
            project_root: paths::normalize(&project_root),
            scratch_dir: PathBuf::from(DEFAULT_SCRATCH_DIR),
            dangerous: dangerous_command_rules()?,
            secrets: secret_rules()?,
            protected_files: PROTECTED_FILES.iter().copied().collect(),
        })
    }

    /// Replace the scratch directory (default `/tmp`)
    pub fn with_scratch_dir(mut self, scratch_dir: impl AsRef<Path>) -> Self {
        self.scratch_dir = paths::resolve(&self.project_root, scratch_dir.as_ref());
        self
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// Deny reason for a shell command, if any
    ///
    /// Dangerous operations are checked before secrets, so the reported
    /// reason is the more severe one when both apply.
    pub fn check_command(&self, command: &str) -> Option<String> {
        if let Some(rule) = self.dangerous.iter().find(|rule| rule.matches(command)) {
            return Some(format!(
                "Security: Dangerous pattern ({}): {}",
                rule.name(),
                rule.source()
            ));
        }

        self.secrets
            .iter()
            .find(|rule| rule.matches(command))
            .map(|rule| {
                format!(
                    "Security: Potential secret in command ({}): {}",
                    rule.name(),
                    rule.source()
                )
            })
    }

    /// Deny reason for writing `file_path`, if any
    pub fn check_write(&self, file_path: &Path) -> Option<String> {
        if let Some(name) = paths::base_name(file_path) {
            if self.protected_files.contains(name) {
                return Some(format!("Security: Cannot modify protected file: {}", name));
            }
        }

        let resolved = paths::resolve(&self.project_root, file_path);
        if !resolved.starts_with(&self.project_root) && !resolved.starts_with(&self.scratch_dir) {
            return Some(format!(
                "Security: Cannot write outside project directory. File: {}, Project: {}",
                file_path.display(),
                self.project_root.display()
            ));
        }

        None
    }
}

#[async_trait]
impl Handler for SecurityBlockerHook {
    fn name(&self) -> &str {
        "security-blocker"
    }

    async fn evaluate(&self, event: &CallEvent) -> GuardResult<Verdict> {
        if event.is_cancelled() || event.phase() != Phase::Pre {
            return Ok(Verdict::Continue);
        }

        let reason = match event.call() {
            ToolCall::Bash { command } => self.check_command(command),
            ToolCall::Write { file_path } | ToolCall::Edit { file_path } => {
                if file_path.as_os_str().is_empty() {
                    None
                } else {
                    self.check_write(file_path)
                }
            }
            ToolCall::Read { .. } | ToolCall::Other => None,
        };

        Ok(reason.map(Verdict::deny).unwrap_or_default())
    }
}
