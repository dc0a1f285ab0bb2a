//! Guard configuration
//!
//! Configuration types for building a [`Pipeline`] from a JSON file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::{paths, GuardError, GuardResult};
use crate::hooks::{HookRegistry, Phase, Pipeline};
use crate::policies::external::{DEFAULT_TIMEOUT_MS, PRETTIER_EXTENSIONS};
use crate::policies::{
    AutoFormatHook, DiagnosticsHook, DispatchHook, EnvInjectorHook, EnvProtectionHook,
    ExternalCommand, FileRestrictionHook, SandboxRedirectHook, SecurityBlockerHook,
    StripDangerousFlagsHook,
};
use crate::policies::security::DEFAULT_SCRATCH_DIR;

/// An external program run after file writes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandConfig {
    /// Name shown in annotations and logs
    #[serde(default)]
    pub label: String,

    /// Program to run; paths with a directory part are resolved against the
    /// project root, bare names are looked up on `PATH`
    pub program: String,

    /// Arguments; `{file}` is replaced with the edited file
    #[serde(default)]
    pub args: Vec<String>,

    /// Extensions this command applies to (empty = every written file)
    #[serde(default)]
    pub extensions: Vec<String>,
}

impl CommandConfig {
    pub fn new(label: impl Into<String>, program: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            program: program.into(),
            args: Vec::new(),
            extensions: Vec::new(),
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = extensions.into_iter().map(Into::into).collect();
        self
    }
}

/// Configuration for one guarded project
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardConfig {
    /// Absolute project root; relative paths in events resolve against it
    pub project_root: PathBuf,

    /// Directory writes may target besides the project
    #[serde(default = "default_scratch_dir")]
    pub scratch_dir: PathBuf,

    /// When set, Write/Edit may only target this file
    #[serde(default)]
    pub allowed_file: Option<PathBuf>,

    /// When set, writes outside this directory are redirected into it
    #[serde(default)]
    pub sandbox_root: Option<PathBuf>,

    /// Variables prefixed to every Bash command
    #[serde(default)]
    pub inject_env: BTreeMap<String, String>,

    #[serde(default)]
    pub strip_dangerous_flags: bool,

    #[serde(default = "default_true")]
    pub protect_env_files: bool,

    /// Use the project's Prettier when no formatter is configured
    #[serde(default = "default_true")]
    pub auto_format: bool,

    #[serde(default)]
    pub formatter: Option<CommandConfig>,

    /// Checkers whose complaints are annotated after writes
    #[serde(default)]
    pub checks: Vec<CommandConfig>,

    /// Timeout for formatter and checker processes in milliseconds
    #[serde(default = "default_external_timeout_ms")]
    pub external_timeout_ms: u64,
}

fn default_scratch_dir() -> PathBuf {
    PathBuf::from(DEFAULT_SCRATCH_DIR)
}

fn default_true() -> bool {
    true
}

fn default_external_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

impl GuardConfig {
    /// Defaults for a project
    pub fn for_project(project_root: impl Into<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
            scratch_dir: default_scratch_dir(),
            allowed_file: None,
            sandbox_root: None,
            inject_env: BTreeMap::new(),
            strip_dangerous_flags: false,
            protect_env_files: true,
            auto_format: true,
            formatter: None,
            checks: Vec::new(),
            external_timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }

    /// Read a JSON configuration file
    pub fn load(path: impl AsRef<Path>) -> GuardResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        tracing::debug!("[Config] Loaded {}", path.display());
        Ok(config)
    }

    /// Check invariants serde cannot express
    pub fn validate(&self) -> GuardResult<()> {
        if !self.project_root.is_absolute() {
            return Err(GuardError::invalid_config(format!(
                "project_root must be absolute: {}",
                self.project_root.display()
            )));
        }

        let mut commands = self.formatter.iter().chain(self.checks.iter());
        if let Some(command) = commands.find(|c| c.program.trim().is_empty()) {
            return Err(GuardError::invalid_config(format!(
                "command '{}' has no program",
                command.label
            )));
        }

        Ok(())
    }

    pub fn with_scratch_dir(mut self, scratch_dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = scratch_dir.into();
        self
    }

    pub fn with_allowed_file(mut self, allowed_file: impl Into<PathBuf>) -> Self {
        self.allowed_file = Some(allowed_file.into());
        self
    }

    pub fn with_sandbox_root(mut self, sandbox_root: impl Into<PathBuf>) -> Self {
        self.sandbox_root = Some(sandbox_root.into());
        self
    }

    /// Add one variable to inject into Bash commands
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.inject_env.insert(key.into(), value.into());
        self
    }

    pub fn with_strip_dangerous_flags(mut self, enabled: bool) -> Self {
        self.strip_dangerous_flags = enabled;
        self
    }

    pub fn with_protect_env_files(mut self, enabled: bool) -> Self {
        self.protect_env_files = enabled;
        self
    }

    pub fn with_auto_format(mut self, enabled: bool) -> Self {
        self.auto_format = enabled;
        self
    }

    pub fn with_formatter(mut self, formatter: CommandConfig) -> Self {
        self.formatter = Some(formatter);
        self
    }

    pub fn with_check(mut self, check: CommandConfig) -> Self {
        self.checks.push(check);
        self
    }

    pub fn with_external_timeout(mut self, timeout_ms: u64) -> Self {
        self.external_timeout_ms = timeout_ms;
        self
    }

    /// Get external timeout as Duration
    pub fn external_timeout(&self) -> Duration {
        Duration::from_millis(self.external_timeout_ms)
    }

    /// Wire every configured policy into a pipeline
    ///
    /// Registration order is fixed: security first, so its denial reason wins
    /// whenever several handlers deny the same call.
    pub fn build_pipeline(&self) -> GuardResult<Pipeline> {
        self.validate()?;
        let root = paths::normalize(&self.project_root);
        let mut registry = HookRegistry::new();

        let security = SecurityBlockerHook::new(&root)?.with_scratch_dir(&self.scratch_dir);
        registry.add_with_pattern(Phase::Pre, "Bash|Write|Edit", security)?;

        if let Some(allowed) = &self.allowed_file {
            registry.add_with_pattern(
                Phase::Pre,
                "Write|Edit",
                FileRestrictionHook::new(allowed, &root),
            )?;
        }

        if let Some(sandbox) = &self.sandbox_root {
            registry.add_with_pattern(
                Phase::Pre,
                "Write|Edit",
                SandboxRedirectHook::new(sandbox, &root),
            )?;
        }

        if self.protect_env_files {
            registry.add_with_pattern(Phase::Pre, "Read", EnvProtectionHook)?;
        }

        if self.strip_dangerous_flags {
            registry.add_with_pattern(Phase::Pre, "Bash", StripDangerousFlagsHook)?;
        }

        if !self.inject_env.is_empty() {
            registry.add_with_pattern(
                Phase::Pre,
                "Bash",
                EnvInjectorHook::new(self.inject_env.clone()),
            )?;
        }

        let mut dispatch = DispatchHook::new();
        for check in &self.checks {
            let label = if check.label.is_empty() {
                check.program.clone()
            } else {
                check.label.clone()
            };
            let hook = DiagnosticsHook::new(label, self.external_command(&root, check));
            dispatch = if check.extensions.is_empty() {
                dispatch.on_tool("Write|Edit", hook)?
            } else {
                dispatch.on_extensions(&check.extensions, hook)
            };
        }
        if !dispatch.is_empty() {
            registry.add_with_pattern(Phase::Post, "Write|Edit", dispatch)?;
        }

        if let Some(formatter) = self.formatter_hook(&root) {
            registry.add_with_pattern(Phase::Post, "Write|Edit", formatter)?;
        }

        tracing::info!(
            "[Config] Pipeline ready for {}: {} pre, {} post handler(s)",
            root.display(),
            registry.hook_count(Phase::Pre),
            registry.hook_count(Phase::Post)
        );

        Ok(Pipeline::new(registry))
    }

    fn external_command(&self, root: &Path, command: &CommandConfig) -> ExternalCommand {
        let program = Path::new(&command.program);
        let program = if program.components().count() > 1 {
            paths::resolve(root, program)
        } else {
            program.to_path_buf()
        };

        ExternalCommand::new(program, root)
            .with_args(command.args.iter().cloned())
            .with_timeout(self.external_timeout())
    }

    fn formatter_hook(&self, root: &Path) -> Option<AutoFormatHook> {
        match &self.formatter {
            Some(formatter) => {
                let command = self.external_command(root, formatter);
                Some(if formatter.extensions.is_empty() {
                    AutoFormatHook::new(command, PRETTIER_EXTENSIONS.iter().copied())
                } else {
                    AutoFormatHook::new(command, &formatter.extensions)
                })
            }
            None if self.auto_format => {
                AutoFormatHook::prettier(root).map(|hook| hook.with_timeout(self.external_timeout()))
            }
            None => None,
        }
    }
}
