//! Hook Registry
//!
//! Contains:
//! - `Handler` trait - for implementing policy handlers
//! - `HookMatcher` - selects events by tool name and file shape
//! - `HookRegistration` - a matcher plus its ordered handlers
//! - `HandlerTable` - ordered registrations for one phase (the router)
//! - `HookRegistry` - one table per phase

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use regex::Regex;

use super::types::{CallEvent, Phase, Verdict};
use crate::core::{paths, GuardResult};

/// Trait for policy handlers
///
/// A handler inspects an event and returns a verdict. It must not mutate
/// shared state, and it must return `Verdict::Continue` straight away when
/// the event's cancellation token is set. Returning `Err` is a fault: the
/// composer logs it and treats it as `Continue`.
#[async_trait]
pub trait Handler: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &str {
        "handler"
    }

    /// Evaluate the event
    async fn evaluate(&self, event: &CallEvent) -> GuardResult<Verdict>;
}

/// Implement Handler for synchronous closures
///
/// Uses Higher-Ranked Trait Bounds (HRTB) so the closure accepts an event of
/// any lifetime.
#[async_trait]
impl<F> Handler for F
where
    F: for<'a> Fn(&'a CallEvent) -> Verdict + Send + Sync,
{
    fn name(&self) -> &str {
        "closure"
    }

    async fn evaluate(&self, event: &CallEvent) -> GuardResult<Verdict> {
        if event.is_cancelled() {
            return Ok(Verdict::Continue);
        }
        Ok((self)(event))
    }
}

/// Type alias for stored handlers
pub type ArcHandler = Arc<dyn Handler>;

/// Selects which events a registration applies to
///
/// All configured criteria must hold. A matcher with no criteria matches
/// every event.
#[derive(Clone, Default)]
pub struct HookMatcher {
    /// Anchored tool-name pattern (None = any tool)
    tool: Option<Regex>,

    /// Lowercase extensions with leading dot (None = any file or no file)
    extensions: Option<Vec<String>>,

    /// Path shape (None = any file or no file)
    path_glob: Option<glob::Pattern>,
}

impl HookMatcher {
    /// Create a matcher that matches every event
    pub fn all() -> Self {
        Self::default()
    }

    /// Create a matcher on tool name
    ///
    /// Pattern examples:
    /// - `"Bash"` - only Bash
    /// - `"Write|Edit"` - either tool
    /// - `"mcp__.*"` - all MCP tools
    /// - `"*"` or `""` - any tool
    ///
    /// The pattern must match the whole tool name.
    pub fn tool(pattern: &str) -> GuardResult<Self> {
        Ok(Self {
            tool: compile_tool_pattern(pattern)?,
            ..Self::default()
        })
    }

    /// Create a matcher on the extension of the event's path argument
    ///
    /// Extensions are compared case-insensitively; the leading dot is
    /// optional (`"ts"` and `".ts"` are the same).
    pub fn extensions<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::all().and_extensions(extensions)
    }

    /// Create a matcher on the shape of the event's path argument
    ///
    /// Paths in events are usually absolute, so patterns should be absolute
    /// too or start with `**/`.
    pub fn path_glob(pattern: &str) -> GuardResult<Self> {
        Self::all().and_path_glob(pattern)
    }

    /// Additionally require one of these extensions
    pub fn and_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.extensions = Some(
            extensions
                .into_iter()
                .map(|ext| paths::normalize_extension(ext.as_ref()))
                .collect(),
        );
        self
    }

    /// Additionally require the path to match a glob
    pub fn and_path_glob(mut self, pattern: &str) -> GuardResult<Self> {
        self.path_glob = Some(glob::Pattern::new(pattern)?);
        Ok(self)
    }

    /// Check the tool-name criterion only
    pub fn matches_tool(&self, tool_name: &str) -> bool {
        match &self.tool {
            Some(regex) => regex.is_match(tool_name),
            None => true,
        }
    }

    /// Check if this matcher applies to an event
    ///
    /// File criteria never fire for events without a path argument.
    pub fn matches(&self, event: &CallEvent) -> bool {
        if !self.matches_tool(event.tool_name()) {
            return false;
        }

        if let Some(extensions) = &self.extensions {
            match event.extension() {
                Some(ext) if extensions.contains(&ext) => {}
                _ => return false,
            }
        }

        if let Some(pattern) = &self.path_glob {
            match event.file_path() {
                Some(path) if pattern.matches_path(path) => {}
                _ => return false,
            }
        }

        true
    }
}

fn compile_tool_pattern(pattern: &str) -> GuardResult<Option<Regex>> {
    let pattern = pattern.trim();
    if pattern.is_empty() || pattern == "*" {
        return Ok(None);
    }
    Ok(Some(Regex::new(&format!("^(?:{})$", pattern))?))
}

impl std::fmt::Debug for HookMatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookMatcher")
            .field("tool", &self.tool.as_ref().map(|r| r.as_str()))
            .field("extensions", &self.extensions)
            .field("path_glob", &self.path_glob.as_ref().map(|p| p.as_str()))
            .finish()
    }
}

/// A matcher paired with the handlers it guards, in registration order
#[derive(Clone)]
pub struct HookRegistration {
    matcher: HookMatcher,
    handlers: Vec<ArcHandler>,
}

impl HookRegistration {
    /// Create an empty registration
    pub fn new(matcher: HookMatcher) -> Self {
        Self {
            matcher,
            handlers: Vec::new(),
        }
    }

    /// Append a handler
    pub fn with_handler<H: Handler + 'static>(mut self, handler: H) -> Self {
        self.handlers.push(Arc::new(handler));
        self
    }

    /// Append an already shared handler
    pub fn with_arc(mut self, handler: ArcHandler) -> Self {
        self.handlers.push(handler);
        self
    }

    pub fn handlers(&self) -> &[ArcHandler] {
        &self.handlers
    }
}

impl std::fmt::Debug for HookRegistration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookRegistration")
            .field("matcher", &self.matcher)
            .field(
                "handlers",
                &self.handlers.iter().map(|h| h.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// Ordered registrations: the router for one phase
///
/// Matching is side-effect free and keeps registration order. Nothing is
/// reordered or deduplicated.
#[derive(Debug, Clone, Default)]
pub struct HandlerTable {
    registrations: Vec<HookRegistration>,
}

impl HandlerTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one handler under a matcher
    pub fn add<H: Handler + 'static>(&mut self, matcher: HookMatcher, handler: H) -> &mut Self {
        self.registrations
            .push(HookRegistration::new(matcher).with_handler(handler));
        self
    }

    /// Register a pre-built registration
    pub fn add_registration(&mut self, registration: HookRegistration) -> &mut Self {
        self.registrations.push(registration);
        self
    }

    /// Handlers that apply to `event`, in registration order
    pub fn matching(&self, event: &CallEvent) -> Vec<ArcHandler> {
        self.registrations
            .iter()
            .filter(|registration| registration.matcher.matches(event))
            .flat_map(|registration| registration.handlers.iter().cloned())
            .collect()
    }

    /// Total number of handlers across registrations
    pub fn handler_count(&self) -> usize {
        self.registrations.iter().map(|r| r.handlers.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.handler_count() == 0
    }
}

/// Central registry: one handler table per phase
///
/// # Example
///
/// ```
/// use agent_guard::hooks::{HookRegistry, Phase, Verdict};
///
/// let mut hooks = HookRegistry::new();
///
/// hooks
///     .add_with_pattern(Phase::Pre, "Bash", |event: &agent_guard::hooks::CallEvent| {
///         match event.call() {
///             agent_guard::hooks::ToolCall::Bash { command } if command.contains("rm -rf") => {
///                 Verdict::deny("Dangerous command blocked")
///             }
///             _ => Verdict::Continue,
///         }
///     })
///     .unwrap();
///
/// assert_eq!(hooks.hook_count(Phase::Pre), 1);
/// ```
#[derive(Default)]
pub struct HookRegistry {
    tables: HashMap<Phase, HandlerTable>,
}

impl HookRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a handler that matches every event of a phase
    pub fn add<H: Handler + 'static>(&mut self, phase: Phase, handler: H) -> &mut Self {
        self.table_mut(phase).add(HookMatcher::all(), handler);
        self
    }

    /// Add a handler with a tool name pattern
    pub fn add_with_pattern<H: Handler + 'static>(
        &mut self,
        phase: Phase,
        pattern: &str,
        handler: H,
    ) -> GuardResult<&mut Self> {
        let matcher = HookMatcher::tool(pattern)?;
        self.table_mut(phase).add(matcher, handler);
        Ok(self)
    }

    /// Add a handler under a pre-built matcher
    pub fn add_matcher<H: Handler + 'static>(
        &mut self,
        phase: Phase,
        matcher: HookMatcher,
        handler: H,
    ) -> &mut Self {
        self.table_mut(phase).add(matcher, handler);
        self
    }

    /// Add a pre-built registration
    pub fn add_registration(&mut self, phase: Phase, registration: HookRegistration) -> &mut Self {
        self.table_mut(phase).add_registration(registration);
        self
    }

    /// Check if there are any handlers for a phase
    pub fn has_hooks(&self, phase: Phase) -> bool {
        self.tables
            .get(&phase)
            .map(|table| !table.is_empty())
            .unwrap_or(false)
    }

    /// Get the number of handlers for a phase
    pub fn hook_count(&self, phase: Phase) -> usize {
        self.tables
            .get(&phase)
            .map(|table| table.handler_count())
            .unwrap_or(0)
    }

    /// Handlers that apply to `event`, in registration order
    pub fn matching(&self, event: &CallEvent) -> Vec<ArcHandler> {
        self.tables
            .get(&event.phase())
            .map(|table| table.matching(event))
            .unwrap_or_default()
    }

    fn table_mut(&mut self, phase: Phase) -> &mut HandlerTable {
        self.tables.entry(phase).or_default()
    }
}

impl std::fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut map = f.debug_map();
        for (phase, table) in &self.tables {
            map.entry(phase, &table.handler_count());
        }
        map.finish()
    }
}
