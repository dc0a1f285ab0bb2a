//! Built-in policy handlers
//!
//! This module provides:
//! - `SecurityBlockerHook` - dangerous commands, secrets, protected files
//! - `FileRestrictionHook` - confine writes to one file
//! - `SandboxRedirectHook` - rewrite write targets into a sandbox
//! - `EnvProtectionHook` - keep `.env` files out of reads
//! - `DispatchHook` - route to sub-handlers by extension and tool
//! - `rewrite` - Bash input rewriting (flag stripping, env injection)
//! - `external` - formatter and checker processes run after writes

mod dispatch;
mod env_protection;
mod file_restriction;
mod sandbox;

pub mod external;
pub mod rewrite;
pub mod security;

pub use dispatch::DispatchHook;
pub use env_protection::EnvProtectionHook;
pub use file_restriction::FileRestrictionHook;
pub use sandbox::SandboxRedirectHook;
pub use security::{PolicyRule, SecurityBlockerHook};

pub use external::{AutoFormatHook, DiagnosticsHook, ExternalCommand, RunOutcome};
pub use rewrite::{EnvInjectorHook, StripDangerousFlagsHook};
