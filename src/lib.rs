pub mod core;

// Hooks for intercepting tool calls
pub mod hooks;

// Built-in policy handlers
pub mod policies;

// Command-hook executable support
pub mod config;
pub mod logging;
pub mod protocol;
