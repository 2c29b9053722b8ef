//! Git for Windows helper - a GitHub App that turns slash commands into
//! cascading workflow pipelines.
//!
//! Comments such as `/git-artifacts` or `/deploy` start GitHub Actions
//! workflows in the automation repository. Their outcome is mirrored as check
//! runs on the commit being built, and completed check runs trigger the next
//! stage. Progress is reported by editing the comment that started it all.

pub mod accessors;
pub mod cascade;
pub mod commands;
pub mod components;
pub mod config;
pub mod correlate;
pub mod effects;
pub mod error;
pub mod github;
pub mod locator;
pub mod router;
pub mod server;
pub mod types;
pub mod webhooks;
pub mod wire;

#[cfg(test)]
mod test_utils;
