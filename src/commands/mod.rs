//! Command parsing for slash commands.
//!
//! This module provides types and parsing for the commands that users issue
//! via GitHub issue/PR comments to drive the Git for Windows pipelines.
//!
//! # Supported Commands
//!
//! - `/hi` - Says hi back
//! - `/open pr` - Opens the package-update PR(s) for a new-version issue
//! - `/updpkgsums` - Updates the checksums of a package PR
//! - `/deploy [<package>]` - Builds and deploys a package
//! - `/git-artifacts`, `/mingit-artifacts` - Tags the PR head and builds the artifacts
//! - `/release`, `/prepare-embargoed-release`, `/publish-embargoed-release`
//! - `/add relnote [<type> <message>]` - Adds a release note
//!
//! # Example
//!
//! ```
//! use gfw_helper::commands::{parse_command, Command};
//!
//! assert_eq!(parse_command("/hi"), Some(Command::Hi));
//! assert_eq!(
//!     parse_command("/mingit-artifacts"),
//!     Some(Command::GitArtifacts { mingit_only: true, release_date: None })
//! );
//! assert_eq!(parse_command("LGTM!"), None);
//! ```

mod parser;
mod types;

pub use parser::parse_command;
pub use types::{Command, ExplicitNote};
