//! Text command matching and argument parsing.
//!
//! Commands are plain messages of the form `<prefix><name> arg arg ...`.
//! Matching is case-insensitive; arguments are whitespace-separated tokens
//! with their original casing.
//!
//! ```rust,ignore
//! if command::matches("r.", "log", false, &msg.content) {
//!     let mut args = command::parse_args("r.", &msg.content);
//!     let section = args.pop();
//! }
//! ```

use std::collections::VecDeque;
use std::sync::LazyLock;

use regex::Regex;
use rikka_core::Snowflake;

use crate::dispatcher::DispatcherBuilder;
use crate::error::{ArgsError, ArgsResult};

/// Matches a channel mention such as `<#319588744023769089>`.
pub static CHANNEL_MENTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^<#!?(\d+)>$").expect("valid channel mention regex"));

/// Matches a user mention such as `<@105484726235607040>` or `<@!105484726235607040>`.
pub static USER_MENTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^<@!?(\d+)>$").expect("valid user mention regex"));

/// A component that installs registrations on a dispatcher during startup.
pub trait Command: Send + Sync {
    /// Adds this command's registrations to `builder`.
    fn register(&self, builder: &mut DispatcherBuilder);
}

/// Returns `true` if `text` invokes `command`.
///
/// The trimmed text must start with `prefix` unless `private` is set (direct
/// messages may omit it). What remains must equal the command name or start
/// with the name followed by a space.
pub fn matches(prefix: &str, command: &str, private: bool, text: &str) -> bool {
    let lower = text.trim().to_lowercase();
    let lower_prefix = prefix.to_lowercase();

    let rest = match lower.strip_prefix(lower_prefix.as_str()) {
        Some(rest) => rest,
        None if private => lower.as_str(),
        None => return false,
    };

    let rest = rest.trim();
    let command = command.to_lowercase();
    rest == command
        || rest
            .strip_prefix(command.as_str())
            .is_some_and(|tail| tail.starts_with(' '))
}

/// Splits a command invocation into its arguments.
///
/// The prefix (if present) is stripped, the text is split on whitespace runs
/// and the command name itself is dropped.
pub fn parse_args(prefix: &str, text: &str) -> Args {
    let text = text.trim();
    let rest = strip_prefix_ignore_case(text, prefix).unwrap_or(text);

    let mut tokens = rest.split_whitespace();
    tokens.next();
    Args(tokens.map(str::to_string).collect())
}

fn strip_prefix_ignore_case<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    let head = text.get(..prefix.len())?;
    (head.to_lowercase() == prefix.to_lowercase()).then(|| &text[prefix.len()..])
}

/// Parses a raw numeric id or a mention matched by `pattern`.
///
/// A string the pattern does not match is parsed as a bare id.
pub fn extract_id(pattern: &Regex, s: &str) -> ArgsResult<Snowflake> {
    let raw = pattern
        .captures(s)
        .and_then(|c| c.get(1))
        .map_or(s, |m| m.as_str());
    raw.parse().map_err(|_| ArgsError::InvalidId {
        value: s.to_string(),
    })
}

// ============================================================================
// Args
// ============================================================================

/// The arguments of a command invocation, consumed from the front.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Args(VecDeque<String>);

impl Args {
    /// Removes and returns the next argument.
    pub fn pop(&mut self) -> Option<String> {
        self.0.pop_front()
    }

    /// Removes the next argument, failing with `what` when there is none.
    pub fn require(&mut self, what: &'static str) -> ArgsResult<String> {
        self.pop().ok_or(ArgsError::Missing(what))
    }

    /// Returns the next argument without consuming it.
    pub fn peek(&self) -> Option<&str> {
        self.0.front().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Joins the remaining arguments with single spaces.
    pub fn rest(&self) -> String {
        self.0.iter().map(String::as_str).collect::<Vec<_>>().join(" ")
    }
}

impl From<Vec<String>> for Args {
    fn from(v: Vec<String>) -> Self {
        Self(v.into())
    }
}

impl IntoIterator for Args {
    type Item = String;
    type IntoIter = std::collections::vec_deque::IntoIter<String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
