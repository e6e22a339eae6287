//! Command identities and name normalization.
//!
//! A [`CommandIdentity`] is the dotted path of a node in the command tree,
//! e.g. `user.create`. Identities are derived from where a command was
//! discovered and never change afterwards.

use serde::{Serialize, Serializer};
use std::fmt;

/// Normalizes a directory, module or command name.
///
/// Names are lowercased and hyphens become underscores, so `User-Admin`
/// and `user_admin` address the same node.
///
/// ```
/// use cmdtree::normalize_name;
///
/// assert_eq!(normalize_name("User-Admin"), "user_admin");
/// ```
pub fn normalize_name(raw: &str) -> String {
    raw.trim()
        .chars()
        .map(|c| if c == '-' { '_' } else { c.to_ascii_lowercase() })
        .collect()
}

/// True for a normalized name usable as a command or group: non-empty and
/// made of ASCII letters, digits and `_`.
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Dotted path uniquely identifying a node in the command hierarchy.
///
/// The root of the tree has the empty identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CommandIdentity {
    segments: Vec<String>,
}

impl CommandIdentity {
    /// The identity of the tree root.
    pub fn root() -> Self {
        Self::default()
    }

    /// Builds an identity from already-split segments, normalizing each one.
    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            segments: segments
                .into_iter()
                .map(|s| normalize_name(s.as_ref()))
                .filter(|s| !s.is_empty())
                .collect(),
        }
    }

    /// Parses a dot-separated identity such as `"user.create"`.
    ///
    /// The empty string parses to the root identity.
    pub fn parse(dotted: &str) -> Self {
        Self::from_segments(dotted.split('.'))
    }

    /// Returns the identity of a direct child named `name`.
    pub fn child(&self, name: &str) -> Self {
        let mut segments = self.segments.clone();
        segments.push(normalize_name(name));
        Self { segments }
    }

    /// Returns the identity of the parent node, or `None` for the root.
    pub fn parent(&self) -> Option<Self> {
        if self.segments.is_empty() {
            return None;
        }
        let mut segments = self.segments.clone();
        segments.pop();
        Some(Self { segments })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// The last segment, which is also the node's display name.
    pub fn name(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn depth(&self) -> usize {
        self.segments.len()
    }
}

impl fmt::Display for CommandIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("."))
    }
}

impl From<&str> for CommandIdentity {
    fn from(dotted: &str) -> Self {
        Self::parse(dotted)
    }
}

impl Serialize for CommandIdentity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
