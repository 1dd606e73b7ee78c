use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::utils;

/// Session-wide settings of an [`SftpClient`](super::SftpClient)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientOptions {
    /// Maximum response time in seconds for listings and commands.
    /// File transfers are not limited.
    pub timeout: u64,
    /// When `stat` finds no exact name match, accept the single entry whose
    /// name starts with the requested one
    pub prefix_fallback: bool,
    /// Longest symlink chain followed before giving up
    pub max_symlink_depth: usize,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout: 10,
            prefix_fallback: false,
            max_symlink_depth: 32,
        }
    }
}

impl ClientOptions {
    pub(crate) fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    #[must_use]
    pub fn prefix_fallback(mut self, enabled: bool) -> Self {
        self.prefix_fallback = enabled;
        self
    }

    #[must_use]
    pub fn max_symlink_depth(mut self, depth: usize) -> Self {
        self.max_symlink_depth = depth;
        self
    }
}

/// Settings of a directory walk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalkOptions {
    /// Emit a directory before its subdirectories
    pub topdown: bool,
    /// Classify symlinks by their target and descend into linked directories
    pub follow_symlinks: bool,
    /// Silently skip directories the server refuses to list
    pub skip_restricted: bool,
    /// Sort names, otherwise keep the server order
    pub sort: bool,
    /// Drop entries whose name starts with `hide_marker`
    pub ignore_hidden: bool,
    pub hide_marker: String,
}

impl Default for WalkOptions {
    fn default() -> Self {
        Self {
            topdown: true,
            follow_symlinks: false,
            skip_restricted: true,
            sort: true,
            ignore_hidden: false,
            hide_marker: ".".to_owned(),
        }
    }
}

impl WalkOptions {
    #[must_use]
    pub fn topdown(mut self, topdown: bool) -> Self {
        self.topdown = topdown;
        self
    }

    #[must_use]
    pub fn follow_symlinks(mut self, follow: bool) -> Self {
        self.follow_symlinks = follow;
        self
    }

    #[must_use]
    pub fn skip_restricted(mut self, skip: bool) -> Self {
        self.skip_restricted = skip;
        self
    }

    #[must_use]
    pub fn sort(mut self, sort: bool) -> Self {
        self.sort = sort;
        self
    }

    #[must_use]
    pub fn ignore_hidden(mut self, ignore: bool) -> Self {
        self.ignore_hidden = ignore;
        self
    }

    #[must_use]
    pub fn hide_marker<M: Into<String>>(mut self, marker: M) -> Self {
        self.hide_marker = marker.into();
        self
    }

    pub(crate) fn is_hidden(&self, name: &str) -> bool {
        self.ignore_hidden && utils::is_hidden(name, &self.hide_marker)
    }
}

/// What to do with a name that already exists at the destination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictPolicy {
    /// Abort, listing every conflicting path
    #[default]
    Error,
    /// Replace the existing entry
    Overwrite,
    /// Leave the existing entry untouched
    Skip,
}

/// `None` errors, `Some(true)` overwrites and `Some(false)` skips
impl From<Option<bool>> for ConflictPolicy {
    fn from(force: Option<bool>) -> Self {
        match force {
            None => Self::Error,
            Some(true) => Self::Overwrite,
            Some(false) => Self::Skip,
        }
    }
}

/// Settings of an upload or download.
///
/// With `merge` existing directories are always reused and the policy only
/// decides about files.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncOptions {
    pub merge: bool,
    pub policy: ConflictPolicy,
    pub ignore_hidden: bool,
    pub hide_marker: Option<String>,
}

impl SyncOptions {
    #[must_use]
    pub fn merge(mut self, merge: bool) -> Self {
        self.merge = merge;
        self
    }

    #[must_use]
    pub fn policy<P: Into<ConflictPolicy>>(mut self, policy: P) -> Self {
        self.policy = policy.into();
        self
    }

    #[must_use]
    pub fn ignore_hidden(mut self, ignore: bool) -> Self {
        self.ignore_hidden = ignore;
        self
    }

    #[must_use]
    pub fn hide_marker<M: Into<String>>(mut self, marker: M) -> Self {
        self.hide_marker = Some(marker.into());
        self
    }

    pub(crate) fn is_hidden(&self, name: &str) -> bool {
        self.ignore_hidden && utils::is_hidden(name, self.hide_marker.as_deref().unwrap_or("."))
    }
}
