use std::fmt;

use crate::utils::quote;

/// Listing flavour requested from the transport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListMode {
    /// One `ls -l` style line per entry, used for stat queries
    Long,
    /// Bare entry names, one per line
    Names,
}

/// Mutating requests sent through the transport.
///
/// Paths are literal, unescaped POSIX paths. [`Display`](fmt::Display)
/// renders the raw quote command understood by SFTP servers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    MakeDir(String),
    RemoveDir(String),
    Remove(String),
    Rename { from: String, to: String },
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MakeDir(path) => write!(f, "mkdir {}", quote(path)),
            Self::RemoveDir(path) => write!(f, "rmdir {}", quote(path)),
            Self::Remove(path) => write!(f, "rm {}", quote(path)),
            Self::Rename { from, to } => write!(f, "rename {} {}", quote(from), quote(to)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_strings() {
        assert_eq!(
            Command::MakeDir("/pub/new dir".to_owned()).to_string(),
            "mkdir \"/pub/new dir\""
        );
        assert_eq!(Command::Remove("/a".to_owned()).to_string(), "rm \"/a\"");
        assert_eq!(
            Command::Rename {
                from: "/a".to_owned(),
                to: "/b c".to_owned()
            }
            .to_string(),
            "rename \"/a\" \"/b c\""
        );
    }
}
