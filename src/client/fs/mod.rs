//! Filesystem-like views of a remote tree.
//!
//! This module contains the types returned by the listing and traversal
//! methods of [`SftpClient`](super::SftpClient).

mod dir;
mod walk;

use crate::protocol::StatEntry;

pub use dir::ReadDir;
pub use walk::{Walk, WalkEntry};
pub type Metadata = StatEntry;
