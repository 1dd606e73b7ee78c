//! Filesystem-like access to a remote server over SFTP.
//!
//! [`SftpClient`] keeps a current directory and offers path resolution,
//! `stat` queries built on single directory listings, lazy directory walks
//! and recursive upload/download with conflict policies. Connections and
//! wire-level packets live behind the [`Transport`] trait.

#[macro_use]
extern crate log;
#[macro_use]
extern crate bitflags;
#[macro_use]
extern crate async_trait;

/// Client side
pub mod client;
mod error;
pub mod path;
/// Listing formats and commands understood by the client
pub mod protocol;
mod transport;
mod utils;

pub use client::{
    fs::{Metadata, ReadDir, Walk, WalkEntry},
    sync::{Child, LocalTree, RemoteTree, Tree},
    ClientOptions, ConflictPolicy, SftpClient, SyncOptions, WalkOptions,
};
pub use error::{Error, SftpResult};
pub use path::{RemoteUri, TrailingSlash};
pub use transport::Transport;
