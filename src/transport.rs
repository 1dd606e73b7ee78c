use bytes::Bytes;

use crate::{
    error::SftpResult,
    path::RemoteUri,
    protocol::{Command, ListMode},
};

/// Wire-level side of the client. This is `async_trait`
///
/// Implementations own connections, authentication and the SFTP packets
/// themselves. Errors should be reported as [`Error::Transport`] with the
/// matching [`StatusCode`] so that missing and restricted paths can be told
/// apart from other failures.
///
/// [`Error::Transport`]: crate::Error::Transport
/// [`StatusCode`]: crate::protocol::StatusCode
#[async_trait]
pub trait Transport: Send + Sync {
    /// Executes a mutating command such as `mkdir` or `rename`.
    async fn execute(&self, command: &Command) -> SftpResult<()>;

    /// Lists the directory at `uri`, one entry per returned line.
    async fn list(&self, uri: &RemoteUri, mode: ListMode) -> SftpResult<Vec<String>>;

    /// Reads the whole file at `uri`.
    async fn fetch(&self, uri: &RemoteUri) -> SftpResult<Bytes>;

    /// Creates or truncates the file at `uri` with `data`.
    async fn put(&self, uri: &RemoteUri, data: Bytes) -> SftpResult<()>;
}
