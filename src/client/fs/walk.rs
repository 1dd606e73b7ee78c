use crate::{
    client::{options::WalkOptions, SftpClient},
    error::SftpResult,
    path::{RemoteUri, TrailingSlash},
    protocol::EntryKind,
    transport::Transport,
};

/// One visited directory: its path and the plain names of its children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkEntry {
    pub path: RemoteUri,
    pub dirs: Vec<String>,
    pub files: Vec<String>,
}

enum Frame {
    Pending(RemoteUri),
    Visited(WalkEntry),
}

/// Lazy depth-first traversal of a remote tree, created by
/// [`SftpClient::walk`].
///
/// Each call to [`next_entry`](Walk::next_entry) lists at most one
/// directory. Dropping the walk early leaves the rest of the tree untouched.
pub struct Walk<T: Transport> {
    client: SftpClient<T>,
    options: WalkOptions,
    stack: Vec<Frame>,
}

impl<T: Transport> Walk<T> {
    pub(crate) fn new(client: SftpClient<T>, root: RemoteUri, options: WalkOptions) -> Self {
        Self {
            client,
            options,
            stack: vec![Frame::Pending(root)],
        }
    }

    /// A walk that yields nothing, used when the root is not a directory
    pub(crate) fn empty(client: SftpClient<T>, options: WalkOptions) -> Self {
        Self {
            client,
            options,
            stack: Vec::new(),
        }
    }

    /// Returns the next directory, or `None` once the tree is exhausted.
    pub async fn next_entry(&mut self) -> SftpResult<Option<WalkEntry>> {
        while let Some(frame) = self.stack.pop() {
            let dir = match frame {
                Frame::Visited(entry) => return Ok(Some(entry)),
                Frame::Pending(dir) => dir,
            };

            let Some(entry) = self.visit(dir).await? else {
                continue;
            };

            let children = entry
                .dirs
                .iter()
                .rev()
                .map(|name| Frame::Pending(entry.path.resolve(&[name], TrailingSlash::ForceOn)))
                .collect::<Vec<_>>();

            if self.options.topdown {
                self.stack.extend(children);
                return Ok(Some(entry));
            }

            self.stack.push(Frame::Visited(entry));
            self.stack.extend(children);
        }

        Ok(None)
    }

    /// Drains the walk into a vector
    pub async fn collect(mut self) -> SftpResult<Vec<WalkEntry>> {
        let mut entries = Vec::new();
        while let Some(entry) = self.next_entry().await? {
            entries.push(entry);
        }
        Ok(entries)
    }

    /// Lists one directory. `Ok(None)` means it was skipped as restricted.
    async fn visit(&self, dir: RemoteUri) -> SftpResult<Option<WalkEntry>> {
        let scanned = match self
            .client
            .statscan(dir.path(), self.options.sort, false)
            .await
        {
            Ok(scanned) => scanned,
            Err(err) if err.is_restricted() && self.options.skip_restricted => {
                info!("skipping restricted directory {}: {}", dir.path(), err);
                return Ok(None);
            }
            Err(err) => return Err(err),
        };

        let mut dirs = Vec::new();
        let mut files = Vec::new();

        for entry in scanned {
            if self.options.is_hidden(&entry.desc) {
                continue;
            }

            let kind = match entry.kind() {
                EntryKind::Symlink if self.options.follow_symlinks => self
                    .client
                    .link_kind(&dir, &entry)
                    .await
                    .unwrap_or(EntryKind::File),
                EntryKind::Symlink => EntryKind::File,
                kind => kind,
            };

            match kind {
                EntryKind::Directory => dirs.push(entry.desc),
                _ => files.push(entry.desc),
            }
        }

        Ok(Some(WalkEntry {
            path: dir,
            dirs,
            files,
        }))
    }
}
