use bytes::Bytes;
use std::{
    collections::VecDeque,
    future::Future,
    path::{Path, PathBuf},
    sync::Arc,
};
use tokio::{
    io::{AsyncWrite, AsyncWriteExt},
    time,
};

use super::{
    fs::{Metadata, ReadDir, Walk},
    options::{ClientOptions, SyncOptions, WalkOptions},
    sync::{self, LocalTree, RemoteTree},
};
use crate::{
    error::{Error, SftpResult},
    path::{RemoteUri, TrailingSlash},
    protocol::{parse_line, Command, EntryKind, ListMode, StatEntry},
    transport::Transport,
};

/// High-level client presenting a remote server as a filesystem.
///
/// Holds the transport, the current directory and the session options.
/// Relative paths given to any method are resolved against the current
/// directory. Cloning is cheap and shares the transport.
pub struct SftpClient<T: Transport> {
    transport: Arc<T>,
    uri: RemoteUri,
    options: ClientOptions,
}

impl<T: Transport> Clone for SftpClient<T> {
    fn clone(&self) -> Self {
        Self {
            transport: self.transport.clone(),
            uri: self.uri.clone(),
            options: self.options.clone(),
        }
    }
}

impl<T: Transport> SftpClient<T> {
    /// Creates a client whose current directory is the path of `uri`
    pub fn new(transport: T, uri: RemoteUri) -> Self {
        Self::with_options(transport, uri, ClientOptions::default())
    }

    pub fn with_options(transport: T, uri: RemoteUri, options: ClientOptions) -> Self {
        Self {
            transport: Arc::new(transport),
            uri: uri.as_dir(),
            options,
        }
    }

    /// Set the maximum response time in seconds.
    /// Default: 10 seconds
    pub fn set_timeout(&mut self, secs: u64) {
        self.options.timeout = secs;
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    async fn request<R, F>(&self, future: F) -> SftpResult<R>
    where
        F: Future<Output = SftpResult<R>>,
    {
        time::timeout(self.options.timeout(), future).await?
    }

    async fn execute(&self, command: Command) -> SftpResult<()> {
        debug!("execute: {}", command);
        self.request(self.transport.execute(&command)).await
    }

    /// The current directory
    pub fn current_path(&self) -> &RemoteUri {
        &self.uri
    }

    /// Resolves `path` against the current directory
    pub fn join_path(&self, path: &str) -> RemoteUri {
        self.uri.resolve(&[path], TrailingSlash::Preserve)
    }

    /// Splits `path` into its parent directory and base name,
    /// see [`RemoteUri::split_dir`]
    pub fn split_dir(&self, path: &str) -> (RemoteUri, String) {
        self.uri.split_dir(path)
    }

    pub fn base_name(&self, path: &str) -> String {
        self.uri.base_name(path)
    }

    /// Changes the current directory.
    ///
    /// The current directory is left untouched if `path` does not exist or
    /// is not a directory.
    pub async fn change_directory(&mut self, path: &str) -> SftpResult<()> {
        let target = self.join_path(path).as_dir();
        let entry = self.stat(target.path()).await?;

        if !self.resolves_to_dir(&target, &entry).await {
            return Err(Error::Precondition(format!(
                "{} is not a directory",
                target.path()
            )));
        }

        debug!("cd {}", target.path());
        self.uri = target;
        Ok(())
    }

    /// Lists the directory `path` with one request and parses every line.
    ///
    /// `.` and `..` are only kept with `show_dots`. Prefer this over repeated
    /// [`stat`](Self::stat) calls when inspecting many entries of one directory.
    pub async fn statscan(
        &self,
        path: &str,
        sort: bool,
        show_dots: bool,
    ) -> SftpResult<Vec<StatEntry>> {
        let uri = self.join_path(path).as_dir();
        let lines = self
            .request(self.transport.list(&uri, ListMode::Long))
            .await?;

        let mut entries = lines
            .iter()
            .map(|line| line.trim_end_matches(['\r', '\n']))
            .filter(|line| !line.trim().is_empty() && !line.starts_with("total "))
            .map(|line| parse_line(line, uri.path()))
            .collect::<SftpResult<Vec<_>>>()?;

        if !show_dots {
            entries.retain(|entry| entry.desc != "." && entry.desc != "..");
        }

        if sort {
            entries.sort_by(|a, b| a.desc.cmp(&b.desc));
        }

        Ok(entries)
    }

    /// Queries metadata about a single remote entry.
    ///
    /// Costs exactly one listing of the parent directory.
    pub async fn stat(&self, path: &str) -> SftpResult<Metadata> {
        let (dir, name) = self.split_dir(path);
        let mut entries = self.statscan(dir.path(), true, true).await?;

        if name.is_empty() {
            let idx = entries.iter().position(|e| e.desc == ".").unwrap_or(0);
            return match entries.len() {
                0 => Err(Error::NotFound(dir.path().to_owned())),
                _ => Ok(entries.swap_remove(idx)),
            };
        }

        if let Some(idx) = entries.iter().position(|e| e.desc == name) {
            return Ok(entries.swap_remove(idx));
        }

        if self.options.prefix_fallback {
            let mut candidates = entries.into_iter().filter(|e| e.desc.starts_with(&name));
            if let (Some(entry), None) = (candidates.next(), candidates.next()) {
                debug!("{:?} matched {:?} by prefix", name, entry.desc);
                return Ok(entry);
            }
        }

        Err(Error::NotFound(dir.join(&name).path().to_owned()))
    }

    /// Alias of [`stat`](Self::stat), named after [`std::fs::metadata`]
    pub async fn metadata(&self, path: &str) -> SftpResult<Metadata> {
        self.stat(path).await
    }

    /// Checks a file or folder exists at the specified path
    pub async fn try_exists(&self, path: &str) -> SftpResult<bool> {
        match self.stat(path).await {
            Ok(_) => Ok(true),
            Err(err) if err.is_not_found() => Ok(false),
            Err(err) => Err(err),
        }
    }

    async fn has_kind(&self, path: &str, kind: EntryKind) -> SftpResult<bool> {
        match self.stat(path).await {
            Ok(entry) => Ok(entry.kind() == kind),
            Err(err) if err.is_not_found() => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// `true` if `path` is a directory, symlinks are not followed
    pub async fn is_dir(&self, path: &str) -> SftpResult<bool> {
        self.has_kind(path, EntryKind::Directory).await
    }

    pub async fn is_file(&self, path: &str) -> SftpResult<bool> {
        self.has_kind(path, EntryKind::File).await
    }

    pub async fn is_symlink(&self, path: &str) -> SftpResult<bool> {
        self.has_kind(path, EntryKind::Symlink).await
    }

    /// Returns an iterator over the names within a directory.
    pub async fn read_dir(&self, path: &str) -> SftpResult<ReadDir> {
        let uri = self.join_path(path).as_dir();
        let lines = self
            .request(self.transport.list(&uri, ListMode::Names))
            .await?;
        Ok(ReadDir::new(lines))
    }

    /// Returns the absolute path `path` designates, with every symlink
    /// component resolved.
    ///
    /// Costs one listing per path component and per link followed. Chains
    /// longer than the configured symlink depth fail with
    /// [`Error::Precondition`].
    pub async fn canonicalize(&self, path: &str) -> SftpResult<RemoteUri> {
        let target = self.join_path(path).as_file();
        let mut pending: VecDeque<String> = target
            .path()
            .split('/')
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
            .collect();
        let mut resolved = target.resolve(&["/"], TrailingSlash::ForceOff);
        let mut hops = 0;

        while let Some(segment) = pending.pop_front() {
            let candidate = resolved.as_dir().join(&segment);
            let entry = self.stat(candidate.path()).await?;

            let Some(link) = entry.link_target.as_deref().filter(|_| entry.is_symlink()) else {
                resolved = candidate;
                continue;
            };

            hops += 1;
            if hops > self.options.max_symlink_depth {
                return Err(Error::Precondition(format!(
                    "too many levels of symbolic links in {}",
                    target.path()
                )));
            }

            let link = resolved.as_dir().join(link);
            for segment in link.path().rsplit('/').filter(|s| !s.is_empty()) {
                pending.push_front(segment.to_owned());
            }
            resolved = resolved.resolve(&["/"], TrailingSlash::ForceOff);
        }

        Ok(resolved)
    }

    /// Follows the symlink `entry` listed in `dir` to a non-link target.
    ///
    /// Returns `None`, with a warning, when the chain is broken, malformed or
    /// longer than the configured depth.
    pub(crate) async fn link_kind(&self, dir: &RemoteUri, entry: &StatEntry) -> Option<EntryKind> {
        let mut dir = dir.as_dir();
        let mut current = entry.clone();

        for _ in 0..self.options.max_symlink_depth {
            let Some(target) = current.link_target.as_deref() else {
                warn!("cannot resolve symlink {:?} in {}", current.desc, dir.path());
                return None;
            };

            let (parent, _) = dir.split_dir(target);
            let target = dir.join(target);

            match self.stat(target.path()).await {
                Ok(next) if next.is_symlink() => {
                    dir = parent;
                    current = next;
                }
                Ok(next) => return Some(next.kind()),
                Err(err) => {
                    warn!("cannot classify symlink target {}: {}", target.path(), err);
                    return None;
                }
            }
        }

        warn!(
            "symlink {:?} in {} exceeds {} hops",
            entry.desc,
            dir.path(),
            self.options.max_symlink_depth
        );
        None
    }

    async fn resolves_to_dir(&self, uri: &RemoteUri, entry: &StatEntry) -> bool {
        match entry.kind() {
            EntryKind::Directory => true,
            EntryKind::Symlink => {
                let (parent, _) = uri.split_dir("");
                self.link_kind(&parent, entry).await == Some(EntryKind::Directory)
            }
            EntryKind::File => false,
        }
    }

    /// Walks the tree rooted at `root`.
    ///
    /// A missing root is an error, a root that is not a directory yields an
    /// empty walk. A symlinked root is always followed.
    pub async fn walk(&self, root: &str, options: WalkOptions) -> SftpResult<Walk<T>> {
        let root = self.join_path(root).as_dir();
        let entry = self.stat(root.path()).await?;

        if self.resolves_to_dir(&root, &entry).await {
            Ok(Walk::new(self.clone(), root, options))
        } else {
            debug!("{} is not a directory, nothing to walk", root.path());
            Ok(Walk::empty(self.clone(), options))
        }
    }

    /// Creates a new empty directory.
    pub async fn create_dir(&self, path: &str) -> SftpResult<()> {
        let uri = self.join_path(path).as_file();
        self.execute(Command::MakeDir(uri.path().to_owned())).await
    }

    /// Creates a directory and every missing parent.
    pub async fn create_dir_all(&self, path: &str) -> SftpResult<()> {
        let target = self.join_path(path).as_file();
        let mut current = target.resolve(&["/"], TrailingSlash::ForceOn);

        for segment in target.path().split('/').filter(|s| !s.is_empty()) {
            current = current.resolve(&[segment], TrailingSlash::ForceOn);
            if !self.try_exists(current.path()).await? {
                self.create_dir(current.path()).await?;
            }
        }

        Ok(())
    }

    /// Rename a file or directory to a new name.
    pub async fn rename(&self, from: &str, to: &str) -> SftpResult<()> {
        self.execute(Command::Rename {
            from: self.join_path(from).as_file().path().to_owned(),
            to: self.join_path(to).as_file().path().to_owned(),
        })
        .await
    }

    /// Removes a file, symlink or directory.
    ///
    /// Directories need `recursive` unless they are empty. With `force` a
    /// missing path is not an error.
    pub async fn remove(&self, path: &str, recursive: bool, force: bool) -> SftpResult<()> {
        let uri = self.join_path(path).as_file();
        let entry = match self.stat(uri.path()).await {
            Ok(entry) => entry,
            Err(err) if force && err.is_not_found() => return Ok(()),
            Err(err) => return Err(err),
        };

        if !entry.is_dir() {
            return self.execute(Command::Remove(uri.path().to_owned())).await;
        }

        if !recursive {
            return self.execute(Command::RemoveDir(uri.path().to_owned())).await;
        }

        let options = WalkOptions::default()
            .topdown(false)
            .skip_restricted(false)
            .sort(false);
        let mut walk = self.walk(uri.path(), options).await?;

        while let Some(level) = walk.next_entry().await? {
            for file in &level.files {
                let file = level.path.join(file);
                self.execute(Command::Remove(file.path().to_owned())).await?;
            }
            self.execute(Command::RemoveDir(level.path.as_file().path().to_owned()))
                .await?;
        }

        Ok(())
    }

    /// Reads the contents of a file located at the specified path to the end.
    pub async fn read(&self, path: &str) -> SftpResult<Bytes> {
        let uri = self.join_path(path).as_file();
        debug!("fetch {}", uri);
        self.transport.fetch(&uri).await
    }

    /// Writes the contents to a file whose path is specified.
    pub async fn write<D: Into<Bytes>>(&self, path: &str, data: D) -> SftpResult<()> {
        let uri = self.join_path(path).as_file();
        debug!("put {}", uri);
        self.transport.put(&uri, data.into()).await
    }

    /// Downloads a single file into `writer`, returning the number of bytes written.
    pub async fn download_to<W>(&self, path: &str, writer: &mut W) -> SftpResult<u64>
    where
        W: AsyncWrite + Unpin + Send,
    {
        let data = self.read(path).await?;
        writer.write_all(&data).await?;
        writer.flush().await?;
        Ok(data.len() as u64)
    }

    /// Uploads a local file or directory tree into the remote directory
    /// `destination`. Returns the remote path of the mirrored root.
    ///
    /// A source without a final name, such as `.` or `dir/..`, is
    /// canonicalized first so the copy is named after the directory it
    /// designates.
    pub async fn upload<P: AsRef<Path>>(
        &self,
        source: P,
        destination: &str,
        options: &SyncOptions,
    ) -> SftpResult<RemoteUri> {
        let mut source = source.as_ref().to_path_buf();
        if source.file_name().is_none() {
            source = tokio::fs::canonicalize(&source).await?;
        }

        let destination = self.join_path(destination).as_dir();
        sync::mirror(
            &LocalTree,
            &source,
            &RemoteTree::new(self),
            &destination,
            options,
        )
        .await
    }

    /// Downloads a remote file or directory tree into the local directory
    /// `destination`. Returns the local path of the mirrored root.
    pub async fn download<P: AsRef<Path>>(
        &self,
        source: &str,
        destination: P,
        options: &SyncOptions,
    ) -> SftpResult<PathBuf> {
        sync::mirror(
            &RemoteTree::new(self),
            &self.join_path(source).as_file(),
            &LocalTree,
            &destination.as_ref().to_path_buf(),
            options,
        )
        .await
    }
}
