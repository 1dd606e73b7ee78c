//! In-memory transport for tests.

use bytes::Bytes;
use std::{
    collections::{BTreeMap, HashSet, VecDeque},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
};

use super::SftpClient;
use crate::{
    error::{Error, SftpResult},
    path::RemoteUri,
    protocol::{Command, ListMode, StatusCode},
    transport::Transport,
    utils::dirname,
};

#[derive(Debug, Clone)]
enum Node {
    Dir,
    File(Bytes),
    Link(String),
}

/// Remote tree kept in a map from normalized path to node.
///
/// Children are listed in reverse name order so that sorting is observable.
pub(crate) struct MemoryTransport {
    nodes: Mutex<BTreeMap<String, Node>>,
    restricted: Mutex<HashSet<String>>,
    listings: AtomicUsize,
}

fn key(path: &str) -> String {
    match path.trim_end_matches('/') {
        "" => "/".to_owned(),
        trimmed => trimmed.to_owned(),
    }
}

fn name_of(key: &str) -> &str {
    key.rsplit('/').next().unwrap_or(key)
}

fn no_such_file(path: &str) -> Error {
    Error::transport(StatusCode::NoSuchFile, format!("{path}: no such file"))
}

fn failure(path: &str, reason: &str) -> Error {
    Error::transport(StatusCode::Failure, format!("{path}: {reason}"))
}

fn long_line(name: &str, node: &Node) -> String {
    match node {
        Node::Dir => format!("drwxr-xr-x    2 demo     users        4096 Jan 01  2020 {name}"),
        Node::File(data) => format!(
            "-rw-r--r--    1 demo     users    {:>8} Mar 04  2021 {name}",
            data.len()
        ),
        Node::Link(target) => format!(
            "lrwxrwxrwx    1 demo     users    {:>8} Jan 01  2020 {name} -> {target}",
            target.len()
        ),
    }
}

impl MemoryTransport {
    pub fn new() -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert("/".to_owned(), Node::Dir);
        Self {
            nodes: Mutex::new(nodes),
            restricted: Mutex::new(HashSet::new()),
            listings: AtomicUsize::new(0),
        }
    }

    fn insert(&self, path: &str, node: Node) -> &Self {
        let key = key(path);
        let mut nodes = self.nodes.lock().unwrap();
        let mut parent = dirname(&key).to_owned();
        while parent != "/" && !parent.is_empty() {
            nodes.entry(parent.clone()).or_insert(Node::Dir);
            parent = dirname(&parent).to_owned();
        }
        nodes.insert(key, node);
        self
    }

    /// Adds a directory and its missing parents
    pub fn dir(&self, path: &str) -> &Self {
        self.insert(path, Node::Dir)
    }

    pub fn file(&self, path: &str, contents: &str) -> &Self {
        self.insert(path, Node::File(Bytes::from(contents.to_owned())))
    }

    pub fn link(&self, path: &str, target: &str) -> &Self {
        self.insert(path, Node::Link(target.to_owned()))
    }

    /// Listing `path` fails with `PermissionDenied`
    pub fn restrict(&self, path: &str) -> &Self {
        self.restricted.lock().unwrap().insert(key(path));
        self
    }

    /// Number of listing requests served so far
    pub fn listings(&self) -> usize {
        self.listings.load(Ordering::SeqCst)
    }

    pub fn contents(&self, path: &str) -> Option<String> {
        match self.nodes.lock().unwrap().get(&key(path)) {
            Some(Node::File(data)) => Some(String::from_utf8_lossy(data).into_owned()),
            _ => None,
        }
    }

    pub fn is_dir(&self, path: &str) -> bool {
        matches!(self.nodes.lock().unwrap().get(&key(path)), Some(Node::Dir))
    }

    /// Every path below `root`, relative to it, in name order
    pub fn tree(&self, root: &str) -> Vec<String> {
        let root = key(root);
        let prefix = if root == "/" { "/".to_owned() } else { format!("{root}/") };
        self.nodes
            .lock()
            .unwrap()
            .keys()
            .filter_map(|k| k.strip_prefix(&prefix).map(str::to_owned))
            .filter(|k| !k.is_empty())
            .collect()
    }

    /// Resolves symlinks in every component of `key`, 8 hops at most
    fn follow<'a>(nodes: &'a BTreeMap<String, Node>, key: &str) -> Option<(String, &'a Node)> {
        let mut pending: VecDeque<String> = key
            .split('/')
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
            .collect();
        let mut resolved = "/".to_owned();
        let mut hops = 0;

        while let Some(segment) = pending.pop_front() {
            let candidate = RemoteUri::new("", &resolved).as_dir().join(&segment);
            match nodes.get(candidate.path())? {
                Node::Link(target) => {
                    hops += 1;
                    if hops > 8 {
                        return None;
                    }
                    let target = RemoteUri::new("", &resolved).as_dir().join(target);
                    for segment in target.path().rsplit('/').filter(|s| !s.is_empty()) {
                        pending.push_front(segment.to_owned());
                    }
                    resolved = "/".to_owned();
                }
                _ => resolved = candidate.path().to_owned(),
            }
        }

        let node = nodes.get(&resolved)?;
        Some((resolved, node))
    }

    fn children(nodes: &BTreeMap<String, Node>, dir: &str) -> Vec<(String, Node)> {
        nodes
            .iter()
            .filter(|(k, _)| k.as_str() != "/" && dirname(k) == dir)
            .map(|(k, node)| (name_of(k).to_owned(), node.clone()))
            .rev()
            .collect()
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn execute(&self, command: &Command) -> SftpResult<()> {
        let mut nodes = self.nodes.lock().unwrap();

        match command {
            Command::MakeDir(path) => {
                let key = key(path);
                if nodes.contains_key(&key) {
                    return Err(failure(path, "already exists"));
                }
                if !matches!(nodes.get(dirname(&key)), Some(Node::Dir)) {
                    return Err(no_such_file(path));
                }
                nodes.insert(key, Node::Dir);
            }
            Command::RemoveDir(path) => {
                let key = key(path);
                match nodes.get(&key) {
                    Some(Node::Dir) if Self::children(&nodes, &key).is_empty() => {
                        nodes.remove(&key);
                    }
                    Some(Node::Dir) => return Err(failure(path, "directory not empty")),
                    Some(_) => return Err(failure(path, "not a directory")),
                    None => return Err(no_such_file(path)),
                }
            }
            Command::Remove(path) => {
                let key = key(path);
                match nodes.get(&key) {
                    Some(Node::Dir) => return Err(failure(path, "is a directory")),
                    Some(_) => {
                        nodes.remove(&key);
                    }
                    None => return Err(no_such_file(path)),
                }
            }
            Command::Rename { from, to } => {
                let (from, to) = (key(from), key(to));
                if !nodes.contains_key(&from) {
                    return Err(no_such_file(&from));
                }
                if nodes.contains_key(&to) {
                    return Err(failure(&to, "already exists"));
                }
                let moved: Vec<String> = nodes
                    .keys()
                    .filter(|k| **k == from || k.starts_with(&format!("{from}/")))
                    .cloned()
                    .collect();
                for old in moved {
                    let node = nodes.remove(&old).unwrap();
                    nodes.insert(format!("{to}{}", &old[from.len()..]), node);
                }
            }
        }

        Ok(())
    }

    async fn list(&self, uri: &RemoteUri, mode: ListMode) -> SftpResult<Vec<String>> {
        let key = key(uri.path());
        if self.restricted.lock().unwrap().contains(&key) {
            return Err(Error::transport(
                StatusCode::PermissionDenied,
                format!("{key}: permission denied"),
            ));
        }

        let nodes = self.nodes.lock().unwrap();
        let key = match Self::follow(&nodes, &key) {
            Some((target, Node::Dir)) => target,
            Some(_) => return Err(failure(&key, "not a directory")),
            None => return Err(no_such_file(&key)),
        };
        self.listings.fetch_add(1, Ordering::SeqCst);

        let mut entries = vec![(".".to_owned(), Node::Dir), ("..".to_owned(), Node::Dir)];
        entries.extend(Self::children(&nodes, &key));

        let lines = entries.iter().map(|(name, node)| match mode {
            ListMode::Long => long_line(name, node),
            ListMode::Names => name.clone(),
        });

        Ok(match mode {
            ListMode::Long => std::iter::once(format!("total {}", entries.len()))
                .chain(lines)
                .collect(),
            ListMode::Names => lines.collect(),
        })
    }

    async fn fetch(&self, uri: &RemoteUri) -> SftpResult<Bytes> {
        let nodes = self.nodes.lock().unwrap();
        match Self::follow(&nodes, uri.path()) {
            Some((_, Node::File(data))) => Ok(data.clone()),
            Some((key, _)) => Err(failure(&key, "is a directory")),
            None => Err(no_such_file(uri.path())),
        }
    }

    async fn put(&self, uri: &RemoteUri, data: Bytes) -> SftpResult<()> {
        let key = key(uri.path());
        let mut nodes = self.nodes.lock().unwrap();
        if !matches!(nodes.get(dirname(&key)), Some(Node::Dir)) {
            return Err(no_such_file(&key));
        }
        if matches!(nodes.get(&key), Some(Node::Dir)) {
            return Err(failure(&key, "is a directory"));
        }
        nodes.insert(key, Node::File(data));
        Ok(())
    }
}

/// A client rooted at `/` of `transport`
pub(crate) fn client(transport: MemoryTransport) -> SftpClient<MemoryTransport> {
    let _ = env_logger::builder().is_test(true).try_init();
    SftpClient::new(transport, RemoteUri::new("test.example.com", "/"))
}
