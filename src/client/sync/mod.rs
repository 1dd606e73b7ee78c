//! Recursive upload and download.
//!
//! [`mirror`] copies a file or a directory tree from one [`Tree`] into a
//! directory of another. The algorithm does not care which side is local:
//! uploads run it from [`LocalTree`] to [`RemoteTree`], downloads the other
//! way around.
//!
//! There is no rollback. A failure aborts the rest of the transfer and
//! leaves already copied entries in place.

mod local;
mod remote;

use bytes::Bytes;
use std::collections::HashSet;

use super::options::{ConflictPolicy, SyncOptions};
use crate::{
    error::{Error, SftpResult},
    protocol::EntryKind,
};

pub use local::LocalTree;
pub use remote::RemoteTree;

/// One entry listed by [`Tree::list_children`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Child {
    pub name: String,
    /// Kind of the entry with symlinks followed
    pub kind: EntryKind,
    /// The entry itself is a symlink
    pub is_link: bool,
}

/// One side of a transfer. This is `async_trait`
///
/// Kinds reported by a tree follow symlinks, a link that cannot be
/// resolved is reported as a file.
#[async_trait]
pub trait Tree: Send + Sync {
    type Path: Clone + Send + Sync;

    fn join(&self, dir: &Self::Path, name: &str) -> Self::Path;

    /// Identity of the directory `name` inside the directory identified by
    /// `parent`, for a `name` that is not a symlink
    fn child_key(&self, parent: &str, name: &str) -> String;

    fn base_name(&self, path: &Self::Path) -> String;

    /// Human readable form of `path` for errors and logs
    fn display(&self, path: &Self::Path) -> String;

    /// Kind of the entry at `path`, `None` if it does not exist
    async fn kind(&self, path: &Self::Path) -> SftpResult<Option<EntryKind>>;

    /// Absolute form of `path` with every symlink resolved, used as the
    /// identity of a directory when guarding against link cycles
    async fn canonical(&self, path: &Self::Path) -> SftpResult<String>;

    async fn list_children(&self, dir: &Self::Path) -> SftpResult<Vec<Child>>;

    /// Names of the entries in `dir`, without classifying them
    async fn list_names(&self, dir: &Self::Path) -> SftpResult<Vec<String>>;

    async fn make_dir(&self, path: &Self::Path) -> SftpResult<()>;

    async fn remove_recursive(&self, path: &Self::Path) -> SftpResult<()>;

    async fn read_file(&self, path: &Self::Path) -> SftpResult<Bytes>;

    async fn write_file(&self, path: &Self::Path, data: Bytes) -> SftpResult<()>;
}

/// A source directory still to copy. `fresh` marks a destination created by
/// this transfer, which cannot hold conflicts. `ancestors` are the identities
/// of the directories leading to it, itself included.
struct Level<S: Tree, D: Tree> {
    src: S::Path,
    dst: D::Path,
    fresh: bool,
    ancestors: Vec<String>,
}

async fn transfer_one<S: Tree, D: Tree>(
    src: &S,
    from: &S::Path,
    dst: &D,
    to: &D::Path,
) -> SftpResult<()> {
    debug!("transfer {} -> {}", src.display(from), dst.display(to));
    let data = src.read_file(from).await?;
    dst.write_file(to, data).await
}

/// Copies `source` into the directory `destination`.
///
/// Returns the path of the copy's root for a directory source and
/// `destination` itself for a file source or a hidden source.
///
/// Conflicts are names that already exist on the destination side. Files
/// follow `options.policy`. Directories are reused when merging or skipping,
/// deleted and recreated when overwriting, and rejected otherwise. With
/// [`ConflictPolicy::Error`] all conflicts of one directory are reported
/// together before anything in it is changed.
///
/// The traversal is independent of [`Walk`](crate::Walk) and its options.
/// Symlinks are always followed, except a directory link that resolves to
/// the directory holding it or one of its parents, which is skipped with a
/// warning.
pub async fn mirror<S: Tree, D: Tree>(
    src: &S,
    source: &S::Path,
    dst: &D,
    destination: &D::Path,
    options: &SyncOptions,
) -> SftpResult<D::Path> {
    if dst.kind(destination).await? != Some(EntryKind::Directory) {
        return Err(Error::Precondition(format!(
            "{} is not a directory",
            dst.display(destination)
        )));
    }

    let name = src.base_name(source);
    if name.is_empty() {
        return Err(Error::Precondition(format!(
            "{} has no base name to copy to",
            src.display(source)
        )));
    }

    if options.is_hidden(&name) {
        debug!("{} is hidden, nothing to transfer", src.display(source));
        return Ok(destination.clone());
    }

    let kind = src
        .kind(source)
        .await?
        .ok_or_else(|| Error::NotFound(src.display(source)))?;
    let target = dst.join(destination, &name);
    let existing = dst.kind(&target).await?;

    if kind != EntryKind::Directory {
        if existing.is_some() {
            match options.policy {
                ConflictPolicy::Error => return Err(Error::Conflict(vec![dst.display(&target)])),
                ConflictPolicy::Skip => {
                    debug!("skipping existing {}", dst.display(&target));
                    return Ok(destination.clone());
                }
                ConflictPolicy::Overwrite => {}
            }
        }

        transfer_one(src, source, dst, &target).await?;
        return Ok(destination.clone());
    }

    let fresh = match existing {
        None => {
            dst.make_dir(&target).await?;
            true
        }
        Some(_) if options.merge || options.policy == ConflictPolicy::Skip => false,
        Some(_) if options.policy == ConflictPolicy::Overwrite => {
            dst.remove_recursive(&target).await?;
            dst.make_dir(&target).await?;
            true
        }
        Some(_) => return Err(Error::Conflict(vec![dst.display(&target)])),
    };

    let mut pending = vec![Level::<S, D> {
        src: source.clone(),
        dst: target.clone(),
        fresh,
        ancestors: vec![src.canonical(source).await?],
    }];
    while let Some(level) = pending.pop() {
        let children = mirror_level(src, dst, &level, options).await?;
        pending.extend(children.into_iter().rev());
    }

    Ok(target)
}

/// Copies the direct children of one level and returns the subdirectories
/// still to visit.
async fn mirror_level<S: Tree, D: Tree>(
    src: &S,
    dst: &D,
    level: &Level<S, D>,
    options: &SyncOptions,
) -> SftpResult<Vec<Level<S, D>>> {
    let (src_dir, dst_dir) = (&level.src, &level.dst);
    let parent_key = level.ancestors.last().map_or("/", String::as_str);
    let mut dirs = Vec::new();
    let mut files = Vec::new();

    for child in src.list_children(src_dir).await? {
        let path = src.join(src_dir, &child.name);
        if options.is_hidden(&child.name) {
            debug!("skipping hidden {}", src.display(&path));
            continue;
        }

        if child.kind != EntryKind::Directory {
            files.push(child.name);
            continue;
        }

        let key = if child.is_link {
            src.canonical(&path).await?
        } else {
            src.child_key(parent_key, &child.name)
        };
        if level.ancestors.contains(&key) {
            warn!("{} links back to {}, not descending", src.display(&path), key);
            continue;
        }
        dirs.push((child.name, key));
    }

    dirs.sort();
    files.sort();

    let existing: HashSet<String> = if level.fresh {
        HashSet::new()
    } else {
        dst.list_names(dst_dir).await?.into_iter().collect()
    };

    if options.policy == ConflictPolicy::Error {
        let conflicting: Vec<String> = dirs
            .iter()
            .map(|(name, _)| name)
            .filter(|_| !options.merge)
            .chain(files.iter())
            .filter(|name| existing.contains(*name))
            .map(|name| dst.display(&dst.join(dst_dir, name)))
            .collect();

        if !conflicting.is_empty() {
            return Err(Error::Conflict(conflicting));
        }
    }

    let mut children = Vec::with_capacity(dirs.len());
    for (name, key) in dirs {
        let target = dst.join(dst_dir, &name);

        let fresh = if !existing.contains(&name) {
            dst.make_dir(&target).await?;
            true
        } else if !options.merge && options.policy == ConflictPolicy::Overwrite {
            dst.remove_recursive(&target).await?;
            dst.make_dir(&target).await?;
            true
        } else {
            false
        };

        let mut ancestors = level.ancestors.clone();
        ancestors.push(key);
        children.push(Level {
            src: src.join(src_dir, &name),
            dst: target,
            fresh,
            ancestors,
        });
    }

    for name in files {
        let target = dst.join(dst_dir, &name);
        if existing.contains(&name) && options.policy != ConflictPolicy::Overwrite {
            debug!("skipping existing {}", dst.display(&target));
            continue;
        }

        transfer_one(src, &src.join(src_dir, &name), dst, &target).await?;
    }

    Ok(children)
}
