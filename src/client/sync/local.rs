use bytes::Bytes;
use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};
use tokio::fs;

use super::{Child, Tree};
use crate::{error::SftpResult, protocol::EntryKind};

/// The local filesystem side of a transfer
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalTree;

#[async_trait]
impl Tree for LocalTree {
    type Path = PathBuf;

    fn join(&self, dir: &PathBuf, name: &str) -> PathBuf {
        dir.join(name)
    }

    fn child_key(&self, parent: &str, name: &str) -> String {
        Path::new(parent).join(name).to_string_lossy().into_owned()
    }

    fn base_name(&self, path: &PathBuf) -> String {
        path.file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    fn display(&self, path: &PathBuf) -> String {
        path.display().to_string()
    }

    async fn kind(&self, path: &PathBuf) -> SftpResult<Option<EntryKind>> {
        match fs::metadata(path).await {
            Ok(metadata) if metadata.is_dir() => Ok(Some(EntryKind::Directory)),
            Ok(_) => Ok(Some(EntryKind::File)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn canonical(&self, path: &PathBuf) -> SftpResult<String> {
        Ok(fs::canonicalize(path).await?.to_string_lossy().into_owned())
    }

    async fn list_children(&self, dir: &PathBuf) -> SftpResult<Vec<Child>> {
        let mut entries = fs::read_dir(dir).await?;
        let mut children = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let is_link = entry.file_type().await?.is_symlink();
            let kind = match fs::metadata(&path).await {
                Ok(metadata) if metadata.is_dir() => EntryKind::Directory,
                Ok(_) => EntryKind::File,
                Err(err) => {
                    warn!("cannot classify {}: {}", path.display(), err);
                    EntryKind::File
                }
            };
            children.push(Child {
                name: entry.file_name().to_string_lossy().into_owned(),
                kind,
                is_link,
            });
        }

        Ok(children)
    }

    async fn list_names(&self, dir: &PathBuf) -> SftpResult<Vec<String>> {
        let mut entries = fs::read_dir(dir).await?;
        let mut names = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }

        Ok(names)
    }

    async fn make_dir(&self, path: &PathBuf) -> SftpResult<()> {
        Ok(fs::create_dir(path).await?)
    }

    async fn remove_recursive(&self, path: &PathBuf) -> SftpResult<()> {
        if fs::symlink_metadata(path).await?.is_dir() {
            fs::remove_dir_all(path).await?;
        } else {
            fs::remove_file(path).await?;
        }
        Ok(())
    }

    async fn read_file(&self, path: &PathBuf) -> SftpResult<Bytes> {
        Ok(Bytes::from(fs::read(path).await?))
    }

    async fn write_file(&self, path: &PathBuf, data: Bytes) -> SftpResult<()> {
        Ok(fs::write(path, data).await?)
    }
}
