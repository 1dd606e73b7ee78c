use bytes::Bytes;

use super::{Child, Tree};
use crate::{
    client::SftpClient, error::SftpResult, path::RemoteUri, protocol::EntryKind,
    transport::Transport,
};

/// The server side of a transfer, backed by an [`SftpClient`]
pub struct RemoteTree<'a, T: Transport> {
    client: &'a SftpClient<T>,
}

impl<'a, T: Transport> RemoteTree<'a, T> {
    pub fn new(client: &'a SftpClient<T>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl<'a, T: Transport> Tree for RemoteTree<'a, T> {
    type Path = RemoteUri;

    fn join(&self, dir: &RemoteUri, name: &str) -> RemoteUri {
        dir.join(name).as_file()
    }

    fn child_key(&self, parent: &str, name: &str) -> String {
        if parent.ends_with('/') {
            format!("{parent}{name}")
        } else {
            format!("{parent}/{name}")
        }
    }

    fn base_name(&self, path: &RemoteUri) -> String {
        path.base_name("")
    }

    fn display(&self, path: &RemoteUri) -> String {
        path.as_file().path().to_owned()
    }

    async fn kind(&self, path: &RemoteUri) -> SftpResult<Option<EntryKind>> {
        let entry = match self.client.stat(path.path()).await {
            Ok(entry) => entry,
            Err(err) if err.is_not_found() => return Ok(None),
            Err(err) => return Err(err),
        };

        Ok(Some(match entry.kind() {
            EntryKind::Symlink => {
                let (parent, _) = path.split_dir("");
                self.client
                    .link_kind(&parent, &entry)
                    .await
                    .unwrap_or(EntryKind::File)
            }
            kind => kind,
        }))
    }

    async fn canonical(&self, path: &RemoteUri) -> SftpResult<String> {
        Ok(self.client.canonicalize(path.path()).await?.path().to_owned())
    }

    async fn list_children(&self, dir: &RemoteUri) -> SftpResult<Vec<Child>> {
        let dir = dir.as_dir();
        let mut children = Vec::new();

        for entry in self.client.statscan(dir.path(), true, false).await? {
            let kind = match entry.kind() {
                EntryKind::Symlink => self
                    .client
                    .link_kind(&dir, &entry)
                    .await
                    .unwrap_or(EntryKind::File),
                kind => kind,
            };
            children.push(Child {
                is_link: entry.is_symlink(),
                name: entry.desc,
                kind,
            });
        }

        Ok(children)
    }

    async fn list_names(&self, dir: &RemoteUri) -> SftpResult<Vec<String>> {
        Ok(self.client.read_dir(dir.path()).await?.collect())
    }

    async fn make_dir(&self, path: &RemoteUri) -> SftpResult<()> {
        self.client.create_dir(path.path()).await
    }

    async fn remove_recursive(&self, path: &RemoteUri) -> SftpResult<()> {
        self.client.remove(path.path(), true, false).await
    }

    async fn read_file(&self, path: &RemoteUri) -> SftpResult<Bytes> {
        self.client.read(path.path()).await
    }

    async fn write_file(&self, path: &RemoteUri, data: Bytes) -> SftpResult<()> {
        self.client.write(path.path(), data).await
    }
}
