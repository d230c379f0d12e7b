use std::{
    os::unix::fs::PermissionsExt,
    path::{Path, PathBuf},
};

use tokio::fs;
use uuid::Uuid;

use crate::core::traits::workspace::{Workspace, WorkspaceError, WorkspaceProvider};

/// Hands out `exec-<uuid>` directories under a shared root.
#[derive(Clone, Debug)]
pub struct TempWorkspaceManager {
    root: PathBuf,
}

impl TempWorkspaceManager {
    pub fn new<T>(root: T) -> Self
    where
        T: AsRef<Path>,
    {
        TempWorkspaceManager {
            root: root.as_ref().into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    async fn populate(&self, workspace: &Workspace) -> Result<(), std::io::Error> {
        fs::set_permissions(workspace.path(), std::fs::Permissions::from_mode(0o700)).await?;
        fs::create_dir(workspace.tmp_dir()).await
    }
}

#[async_trait::async_trait]
impl WorkspaceProvider for TempWorkspaceManager {
    async fn create(&self) -> Result<Workspace, WorkspaceError> {
        fs::create_dir_all(&self.root)
            .await
            .map_err(|source| WorkspaceError::Create {
                path: self.root.clone(),
                source,
            })?;

        let id = Uuid::new_v4();
        let path = self.root.join(format!("exec-{}", id.simple()));
        // create_dir, not create_dir_all: an existing directory is a collision.
        fs::create_dir(&path)
            .await
            .map_err(|source| WorkspaceError::Create {
                path: path.clone(),
                source,
            })?;

        let workspace = Workspace::new(id, path);
        if let Err(source) = self.populate(&workspace).await {
            let _ = fs::remove_dir_all(workspace.path()).await;
            return Err(WorkspaceError::Create {
                path: workspace.path().to_path_buf(),
                source,
            });
        }

        tracing::debug!(path = %workspace.path().display(), "Workspace created");
        Ok(workspace)
    }

    async fn destroy(&self, workspace: &Workspace) -> Result<(), WorkspaceError> {
        match fs::remove_dir_all(workspace.path()).await {
            Ok(()) => {
                tracing::debug!(path = %workspace.path().display(), "Workspace removed");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(WorkspaceError::Destroy {
                path: workspace.path().to_path_buf(),
                source,
            }),
        }
    }
}
