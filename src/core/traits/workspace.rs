use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use uuid::Uuid;

use crate::constants::WORKSPACE_PLACEHOLDER;

#[derive(Debug, thiserror::Error)]
pub enum WorkspaceError {
    #[error("Failed to create workspace {path}: {source}")]
    Create {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to remove workspace {path}: {source}")]
    Destroy {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Exclusive scratch directory owned by exactly one in-flight request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Workspace {
    id: Uuid,
    path: PathBuf,
}

impl Workspace {
    pub fn new(id: Uuid, path: PathBuf) -> Self {
        Self { id, path }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn tmp_dir(&self) -> PathBuf {
        self.path.join("tmp")
    }

    /// Replaces every `{workspace}` placeholder with this workspace's path.
    pub fn expand(&self, value: &str) -> String {
        value.replace(WORKSPACE_PLACEHOLDER, &self.path.to_string_lossy())
    }

    /// Builds the complete child environment from scratch.
    ///
    /// Nothing is inherited from the service process: `HOME` and `TMPDIR`
    /// point inside the workspace, so toolchain caches written by one
    /// request are invisible to every other request.
    pub fn environment<'a, I>(&self, path_var: &str, extra: I) -> BTreeMap<String, String>
    where
        I: IntoIterator<Item = &'a (String, String)>,
    {
        let mut env = BTreeMap::new();
        env.insert("PATH".to_string(), path_var.to_string());
        env.insert("HOME".to_string(), self.path.to_string_lossy().into_owned());
        env.insert(
            "TMPDIR".to_string(),
            self.tmp_dir().to_string_lossy().into_owned(),
        );
        env.insert("LANG".to_string(), "C.UTF-8".to_string());
        for (key, value) in extra {
            env.insert(key.clone(), self.expand(value));
        }
        env
    }
}

/// Allocates and destroys per-request workspaces.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait WorkspaceProvider: std::fmt::Debug + Send + Sync {
    async fn create(&self) -> Result<Workspace, WorkspaceError>;

    /// Idempotent: destroying a workspace that is already gone is `Ok`.
    async fn destroy(&self, workspace: &Workspace) -> Result<(), WorkspaceError>;
}
