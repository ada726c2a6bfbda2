use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;

/// Locates and reads named seed resources.
///
/// Locating and reading are separate stages so that a missing resource and
/// an unreadable one stay distinguishable to the caller.
#[async_trait]
pub trait ResourceLoader: Send + Sync + 'static {
    /// Opaque handle to a located resource.
    type Handle: Send + Sync;

    /// Resolves a resource name to a handle, or `None` if no such resource
    /// exists.
    fn locate(&self, name: &str) -> Option<Self::Handle>;

    /// Reads the full contents of a located resource.
    async fn read_bytes(&self, handle: &Self::Handle) -> std::io::Result<Vec<u8>>;
}

/// Resource loader over a directory of seed files.
///
/// `locate(name)` resolves to `<root>/<name>.<extension>` (`.json` by
/// default) and succeeds only if that path is an existing regular file.
pub struct DirResourceLoader {
    root: PathBuf,
    extension: String,
}

impl DirResourceLoader {
    /// Creates a loader for `.json` files under `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_extension(root, "json")
    }

    /// Creates a loader for files with the given extension under `root`.
    pub fn with_extension(root: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            extension: extension.into(),
        }
    }

    /// The directory resources are resolved under.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl ResourceLoader for DirResourceLoader {
    type Handle = PathBuf;

    fn locate(&self, name: &str) -> Option<PathBuf> {
        let path = self.root.join(name).with_extension(&self.extension);
        path.is_file().then_some(path)
    }

    async fn read_bytes(&self, handle: &PathBuf) -> std::io::Result<Vec<u8>> {
        fs::read(handle).await
    }
}
