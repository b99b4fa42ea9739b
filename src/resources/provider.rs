use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

use super::registry::Resource;
use crate::error::ResourceError;

/// Supplies the serialized model.
///
/// The loader only needs the raw bytes; where they come from (a local
/// directory, a warmed cache, memory) is the provider's business.
pub trait ResourceProvider: Send + Sync {
    /// Returns the serialized model bytes.
    fn model_bytes(&self) -> Result<Vec<u8>, ResourceError>;

    /// Human-readable description for logs.
    fn describe(&self) -> String;
}

/// Reads a registered resource from a directory tree.
#[derive(Debug, Clone)]
pub struct FileResourceProvider {
    root: PathBuf,
    resource: Resource,
}

impl FileResourceProvider {
    pub fn new(root: impl Into<PathBuf>, resource: Resource) -> Self {
        Self {
            root: root.into(),
            resource,
        }
    }

    /// Full path of the served resource
    pub fn path(&self) -> PathBuf {
        self.resource.locate(&self.root)
    }
}

impl ResourceProvider for FileResourceProvider {
    fn model_bytes(&self) -> Result<Vec<u8>, ResourceError> {
        let path = self.path();
        let bytes = fs::read(&path).map_err(|source| match source.kind() {
            ErrorKind::NotFound => ResourceError::NotFound(path.clone()),
            _ => ResourceError::Io {
                path: path.clone(),
                source,
            },
        })?;
        if bytes.is_empty() {
            return Err(ResourceError::Empty(path));
        }
        debug!(path = %path.display(), size_bytes = bytes.len(), "Read model resource");
        Ok(bytes)
    }

    fn describe(&self) -> String {
        format!("file:{}", self.path().display())
    }
}

/// Serves bytes already held in memory.
#[derive(Debug, Clone)]
pub struct MemoryResourceProvider {
    bytes: Arc<Vec<u8>>,
}

impl MemoryResourceProvider {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            bytes: Arc::new(bytes),
        }
    }
}

impl ResourceProvider for MemoryResourceProvider {
    fn model_bytes(&self) -> Result<Vec<u8>, ResourceError> {
        Ok(self.bytes.as_ref().clone())
    }

    fn describe(&self) -> String {
        format!("memory:{} bytes", self.bytes.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::registry::STOOL_MODEL;

    #[test]
    fn test_file_provider_reads_resource() {
        let root = tempfile::tempdir().unwrap();
        let provider = FileResourceProvider::new(root.path(), STOOL_MODEL);
        fs::create_dir_all(provider.path().parent().unwrap()).unwrap();
        fs::write(provider.path(), b"onnx-bytes").unwrap();

        assert_eq!(provider.model_bytes().unwrap(), b"onnx-bytes".to_vec());
        assert!(provider.describe().ends_with("kf_sttool_classification_628.onnx"));
    }

    #[test]
    fn test_file_provider_missing_and_empty() {
        let root = tempfile::tempdir().unwrap();
        let provider = FileResourceProvider::new(root.path(), STOOL_MODEL);
        assert!(matches!(provider.model_bytes(), Err(ResourceError::NotFound(_))));

        fs::create_dir_all(provider.path().parent().unwrap()).unwrap();
        fs::write(provider.path(), b"").unwrap();
        assert!(matches!(provider.model_bytes(), Err(ResourceError::Empty(_))));
    }

    #[test]
    fn test_memory_provider() {
        let provider = MemoryResourceProvider::new(vec![1, 2, 3]);
        assert_eq!(provider.model_bytes().unwrap(), vec![1, 2, 3]);
        assert_eq!(provider.describe(), "memory:3 bytes");
    }
}
