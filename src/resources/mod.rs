//! Static resource registry and the providers that serve model bytes.

pub mod provider;
pub mod registry;
pub mod store;

pub use provider::{FileResourceProvider, MemoryResourceProvider, ResourceProvider};
pub use registry::{
    categories, lookup, verify_resource_mappings, Resource, CLASSIFICATION_FRONTEND, RESOURCES,
    STOOL_MODEL,
};
pub use store::{resolve_model_root, BlobStore};
