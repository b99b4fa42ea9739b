use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::ResourceError;

/// A logical resource path such as `Models/model.onnx`.
///
/// The first path component is the resource category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Resource {
    path: &'static str,
}

impl Resource {
    pub const fn new(path: &'static str) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &'static str {
        self.path
    }

    /// Category folder, i.e. the first path component.
    pub fn category(&self) -> &'static str {
        self.path.split('/').next().unwrap_or(self.path)
    }

    pub fn file_name(&self) -> &'static str {
        self.path.rsplit('/').next().unwrap_or(self.path)
    }

    /// Location of this resource below `root`.
    pub fn locate(&self, root: &Path) -> PathBuf {
        self.path.split('/').fold(root.to_path_buf(), |acc, part| acc.join(part))
    }

    /// MIME type derived from the file extension.
    pub fn content_type(&self) -> &'static str {
        let extension = Path::new(self.path)
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "html" => "text/html",
            "otf" => "font/otf",
            "ttf" => "font/ttf",
            "svg" => "image/svg+xml",
            "png" => "image/png",
            "jpg" | "jpeg" => "image/jpeg",
            "txt" => "text/plain",
            "csv" => "text/csv",
            "pdf" => "application/pdf",
            "cer" => "application/x-x509-ca-cert",
            _ => "application/octet-stream",
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path)
    }
}

/// The classification model.
pub const STOOL_MODEL: Resource = Resource::new("Models/kf_sttool_classification_628.onnx");
/// The single-page upload frontend.
pub const CLASSIFICATION_FRONTEND: Resource =
    Resource::new("Frontend/StoolClassificationFrontend.html");

/// Every resource the service knows about, keyed by logical name.
pub static RESOURCES: &[(&str, Resource)] = &[
    ("models.stool", STOOL_MODEL),
    ("frontend.classification", CLASSIFICATION_FRONTEND),
];

/// Looks up a registered resource by logical name.
pub fn lookup(name: &str) -> Result<Resource, ResourceError> {
    RESOURCES
        .iter()
        .find(|(key, _)| *key == name)
        .map(|(_, resource)| *resource)
        .ok_or_else(|| ResourceError::Unknown(name.to_string()))
}

/// Category folders that appear in the registry.
pub fn categories() -> BTreeSet<&'static str> {
    RESOURCES.iter().map(|(_, r)| r.category()).collect()
}

/// Checks that the registry and the files on disk agree.
///
/// Every registered resource must exist below at least one of `roots`, and
/// every file found in a known category folder below any root must be
/// registered. Both kinds of mismatch are collected and reported together.
///
/// # Errors
///
/// Returns `ResourceError::Mapping` listing missing and unmapped entries.
pub fn verify_resource_mappings(roots: &[PathBuf]) -> Result<(), ResourceError> {
    let mapped: BTreeSet<&str> = RESOURCES.iter().map(|(_, r)| r.path()).collect();

    let missing: Vec<String> = RESOURCES
        .iter()
        .filter(|(_, r)| !roots.iter().any(|root| r.locate(root).is_file()))
        .map(|(_, r)| r.path().to_string())
        .collect();

    let mut unmapped = BTreeSet::new();
    for root in roots {
        for category in categories() {
            let dir = root.join(category);
            let entries = match fs::read_dir(&dir) {
                Ok(entries) => entries,
                Err(_) => continue,
            };
            for entry in entries.filter_map(Result::ok) {
                let path = entry.path();
                if !path.is_file() || entry.file_name().to_string_lossy().starts_with('.') {
                    continue;
                }
                let logical = format!("{}/{}", category, entry.file_name().to_string_lossy());
                if !mapped.contains(logical.as_str()) {
                    debug!("Unmapped file: {}", path.display());
                    unmapped.insert(logical);
                }
            }
        }
    }

    if missing.is_empty() && unmapped.is_empty() {
        info!(resources = RESOURCES.len(), "Resource mappings verified");
        return Ok(());
    }

    Err(ResourceError::Mapping {
        missing,
        unmapped: unmapped.into_iter().collect(),
    })
}
