//! Per-worker library session
//!
//! An [`AssetsManager`] owns everything a conversion needs that is not safe
//! or cheap to share: its own copy of the class package, a cache of resolved
//! class databases, and the record of bundles opened for the current job.
//! Each worker thread creates its own session; nothing here is shared between
//! threads.
//!
//! The session does not keep archive handles open. A [`BundleFile`] closes
//! its file when it is consumed or dropped; the session only records which
//! paths were opened until [`AssetsManager::release_bundles`] is called.

use crate::bundle::{Bundle, BundleFile};
use crate::class_package::{ClassDatabase, ClassPackage};
use crate::serialized::SerializedFile;
use crate::{Error, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Library session holding the schema and per-session caches
#[derive(Debug)]
pub struct AssetsManager {
    package: ClassPackage,
    /// Engine version -> index into `package.databases`
    database_cache: HashMap<String, Option<usize>>,
    /// Bundles opened since the last release
    loaded_bundles: Vec<PathBuf>,
}

impl AssetsManager {
    /// Create a session around a class package
    pub fn new(package: ClassPackage) -> Self {
        Self {
            package,
            database_cache: HashMap::new(),
            loaded_bundles: Vec::new(),
        }
    }

    /// Create a session, loading the class package from disk
    pub fn from_class_package_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::new(ClassPackage::load(path)?))
    }

    /// Class package used by this session
    pub fn class_package(&self) -> &ClassPackage {
        &self.package
    }

    /// Open a bundle and record it in the session
    pub fn load_bundle<P: AsRef<Path>>(&mut self, path: P) -> Result<BundleFile> {
        let path = path.as_ref();
        let bundle = BundleFile::open(path)?;
        self.loaded_bundles.push(path.to_path_buf());
        Ok(bundle)
    }

    /// Parse the serialized file stored in node `index` of a bundle
    pub fn load_assets_file(&self, bundle: &Bundle, index: usize) -> Result<SerializedFile> {
        let node = bundle
            .nodes()
            .get(index)
            .ok_or_else(|| Error::NodeNotFound(format!("#{index}")))?;
        log::trace!("Loading assets file {}", node.path);
        SerializedFile::parse(bundle.node_data(index)?)
    }

    /// Resolve the class database for an engine version.
    ///
    /// Results (including misses) are cached per session.
    pub fn load_class_database(&mut self, unity_version: &str) -> Option<&ClassDatabase> {
        let package = &self.package;
        let index = *self
            .database_cache
            .entry(unity_version.to_string())
            .or_insert_with(|| {
                let found = package.find_database_index(unity_version);
                match found {
                    Some(i) => log::debug!(
                        "Using class database '{}' for engine {}",
                        package.databases[i].version,
                        unity_version
                    ),
                    None => log::debug!("No class database matches engine {unity_version}"),
                }
                found
            });
        index.map(|i| &self.package.databases[i])
    }

    /// Bundles opened since the last release, in order
    pub fn loaded_bundles(&self) -> &[PathBuf] {
        &self.loaded_bundles
    }

    /// Forget the bundles opened for the finished job.
    ///
    /// Cached class databases stay loaded for the next job.
    pub fn release_bundles(&mut self) {
        for path in self.loaded_bundles.drain(..) {
            log::trace!("Released bundle {}", path.display());
        }
    }

    /// Tear the session down: forget opened bundles and cached databases
    pub fn unload_all(&mut self) {
        log::trace!(
            "Unloading session ({} bundles, {} cached databases)",
            self.loaded_bundles.len(),
            self.database_cache.len()
        );
        self.loaded_bundles.clear();
        self.database_cache.clear();
    }
}
