//! Class package: the schema-definition resource
//!
//! A class package groups class databases (type descriptors for one engine
//! release or release family) in a single YAML document:
//!
//! ```yaml
//! name: classdata
//! databases:
//!   - version: "2019.4.*"
//!     classes:
//!       - { id: 1, name: GameObject }
//!       - { id: 4, name: Transform, base: Component }
//! ```
//!
//! A database is selected by the engine version string embedded in a
//! serialized file: an exact `version` match wins, otherwise the longest
//! matching `prefix*` pattern.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Default file name of the class package
pub const DEFAULT_CLASS_PACKAGE_NAME: &str = "classdata.yaml";

/// One class descriptor
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ClassInfo {
    /// Persistent class ID
    pub id: i32,
    /// Class name
    pub name: String,
    /// Base class name, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base: Option<String>,
}

/// Type descriptors for one engine release family
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ClassDatabase {
    /// Engine version or `prefix*` pattern
    pub version: String,
    /// Class descriptors
    #[serde(default)]
    pub classes: Vec<ClassInfo>,
}

impl ClassDatabase {
    /// Look up a class by ID
    pub fn class_by_id(&self, id: i32) -> Option<&ClassInfo> {
        self.classes.iter().find(|c| c.id == id)
    }

    /// Look up a class by name
    pub fn class_by_name(&self, name: &str) -> Option<&ClassInfo> {
        self.classes.iter().find(|c| c.name == name)
    }

    /// How specifically this database matches `version`.
    ///
    /// `None` when it does not match at all; exact matches outrank every
    /// pattern.
    fn match_rank(&self, version: &str) -> Option<usize> {
        if self.version == version {
            return Some(usize::MAX);
        }
        let prefix = self.version.strip_suffix('*')?;
        version.starts_with(prefix).then_some(prefix.len())
    }
}

/// The full class package
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ClassPackage {
    /// Package name
    #[serde(default)]
    pub name: String,
    /// Class databases
    pub databases: Vec<ClassDatabase>,
}

impl ClassPackage {
    /// Load a class package from a YAML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let package: ClassPackage = serde_yaml_ng::from_reader(BufReader::new(file))
            .map_err(|e| Error::ClassPackage(format!("{}: {e}", path.display())))?;
        package.validate()?;

        log::debug!(
            "Loaded class package {} with {} databases",
            path.display(),
            package.databases.len()
        );
        Ok(package)
    }

    /// Load a class package from a YAML string
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let package: ClassPackage =
            serde_yaml_ng::from_str(yaml).map_err(|e| Error::ClassPackage(e.to_string()))?;
        package.validate()?;
        Ok(package)
    }

    fn validate(&self) -> Result<()> {
        if self.databases.is_empty() {
            return Err(Error::ClassPackage(
                "package contains no class databases".to_string(),
            ));
        }
        Ok(())
    }

    /// Index of the best database for an engine version
    pub fn find_database_index(&self, version: &str) -> Option<usize> {
        self.databases
            .iter()
            .enumerate()
            .filter_map(|(i, db)| db.match_rank(version).map(|rank| (rank, i)))
            // first database wins among equal ranks
            .max_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)))
            .map(|(_, i)| i)
    }

    /// Best database for an engine version
    pub fn find_database(&self, version: &str) -> Option<&ClassDatabase> {
        self.find_database_index(version)
            .map(|i| &self.databases[i])
    }
}
