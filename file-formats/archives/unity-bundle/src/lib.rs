//! # unity_bundle - UnityFS Asset Bundle Library
//!
//! Reading and writing of UnityFS asset bundles together with the header and
//! metadata prefix of the serialized (assets) files they carry.
//!
//! ## Features
//!
//! - UnityFS format versions 6 to 8
//! - LZ4, LZ4HC and LZMA block compression, plus uncompressed bundles
//! - Block info stored inline or at the end of the file
//! - Node replacement when writing a bundle back out
//! - Serialized-file headers up to version 22+ (64-bit extension)
//! - Class packages (schema resources) loaded from YAML
//!
//! ## Examples
//!
//! ### Changing the target platform of a bundle
//!
//! ```no_run
//! use unity_bundle::{AssetsManager, Replacement, WriteOptions};
//! use std::fs::File;
//!
//! # fn main() -> Result<(), unity_bundle::Error> {
//! let mut session = AssetsManager::from_class_package_file("classdata.yaml")?;
//!
//! let bundle = session.load_bundle("level0.bundle")?.decompress_to_memory()?;
//! let index = bundle.serialized_file_index().unwrap_or(0);
//! let mut assets = session.load_assets_file(&bundle, index)?;
//! assets.set_target_platform(13);
//!
//! let replacement = Replacement::new(bundle.nodes()[index].path.clone(), assets.serialize()?);
//! let mut out = File::create("level0.android.bundle")?;
//! bundle.write_with_replacements(&mut out, &[replacement], &WriteOptions::default())?;
//! # Ok(())
//! # }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]

pub mod blocks;
pub mod bundle;
pub mod class_package;
pub mod compression;
pub mod error;
pub mod header;
pub mod io;
pub mod manager;
pub mod platform;
pub mod serialized;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use blocks::{BlocksInfo, DirectoryNode, StorageBlock};
pub use bundle::{Bundle, BundleFile, Replacement, WriteOptions};
pub use class_package::{ClassDatabase, ClassInfo, ClassPackage, DEFAULT_CLASS_PACKAGE_NAME};
pub use compression::{compress, decompress};
pub use error::{Error, Result};
pub use header::{BundleHeader, CompressionType};
pub use manager::AssetsManager;
pub use platform::BuildTarget;
pub use serialized::{Endianness, SerializedFile, SerializedFileHeader};
