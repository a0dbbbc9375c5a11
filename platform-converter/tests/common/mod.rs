//! Shared fixtures for converter integration tests

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use unity_bundle::test_utils::{BundleBuilder, SerializedFileBuilder, sample_bundle};
use unity_bundle::{BuildTarget, BundleFile, SerializedFile};
use unity_platform_converter::ConvertConfig;

/// Class package shipped with the converter
pub fn class_package_path() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("resources/classdata.yaml")
}

/// Scratch layout for one batch run
pub struct Workspace {
    pub root: TempDir,
    pub input: PathBuf,
    pub output: PathBuf,
    pub staging: PathBuf,
}

impl Workspace {
    pub fn new() -> Self {
        let root = TempDir::new().unwrap();
        let input = root.path().join("input");
        let output = root.path().join("output");
        let staging = root.path().join("staging");
        fs::create_dir(&input).unwrap();
        fs::create_dir(&staging).unwrap();
        Self {
            root,
            input,
            output,
            staging,
        }
    }

    /// Write `count` valid bundles with distinct payloads
    pub fn add_bundles(&self, count: usize, platform: u32) {
        for i in 0..count {
            let assets = SerializedFileBuilder::new()
                .target_platform(platform)
                .object_data(format!("object payload {i} ").repeat(400 + i).into_bytes())
                .build();
            BundleBuilder::new()
                .serialized_file(format!("CAB-{i:032x}"), assets)
                .resource(format!("CAB-{i:032x}.resS"), vec![i as u8; 4096])
                .write_to(self.input.join(format!("bundle_{i:02}.unity3d")))
                .unwrap();
        }
    }

    /// Write a file that is not a bundle
    pub fn add_corrupt(&self, name: &str) {
        fs::write(self.input.join(name), b"UnityFS\0garbage that ends early").unwrap();
    }

    /// Silent directory-mode configuration for this workspace
    pub fn config(&self, platform: BuildTarget, threads: usize) -> ConvertConfig {
        let mut config = ConvertConfig::directory(&self.input, &self.output, platform);
        config.class_package = class_package_path();
        config.staging_dir = self.staging.clone();
        config.threads = threads;
        config.silent = true;
        config
    }

    pub fn staging_is_empty(&self) -> bool {
        fs::read_dir(&self.staging).unwrap().next().is_none()
    }

    /// Names of the files in the output directory, sorted
    pub fn output_names(&self) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(&self.output)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }
}

/// Write a single sample bundle into `dir`
pub fn write_sample(dir: &Path, name: &str, platform: u32) -> PathBuf {
    let path = dir.join(name);
    sample_bundle(platform).write_to(&path).unwrap();
    path
}

/// Read back the serialized file of a bundle on disk
pub fn read_assets(path: &Path) -> SerializedFile {
    let bundle = BundleFile::open(path).unwrap().decompress_to_memory().unwrap();
    let index = bundle.serialized_file_index().unwrap();
    SerializedFile::parse(bundle.node_data(index).unwrap()).unwrap()
}

/// Decompressed data stream of a bundle on disk
pub fn read_stream(path: &Path) -> Vec<u8> {
    BundleFile::open(path)
        .unwrap()
        .decompress_to_memory()
        .unwrap()
        .data()
        .to_vec()
}
