//! Serialized file fixture builder

use crate::serialized::{Endianness, LARGE_FILES_VERSION};

/// Builder for synthetic serialized files
#[derive(Debug, Clone)]
pub struct SerializedFileBuilder {
    version: u32,
    unity_version: String,
    target_platform: u32,
    endianness: Endianness,
    type_tree: Vec<u8>,
    object_data: Vec<u8>,
}

impl Default for SerializedFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SerializedFileBuilder {
    /// Version 22 file for `2019.4.40f1` targeting platform 5
    pub fn new() -> Self {
        let mut type_tree = vec![1u8]; // enableTypeTree
        type_tree.extend_from_slice(&3u32.to_le_bytes()); // type count
        for class_id in [1u32, 4, 114] {
            type_tree.extend_from_slice(&class_id.to_le_bytes());
            type_tree.extend_from_slice(&[0; 16]);
        }

        let object_data = (0..4096u32)
            .flat_map(|i| (i.wrapping_mul(2_654_435_761) >> 7).to_le_bytes())
            .collect();

        Self {
            version: 22,
            unity_version: "2019.4.40f1".to_string(),
            target_platform: 5,
            endianness: Endianness::Little,
            type_tree,
            object_data,
        }
    }

    /// Set the format version
    pub fn version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    /// Set the embedded engine version
    pub fn unity_version<S: Into<String>>(mut self, version: S) -> Self {
        self.unity_version = version.into();
        self
    }

    /// Set the target platform code
    pub fn target_platform(mut self, platform: u32) -> Self {
        self.target_platform = platform;
        self
    }

    /// Set the metadata byte order
    pub fn endianness(mut self, endianness: Endianness) -> Self {
        self.endianness = endianness;
        self
    }

    /// Replace the object data payload
    pub fn object_data(mut self, data: Vec<u8>) -> Self {
        self.object_data = data;
        self
    }

    /// Produce the file bytes
    pub fn build(&self) -> Vec<u8> {
        let large = self.version >= LARGE_FILES_VERSION;
        let header_len: u64 = if large { 48 } else { 20 };
        let metadata_size = (self.unity_version.len() + 1 + 4 + self.type_tree.len()) as u64;
        let metadata_end = header_len + metadata_size;
        let data_offset = metadata_end.div_ceil(16) * 16;
        let file_size = data_offset + self.object_data.len() as u64;

        let mut out = Vec::with_capacity(file_size as usize);
        if large {
            out.extend_from_slice(&0u32.to_be_bytes());
            out.extend_from_slice(&0u32.to_be_bytes());
            out.extend_from_slice(&self.version.to_be_bytes());
            out.extend_from_slice(&0u32.to_be_bytes());
        } else {
            out.extend_from_slice(&(metadata_size as u32).to_be_bytes());
            out.extend_from_slice(&(file_size as u32).to_be_bytes());
            out.extend_from_slice(&self.version.to_be_bytes());
            out.extend_from_slice(&(data_offset as u32).to_be_bytes());
        }
        out.push(match self.endianness {
            Endianness::Little => 0,
            Endianness::Big => 1,
        });
        out.extend_from_slice(&[0; 3]);
        if large {
            out.extend_from_slice(&(metadata_size as u32).to_be_bytes());
            out.extend_from_slice(&file_size.to_be_bytes());
            out.extend_from_slice(&data_offset.to_be_bytes());
            out.extend_from_slice(&0u64.to_be_bytes());
        }

        out.extend_from_slice(self.unity_version.as_bytes());
        out.push(0);
        match self.endianness {
            Endianness::Little => out.extend_from_slice(&self.target_platform.to_le_bytes()),
            Endianness::Big => out.extend_from_slice(&self.target_platform.to_be_bytes()),
        }
        out.extend_from_slice(&self.type_tree);
        out.resize(data_offset as usize, 0);
        out.extend_from_slice(&self.object_data);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_header_layout() {
        let bytes = SerializedFileBuilder::new().version(21).build();
        let field = |at: usize| u32::from_be_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]]);

        assert_eq!(field(4) as usize, bytes.len());
        assert_eq!(field(8), 21);
        assert_eq!(field(12) % 16, 0);
    }

    #[test]
    fn test_large_header_leaves_legacy_slots_empty() {
        let bytes = SerializedFileBuilder::new().version(22).build();
        assert_eq!(&bytes[0..8], &[0; 8]);
        assert_eq!(&bytes[8..12], &22u32.to_be_bytes());
        assert_eq!(&bytes[24..32], &(bytes.len() as u64).to_be_bytes());
    }
}
