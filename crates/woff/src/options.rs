//! Options for decoding and encoding

use crate::{compression::DEFAULT_ZLIB_LEVEL, header::ContainerVersion};

/// Default cap on the total decompressed table size (256 MiB).
pub const DEFAULT_MAX_DECOMPRESSED_SIZE: u64 = 256 * 1024 * 1024;

/// Options for decoding a WOFF or WOFF2 file
#[derive(Debug, Clone)]
pub struct DecodeOptions {
    /// Restore missing family/full name records in the name table
    pub repair_names: bool,

    /// Compare WOFF 1.0 table checksums against the decompressed data
    pub verify_checksums: bool,

    /// Upper bound for the declared decompressed table data
    pub max_decompressed_size: u64,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            repair_names: true,
            verify_checksums: true,
            max_decompressed_size: DEFAULT_MAX_DECOMPRESSED_SIZE,
        }
    }
}

impl DecodeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn repair_names(mut self, repair_names: bool) -> Self {
        self.repair_names = repair_names;
        self
    }

    pub fn verify_checksums(mut self, verify_checksums: bool) -> Self {
        self.verify_checksums = verify_checksums;
        self
    }

    pub fn max_decompressed_size(mut self, limit: u64) -> Self {
        self.max_decompressed_size = limit;
        self
    }
}

/// Options for encoding an sfnt into a WOFF or WOFF2 container
#[derive(Debug, Clone)]
pub struct EncodeOptions {
    /// Target container format
    pub version: ContainerVersion,

    /// Apply the glyf/loca transform (WOFF2, single TrueType fonts)
    pub transform_glyf: bool,

    /// Apply the hmtx transform when left side bearings match glyph bounds;
    /// only together with a transformed glyf
    pub transform_hmtx: bool,

    /// zlib level for WOFF 1.0 tables and metadata
    pub zlib_level: u32,

    /// Extended metadata XML, stored compressed
    pub metadata: Option<Vec<u8>>,

    /// Private data block, stored as-is
    pub private_data: Option<Vec<u8>>,

    /// Font version written to the container header
    pub major_version: u16,
    pub minor_version: u16,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            version: ContainerVersion::Woff2,
            transform_glyf: true,
            transform_hmtx: true,
            zlib_level: DEFAULT_ZLIB_LEVEL,
            metadata: None,
            private_data: None,
            major_version: 0,
            minor_version: 0,
        }
    }
}

impl EncodeOptions {
    pub fn new(version: ContainerVersion) -> Self {
        Self { version, ..Default::default() }
    }

    pub fn version(mut self, version: ContainerVersion) -> Self {
        self.version = version;
        self
    }

    /// Enable or disable both glyf and hmtx transforms
    pub fn transform(mut self, enabled: bool) -> Self {
        self.transform_glyf = enabled;
        self.transform_hmtx = enabled;
        self
    }

    pub fn transform_glyf(mut self, enabled: bool) -> Self {
        self.transform_glyf = enabled;
        self
    }

    pub fn transform_hmtx(mut self, enabled: bool) -> Self {
        self.transform_hmtx = enabled;
        self
    }

    pub fn zlib_level(mut self, level: u32) -> Self {
        self.zlib_level = level.min(9);
        self
    }

    pub fn metadata(mut self, xml: impl Into<Vec<u8>>) -> Self {
        self.metadata = Some(xml.into());
        self
    }

    pub fn private_data(mut self, data: impl Into<Vec<u8>>) -> Self {
        self.private_data = Some(data.into());
        self
    }

    pub fn font_version(mut self, major: u16, minor: u16) -> Self {
        self.major_version = major;
        self.minor_version = minor;
        self
    }
}
