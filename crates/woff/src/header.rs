//! Fixed-size WOFF 1.0 / WOFF 2.0 container header.

use std::fmt;

use read_fonts::types::Tag;

use crate::{
    binary::{FontBuffer, Reader},
    error::{Result, WoffError},
    tags::{TRUETYPE_FLAVOR, TTCF},
};

/// Container format version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ContainerVersion {
    Woff1,
    #[default]
    Woff2,
}

impl ContainerVersion {
    pub const WOFF1_SIGNATURE: u32 = 0x774F_4646;
    pub const WOFF2_SIGNATURE: u32 = 0x774F_4632;

    pub fn signature(self) -> u32 {
        match self {
            Self::Woff1 => Self::WOFF1_SIGNATURE,
            Self::Woff2 => Self::WOFF2_SIGNATURE,
        }
    }

    pub fn header_len(self) -> usize {
        match self {
            Self::Woff1 => 44,
            Self::Woff2 => 48,
        }
    }

    /// File extension without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Woff1 => "woff",
            Self::Woff2 => "woff2",
        }
    }

    /// Detects the container version from the leading signature.
    pub fn sniff(data: &[u8]) -> Result<Self> {
        let signature = Reader::new(data).u32()?;
        match signature {
            Self::WOFF1_SIGNATURE => Ok(Self::Woff1),
            Self::WOFF2_SIGNATURE => Ok(Self::Woff2),
            other => Err(WoffError::UnknownSignature(other)),
        }
    }
}

impl fmt::Display for ContainerVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Woff1 => f.write_str("WOFF 1.0"),
            Self::Woff2 => f.write_str("WOFF 2.0"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerHeader {
    pub version: ContainerVersion,
    /// sfnt version of the wrapped font, `ttcf` for collections.
    pub flavor: u32,
    pub length: u32,
    pub num_tables: u16,
    pub reserved: u16,
    pub total_sfnt_size: u32,
    /// Size of the Brotli stream; WOFF 2.0 only.
    pub total_compressed_size: u32,
    pub major_version: u16,
    pub minor_version: u16,
    pub meta_offset: u32,
    pub meta_length: u32,
    pub meta_orig_length: u32,
    pub priv_offset: u32,
    pub priv_length: u32,
}

impl ContainerHeader {
    /// Parses and validates the header of `data` as `version`.
    pub fn read(data: &[u8], version: ContainerVersion) -> Result<Self> {
        let mut r = Reader::new(data);
        let signature = r.u32()?;
        if signature != version.signature() {
            return Err(WoffError::BadSignature { expected: version.signature(), actual: signature });
        }
        if data.len() < version.header_len() {
            return Err(WoffError::UnexpectedEof {
                offset: 0,
                needed: version.header_len(),
                available: data.len(),
            });
        }

        let flavor = r.u32()?;
        let length = r.u32()?;
        let num_tables = r.u16()?;
        let reserved = r.u16()?;
        let total_sfnt_size = r.u32()?;
        let total_compressed_size = match version {
            ContainerVersion::Woff1 => 0,
            ContainerVersion::Woff2 => r.u32()?,
        };
        let header = Self {
            version,
            flavor,
            length,
            num_tables,
            reserved,
            total_sfnt_size,
            total_compressed_size,
            major_version: r.u16()?,
            minor_version: r.u16()?,
            meta_offset: r.u32()?,
            meta_length: r.u32()?,
            meta_orig_length: r.u32()?,
            priv_offset: r.u32()?,
            priv_length: r.u32()?,
        };
        header.validate(data.len())?;
        Ok(header)
    }

    fn validate(&self, data_len: usize) -> Result<()> {
        if self.reserved != 0 {
            return Err(WoffError::NonZeroReserved(self.reserved));
        }
        if self.length as usize != data_len {
            return Err(WoffError::LengthMismatch { declared: self.length, actual: data_len });
        }
        if self.num_tables == 0 {
            return Err(WoffError::NoTables);
        }
        Ok(())
    }

    pub fn write(&self, out: &mut FontBuffer) {
        out.push_u32(self.version.signature())
            .push_u32(self.flavor)
            .push_u32(self.length)
            .push_u16(self.num_tables)
            .push_u16(0)
            .push_u32(self.total_sfnt_size);
        if self.version == ContainerVersion::Woff2 {
            out.push_u32(self.total_compressed_size);
        }
        out.push_u16(self.major_version)
            .push_u16(self.minor_version)
            .push_u32(self.meta_offset)
            .push_u32(self.meta_length)
            .push_u32(self.meta_orig_length)
            .push_u32(self.priv_offset)
            .push_u32(self.priv_length);
    }

    pub fn flavor_tag(&self) -> Tag {
        Tag::from_be_bytes(self.flavor.to_be_bytes())
    }

    pub fn has_metadata(&self) -> bool {
        self.meta_offset > 0 && self.meta_length != 0
    }

    pub fn has_private_data(&self) -> bool {
        self.priv_offset > 0 && self.priv_length != 0
    }

    pub fn is_truetype(&self) -> bool {
        self.flavor == TRUETYPE_FLAVOR
    }

    pub fn is_collection(&self) -> bool {
        self.flavor_tag() == TTCF
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(version: ContainerVersion) -> ContainerHeader {
        ContainerHeader {
            version,
            flavor: TRUETYPE_FLAVOR,
            length: version.header_len() as u32,
            num_tables: 1,
            total_sfnt_size: 100,
            total_compressed_size: if version == ContainerVersion::Woff2 { 10 } else { 0 },
            major_version: 1,
            ..Default::default()
        }
    }

    fn bytes(header: &ContainerHeader) -> Vec<u8> {
        let mut out = FontBuffer::new();
        header.write(&mut out);
        out.into_vec()
    }

    #[test]
    fn test_header_sizes() {
        for version in [ContainerVersion::Woff1, ContainerVersion::Woff2] {
            let header = sample(version);
            let data = bytes(&header);
            assert_eq!(data.len(), version.header_len());
            assert_eq!(ContainerHeader::read(&data, version).unwrap(), header);
        }
    }

    #[test]
    fn test_woff2_read_as_woff1_rejected() {
        let data = bytes(&sample(ContainerVersion::Woff2));
        let err = ContainerHeader::read(&data, ContainerVersion::Woff1).unwrap_err();
        assert!(matches!(err, WoffError::BadSignature { actual: 0x774F_4632, .. }));
    }

    #[test]
    fn test_woff2_with_woff1_header_size_rejected() {
        // A 'wOF2' signature on a 44-byte WOFF 1.0 sized header.
        let mut header = sample(ContainerVersion::Woff1);
        header.length = 44;
        let mut data = bytes(&header);
        data[0..4].copy_from_slice(&ContainerVersion::WOFF2_SIGNATURE.to_be_bytes());
        assert_eq!(ContainerVersion::sniff(&data).unwrap(), ContainerVersion::Woff2);
        assert!(ContainerHeader::read(&data, ContainerVersion::Woff2).is_err());
    }

    #[test]
    fn test_reserved_must_be_zero() {
        let mut data = bytes(&sample(ContainerVersion::Woff1));
        data[14] = 1;
        assert!(matches!(
            ContainerHeader::read(&data, ContainerVersion::Woff1),
            Err(WoffError::NonZeroReserved(0x0100))
        ));
    }

    #[test]
    fn test_length_mismatch() {
        let mut data = bytes(&sample(ContainerVersion::Woff2));
        data.push(0);
        assert!(matches!(
            ContainerHeader::read(&data, ContainerVersion::Woff2),
            Err(WoffError::LengthMismatch { declared: 48, actual: 49 })
        ));
    }

    #[test]
    fn test_predicates() {
        let mut header = sample(ContainerVersion::Woff2);
        assert!(header.is_truetype());
        assert!(!header.is_collection());
        assert!(!header.has_metadata());
        header.meta_offset = 48;
        assert!(!header.has_metadata());
        header.meta_length = 4;
        assert!(header.has_metadata());
        header.flavor = u32::from_be_bytes(*b"ttcf");
        assert!(header.is_collection());
        assert!(ContainerVersion::sniff(b"OTTO").is_err());
    }
}
