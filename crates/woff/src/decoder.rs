//! WOFF 1.0 / WOFF 2.0 import: header, directory, payload decompression and
//! per-font table reconstruction.

use log::{debug, info, warn};

use crate::{
    binary::{Reader, table_checksum},
    collection::CollectionHeader,
    compression::{brotli_decompress, inflate_block, zlib_decompress},
    directory::{TableRecord, read_woff1, read_woff2},
    error::{Result, WoffError},
    font::Font,
    header::{ContainerHeader, ContainerVersion},
    options::DecodeOptions,
    reconstruct::rebuild_font,
    sfnt::{write_collection, write_sfnt},
    tags::CFF_FLAVOR,
};

/// Decodes WOFF containers into sfnt tables.
#[derive(Debug, Clone, Default)]
pub struct Decoder {
    options: DecodeOptions,
}

/// A decoded container: plain sfnt tables grouped into fonts, plus the
/// optional metadata and private data blocks.
#[derive(Debug, Clone)]
pub struct DecodedFile {
    header: ContainerHeader,
    tables: Vec<TableRecord>,
    fonts: Vec<Font>,
    collection: Option<CollectionHeader>,
    metadata: Option<Vec<u8>>,
    private_data: Option<Vec<u8>>,
}

impl DecodedFile {
    pub fn header(&self) -> &ContainerHeader {
        &self.header
    }

    pub fn version(&self) -> ContainerVersion {
        self.header.version
    }

    pub fn tables(&self) -> &[TableRecord] {
        &self.tables
    }

    pub fn fonts(&self) -> &[Font] {
        &self.fonts
    }

    pub fn collection(&self) -> Option<&CollectionHeader> {
        self.collection.as_ref()
    }

    pub fn is_collection(&self) -> bool {
        self.collection.is_some()
    }

    /// Decompressed extended metadata (XML).
    pub fn metadata(&self) -> Option<&[u8]> {
        self.metadata.as_deref()
    }

    pub fn private_data(&self) -> Option<&[u8]> {
        self.private_data.as_deref()
    }

    /// File extension matching [`to_sfnt`](Self::to_sfnt) output.
    pub fn extension(&self) -> &'static str {
        let cff = self.fonts.first().is_some_and(|font| font.flavor == CFF_FLAVOR);
        match (self.is_collection(), cff) {
            (true, true) => "otc",
            (true, false) => "ttc",
            (false, true) => "otf",
            (false, false) => "ttf",
        }
    }

    /// Serializes the decoded fonts as an sfnt font or collection.
    pub fn to_sfnt(&self) -> Result<Vec<u8>> {
        match &self.collection {
            Some(collection) => {
                if self.fonts.iter().any(|font| font.transformed) {
                    return Err(WoffError::TransformedCollection);
                }
                write_collection(collection.version, &self.fonts, &self.tables)
            }
            None => write_sfnt(&self.tables, &self.fonts, None),
        }
    }
}

/// Borrows `length` bytes at `offset`, failing with a short read.
fn block<'a>(data: &'a [u8], offset: u32, length: u32, what: &'static str) -> Result<&'a [u8]> {
    let start = offset as usize;
    data.get(start..start + length as usize).ok_or(WoffError::ShortRead {
        what,
        expected: length as usize,
        actual: data.len().saturating_sub(start).min(length as usize),
    })
}

impl Decoder {
    pub fn new(options: DecodeOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &DecodeOptions {
        &self.options
    }

    /// Decodes `data`, detecting the container version from its signature.
    pub fn decode(&self, data: &[u8]) -> Result<DecodedFile> {
        let version = ContainerVersion::sniff(data)?;
        self.decode_as(data, version)
    }

    /// Decodes `data` as the given container version.
    pub fn decode_as(&self, data: &[u8], version: ContainerVersion) -> Result<DecodedFile> {
        let header = ContainerHeader::read(data, version)?;
        info!(
            "decoding {version}: flavor '{}', {} tables, {} bytes",
            header.flavor_tag(),
            header.num_tables,
            header.length
        );

        let (mut tables, fonts, collection) = match version {
            ContainerVersion::Woff1 => self.read_woff1_tables(data, &header)?,
            ContainerVersion::Woff2 => self.read_woff2_tables(data, &header)?,
        };

        let mut done = vec![false; tables.len()];
        for font in &fonts {
            rebuild_font(&mut tables, font, &self.options, &mut done)?;
        }

        let metadata = self.read_metadata(data, &header)?;
        let private_data = header
            .has_private_data()
            .then(|| block(data, header.priv_offset, header.priv_length, "private data").map(<[u8]>::to_vec))
            .transpose()?;

        debug!(
            "decoded {} fonts, metadata: {}, private data: {}",
            fonts.len(),
            metadata.is_some(),
            private_data.is_some()
        );
        Ok(DecodedFile { header, tables, fonts, collection, metadata, private_data })
    }

    fn check_size(&self, declared: u64) -> Result<()> {
        if declared > self.options.max_decompressed_size {
            return Err(WoffError::TooLarge { declared, limit: self.options.max_decompressed_size });
        }
        Ok(())
    }

    fn read_woff1_tables(
        &self,
        data: &[u8],
        header: &ContainerHeader,
    ) -> Result<(Vec<TableRecord>, Vec<Font>, Option<CollectionHeader>)> {
        if header.is_collection() {
            return Err(WoffError::Woff1Collection);
        }
        let mut tables = read_woff1(data, header.version.header_len(), header.num_tables)?;
        self.check_size(tables.iter().map(|t| u64::from(t.orig_length)).sum())?;

        for record in &mut tables {
            let stored = block(data, record.offset, record.comp_length, "table data")?;
            let bytes = inflate_block(
                stored,
                record.orig_length as usize,
                &format!("table '{}'", record.tag),
                zlib_decompress,
            )?;
            let declared = record.checksum;
            if self.options.verify_checksums && table_checksum(record.tag, &bytes) != declared {
                warn!("table '{}' checksum does not match directory ({declared:#010x})", record.tag);
            }
            debug!("table '{}': {} -> {} bytes", record.tag, record.comp_length, bytes.len());
            record.set_untransformed(bytes);
        }

        let font = Font::new(header.flavor, (0..tables.len()).collect(), &tables);
        Ok((tables, vec![font], None))
    }

    fn read_woff2_tables(
        &self,
        data: &[u8],
        header: &ContainerHeader,
    ) -> Result<(Vec<TableRecord>, Vec<Font>, Option<CollectionHeader>)> {
        let mut r = Reader::at(data, header.version.header_len())?;
        let mut tables = read_woff2(&mut r, header.num_tables)?;
        let collection = if header.is_collection() {
            Some(CollectionHeader::read(&mut r, &tables)?)
        } else {
            None
        };

        let total: u64 = tables.iter().map(|t| u64::from(t.comp_length)).sum();
        self.check_size(total)?;
        let compressed = block(data, r.position() as u32, header.total_compressed_size, "compressed table data")?;
        let stream = brotli_decompress(compressed, total as usize)
            .map_err(|source| WoffError::Decompress { what: "table stream".to_string(), source })?;
        if stream.len() < total as usize {
            return Err(WoffError::ShortRead { what: "table stream", expected: total as usize, actual: stream.len() });
        }
        if stream.len() > total as usize {
            return Err(WoffError::InvalidSfnt("table stream is longer than its directory"));
        }
        debug!("brotli stream: {} -> {} bytes", compressed.len(), stream.len());

        for record in &mut tables {
            let start = record.offset as usize;
            let bytes = stream[start..start + record.comp_length as usize].to_vec();
            if record.transformed {
                record.set_stored(bytes);
            } else {
                record.set_data(bytes);
            }
        }

        let fonts = match &collection {
            Some(collection) => collection
                .fonts
                .iter()
                .map(|entry| {
                    let indices = entry.table_indices.iter().map(|&i| i as usize).collect();
                    Font::new(entry.flavor, indices, &tables)
                })
                .collect(),
            None => vec![Font::new(header.flavor, (0..tables.len()).collect(), &tables)],
        };
        Ok((tables, fonts, collection))
    }

    fn read_metadata(&self, data: &[u8], header: &ContainerHeader) -> Result<Option<Vec<u8>>> {
        if !header.has_metadata() {
            return Ok(None);
        }
        self.check_size(u64::from(header.meta_orig_length))?;
        let stored = block(data, header.meta_offset, header.meta_length, "metadata")?;
        let decompress = match header.version {
            ContainerVersion::Woff1 => zlib_decompress,
            ContainerVersion::Woff2 => brotli_decompress,
        };
        inflate_block(stored, header.meta_orig_length as usize, "metadata", decompress).map(Some)
    }
}
