//! Packs sfnt fonts and collections into WOFF 1.0 or WOFF 2.0 containers.

use log::{debug, info, warn};

use crate::{
    binary::{FontBuffer, round4, table_checksum},
    collection::{CollectionFontEntry, CollectionHeader, ttc_header_len},
    compression::{brotli_compress, zlib_compress},
    directory::{GLYF_NULL_TRANSFORM, TableRecord, WOFF1_RECORD_LEN},
    error::{Result, WoffError},
    font::Font,
    glyf::{Glyph, LocaFormat, encode_glyf, read_glyf, read_loca, write_glyf},
    header::{ContainerHeader, ContainerVersion},
    options::EncodeOptions,
    reconstruct::{index_to_loc_format, transform_hmtx},
    sfnt::{OFFSET_TABLE_LEN, SfntFile, TABLE_RECORD_LEN},
    tags::{GLYF, HEAD, HMTX, LOCA, TRUETYPE_FLAVOR, TTCF},
};

const HMTX_TRANSFORM: u8 = 1;

/// Encodes sfnt data into a WOFF container.
#[derive(Debug, Clone, Default)]
pub struct Encoder {
    options: EncodeOptions,
}

/// Size of the sfnt the container will decode to.
fn total_sfnt_size(sfnt: &SfntFile, tables: &[TableRecord]) -> u32 {
    let directories: usize = sfnt
        .fonts
        .iter()
        .map(|font| OFFSET_TABLE_LEN + TABLE_RECORD_LEN * font.num_tables())
        .sum();
    let header = match sfnt.collection_version {
        Some(version) => ttc_header_len(version, sfnt.fonts.len()),
        None => 0,
    };
    let data: usize = tables.iter().map(|t| round4(t.orig_length as usize)).sum();
    (header + directories + data) as u32
}

impl Encoder {
    pub fn new(options: EncodeOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &EncodeOptions {
        &self.options
    }

    /// Encodes a `.ttf`/`.otf` font or `.ttc`/`.otc` collection.
    pub fn encode(&self, data: &[u8]) -> Result<Vec<u8>> {
        let sfnt = SfntFile::read(data)?;
        self.encode_sfnt(&sfnt)
    }

    pub fn encode_sfnt(&self, sfnt: &SfntFile) -> Result<Vec<u8>> {
        info!(
            "encoding {} font(s), {} tables as {}",
            sfnt.fonts.len(),
            sfnt.tables.len(),
            self.options.version
        );
        match self.options.version {
            ContainerVersion::Woff1 => self.encode_woff1(sfnt),
            ContainerVersion::Woff2 => self.encode_woff2(sfnt),
        }
    }

    fn header(&self, version: ContainerVersion, flavor: u32, num_tables: usize) -> ContainerHeader {
        ContainerHeader {
            version,
            flavor,
            num_tables: num_tables as u16,
            major_version: self.options.major_version,
            minor_version: self.options.minor_version,
            ..Default::default()
        }
    }

    /// Appends metadata and private data, each starting on a 4-byte boundary,
    /// and fills in their header fields.
    fn push_extension_blocks(
        &self,
        out: &mut FontBuffer,
        header: &mut ContainerHeader,
        compress: impl FnOnce(&[u8]) -> Result<Vec<u8>>,
    ) -> Result<()> {
        if let Some(metadata) = self.options.metadata.as_deref().filter(|m| !m.is_empty()) {
            let compressed = compress(metadata)?;
            out.pad4();
            header.meta_offset = out.len() as u32;
            header.meta_length = compressed.len() as u32;
            header.meta_orig_length = metadata.len() as u32;
            out.push_bytes(&compressed);
            debug!("metadata: {} -> {} bytes", metadata.len(), compressed.len());
        }
        if let Some(private_data) = self.options.private_data.as_deref().filter(|p| !p.is_empty()) {
            out.pad4();
            header.priv_offset = out.len() as u32;
            header.priv_length = private_data.len() as u32;
            out.push_bytes(private_data);
        }
        Ok(())
    }

    fn encode_woff1(&self, sfnt: &SfntFile) -> Result<Vec<u8>> {
        if sfnt.is_collection() {
            return Err(WoffError::Woff1Collection);
        }
        let font = sfnt.fonts.first().ok_or(WoffError::NoTables)?;
        let indices = font.sorted_indices(&sfnt.tables);
        let level = self.options.zlib_level;

        let header_len = ContainerVersion::Woff1.header_len();
        let mut offset = round4(header_len + WOFF1_RECORD_LEN * indices.len());
        let mut records = Vec::with_capacity(indices.len());
        let mut stored = Vec::with_capacity(indices.len());
        for &index in &indices {
            let table = &sfnt.tables[index];
            let data = table.data();
            let compressed = zlib_compress(data, level)?;
            let bytes = if compressed.len() < data.len() { compressed } else { data.to_vec() };
            debug!("table '{}': {} -> {} bytes", table.tag, data.len(), bytes.len());
            records.push(TableRecord {
                tag: table.tag,
                offset: offset as u32,
                comp_length: bytes.len() as u32,
                orig_length: data.len() as u32,
                checksum: table_checksum(table.tag, data),
                ..Default::default()
            });
            offset += round4(bytes.len());
            stored.push(bytes);
        }

        let mut header = self.header(ContainerVersion::Woff1, font.flavor, records.len());
        header.total_sfnt_size = total_sfnt_size(sfnt, &sfnt.tables);

        let mut out = FontBuffer::with_capacity(offset);
        header.write(&mut out);
        for record in &records {
            record.write_woff1(&mut out);
        }
        out.pad4();
        for bytes in &stored {
            out.push_bytes(bytes).pad4();
        }
        self.push_extension_blocks(&mut out, &mut header, |data| Ok(zlib_compress(data, level)?))?;
        self.finish(out, header)
    }

    fn encode_woff2(&self, sfnt: &SfntFile) -> Result<Vec<u8>> {
        let mut tables = sfnt.tables.clone();

        if !sfnt.is_collection()
            && let [font] = sfnt.fonts.as_slice()
            && font.flavor == TRUETYPE_FLAVOR
        {
            self.apply_transforms(&mut tables, font);
        }
        for table in &mut tables {
            if (table.tag == GLYF || table.tag == LOCA) && !table.transformed {
                table.flags = GLYF_NULL_TRANSFORM << 6;
            }
        }

        let order = stream_order(sfnt, &tables)?;
        let mut directory = FontBuffer::new();
        let mut stream = Vec::new();
        for &index in &order {
            tables[index].write_woff2(&mut directory);
            stream.extend_from_slice(tables[index].data());
        }
        if sfnt.is_collection() {
            collection_directory(sfnt, &tables, &order)?.write(&mut directory);
        }
        let compressed = brotli_compress(&stream)?;
        debug!("brotli stream: {} -> {} bytes", stream.len(), compressed.len());

        let flavor = match sfnt.fonts.as_slice() {
            [font] if !sfnt.is_collection() => font.flavor,
            _ => u32::from_be_bytes(TTCF.to_be_bytes()),
        };
        let mut header = self.header(ContainerVersion::Woff2, flavor, tables.len());
        header.total_sfnt_size = total_sfnt_size(sfnt, &tables);
        header.total_compressed_size = compressed.len() as u32;

        let mut out = FontBuffer::new();
        header.write(&mut out);
        out.push_bytes(directory.as_slice()).push_bytes(&compressed);
        self.push_extension_blocks(&mut out, &mut header, brotli_compress)?;
        self.finish(out, header)
    }

    /// Rewrites the header once every offset and length is known.
    fn finish(&self, mut out: FontBuffer, mut header: ContainerHeader) -> Result<Vec<u8>> {
        header.length = out.len() as u32;
        let mut fixed = FontBuffer::new();
        header.write(&mut fixed);
        out.set_bytes(0, fixed.as_slice())?;
        info!("wrote {} bytes ({} tables)", header.length, header.num_tables);
        Ok(out.into_vec())
    }

    /// Applies the glyf/loca and hmtx transforms where the options and the
    /// font allow it. Fonts that cannot be transformed are stored as-is.
    ///
    /// hmtx is only transformed on top of a transformed glyf, since decoders
    /// take the glyph xMin values from the reconstructed glyf.
    fn apply_transforms(&self, tables: &mut [TableRecord], font: &Font) {
        if !self.options.transform_glyf {
            return;
        }
        let (glyphs, loca_format) = match load_glyphs(tables, font) {
            Ok(Some(loaded)) => loaded,
            Ok(None) => return,
            Err(e) => {
                warn!("storing glyf untransformed: {e}");
                return;
            }
        };
        if let Err(e) = transform_glyf(tables, font, &glyphs, loca_format) {
            warn!("storing glyf untransformed: {e}");
        }
        if self.options.transform_hmtx
            && let Err(e) = transform_hmtx_table(tables, font, &glyphs)
        {
            warn!("storing hmtx untransformed: {e}");
        }
    }
}

/// Parses the plain glyf table of a TrueType font, if it has one.
fn load_glyphs(tables: &[TableRecord], font: &Font) -> Result<Option<(Vec<Glyph>, LocaFormat)>> {
    let (Some(glyf), Some(loca)) = (font.glyf, font.loca) else {
        return Ok(None);
    };
    let loca_format = LocaFormat::from_index_format(index_to_loc_format(font.table(HEAD, tables)?.data())?);
    let num_glyphs = font.num_glyphs(tables)? as usize;
    if tables[loca].data().len() < loca_format.table_len(num_glyphs) {
        return Err(WoffError::TableTooShort { tag: LOCA, len: tables[loca].data().len() });
    }
    let offsets = read_loca(tables[loca].data(), loca_format, num_glyphs)?;
    let glyphs = read_glyf(tables[glyf].data(), &offsets)?;
    Ok(Some((glyphs, loca_format)))
}

fn transform_glyf(tables: &mut [TableRecord], font: &Font, glyphs: &[Glyph], loca_format: LocaFormat) -> Result<()> {
    let (Some(glyf), Some(loca)) = (font.glyf, font.loca) else {
        return Ok(());
    };
    // decoding rebuilds the canonical glyf, whose short offsets must still fit
    let canonical = write_glyf(glyphs)?;
    canonical.loca(loca_format)?;
    let transformed = encode_glyf(glyphs, loca_format)?;
    debug!("glyf transform: {} -> {} bytes", tables[glyf].data().len(), transformed.len());

    let record = &mut tables[glyf];
    record.orig_length = canonical.glyf.len() as u32;
    record.transform_length = transformed.len() as u32;
    record.transformed = true;
    record.set_stored(transformed);

    let record = &mut tables[loca];
    record.orig_length = loca_format.table_len(glyphs.len()) as u32;
    record.transform_length = 0;
    record.transformed = true;
    record.set_stored(Vec::new());
    Ok(())
}

fn transform_hmtx_table(tables: &mut [TableRecord], font: &Font, glyphs: &[Glyph]) -> Result<()> {
    let Some(hmtx) = font.hmtx else {
        return Ok(());
    };
    if !font.glyf.is_some_and(|glyf| tables[glyf].transformed) {
        debug!("glyf stored plain; hmtx not transformed");
        return Ok(());
    }
    let num_glyphs = font.num_glyphs(tables)?;
    let num_h_metrics = font.num_h_metrics(tables)?;
    let expected = 4 * num_h_metrics as usize + 2 * (num_glyphs as usize).saturating_sub(num_h_metrics as usize);
    if tables[hmtx].data().len() != expected {
        debug!("hmtx has {} bytes, expected {expected}; not transformed", tables[hmtx].data().len());
        return Ok(());
    }
    let x_mins: Vec<i16> = glyphs.iter().map(Glyph::x_min).collect();
    let Some(transformed) = transform_hmtx(tables[hmtx].data(), num_glyphs, num_h_metrics, &x_mins)? else {
        debug!("hmtx bearings differ from glyph bounds; not transformed");
        return Ok(());
    };
    debug!("hmtx transform: {} -> {} bytes", expected, transformed.len());
    let record = &mut tables[hmtx];
    record.flags = HMTX_TRANSFORM << 6;
    record.transform_length = transformed.len() as u32;
    record.transformed = true;
    record.set_stored(transformed);
    Ok(())
}

/// Order of tables in the WOFF2 directory and stream: by tag within each
/// font, first use across fonts, and each loca right after its glyf.
fn stream_order(sfnt: &SfntFile, tables: &[TableRecord]) -> Result<Vec<usize>> {
    if sfnt.fonts.is_empty() {
        return Err(WoffError::NoTables);
    }
    let mut placed = vec![false; tables.len()];
    let mut order = Vec::with_capacity(tables.len());
    for font in &sfnt.fonts {
        for index in font.sorted_indices(tables) {
            if placed[index] {
                continue;
            }
            if tables[index].tag == LOCA && font.glyf.is_some() {
                return Err(WoffError::InvalidCollection("fonts sharing glyf must share loca"));
            }
            placed[index] = true;
            order.push(index);
            if tables[index].tag == GLYF
                && let Some(loca) = font.loca
            {
                if placed[loca] {
                    return Err(WoffError::InvalidCollection("fonts sharing loca must share glyf"));
                }
                placed[loca] = true;
                order.push(loca);
            }
        }
    }
    Ok(order)
}

/// The WOFF2 collection directory, with table indices remapped to `order`.
fn collection_directory(sfnt: &SfntFile, tables: &[TableRecord], order: &[usize]) -> Result<CollectionHeader> {
    let mut position = vec![0u16; tables.len()];
    for (i, &index) in order.iter().enumerate() {
        position[index] = u16::try_from(i).map_err(|_| WoffError::InvalidCollection("too many tables"))?;
    }
    let fonts = sfnt
        .fonts
        .iter()
        .map(|font| CollectionFontEntry {
            flavor: font.flavor,
            table_indices: font.sorted_indices(tables).into_iter().map(|i| position[i]).collect(),
        })
        .collect();
    let version = sfnt.collection_version.unwrap_or_default();
    Ok(CollectionHeader::new(version, fonts))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        decoder::Decoder,
        glyf::{BoundingBox, Point, SimpleGlyph},
        sfnt::write_font,
        tags::{HHEA, MAXP},
    };
    use read_fonts::types::Tag;

    fn head(index_format: u16) -> Vec<u8> {
        let mut data = vec![0u8; 54];
        data[0..4].copy_from_slice(&0x0001_0000u32.to_be_bytes());
        data[12..16].copy_from_slice(&0x5F0F_3CF5u32.to_be_bytes());
        data[50..52].copy_from_slice(&index_format.to_be_bytes());
        data
    }

    fn hhea(num_h_metrics: u16) -> Vec<u8> {
        let mut data = vec![0u8; 36];
        data[0..4].copy_from_slice(&0x0001_0000u32.to_be_bytes());
        data[34..36].copy_from_slice(&num_h_metrics.to_be_bytes());
        data
    }

    fn glyphs() -> Vec<Glyph> {
        let points = vec![Point::new(50, 0, true), Point::new(50, 700, true), Point::new(450, 0, false)];
        vec![
            Glyph::Empty,
            Glyph::Simple(SimpleGlyph {
                bbox: BoundingBox::from_points(&points, 1).unwrap(),
                end_points: vec![2],
                points,
                ..Default::default()
            }),
        ]
    }

    fn font_bytes(lsb: i16) -> Vec<u8> {
        let glyf = write_glyf(&glyphs()).unwrap();
        let mut hmtx = FontBuffer::new();
        hmtx.push_u16(500).push_i16(0).push_u16(500).push_i16(lsb);
        let tables = [
            TableRecord::new(HEAD, head(0)),
            TableRecord::new(HHEA, hhea(2)),
            TableRecord::new(HMTX, hmtx.into_vec()),
            TableRecord::new(MAXP, vec![0, 0, 0x50, 0, 0, 2]),
            TableRecord::new(LOCA, glyf.loca(LocaFormat::Short).unwrap()),
            TableRecord::new(GLYF, glyf.glyf),
        ];
        let records: Vec<&TableRecord> = tables.iter().collect();
        write_font(TRUETYPE_FLAVOR, &records).unwrap()
    }

    fn decoded_table(woff: &[u8], tag: Tag) -> Vec<u8> {
        let decoded = Decoder::default().decode(woff).unwrap();
        let font = &decoded.fonts()[0];
        font.table(tag, decoded.tables()).unwrap().data().to_vec()
    }

    fn original_table(sfnt: &[u8], tag: Tag) -> Vec<u8> {
        let file = SfntFile::read(sfnt).unwrap();
        file.fonts[0].table(tag, &file.tables).unwrap().data().to_vec()
    }

    #[test]
    fn test_woff2_transforms_glyf_and_hmtx() {
        let sfnt = font_bytes(50);
        let woff = Encoder::default().encode(&sfnt).unwrap();
        let decoded = Decoder::default().decode(&woff).unwrap();
        assert!(decoded.fonts()[0].transformed);
        for tag in [GLYF, LOCA, HMTX, MAXP, HHEA] {
            assert_eq!(decoded_table(&woff, tag), original_table(&sfnt, tag), "table {tag}");
        }
    }

    #[test]
    fn test_hmtx_kept_when_bearings_differ() {
        let sfnt = font_bytes(7);
        let woff = Encoder::default().encode(&sfnt).unwrap();
        assert_eq!(decoded_table(&woff, HMTX), original_table(&sfnt, HMTX));
    }

    #[test]
    fn test_woff2_without_transforms() {
        let sfnt = font_bytes(50);
        let options = EncodeOptions::new(ContainerVersion::Woff2).transform(false);
        let woff = Encoder::new(options).encode(&sfnt).unwrap();
        let decoded = Decoder::default().decode(&woff).unwrap();
        assert!(!decoded.fonts()[0].transformed);
        let glyf = decoded.fonts()[0].table(GLYF, decoded.tables()).unwrap();
        assert_eq!(glyf.transform_version(), GLYF_NULL_TRANSFORM);
        assert_eq!(decoded.to_sfnt().unwrap().len(), sfnt.len());
    }

    #[test]
    fn test_hmtx_requires_transformed_glyf() {
        let sfnt = font_bytes(50);
        let options = EncodeOptions::new(ContainerVersion::Woff2).transform_glyf(false).transform_hmtx(true);
        let woff = Encoder::new(options).encode(&sfnt).unwrap();
        let decoded = Decoder::default().decode(&woff).unwrap();
        let font = &decoded.fonts()[0];
        assert_eq!(font.table(GLYF, decoded.tables()).unwrap().transform_version(), GLYF_NULL_TRANSFORM);
        assert_eq!(font.table(HMTX, decoded.tables()).unwrap().transform_version(), 0);
        assert!(!font.transformed);
        assert_eq!(decoded_table(&woff, HMTX), original_table(&sfnt, HMTX));
    }

    #[test]
    fn test_hmtx_plain_next_to_plain_glyf() {
        let mut file = SfntFile::read(&font_bytes(50)).unwrap();
        let font = file.fonts[0].clone();
        let hmtx = font.hmtx.unwrap();
        let before = file.tables[hmtx].clone();
        transform_hmtx_table(&mut file.tables, &font, &glyphs()).unwrap();
        assert_eq!(file.tables[hmtx], before);
        assert_eq!(file.tables[hmtx].transform_version(), 0);
    }

    #[test]
    fn test_loca_follows_glyf_in_stream() {
        let woff = Encoder::default().encode(&font_bytes(50)).unwrap();
        let decoded = Decoder::default().decode(&woff).unwrap();
        let tags: Vec<Tag> = decoded.tables().iter().map(|t| t.tag).collect();
        assert_eq!(tags, vec![GLYF, LOCA, HEAD, HHEA, HMTX, MAXP]);
    }

    #[test]
    fn test_decoded_records_keep_stored_lengths() {
        let sfnt = font_bytes(50);
        let woff = Encoder::new(EncodeOptions::new(ContainerVersion::Woff1)).encode(&sfnt).unwrap();
        let decoded = Decoder::default().decode(&woff).unwrap();
        let hhea = decoded.fonts()[0].table(HHEA, decoded.tables()).unwrap();
        assert_eq!(hhea.orig_length, 36);
        assert!(hhea.comp_length < hhea.orig_length);

        let woff2 = Encoder::default().encode(&sfnt).unwrap();
        let decoded = Decoder::default().decode(&woff2).unwrap();
        let font = &decoded.fonts()[0];
        let loca = font.table(LOCA, decoded.tables()).unwrap();
        assert_eq!(loca.comp_length, 0);
        assert_eq!(loca.orig_length, 6);
        let glyf = font.table(GLYF, decoded.tables()).unwrap();
        assert_eq!(glyf.comp_length, glyf.transform_length);
    }

    #[test]
    fn test_woff1_round_trip() {
        let sfnt = font_bytes(50);
        let options = EncodeOptions::new(ContainerVersion::Woff1)
            .metadata(b"<metadata version=\"1.0\"/>".to_vec())
            .private_data(vec![1, 2, 3])
            .font_version(2, 1);
        let woff = Encoder::new(options).encode(&sfnt).unwrap();
        assert_eq!(&woff[0..4], b"wOFF");

        let decoded = Decoder::default().decode(&woff).unwrap();
        assert_eq!(decoded.header().major_version, 2);
        assert_eq!(decoded.header().total_sfnt_size as usize, sfnt.len());
        assert_eq!(decoded.metadata(), Some(&b"<metadata version=\"1.0\"/>"[..]));
        assert_eq!(decoded.private_data(), Some(&[1u8, 2, 3][..]));
        assert_eq!(decoded.to_sfnt().unwrap(), sfnt);
    }

    #[test]
    fn test_woff1_rejects_collections() {
        let sfnt = SfntFile { collection_version: Some(0x0001_0000), ..Default::default() };
        let encoder = Encoder::new(EncodeOptions::new(ContainerVersion::Woff1));
        assert!(matches!(encoder.encode_sfnt(&sfnt), Err(WoffError::Woff1Collection)));
    }
}
