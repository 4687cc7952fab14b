//! Restores family and full name records that some WOFF2 tools strip.

use std::collections::BTreeMap;

use log::{debug, warn};
use read_fonts::{
    FontData, FontRead, FontRef, Offset,
    tables::name::{Name as ReadName, NameRecord as ReadNameRecord},
    types::NameId,
};
use write_fonts::{
    FontBuilder,
    tables::name::{Name, NameRecord},
};

use crate::{
    error::{Result, WoffError},
    tags::NAME,
};

const FAMILY_NAME: u16 = 1;
const FULL_NAME: u16 = 4;
const POSTSCRIPT_NAME: u16 = 6;

/// (platform, encoding, language)
type RecordGroup = (u16, u16, u16);

/// (platform, encoding, language, name ID)
type RecordKey = (u16, u16, u16, u16);

fn record_key(record: &ReadNameRecord) -> RecordKey {
    (record.platform_id(), record.encoding_id(), record.language_id(), record.name_id().to_u16())
}

/// Encoded string bytes of every record, keyed by record identity.
fn raw_strings<'a>(name: &ReadName<'a>) -> BTreeMap<RecordKey, &'a [u8]> {
    let data = name.string_data().as_bytes();
    name.name_record()
        .iter()
        .filter_map(|record| {
            let start = record.string_offset().non_null().unwrap_or(0);
            let bytes = data.get(start..start + record.length() as usize)?;
            Some((record_key(record), bytes))
        })
        .collect()
}

fn build_name_table(records: Vec<NameRecord>) -> Result<Vec<u8>> {
    let mut builder = FontBuilder::new();
    builder.add_table(&Name::new(records))?;
    let font = builder.build();
    FontRef::new(&font)?
        .table_data(NAME)
        .map(|data| data.as_bytes().to_vec())
        .ok_or(WoffError::MissingTable(NAME))
}

/// Rebuilds the name table when a record group lacks ID 1 or 4.
///
/// Returns `Ok(None)` when nothing is missing or when the table cannot be
/// rebuilt losslessly.
pub fn repair_names(data: &[u8]) -> Result<Option<Vec<u8>>> {
    let name = ReadName::read(FontData::new(data))?;
    if name.version() != 0 {
        debug!("name table version {} left untouched", name.version());
        return Ok(None);
    }

    let mut records = Vec::with_capacity(name.name_record().len());
    let mut groups: BTreeMap<RecordGroup, BTreeMap<u16, String>> = BTreeMap::new();
    for record in name.name_record() {
        let Ok(string) = record.string(name.string_data()) else {
            warn!("name record {} is unreadable, skipping repair", record.name_id().to_u16());
            return Ok(None);
        };
        let string: String = string.chars().collect();
        let group = (record.platform_id(), record.encoding_id(), record.language_id());
        let name_id = record.name_id().to_u16();
        groups.entry(group).or_default().insert(name_id, string.clone());
        records.push(NameRecord::new(group.0, group.1, group.2, NameId::new(name_id), string.into()));
    }

    let mut added = 0;
    for ((platform, encoding, language), ids) in &groups {
        for (missing, fallbacks) in [
            (FAMILY_NAME, [POSTSCRIPT_NAME, FULL_NAME]),
            (FULL_NAME, [POSTSCRIPT_NAME, FAMILY_NAME]),
        ] {
            if ids.contains_key(&missing) {
                continue;
            }
            let Some(source) = fallbacks.iter().find_map(|id| ids.get(id)) else {
                continue;
            };
            debug!("adding name ID {missing} for ({platform}, {encoding}, {language})");
            records.push(NameRecord::new(
                *platform,
                *encoding,
                *language,
                NameId::new(missing),
                source.clone().into(),
            ));
            added += 1;
        }
    }
    if added == 0 {
        return Ok(None);
    }

    records.sort();
    let bytes = build_name_table(records)?;

    // strings that do not survive decoding (lone surrogates, unmapped bytes)
    // would be rewritten; keep the stored table instead
    let original = raw_strings(&name);
    let rebuilt_name = ReadName::read(FontData::new(&bytes))?;
    let rebuilt = raw_strings(&rebuilt_name);
    if let Some(key) = original.iter().find_map(|(key, stored)| (rebuilt.get(key) != Some(stored)).then_some(key)) {
        warn!("name record {key:?} does not re-encode losslessly, skipping repair");
        return Ok(None);
    }
    Ok(Some(bytes))
}
