//! The WOFF2 hmtx transform: left side bearings equal to the glyph xMin
//! are dropped on encode and restored from glyph bounds on decode.

use crate::{
    binary::{FontBuffer, Reader},
    error::{Result, WoffError},
    tags::HMTX,
};

const PROPORTIONAL_LSBS_ABSENT: u8 = 0x01;
const MONOSPACE_LSBS_ABSENT: u8 = 0x02;
const RESERVED_FLAGS: u8 = 0xFC;

fn malformed(reason: &'static str) -> WoffError {
    WoffError::MalformedTransform { tag: HMTX, reason }
}

fn check_counts(num_glyphs: u16, num_h_metrics: u16, x_mins: &[i16]) -> Result<()> {
    if num_h_metrics == 0 || num_h_metrics > num_glyphs {
        return Err(malformed("numberOfHMetrics out of range"));
    }
    if x_mins.len() != num_glyphs as usize {
        return Err(malformed("glyph count differs from maxp"));
    }
    Ok(())
}

/// Rebuilds the sfnt hmtx table from its transformed form.
pub fn reconstruct_hmtx(data: &[u8], num_glyphs: u16, num_h_metrics: u16, x_mins: &[i16]) -> Result<Vec<u8>> {
    let mut r = Reader::new(data);
    let flags = r.u8()?;
    if flags & RESERVED_FLAGS != 0 {
        return Err(WoffError::InvalidHmtxFlags(flags));
    }
    let has_proportional = flags & PROPORTIONAL_LSBS_ABSENT == 0;
    let has_monospace = flags & MONOSPACE_LSBS_ABSENT == 0;
    if !has_proportional && !has_monospace {
        return Err(WoffError::InvalidHmtxFlags(flags));
    }
    check_counts(num_glyphs, num_h_metrics, x_mins)?;

    let truncated = |_| malformed("truncated stream");
    let advances = (0..num_h_metrics)
        .map(|_| r.u16())
        .collect::<Result<Vec<_>>>()
        .map_err(truncated)?;
    let mut lsbs = Vec::with_capacity(num_glyphs as usize);
    for (gid, &x_min) in x_mins.iter().enumerate() {
        let present = if gid < num_h_metrics as usize { has_proportional } else { has_monospace };
        lsbs.push(if present { r.i16().map_err(truncated)? } else { x_min });
    }

    let mut out = FontBuffer::with_capacity(4 * num_h_metrics as usize + 2 * (num_glyphs - num_h_metrics) as usize);
    for (advance, lsb) in advances.iter().zip(&lsbs) {
        out.push_u16(*advance).push_i16(*lsb);
    }
    for lsb in &lsbs[num_h_metrics as usize..] {
        out.push_i16(*lsb);
    }
    Ok(out.into_vec())
}

/// Produces the transformed hmtx when at least one bearing array can be
/// derived from glyph bounds, otherwise `None`.
pub fn transform_hmtx(data: &[u8], num_glyphs: u16, num_h_metrics: u16, x_mins: &[i16]) -> Result<Option<Vec<u8>>> {
    check_counts(num_glyphs, num_h_metrics, x_mins)?;
    let mut r = Reader::new(data);
    let nh = num_h_metrics as usize;
    let mut advances = Vec::with_capacity(nh);
    let mut lsbs = Vec::with_capacity(num_glyphs as usize);
    for _ in 0..nh {
        advances.push(r.u16()?);
        lsbs.push(r.i16()?);
    }
    for _ in nh..num_glyphs as usize {
        lsbs.push(r.i16()?);
    }

    let proportional_derived = lsbs[..nh] == x_mins[..nh];
    let monospace_derived = lsbs[nh..] == x_mins[nh..];
    // both arrays absent is not accepted on decode, keep the monospace one then
    let flags = if proportional_derived {
        PROPORTIONAL_LSBS_ABSENT
    } else if monospace_derived && nh < num_glyphs as usize {
        MONOSPACE_LSBS_ABSENT
    } else {
        return Ok(None);
    };

    let mut out = FontBuffer::new();
    out.push_u8(flags);
    for advance in &advances {
        out.push_u16(*advance);
    }
    if !proportional_derived {
        for lsb in &lsbs[..nh] {
            out.push_i16(*lsb);
        }
    }
    if flags != MONOSPACE_LSBS_ABSENT {
        for lsb in &lsbs[nh..] {
            out.push_i16(*lsb);
        }
    }
    Ok(Some(out.into_vec()))
}
