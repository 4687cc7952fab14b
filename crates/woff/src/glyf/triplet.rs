//! Point triplet coding used by the transformed glyf table.
//!
//! Each point is a flag byte (top bit set means off-curve) plus one to four
//! data bytes holding the (dx, dy) delta. The low seven flag bits choose a
//! bucket that fixes the byte count, the magnitude layout and the signs.

use super::glyph::Point;
use crate::{
    binary::{FontBuffer, Reader},
    error::{Result, WoffError},
};

fn with_sign(flag: u8, magnitude: i32) -> i32 {
    if flag & 1 != 0 { magnitude } else { -magnitude }
}

fn data_len(flag: u8) -> usize {
    match flag {
        0..84 => 1,
        84..120 => 2,
        120..124 => 3,
        _ => 4,
    }
}

fn delta(flag: u8, data: &[u8]) -> (i32, i32) {
    let d = |i: usize| i32::from(data[i]);
    let f = i32::from(flag);
    match flag {
        0..10 => (0, with_sign(flag, ((f & 14) << 7) + d(0))),
        10..20 => (with_sign(flag, (((f - 10) & 14) << 7) + d(0)), 0),
        20..84 => {
            let b0 = f - 20;
            let b1 = d(0);
            (
                with_sign(flag, 1 + (b0 & 0x30) + (b1 >> 4)),
                with_sign(flag >> 1, 1 + ((b0 & 0x0C) << 2) + (b1 & 0x0F)),
            )
        }
        84..120 => {
            let b0 = f - 84;
            (
                with_sign(flag, 1 + ((b0 / 12) << 8) + d(0)),
                with_sign(flag >> 1, 1 + (((b0 % 12) >> 2) << 8) + d(1)),
            )
        }
        120..124 => (
            with_sign(flag, (d(0) << 4) + (d(1) >> 4)),
            with_sign(flag >> 1, ((d(1) & 0x0F) << 8) + d(2)),
        ),
        _ => (with_sign(flag, (d(0) << 8) + d(1)), with_sign(flag >> 1, (d(2) << 8) + d(3))),
    }
}

/// Decodes `count` points, reading flags and delta bytes from separate streams.
pub fn decode_points(
    flags: &mut Reader<'_>,
    data: &mut Reader<'_>,
    count: usize,
    glyph: u32,
) -> Result<Vec<Point>> {
    let truncated = |_| WoffError::MalformedGlyph { glyph, reason: "truncated point stream" };
    let mut points = Vec::with_capacity(count);
    let (mut x, mut y) = (0i32, 0i32);
    for _ in 0..count {
        let raw = flags.u8().map_err(truncated)?;
        let on_curve = raw & 0x80 == 0;
        let flag = raw & 0x7F;
        let bytes = data.bytes(data_len(flag)).map_err(truncated)?;
        let (dx, dy) = delta(flag, bytes);
        x = x.checked_add(dx).ok_or(WoffError::CoordinateOverflow(glyph))?;
        y = y.checked_add(dy).ok_or(WoffError::CoordinateOverflow(glyph))?;
        points.push(Point { x, y, on_curve });
    }
    Ok(points)
}

/// Encodes one delta; the inverse of [`decode_points`] for a single point.
pub fn encode_point(flags: &mut FontBuffer, data: &mut FontBuffer, dx: i32, dy: i32, on_curve: bool) {
    let on_curve_bit: u8 = if on_curve { 0 } else { 0x80 };
    let x_sign = u8::from(dx >= 0);
    let y_sign = u8::from(dy >= 0);
    let xy_signs = x_sign + 2 * y_sign;
    let ax = dx.unsigned_abs();
    let ay = dy.unsigned_abs();

    if dx == 0 && ay < 1280 {
        flags.push_u8(on_curve_bit + ((ay & 0xF00) >> 7) as u8 + y_sign);
        data.push_u8((ay & 0xFF) as u8);
    } else if dy == 0 && ax < 1280 {
        flags.push_u8(on_curve_bit + 10 + ((ax & 0xF00) >> 7) as u8 + x_sign);
        data.push_u8((ax & 0xFF) as u8);
    } else if ax < 65 && ay < 65 {
        let (x1, y1) = (ax - 1, ay - 1);
        flags.push_u8(on_curve_bit + 20 + (x1 & 0x30) as u8 + ((y1 & 0x30) >> 2) as u8 + xy_signs);
        data.push_u8((((x1 & 0x0F) << 4) | (y1 & 0x0F)) as u8);
    } else if ax < 769 && ay < 769 {
        let (x1, y1) = (ax - 1, ay - 1);
        flags.push_u8(
            on_curve_bit + 84 + 12 * ((x1 & 0x300) >> 8) as u8 + ((y1 & 0x300) >> 6) as u8 + xy_signs,
        );
        data.push_u8((x1 & 0xFF) as u8).push_u8((y1 & 0xFF) as u8);
    } else if ax < 4096 && ay < 4096 {
        flags.push_u8(on_curve_bit + 120 + xy_signs);
        data.push_u8((ax >> 4) as u8)
            .push_u8((((ax & 0x0F) << 4) | (ay >> 8)) as u8)
            .push_u8((ay & 0xFF) as u8);
    } else {
        flags.push_u8(on_curve_bit + 124 + xy_signs);
        data.push_u8((ax >> 8) as u8)
            .push_u8((ax & 0xFF) as u8)
            .push_u8((ay >> 8) as u8)
            .push_u8((ay & 0xFF) as u8);
    }
}

/// Encodes absolute points as successive deltas.
pub fn encode_points(flags: &mut FontBuffer, data: &mut FontBuffer, points: &[Point]) {
    let (mut x, mut y) = (0, 0);
    for p in points {
        encode_point(flags, data, p.x - x, p.y - y, p.on_curve);
        x = p.x;
        y = p.y;
    }
}
