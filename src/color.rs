pub type Rgba = [f32; 4];

pub const WHITE: Rgba = [1.0, 1.0, 1.0, 1.0];

#[inline(always)]
pub fn srgb8_to_linear(c: u8) -> f32 {
    let x = (c as f32) / 255.0;
    if x <= 0.04045 { x / 12.92 } else { ((x + 0.055) / 1.055).powf(2.4) }
}

/// Parses "#rgb", "#rgba", "#rrggbb" or "#rrggbbaa" (the '#' is optional)
/// into linear RGBA.
pub fn parse_hex(s: &str) -> Result<Rgba, String> {
    fn nib(b: u8) -> Result<u8, String> {
        match b {
            b'0'..=b'9' => Ok(b - b'0'),
            b'a'..=b'f' => Ok(10 + (b - b'a')),
            b'A'..=b'F' => Ok(10 + (b - b'A')),
            _ => Err(format!("invalid hex digit '{}'", b as char)),
        }
    }
    let byte = |h: u8, l: u8| -> Result<u8, String> { Ok((nib(h)? << 4) | nib(l)?) };
    let short = |n: u8| -> Result<u8, String> { byte(n, n) };

    let trimmed = s.trim();
    let digits = trimmed.strip_prefix('#').unwrap_or(trimmed).as_bytes();
    let (r, g, b, a) = match *digits {
        [r, g, b] => (short(r)?, short(g)?, short(b)?, 0xFF),
        [r, g, b, a] => (short(r)?, short(g)?, short(b)?, short(a)?),
        [r1, r2, g1, g2, b1, b2] => (byte(r1, r2)?, byte(g1, g2)?, byte(b1, b2)?, 0xFF),
        [r1, r2, g1, g2, b1, b2, a1, a2] => {
            (byte(r1, r2)?, byte(g1, g2)?, byte(b1, b2)?, byte(a1, a2)?)
        }
        _ => return Err(format!("colour '{}' must have 3, 4, 6 or 8 hex digits", s)),
    };

    Ok([
        srgb8_to_linear(r),
        srgb8_to_linear(g),
        srgb8_to_linear(b),
        (a as f32) / 255.0,
    ])
}
