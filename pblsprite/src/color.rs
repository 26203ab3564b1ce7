//! Reduction of arbitrary RGBA pixels onto the 64-color device palette.
use core::str::FromStr;
use itertools::Itertools;

/// Channel levels available on the display. Each channel uses 2 bits.
pub const LEVELS: [u8; 4] = [0x00, 0x55, 0xAA, 0xFF];

/// Fully transparent pixels all collapse onto this color.
pub const TRANSPARENT: [u8; 4] = [0, 0, 0, 0];

/// The 64 opaque colors of the display, indexed by `r_level * 16 + g_level * 4 + b_level`.
pub const DEVICE_PALETTE: [[u8; 4]; 64] = device_palette();

const fn device_palette() -> [[u8; 4]; 64] {
    let mut palette = [[0; 4]; 64];
    let mut i = 0;
    while i < 64 {
        palette[i] = [LEVELS[i >> 4], LEVELS[(i >> 2) & 0b11], LEVELS[i & 0b11], 0xFF];
        i += 1;
    }
    palette
}

/// How colors outside the device palette are brought into it.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReductionMethod {
    /// Closest palette color by squared RGB distance.
    #[default]
    Nearest,
    /// Every channel floors to the level below it.
    Truncate,
}

impl ReductionMethod {
    #[inline]
    pub fn map(self, color: [u8; 4]) -> [u8; 4] {
        match self {
            ReductionMethod::Nearest => nearest_color(color),
            ReductionMethod::Truncate => truncate_color(color),
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            ReductionMethod::Nearest => "nearest",
            ReductionMethod::Truncate => "truncate",
        }
    }
}

impl FromStr for ReductionMethod {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        #[rustfmt::skip]
        let Some(method) = s.eq_ignore_ascii_case("nearest").then_some(ReductionMethod::Nearest)
               .or_else(|| s.eq_ignore_ascii_case("truncate").then_some(ReductionMethod::Truncate))
        else { return Err("expected `nearest` or `truncate`"); };

        Ok(method)
    }
}

impl core::fmt::Display for ReductionMethod {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Squared euclidean distance between the RGB parts of two colors.
#[inline]
pub const fn rgb_distance([r1, g1, b1, _]: [u8; 4], [r2, g2, b2, _]: [u8; 4]) -> u32 {
    let dr = r1.abs_diff(r2) as u32;
    let dg = g1.abs_diff(g2) as u32;
    let db = b1.abs_diff(b2) as u32;
    dr * dr + dg * dg + db * db
}

/// Index of the device palette color closest to `color`. Ties go to the lowest index.
pub fn nearest_index(color: [u8; 4]) -> usize {
    DEVICE_PALETTE
        .iter()
        .position_min_by_key(|&&candidate| rgb_distance(color, candidate))
        .unwrap_or(0)
}

/// Maps a color to the closest device palette member. Pixels with alpha below 128 become
/// [`TRANSPARENT`].
pub fn nearest_color(color: [u8; 4]) -> [u8; 4] {
    if color[3] < 0x80 {
        return TRANSPARENT;
    }

    DEVICE_PALETTE[nearest_index(color)]
}

/// Maps a color by flooring every channel to the level below. Anything short of full opacity
/// becomes [`TRANSPARENT`].
pub const fn truncate_color([r, g, b, a]: [u8; 4]) -> [u8; 4] {
    if a != 0xFF {
        return TRANSPARENT;
    }

    [(r / 0x55) * 0x55, (g / 0x55) * 0x55, (b / 0x55) * 0x55, 0xFF]
}
