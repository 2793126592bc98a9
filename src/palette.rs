// src/palette.rs

//! Named color tables handed to decode sessions.
//!
//! Colors are packed RGBA `u32` values laid out as `r | g << 8 | b << 16 | a << 24`,
//! which is byte order R, G, B, A on little-endian hosts.
//!
//! The tables here are process-wide constants. Decode engines are allowed to
//! redefine palette entries while decoding, so sessions never borrow these
//! tables: [`PaletteName::private_copy`] hands out an owned copy instead.

use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt;

/// An owned palette, private to one decode session.
pub type Palette = Vec<u32>;

/// Packs 8-bit channels into a palette entry.
pub const fn to_rgba(r: u8, g: u8, b: u8, a: u8) -> u32 {
    (r as u32) | (g as u32) << 8 | (b as u32) << 16 | (a as u32) << 24
}

/// Unpacks a palette entry into `[r, g, b, a]`.
pub const fn from_rgba(color: u32) -> [u8; 4] {
    color.to_le_bytes()
}

/// Converts VT340 percentage channels (0..=100) into an opaque entry.
const fn percent_rgb(r: u32, g: u32, b: u32) -> u32 {
    to_rgba(
        ((r * 255 + 50) / 100) as u8,
        ((g * 255 + 50) / 100) as u8,
        ((b * 255 + 50) / 100) as u8,
        255,
    )
}

/// The 16 register defaults of a color VT340.
pub static PALETTE_VT340_COLOR: [u32; 16] = [
    percent_rgb(0, 0, 0),
    percent_rgb(20, 20, 80),
    percent_rgb(80, 13, 13),
    percent_rgb(20, 80, 20),
    percent_rgb(80, 20, 80),
    percent_rgb(20, 80, 80),
    percent_rgb(80, 80, 20),
    percent_rgb(53, 53, 53),
    percent_rgb(26, 26, 26),
    percent_rgb(33, 33, 60),
    percent_rgb(60, 26, 26),
    percent_rgb(33, 60, 33),
    percent_rgb(60, 33, 60),
    percent_rgb(33, 60, 60),
    percent_rgb(60, 60, 33),
    percent_rgb(80, 80, 80),
];

/// The 16 register defaults of a monochrome VT340.
pub static PALETTE_VT340_GREY: [u32; 16] = [
    percent_rgb(0, 0, 0),
    percent_rgb(13, 13, 13),
    percent_rgb(26, 26, 26),
    percent_rgb(40, 40, 40),
    percent_rgb(6, 6, 6),
    percent_rgb(33, 33, 33),
    percent_rgb(46, 46, 46),
    percent_rgb(60, 60, 60),
    percent_rgb(20, 20, 20),
    percent_rgb(33, 33, 33),
    percent_rgb(46, 46, 46),
    percent_rgb(60, 60, 60),
    percent_rgb(13, 13, 13),
    percent_rgb(26, 26, 26),
    percent_rgb(40, 40, 40),
    percent_rgb(80, 80, 80),
];

/// xterm's 256 color table: 16 named colors, a 6x6x6 cube and a 24 step grey ramp.
pub static PALETTE_ANSI_256: [u32; 256] = build_ansi_256();

const fn build_ansi_256() -> [u32; 256] {
    const NAMED: [(u8, u8, u8); 16] = [
        (0, 0, 0),       // Black
        (205, 0, 0),     // Red
        (0, 205, 0),     // Green
        (205, 205, 0),   // Yellow
        (0, 0, 238),     // Blue
        (205, 0, 205),   // Magenta
        (0, 205, 205),   // Cyan
        (229, 229, 229), // White
        (127, 127, 127), // BrightBlack
        (255, 0, 0),     // BrightRed
        (0, 255, 0),     // BrightGreen
        (255, 255, 0),   // BrightYellow
        (92, 92, 255),   // BrightBlue
        (255, 0, 255),   // BrightMagenta
        (0, 255, 255),   // BrightCyan
        (255, 255, 255), // BrightWhite
    ];

    let mut table = [0u32; 256];
    let mut idx = 0;
    while idx < 16 {
        let (r, g, b) = NAMED[idx];
        table[idx] = to_rgba(r, g, b, 255);
        idx += 1;
    }

    // 16-231: color cube
    while idx < 232 {
        let cube_idx = idx - 16;
        let r = cube_level(cube_idx / 36 % 6);
        let g = cube_level(cube_idx / 6 % 6);
        let b = cube_level(cube_idx % 6);
        table[idx] = to_rgba(r, g, b, 255);
        idx += 1;
    }

    // 232-255: grey ramp
    while idx < 256 {
        let level = ((idx - 232) * 10 + 8) as u8;
        table[idx] = to_rgba(level, level, level, 255);
        idx += 1;
    }

    table
}

const fn cube_level(component: usize) -> u8 {
    if component == 0 {
        0
    } else {
        (component * 40 + 55) as u8
    }
}

/// Names the palette a decode session starts from.
///
/// Parsing never fails: any name other than the two VT340 tables selects
/// `ANSI-256`. Names may be written with `-` or `_` (`VT340-COLOR`,
/// `VT340_COLOR`); the hyphenated form is what gets serialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PaletteName {
    Vt340Color,
    Vt340Grey,
    #[default]
    Ansi256,
}

impl PaletteName {
    /// Resolves a wire name, falling back to `ANSI-256`. Both the hyphenated
    /// wire spelling and the underscore spelling are accepted.
    pub fn from_name(name: &str) -> Self {
        match name {
            "VT340-COLOR" | "VT340_COLOR" => PaletteName::Vt340Color,
            "VT340-GREY" | "VT340_GREY" => PaletteName::Vt340Grey,
            "ANSI-256" | "ANSI_256" => PaletteName::Ansi256,
            other => {
                debug!("Palette: unknown palette '{}', falling back to ANSI-256", other);
                PaletteName::Ansi256
            }
        }
    }

    /// Returns the wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            PaletteName::Vt340Color => "VT340-COLOR",
            PaletteName::Vt340Grey => "VT340-GREY",
            PaletteName::Ansi256 => "ANSI-256",
        }
    }

    /// The canonical table. Never hand this to a decode engine.
    pub fn table(self) -> &'static [u32] {
        match self {
            PaletteName::Vt340Color => &PALETTE_VT340_COLOR,
            PaletteName::Vt340Grey => &PALETTE_VT340_GREY,
            PaletteName::Ansi256 => &PALETTE_ANSI_256,
        }
    }

    /// An owned copy of the table for one decode session.
    pub fn private_copy(self) -> Palette {
        self.table().to_vec()
    }
}

impl From<String> for PaletteName {
    fn from(name: String) -> Self {
        PaletteName::from_name(&name)
    }
}

impl From<PaletteName> for String {
    fn from(name: PaletteName) -> Self {
        name.as_str().to_string()
    }
}

impl fmt::Display for PaletteName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
