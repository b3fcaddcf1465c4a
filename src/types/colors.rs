use super::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// An sRGB colour with straight (non-premultiplied) alpha.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const TRANSPARENT: Rgba = Rgba::new(0, 0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 255)
    }

    /// Returns the colour with its alpha multiplied by `factor` (0.0..=1.0).
    pub fn with_opacity(self, factor: f32) -> Self {
        let a = (self.a as f32 * factor.clamp(0.0, 1.0)).round() as u8;
        Self { a, ..self }
    }

    pub fn is_transparent(&self) -> bool {
        self.a == 0
    }

    pub fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

impl std::str::FromStr for Rgba {
    type Err = ValidationError;

    /// Accepts `#RRGGBB`, `#RRGGBBAA` and `transparent`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("transparent") {
            return Ok(Self::TRANSPARENT);
        }

        let hex = trimmed
            .strip_prefix('#')
            .ok_or_else(|| ValidationError::InvalidColor(s.to_string()))?;
        if !hex.is_ascii() || !(hex.len() == 6 || hex.len() == 8) {
            return Err(ValidationError::InvalidColor(s.to_string()));
        }

        let channel = |i: usize| {
            u8::from_str_radix(&hex[i..i + 2], 16)
                .map_err(|_| ValidationError::InvalidColor(s.to_string()))
        };
        let alpha = if hex.len() == 8 { channel(6)? } else { 255 };
        Ok(Self::new(channel(0)?, channel(2)?, channel(4)?, alpha))
    }
}

impl fmt::Display for Rgba {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.a == 255 {
            write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
        } else {
            write!(f, "#{:02X}{:02X}{:02X}{:02X}", self.r, self.g, self.b, self.a)
        }
    }
}

/// Visual theme a share card is exported in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

/// Palette entries a card layout draws with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub background: Rgba,
    pub panel: Rgba,
    pub header: Rgba,
    pub positive: Rgba,
    pub negative: Rgba,
    pub muted: Rgba,
}

const LIGHT_PALETTE: Palette = Palette {
    background: Rgba::opaque(0xF8, 0xFA, 0xFC),
    panel: Rgba::opaque(0xFF, 0xFF, 0xFF),
    header: Rgba::opaque(0x1E, 0x40, 0xAF),
    positive: Rgba::opaque(0x16, 0xA3, 0x4A),
    negative: Rgba::opaque(0xDC, 0x26, 0x26),
    muted: Rgba::opaque(0xCB, 0xD5, 0xE1),
};

const DARK_PALETTE: Palette = Palette {
    background: Rgba::opaque(0x0F, 0x17, 0x2A),
    panel: Rgba::opaque(0x1E, 0x29, 0x3B),
    header: Rgba::opaque(0x38, 0xBD, 0xF8),
    positive: Rgba::opaque(0x4A, 0xDE, 0x80),
    negative: Rgba::opaque(0xF8, 0x71, 0x71),
    muted: Rgba::opaque(0x47, 0x55, 0x69),
};

impl Theme {
    /// The designated background constant for this theme.
    pub const fn background(self) -> Rgba {
        self.palette().background
    }

    pub const fn palette(self) -> Palette {
        match self {
            Theme::Light => LIGHT_PALETTE,
            Theme::Dark => DARK_PALETTE,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }
}

impl std::str::FromStr for Theme {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            _ => Err(ValidationError::InvalidTheme(s.to_string())),
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
