use std::fmt;
use std::str::FromStr;

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};

/// Hex string sent for a dark device.
pub const OFF_HEX: &str = "000000";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseColorError {
    input: String,
}

impl ParseColorError {
    pub(crate) fn new(input: &str) -> Self {
        Self {
            input: input.to_string(),
        }
    }
}

impl fmt::Display for ParseColorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid color: {:?}", self.input)
    }
}

impl std::error::Error for ParseColorError {}

/// Six upper-case hex digits, without the leading `#`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HexColor(String);

impl HexColor {
    pub fn parse(input: &str) -> Result<Self, ParseColorError> {
        let digits = input.trim().trim_start_matches('#');

        if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ParseColorError::new(input));
        }

        Ok(Self(digits.to_ascii_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HexColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Color {
    Red,
    Green,
    Blue,
    Yellow,
    Cyan,
    Magenta,
    White,
    Off,
    #[default]
    Unknown,
    /// Any color outside the named palette
    Custom(HexColor),
}

impl Color {
    /// Named colors the vendor API accepts directly.
    pub const PALETTE: [Color; 7] = [
        Color::Red,
        Color::Green,
        Color::Blue,
        Color::Yellow,
        Color::Cyan,
        Color::Magenta,
        Color::White,
    ];

    pub fn name(&self) -> &str {
        match self {
            Color::Red => "red",
            Color::Green => "green",
            Color::Blue => "blue",
            Color::Yellow => "yellow",
            Color::Cyan => "cyan",
            Color::Magenta => "magenta",
            Color::White => "white",
            Color::Off => "off",
            Color::Unknown => "unknown",
            Color::Custom(_) => "custom",
        }
    }

    /// Palette hex for named colors, the stored value for custom ones.
    pub fn hex(&self) -> Option<&str> {
        match self {
            Color::Red => Some("FF0000"),
            Color::Green => Some("00FF00"),
            Color::Blue => Some("0000FF"),
            Color::Yellow => Some("FFFF00"),
            Color::Cyan => Some("00FFFF"),
            Color::Magenta => Some("FF00FF"),
            Color::White => Some("FFFFFF"),
            Color::Off => Some(OFF_HEX),
            Color::Unknown => None,
            Color::Custom(hex) => Some(hex.as_str()),
        }
    }

    /// Folds palette values back into their named color so that e.g.
    /// `FFFFFF` reads back as white.
    pub fn from_hex(hex: HexColor) -> Self {
        Self::PALETTE
            .iter()
            .chain(std::iter::once(&Color::Off))
            .find(|color| color.hex() == Some(hex.as_str()))
            .cloned()
            .unwrap_or(Color::Custom(hex))
    }

    /// Whether the device shows light in this state.
    pub fn is_lit(&self) -> bool {
        !matches!(self, Color::Off | Color::Unknown)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Color::Custom(hex) => write!(f, "{hex}"),
            named => f.write_str(named.name()),
        }
    }
}

impl FromStr for Color {
    type Err = ParseColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let named = match s.trim().to_ascii_lowercase().as_str() {
            "red" => Some(Color::Red),
            "green" => Some(Color::Green),
            "blue" => Some(Color::Blue),
            "yellow" => Some(Color::Yellow),
            "cyan" => Some(Color::Cyan),
            "magenta" => Some(Color::Magenta),
            "white" => Some(Color::White),
            "off" => Some(Color::Off),
            "unknown" => Some(Color::Unknown),
            _ => None,
        };

        match named {
            Some(color) => Ok(color),
            None => HexColor::parse(s).map(Color::from_hex),
        }
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ColorVisitor;

        impl Visitor<'_> for ColorVisitor {
            type Value = Color;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a color name or a #RRGGBB string")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Color, E> {
                v.parse().map_err(E::custom)
            }
        }

        deserializer.deserialize_str(ColorVisitor)
    }
}
