use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::{Color, OFF_HEX, ParseColorError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionEndpoint {
    SolidColor,
    Blink,
}

impl ActionEndpoint {
    pub fn path(&self) -> &'static str {
        match self {
            ActionEndpoint::SolidColor => "solid_color",
            ActionEndpoint::Blink => "blink",
        }
    }
}

/// Regional API host the user's account lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ApiRegion {
    #[default]
    #[serde(rename = "com")]
    Com,
    #[serde(rename = "co.uk")]
    CoUk,
}

impl ApiRegion {
    pub fn base_url(&self) -> &'static str {
        match self {
            ApiRegion::Com => "https://api.luxafor.com",
            ApiRegion::CoUk => "https://api.luxafor.co.uk",
        }
    }
}

impl FromStr for ApiRegion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "com" | "api.luxafor.com" => Ok(ApiRegion::Com),
            "co.uk" | "api.luxafor.co.uk" => Ok(ApiRegion::CoUk),
            other => Err(format!("unknown API endpoint: {other}")),
        }
    }
}

impl fmt::Display for ApiRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiRegion::Com => f.write_str("com"),
            ApiRegion::CoUk => f.write_str("co.uk"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionFields {
    /// Named color, or `custom` together with `custom_color`
    pub color: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_color: Option<String>,
}

impl ActionFields {
    pub fn for_color(color: &Color) -> Result<Self, ParseColorError> {
        match color {
            Color::Unknown => Err(ParseColorError::new(color.name())),
            Color::Off => Ok(Self::custom(OFF_HEX)),
            Color::Custom(hex) => Ok(Self::custom(hex.as_str())),
            named => Ok(Self {
                color: named.name().to_string(),
                custom_color: None,
            }),
        }
    }

    fn custom(hex: &str) -> Self {
        Self {
            color: String::from("custom"),
            custom_color: Some(hex.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionRequest {
    pub user_id: String,
    pub action_fields: ActionFields,
}
