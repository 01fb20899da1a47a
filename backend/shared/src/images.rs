use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageSource {
    Unsplash,
    Pexels,
    Pixabay,
}

impl ImageSource {
    pub const ALL: [ImageSource; 3] = [Self::Unsplash, Self::Pexels, Self::Pixabay];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unsplash => "unsplash",
            Self::Pexels => "pexels",
            Self::Pixabay => "pixabay",
        }
    }

    /// Display name used in messages and tabs.
    pub fn label(self) -> &'static str {
        match self {
            Self::Unsplash => "Unsplash",
            Self::Pexels => "Pexels",
            Self::Pixabay => "Pixabay",
        }
    }
}

impl fmt::Display for ImageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError(pub String);

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unrecognized value: {}", self.0)
    }
}

impl std::error::Error for ParseError {}

impl FromStr for ImageSource {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unsplash" => Ok(Self::Unsplash),
            "pexels" => Ok(Self::Pexels),
            "pixabay" => Ok(Self::Pixabay),
            other => Err(ParseError(other.to_string())),
        }
    }
}

/// Pixabay-only filter. `All` means the parameter is not forwarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageType {
    Photo,
    Illustration,
    Vector,
    #[default]
    All,
}

impl ImageType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Photo => "photo",
            Self::Illustration => "illustration",
            Self::Vector => "vector",
            Self::All => "all",
        }
    }
}

impl fmt::Display for ImageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImageType {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "photo" => Ok(Self::Photo),
            "illustration" => Ok(Self::Illustration),
            "vector" => Ok(Self::Vector),
            "all" => Ok(Self::All),
            other => Err(ParseError(other.to_string())),
        }
    }
}

/// A provider image normalized into one shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    pub id: String,
    pub url: String,
    pub thumbnail_url: String,
    pub width: u32,
    pub height: u32,

    pub photographer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photographer_url: Option<String>,
    pub source: ImageSource,
    pub source_url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub query: String,
    pub source: ImageSource,
    pub images: Vec<Image>,
    pub total_results: u64,
    pub page: u32,
    pub per_page: u32,
    pub total_pages: u32,
    pub timestamp: i64,
}
