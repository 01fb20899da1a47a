use image::Rgba;

pub const DEFAULT_TEXT: &str = "LGTM";
pub const DEFAULT_MAX_WIDTH: u32 = 800;
pub const DEFAULT_MAX_HEIGHT: u32 = 800;

/// Font size as a fraction of the final image height.
pub const FONT_HEIGHT_RATIO: f64 = 0.04;

/// White at 60% opacity.
pub const DEFAULT_TEXT_COLOR: Rgba<u8> = Rgba([255, 255, 255, 153]);

#[derive(Debug, Clone, PartialEq)]
pub struct Shadow {
    pub color: Rgba<u8>,
    pub blur: f32,
    pub offset_x: i32,
    pub offset_y: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LgtmOptions {
    pub text: String,
    /// Explicit size in pixels, at most the image height. `None` or a
    /// non-positive value derives it from the height.
    pub font_size: Option<f32>,
    pub text_color: Rgba<u8>,
    pub shadow: Option<Shadow>,
    pub max_width: u32,
    pub max_height: u32,
}

impl Default for LgtmOptions {
    fn default() -> Self {
        Self {
            text: DEFAULT_TEXT.to_string(),
            font_size: None,
            text_color: DEFAULT_TEXT_COLOR,
            shadow: None,
            max_width: DEFAULT_MAX_WIDTH,
            max_height: DEFAULT_MAX_HEIGHT,
        }
    }
}

/// Parses `#rrggbb` or `#rrggbbaa`.
pub fn parse_hex_color(input: &str) -> Option<Rgba<u8>> {
    let hex = input.trim().strip_prefix('#')?;
    if !hex.is_ascii() {
        return None;
    }

    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();

    match hex.len() {
        6 => Some(Rgba([channel(0)?, channel(2)?, channel(4)?, 255])),
        8 => Some(Rgba([channel(0)?, channel(2)?, channel(4)?, channel(6)?])),
        _ => None,
    }
}
