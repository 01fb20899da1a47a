use std::{
    fs,
    io::Cursor,
    path::{Path, PathBuf},
};

use base64::{Engine, engine::general_purpose::STANDARD};
use image::{ImageFormat, RgbaImage};

use crate::error::{ProcessError, ProcessResult};

pub const DEFAULT_FILENAME: &str = "lgtm.png";

pub fn encode_png(image: &RgbaImage) -> ProcessResult<Vec<u8>> {
    let mut buf = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .map_err(|e| ProcessError::Encode(e.to_string()))?;

    Ok(buf)
}

pub fn png_data_url(png: &[u8]) -> String {
    format!("data:image/png;base64,{}", STANDARD.encode(png))
}

/// Markdown image reference, `![LGTM](url)`.
pub fn markdown(image_url: &str) -> String {
    format!("![LGTM]({image_url})")
}

/// Timestamped download name, `lgtm-<ms>.png`.
pub fn timestamped_filename(epoch_ms: i64) -> String {
    format!("lgtm-{epoch_ms}.png")
}

/// Writes `png` into `dir` as `filename` (or `lgtm.png`) and returns the path.
pub fn download(png: &[u8], dir: &Path, filename: Option<&str>) -> ProcessResult<PathBuf> {
    let name = filename
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or(DEFAULT_FILENAME);

    // keep the write inside `dir`
    let name = Path::new(name)
        .file_name()
        .ok_or_else(|| ProcessError::Encode(format!("invalid file name: {name}")))?;

    fs::create_dir_all(dir)?;
    let path = dir.join(name);
    fs::write(&path, png)?;

    Ok(path)
}
