use std::{
    fs,
    path::{Path, PathBuf},
};

use ab_glyph::FontVec;
use tracing::{debug, info};

use crate::error::{ProcessError, ProcessResult};

/// Regular sans-serif faces probed in order when no font is configured.
const FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/liberation-sans/LiberationSans-Regular.ttf",
    "/usr/share/fonts/noto/NotoSans-Regular.ttf",
    "/usr/share/fonts/truetype/noto/NotoSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

pub fn find_system_font() -> Option<PathBuf> {
    FONT_CANDIDATES
        .iter()
        .map(PathBuf::from)
        .find(|path| path.is_file())
}

pub fn load_font_file(path: &Path) -> ProcessResult<FontVec> {
    let data = fs::read(path)
        .map_err(|e| ProcessError::Font(format!("{}: {e}", path.display())))?;

    FontVec::try_from_vec(data)
        .map_err(|e| ProcessError::Font(format!("{}: {e}", path.display())))
}

/// Loads `explicit` when given, otherwise the first system font found.
pub fn load_font(explicit: Option<&Path>) -> ProcessResult<FontVec> {
    if let Some(path) = explicit {
        debug!("Loading configured font {}", path.display());
        return load_font_file(path);
    }

    let path = find_system_font().ok_or_else(|| {
        ProcessError::Font("no usable system font found, set LGTM_FONT_PATH".to_string())
    })?;

    info!("Using system font {}", path.display());
    load_font_file(&path)
}
