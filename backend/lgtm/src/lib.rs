//! # LGTM Rendering
//!
//! Turns a stock photo into an "LGTM" image.
//!
//! ## Pipeline
//!
//! 1. Load: fetch the source over HTTP(S), capped at [`loader::MAX_IMAGE_BYTES`].
//!    Hosts resolving to private ranges are refused unless [`HostPolicy::AllowPrivate`],
//!    and redirects are followed by hand so each hop is checked again.
//! 2. Resize: fit inside the max box (800x800 by default), never enlarging.
//! 3. Overlay: draw the text centered, white at 60% opacity, font size 4% of the
//!    final height unless overridden. No shadow unless one is configured.
//! 4. Export: PNG bytes plus a `data:` URL.
//!
//! ## Notes
//! - Glyphs are rasterized with `ab_glyph` into a coverage mask, then blended
//!   source-over onto the RGBA canvas.
//! - The renderer holds one parsed font; clone it freely.

pub mod error;
pub mod export;
pub mod font;
pub mod loader;
pub mod options;
pub mod overlay;
pub mod processor;
pub mod resize;

pub use error::{ProcessError, ProcessResult};
pub use export::{DEFAULT_FILENAME, download, markdown, timestamped_filename};
pub use loader::{HostPolicy, image_client};
pub use options::{LgtmOptions, Shadow};
pub use processor::{ProcessedImage, Renderer};
pub use resize::{fit_dimensions, font_size_for};
