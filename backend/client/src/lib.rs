//! # LGTM Client
//!
//! Terminal front end for the LGTM Generator server.
//!
//! - [`search::Searcher`]: calls `/api/search/{source}` with retries and a
//!   five minute on-disk cache keyed by the full request.
//! - [`session::Session`]: renders a chosen image locally, then copies it
//!   (PNG or Markdown) to the clipboard or saves it to disk.
//! - [`toast::Toasts`]: short status messages collected along the way.
//!
//! ## Retries
//! Up to three attempts with `min(1000 * 2^n, 5000)` ms between them.
//! Error envelopes with a 4xx status are returned at once.

pub mod api;
pub mod cache;
pub mod clipboard;
pub mod error;
pub mod search;
pub mod session;
pub mod toast;

pub use api::{ApiClient, RetryPolicy, SearchParams};
pub use cache::Cache;
pub use clipboard::{Clipboard, MemoryClipboard, SystemClipboard};
pub use error::{ClientError, ClientResult};
pub use search::Searcher;
pub use session::{Session, SessionState};
pub use toast::{Toast, ToastKind, Toasts};
