//! # Session
//!
//! One preview lifecycle: pick an image, render it, then copy or download.
//!
//! ```text
//! Idle --select--> Processing --ok--> Ready --copy/download--> Ready
//!                       |                          close
//!                       +--err--> Error --retry--> Processing
//! ```
//!
//! `close` returns to Idle from any state. Each selection issues a new
//! [`Ticket`]; a completion carrying an older ticket is dropped.

use std::path::{Path, PathBuf};

use lgtm::{
    HostPolicy, LgtmOptions, ProcessError, ProcessedImage, Renderer, markdown,
    timestamped_filename,
};
use reqwest::Client;
use shared::now_ms;
use tracing::{error, info};

use crate::{
    clipboard::Clipboard,
    error::{
        CLIPBOARD_COPY_FAILED, ClientError, ClientResult, GENERATION_FAILED, MARKDOWN_COPY_FAILED,
    },
    toast::Toasts,
};

pub const IMAGE_COPIED: &str = "画像をコピーしました！";
pub const MARKDOWN_COPIED: &str = "マークダウンをコピーしました！";
pub const IMAGE_DOWNLOADED: &str = "画像をダウンロードしました！";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Processing,
    Ready,
    Copying,
    Downloading,
    Error(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket(u64);

pub struct Session<C: Clipboard> {
    state: SessionState,
    generation: u64,
    original_url: Option<String>,
    processed: Option<ProcessedImage>,
    clipboard: C,
    pub toasts: Toasts,
}

impl<C: Clipboard> Session<C> {
    pub fn new(clipboard: C) -> Self {
        Self {
            state: SessionState::Idle,
            generation: 0,
            original_url: None,
            processed: None,
            clipboard,
            toasts: Toasts::new(),
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn processed(&self) -> Option<&ProcessedImage> {
        self.processed.as_ref()
    }

    pub fn original_url(&self) -> Option<&str> {
        self.original_url.as_deref()
    }

    pub fn clipboard(&self) -> &C {
        &self.clipboard
    }

    /// Starts processing `url`, superseding any pending render.
    pub fn select(&mut self, url: impl Into<String>) -> Ticket {
        self.generation += 1;
        self.original_url = Some(url.into());
        self.processed = None;
        self.state = SessionState::Processing;

        Ticket(self.generation)
    }

    /// Re-enters Processing for the last URL after a failure.
    pub fn retry(&mut self) -> Option<(Ticket, String)> {
        if !matches!(self.state, SessionState::Error(_)) {
            return None;
        }
        let url = self.original_url.clone()?;
        Some((self.select(url.clone()), url))
    }

    /// Applies a render outcome. Returns `false` when the ticket is stale.
    pub fn complete(
        &mut self,
        ticket: Ticket,
        result: Result<ProcessedImage, ProcessError>,
    ) -> bool {
        if ticket.0 != self.generation || self.state != SessionState::Processing {
            return false;
        }

        match result {
            Ok(processed) => {
                self.processed = Some(processed);
                self.state = SessionState::Ready;
            }
            Err(e) => {
                error!("Failed to generate LGTM image: {e}");
                self.toasts.error(GENERATION_FAILED);
                self.state = SessionState::Error(e.to_string());
            }
        }

        true
    }

    /// Selects `url`, renders it and applies the outcome.
    pub async fn generate(
        &mut self,
        renderer: &Renderer,
        http: &Client,
        url: &str,
        options: LgtmOptions,
        policy: HostPolicy,
    ) -> &SessionState {
        let ticket = self.select(url);
        let result = renderer.process_url(http, url, options, policy).await;
        self.complete(ticket, result);
        &self.state
    }

    /// Discards the session, including any result still in flight.
    pub fn close(&mut self) {
        self.generation += 1;
        self.original_url = None;
        self.processed = None;
        self.state = SessionState::Idle;
    }

    fn ready_image(&self) -> ClientResult<ProcessedImage> {
        match (&self.state, &self.processed) {
            (SessionState::Ready, Some(processed)) => Ok(processed.clone()),
            _ => Err(ClientError::NotReady),
        }
    }

    pub fn copy_image(&mut self) -> ClientResult<()> {
        let processed = self.ready_image()?;

        self.state = SessionState::Copying;
        let result = self.clipboard.set_png(&processed.png);
        self.state = SessionState::Ready;

        self.report(result.map_err(|reason| {
            error!("Clipboard write failed: {reason}");
            ClientError::Clipboard(CLIPBOARD_COPY_FAILED)
        }), IMAGE_COPIED)
    }

    /// Copies `![LGTM](data url)`.
    pub fn copy_markdown(&mut self) -> ClientResult<()> {
        let processed = self.ready_image()?;

        self.state = SessionState::Copying;
        let result = self.clipboard.set_text(&markdown(&processed.data_url));
        self.state = SessionState::Ready;

        self.report(result.map_err(|reason| {
            error!("Clipboard write failed: {reason}");
            ClientError::Clipboard(MARKDOWN_COPY_FAILED)
        }), MARKDOWN_COPIED)
    }

    /// Writes the PNG into `dir`, as `filename` or `lgtm-<ms>.png`.
    pub fn download(&mut self, dir: &Path, filename: Option<&str>) -> ClientResult<PathBuf> {
        let processed = self.ready_image()?;
        let name = filename
            .map(str::to_string)
            .unwrap_or_else(|| timestamped_filename(now_ms()));

        self.state = SessionState::Downloading;
        let result = lgtm::download(&processed.png, dir, Some(&name));
        self.state = SessionState::Ready;

        let path = result.map_err(ClientError::Download);
        if let Ok(path) = &path {
            info!("Saved {}", path.display());
        }
        self.report(path, IMAGE_DOWNLOADED)
    }

    fn report<T>(&mut self, result: ClientResult<T>, success: &str) -> ClientResult<T> {
        match &result {
            Ok(_) => {
                self.toasts.success(success);
            }
            Err(e) => {
                self.toasts.error(e.to_string());
            }
        }
        result
    }
}
