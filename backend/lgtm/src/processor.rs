use std::{path::Path, sync::Arc, time::Instant};

use ab_glyph::FontVec;
use image::DynamicImage;
use reqwest::Client;
use tokio::task::spawn_blocking;
use tracing::{error, info};

use crate::{
    error::{ProcessError, ProcessResult},
    export::{encode_png, png_data_url},
    font::load_font,
    loader::{HostPolicy, load_image},
    options::LgtmOptions,
    overlay::draw_centered_text,
    resize::{font_size_for, resize_to_fit},
};

/// Output of one rendering pass.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedImage {
    /// `data:image/png;base64,...`, ready to embed in Markdown.
    pub data_url: String,
    /// Encoded PNG bytes, used for clipboard copies and downloads.
    pub png: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Stamps overlay text onto images. Cheap to clone.
#[derive(Clone)]
pub struct Renderer {
    font: Arc<FontVec>,
}

impl Renderer {
    pub fn new(font: FontVec) -> Self {
        Self {
            font: Arc::new(font),
        }
    }

    /// Uses the font at `path`, or the first system font found.
    pub fn load(path: Option<&Path>) -> ProcessResult<Self> {
        load_font(path).map(Self::new)
    }

    pub fn render(&self, image: DynamicImage, options: &LgtmOptions) -> ProcessResult<ProcessedImage> {
        let resized = resize_to_fit(image, options.max_width, options.max_height);
        let mut canvas = resized.into_rgba8();

        let font_size = font_size_for(canvas.height(), options.font_size);
        draw_centered_text(
            &mut canvas,
            self.font.as_ref(),
            &options.text,
            font_size,
            options.text_color,
            options.shadow.as_ref(),
        );

        let png = encode_png(&canvas)?;

        Ok(ProcessedImage {
            data_url: png_data_url(&png),
            png,
            width: canvas.width(),
            height: canvas.height(),
        })
    }

    /// Renders on the blocking pool.
    pub async fn render_blocking(
        &self,
        image: DynamicImage,
        options: LgtmOptions,
    ) -> ProcessResult<ProcessedImage> {
        let renderer = self.clone();

        spawn_blocking(move || renderer.render(image, &options))
            .await
            .map_err(|e| ProcessError::Task(e.to_string()))?
    }

    /// Fetches `image_url`, then renders it.
    pub async fn process_url(
        &self,
        client: &Client,
        image_url: &str,
        options: LgtmOptions,
        policy: HostPolicy,
    ) -> ProcessResult<ProcessedImage> {
        let start = Instant::now();

        let result = match load_image(client, image_url, policy).await {
            Ok(image) => self.render_blocking(image, options).await,
            Err(e) => Err(e),
        };

        match &result {
            Ok(processed) => info!(
                width = processed.width,
                height = processed.height,
                "Image processed in {:.2}ms",
                start.elapsed().as_secs_f64() * 1000.0
            ),
            Err(e) => error!("Error processing image: {e}"),
        }

        result
    }
}
