use std::{borrow::Cow, time::Duration};
#[cfg(target_os = "linux")]
use std::time::Instant;

#[cfg(target_os = "linux")]
use arboard::SetExtLinux;
use arboard::{ImageData, Set};

/// Destination for copied images and Markdown.
pub trait Clipboard {
    fn set_text(&mut self, text: &str) -> Result<(), String>;

    /// `png` holds encoded PNG bytes.
    fn set_png(&mut self, png: &[u8]) -> Result<(), String>;
}

/// The desktop clipboard. Opened lazily so headless runs only fail on use.
///
/// On X11 and Wayland the owning process serves the contents, which vanish
/// when it exits. With a `hold` set, each write blocks until another program
/// takes the selection or `hold` elapses. Other platforms ignore `hold`.
#[derive(Default)]
pub struct SystemClipboard {
    inner: Option<arboard::Clipboard>,
    #[cfg_attr(not(target_os = "linux"), allow(dead_code))]
    hold: Option<Duration>,
}

impl SystemClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_hold(hold: Duration) -> Self {
        Self {
            inner: None,
            hold: Some(hold),
        }
    }

    fn handle(&mut self) -> Result<&mut arboard::Clipboard, String> {
        if self.inner.is_none() {
            self.inner = Some(arboard::Clipboard::new().map_err(|e| e.to_string())?);
        }
        self.inner
            .as_mut()
            .ok_or_else(|| "clipboard unavailable".to_string())
    }

    fn writer(&mut self) -> Result<Set<'_>, String> {
        #[cfg(target_os = "linux")]
        let deadline = self.hold.map(|hold| Instant::now() + hold);

        let set = self.handle()?.set();

        #[cfg(target_os = "linux")]
        let set = match deadline {
            Some(deadline) => set.wait_until(deadline),
            None => set,
        };

        Ok(set)
    }
}

impl Clipboard for SystemClipboard {
    fn set_text(&mut self, text: &str) -> Result<(), String> {
        self.writer()?.text(text).map_err(|e| e.to_string())
    }

    fn set_png(&mut self, png: &[u8]) -> Result<(), String> {
        let rgba = image::load_from_memory(png)
            .map_err(|e| e.to_string())?
            .into_rgba8();
        let (width, height) = rgba.dimensions();

        self.writer()?
            .image(ImageData {
                width: width as usize,
                height: height as usize,
                bytes: Cow::Owned(rgba.into_raw()),
            })
            .map_err(|e| e.to_string())
    }
}

/// Keeps the last write in memory.
#[derive(Debug, Default)]
pub struct MemoryClipboard {
    pub text: Option<String>,
    pub png: Option<Vec<u8>>,
    /// When set, every write fails with this reason.
    pub fail_with: Option<String>,
}

impl Clipboard for MemoryClipboard {
    fn set_text(&mut self, text: &str) -> Result<(), String> {
        if let Some(reason) = &self.fail_with {
            return Err(reason.clone());
        }
        self.text = Some(text.to_string());
        Ok(())
    }

    fn set_png(&mut self, png: &[u8]) -> Result<(), String> {
        if let Some(reason) = &self.fail_with {
            return Err(reason.clone());
        }
        self.png = Some(png.to_vec());
        Ok(())
    }
}
