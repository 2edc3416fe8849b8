//! pdfrender
//!
//! Turns an HTML string into an A4 PDF by driving a headless browser through
//! launch → new page → set content → print → close, and exposes that as a
//! single HTTP endpoint.
//!
//! # Features
//!
//! - **CDP Backend** (default): Uses Chrome DevTools Protocol via headless Chrome
//! - **Swappable automation**: the render script only talks to the
//!   [`Automation`], [`Session`] and [`PageContext`] traits
//! - **Scoped cleanup**: the browser session is closed on every exit path
//!
//! # Example
//!
//! ```no_run
//! use pdfrender::{Margin, RenderConfig, RenderRequest};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let automation = pdfrender::new_automation(RenderConfig::default())?;
//! let request = RenderRequest::new("<p>hi</p>", Margin::from_px(10.0)?);
//! let pdf = pdfrender::render::render_document(&automation, &request)?;
//! std::fs::write("document.pdf", pdf)?;
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;

pub mod error;
pub use error::{Error, Result};

pub mod request;
pub use request::{
    Margin, PageMargins, PaperSize, PdfOptions, RenderRequest, WaitOptions, WaitUntil,
};

pub mod render;

// Async facade (worker-thread backed)
pub mod async_api;

pub mod server;

#[cfg(feature = "cdp")]
pub mod cdp;

/// Flags passed to Chrome when running in a memory-constrained, serverless
/// runtime. All of them work with the sandbox enabled.
pub const SERVERLESS_ARGS: &[&str] = &["--disable-dev-shm-usage", "--disable-gpu", "--no-first-run"];

/// Process-model flags added to the serverless set only when the sandbox is
/// off. Chrome refuses to start with `--no-zygote` while sandboxed.
pub const UNSANDBOXED_SERVERLESS_ARGS: &[&str] = &["--no-zygote", "--single-process"];

/// Configuration for launching automation sessions
///
/// The defaults are conservative: the browser sandbox stays on, and every
/// protocol call is bounded by `timeout_ms`.
///
/// # Examples
///
/// ```
/// let cfg = pdfrender::RenderConfig::default();
/// assert!(cfg.sandbox);
/// ```
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Browser executable; `None` searches the usual install locations
    pub chrome_path: Option<PathBuf>,
    /// Whether the browser runs with its sandbox enabled
    pub sandbox: bool,
    /// Viewport dimensions of the browser window
    pub viewport: Viewport,
    /// Timeout for each browser operation in milliseconds
    pub timeout_ms: u64,
    /// Extra command-line flags for the browser
    pub extra_args: Vec<String>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            chrome_path: None,
            sandbox: true,
            viewport: Viewport::default(),
            timeout_ms: 30000,
            extra_args: Vec::new(),
        }
    }
}

impl RenderConfig {
    /// Defaults plus [`SERVERLESS_ARGS`], and [`UNSANDBOXED_SERVERLESS_ARGS`]
    /// when `sandbox` is false.
    pub fn serverless(sandbox: bool) -> Self {
        let mut extra_args: Vec<String> = SERVERLESS_ARGS.iter().map(|s| s.to_string()).collect();
        if !sandbox {
            extra_args.extend(UNSANDBOXED_SERVERLESS_ARGS.iter().map(|s| s.to_string()));
        }
        Self {
            sandbox,
            extra_args,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.timeout_ms == 0 {
            return Err(Error::ConfigError("timeout_ms must be greater than zero".into()));
        }
        if self.viewport.width == 0 || self.viewport.height == 0 {
            return Err(Error::ConfigError(format!(
                "viewport must be non-empty, got {}x{}",
                self.viewport.width, self.viewport.height
            )));
        }
        if self.sandbox && self.extra_args.iter().any(|a| a == "--no-zygote") {
            return Err(Error::ConfigError(
                "--no-zygote requires the sandbox to be disabled".into(),
            ));
        }
        Ok(())
    }
}

/// Viewport dimensions
#[derive(Debug, Clone, Copy)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

/// A browser automation backend.
///
/// Implementations must hand out independent sessions: nothing (cookies,
/// storage, cache) may leak from one session into the next.
pub trait Automation: Send + Sync + 'static {
    type Session: Session;

    /// Launch a new automation session
    fn open_session(&self) -> Result<Self::Session>;
}

/// A running browser instance.
pub trait Session {
    type Page: PageContext;

    /// Open a new page/tab inside this session
    fn open_page(&mut self) -> Result<Self::Page>;

    /// Shut the session down and release the underlying process
    fn close(self) -> Result<()>;
}

/// An isolated document-rendering context inside a session.
pub trait PageContext {
    /// Replace the page document with `html` and block until `wait` holds
    fn set_content(&mut self, html: &str, wait: &WaitOptions) -> Result<()>;

    /// Print the current document to PDF
    fn render_pdf(&mut self, options: &PdfOptions) -> Result<Vec<u8>>;
}

/// Create the default automation backend (CDP).
#[cfg(feature = "cdp")]
pub fn new_automation(config: RenderConfig) -> Result<cdp::CdpAutomation> {
    cdp::CdpAutomation::new(config)
}
