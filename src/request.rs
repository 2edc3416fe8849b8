//! Render request model and the page options derived from it.

use crate::{Error, Result};
use serde::Deserialize;

/// CSS pixels per inch, used when converting margins for the print backend.
pub const CSS_PX_PER_INCH: f64 = 96.0;

/// Input payload of the render endpoint.
///
/// Constructed from the request body, consumed once by
/// [`render_document`](crate::render::render_document).
#[derive(Debug, Clone, Deserialize)]
pub struct RenderRequest {
    /// HTML markup to print. Untrusted.
    pub content: String,
    /// Margin in CSS pixels applied to the top, right and left edges.
    pub margin: Margin,
}

impl RenderRequest {
    pub fn new(content: impl Into<String>, margin: Margin) -> Self {
        Self {
            content: content.into(),
            margin,
        }
    }

    /// Parse a JSON request body.
    pub fn from_json(body: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(body)?)
    }
}

/// A page margin in CSS pixels. Always finite and non-negative.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(try_from = "MarginRepr")]
pub struct Margin(f64);

/// Margins arrive either as JSON numbers or as numeric strings.
#[derive(Deserialize)]
#[serde(untagged)]
enum MarginRepr {
    Number(f64),
    Text(String),
}

impl TryFrom<MarginRepr> for Margin {
    type Error = Error;

    fn try_from(repr: MarginRepr) -> Result<Self> {
        match repr {
            MarginRepr::Number(px) => Margin::from_px(px),
            MarginRepr::Text(text) => {
                let trimmed = text.trim();
                let digits = trimmed.strip_suffix("px").unwrap_or(trimmed).trim();
                let px = digits.parse::<f64>().map_err(|_| {
                    Error::InvalidRequest(format!("margin '{}' is not a number", text))
                })?;
                Margin::from_px(px)
            }
        }
    }
}

impl Margin {
    pub const ZERO: Margin = Margin(0.0);

    pub fn from_px(px: f64) -> Result<Self> {
        if !px.is_finite() {
            return Err(Error::InvalidRequest(format!("margin must be finite, got {}", px)));
        }
        if px < 0.0 {
            return Err(Error::InvalidRequest(format!("margin must not be negative, got {}", px)));
        }
        Ok(Margin(px))
    }

    pub fn px(self) -> f64 {
        self.0
    }

    /// Pixel-unit string as used in CSS, e.g. `10px`.
    pub fn css(self) -> String {
        format!("{}px", self.0)
    }

    pub fn inches(self) -> f64 {
        self.0 / CSS_PX_PER_INCH
    }
}

/// Page margins for the printed document.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageMargins {
    pub top: Margin,
    pub right: Margin,
    pub bottom: Margin,
    pub left: Margin,
}

impl PageMargins {
    /// Requested margin on top, right and left; the bottom edge is always zero.
    pub fn from_margin(margin: Margin) -> Self {
        Self {
            top: margin,
            right: margin,
            bottom: Margin::ZERO,
            left: margin,
        }
    }
}

/// Paper dimensions in inches.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PaperSize {
    pub width_in: f64,
    pub height_in: f64,
}

impl PaperSize {
    pub const A4: PaperSize = PaperSize {
        width_in: 8.27,
        height_in: 11.7,
    };
}

/// Options handed to [`PageContext::render_pdf`](crate::PageContext::render_pdf).
#[derive(Debug, Clone, PartialEq)]
pub struct PdfOptions {
    pub paper: PaperSize,
    pub print_background: bool,
    pub margins: PageMargins,
}

impl PdfOptions {
    /// A4 with background graphics and the request's margin policy applied.
    pub fn for_request(request: &RenderRequest) -> Self {
        Self {
            paper: PaperSize::A4,
            print_background: true,
            margins: PageMargins::from_margin(request.margin),
        }
    }
}

/// Lifecycle points a content load can wait for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitUntil {
    /// The DOM finished parsing
    DomContentLoaded,
    /// No resource loads have finished for a quiet window
    NetworkIdle,
}

/// Conditions that must hold before `set_content` returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitOptions {
    pub until: Vec<WaitUntil>,
    /// Also wait for `document.fonts.ready`
    pub fonts: bool,
}

impl WaitOptions {
    /// DOM parsed, network quiet and web fonts loaded.
    pub fn settled() -> Self {
        Self {
            until: vec![WaitUntil::DomContentLoaded, WaitUntil::NetworkIdle],
            fonts: true,
        }
    }
}
