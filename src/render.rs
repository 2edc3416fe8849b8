//! The render script: one session, one page, one document.

use crate::{Automation, Error, PageContext, PdfOptions, RenderRequest, Result, Session, WaitOptions};
use log::{debug, warn};

/// Owns a session and closes it when dropped unless [`close`](Self::close)
/// was already called.
pub struct SessionGuard<S: Session> {
    session: Option<S>,
}

impl<S: Session> SessionGuard<S> {
    pub fn new(session: S) -> Self {
        Self {
            session: Some(session),
        }
    }

    pub fn open_page(&mut self) -> Result<S::Page> {
        match self.session.as_mut() {
            Some(session) => session.open_page(),
            None => Err(Error::PageError("session already closed".into())),
        }
    }

    /// Close the session now and report the outcome.
    pub fn close(mut self) -> Result<()> {
        match self.session.take() {
            Some(session) => session.close(),
            None => Ok(()),
        }
    }
}

impl<S: Session> Drop for SessionGuard<S> {
    fn drop(&mut self) {
        if let Some(session) = self.session.take() {
            debug!("Releasing browser session on early exit");
            if let Err(e) = session.close() {
                warn!("Failed to close browser session: {}", e);
            }
        }
    }
}

/// Render `request` to PDF bytes using a fresh session from `automation`.
///
/// The content is loaded once; DOM, network and font waits all complete
/// before the page is printed.
pub fn render_document<A: Automation>(automation: &A, request: &RenderRequest) -> Result<Vec<u8>> {
    let mut session = SessionGuard::new(automation.open_session()?);
    debug!("Browser session opened");

    let pdf = {
        let mut page = session.open_page()?;
        page.set_content(&request.content, &WaitOptions::settled())?;
        debug!("Content loaded ({} bytes of HTML)", request.content.len());
        page.render_pdf(&PdfOptions::for_request(request))?
    };

    if pdf.is_empty() {
        return Err(Error::RenderError("browser returned an empty PDF".into()));
    }

    if let Err(e) = session.close() {
        warn!("PDF captured but closing the browser session failed: {}", e);
    }

    Ok(pdf)
}
