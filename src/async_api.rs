use crate::render::render_document;
use crate::{Automation, Error, RenderRequest, Result};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tokio::sync::oneshot;

/// Render a document from async code.
///
/// The blocking render script runs on a dedicated worker thread that owns
/// the browser session for its whole life; the result comes back through a
/// oneshot channel. When `timeout` elapses first the caller gets
/// [`Error::Timeout`] while the worker finishes in the background and still
/// closes its session.
pub async fn render_async<A: Automation>(
    automation: Arc<A>,
    request: RenderRequest,
    timeout: Duration,
) -> Result<Vec<u8>> {
    let (resp_tx, resp_rx) = oneshot::channel::<Result<Vec<u8>>>();

    thread::Builder::new()
        .name("pdfrender-worker".into())
        .spawn(move || {
            let res = render_document(automation.as_ref(), &request);
            // Receiver is gone when the caller timed out
            let _ = resp_tx.send(res);
        })
        .map_err(|e| Error::Other(format!("Failed to spawn render worker: {}", e)))?;

    match tokio::time::timeout(timeout, resp_rx).await {
        Ok(res) => res.map_err(|e| Error::Other(format!("Render canceled: {}", e)))?,
        Err(_) => Err(Error::Timeout(timeout.as_millis() as u64)),
    }
}
