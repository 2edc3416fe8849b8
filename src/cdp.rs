//! Chrome DevTools Protocol automation backend

use crate::{
    Automation, Error, PageContext, PdfOptions, RenderConfig, Result, Session, WaitOptions,
    WaitUntil,
};

use base64::Engine as Base64Engine;
use headless_chrome::browser::tab::Tab;
use headless_chrome::protocol::cdp::types::Event;
use headless_chrome::protocol::cdp::Network;
use headless_chrome::types::PrintToPdfOptions;
use headless_chrome::{Browser, LaunchOptions};
use log::{debug, trace};
use std::collections::HashSet;
use std::ffi::OsStr;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

/// A page counts as network-idle once no request has been in flight for this long.
const NETWORK_IDLE_QUIET: Duration = Duration::from_millis(500);
const NETWORK_IDLE_POLL: Duration = Duration::from_millis(50);

/// CDP-based automation backend (uses the `headless_chrome` crate)
///
/// Every session is a separate Chrome process with its own temporary
/// profile, so no cookies or storage survive from one session to the next.
pub struct CdpAutomation {
    config: RenderConfig,
}

impl CdpAutomation {
    pub fn new(config: RenderConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }
}

impl Automation for CdpAutomation {
    type Session = CdpSession;

    fn open_session(&self) -> Result<CdpSession> {
        let config = &self.config;
        let timeout = Duration::from_millis(config.timeout_ms);
        let args: Vec<&OsStr> = config.extra_args.iter().map(OsStr::new).collect();

        let launch_options = LaunchOptions::default_builder()
            .headless(true)
            .sandbox(config.sandbox)
            .path(config.chrome_path.clone())
            .window_size(Some((config.viewport.width, config.viewport.height)))
            .idle_browser_timeout(timeout)
            .args(args)
            .build()
            .map_err(|e| Error::InitializationError(format!("Failed to build launch options: {}", e)))?;

        let browser = Browser::new(launch_options)
            .map_err(|e| Error::InitializationError(format!("Failed to launch browser: {}", e)))?;

        Ok(CdpSession { browser, timeout })
    }
}

/// One running Chrome process.
pub struct CdpSession {
    browser: Browser,
    timeout: Duration,
}

impl Session for CdpSession {
    type Page = CdpPage;

    fn open_page(&mut self) -> Result<CdpPage> {
        let tab = self
            .browser
            .new_tab()
            .map_err(|e| Error::PageError(format!("Failed to create tab: {}", e)))?;
        tab.set_default_timeout(self.timeout);

        let network = Arc::new(Mutex::new(NetworkTracker::new(Instant::now())));
        let listener_network = network.clone();
        tab.add_event_listener(Arc::new(move |event: &Event| {
            let mut tracker = listener_network.lock().unwrap_or_else(PoisonError::into_inner);
            match event {
                Event::NetworkRequestWillBeSent(ev) => {
                    tracker.started(&ev.params.request_id, Instant::now())
                }
                Event::NetworkLoadingFinished(ev) => {
                    tracker.finished(&ev.params.request_id, Instant::now())
                }
                Event::NetworkLoadingFailed(ev) => {
                    tracker.finished(&ev.params.request_id, Instant::now())
                }
                _ => {}
            }
        }))
        .map_err(|e| Error::PageError(format!("Failed to watch network events: {}", e)))?;
        tab.call_method(Network::Enable {
            max_total_buffer_size: None,
            max_resource_buffer_size: None,
            max_post_data_size: None,
            report_direct_socket_traffic: None,
            enable_durable_messages: None,
        })
        .map_err(|e| Error::PageError(format!("Failed to enable network domain: {}", e)))?;

        Ok(CdpPage {
            tab,
            timeout: self.timeout,
            network,
        })
    }

    fn close(self) -> Result<()> {
        // Dropping the browser kills the child process and removes its profile dir
        drop(self.browser);
        Ok(())
    }
}

/// Requests the page has started but not yet finished, as reported by the
/// `Network` domain.
#[derive(Debug)]
struct NetworkTracker {
    inflight: HashSet<String>,
    last_change: Instant,
}

impl NetworkTracker {
    fn new(now: Instant) -> Self {
        Self {
            inflight: HashSet::new(),
            last_change: now,
        }
    }

    fn started(&mut self, request_id: &str, now: Instant) {
        trace!("Request {} started", request_id);
        self.inflight.insert(request_id.to_string());
        self.last_change = now;
    }

    fn finished(&mut self, request_id: &str, now: Instant) {
        // Redirects reuse the id, and events from before a reset may still arrive
        if self.inflight.remove(request_id) {
            trace!("Request {} finished", request_id);
            self.last_change = now;
        }
    }

    /// Nothing in flight and nothing has started or finished for `quiet`.
    fn is_idle(&self, now: Instant, quiet: Duration) -> bool {
        self.inflight.is_empty() && now.saturating_duration_since(self.last_change) >= quiet
    }
}

/// How long the network-idle wait may take, leaving headroom under the
/// protocol timeout.
fn network_idle_deadline(timeout: Duration) -> Duration {
    timeout / 4 * 3
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Chrome print parameters for `options`. Margins and paper are in inches.
pub(crate) fn print_options(options: &PdfOptions) -> PrintToPdfOptions {
    let margins = &options.margins;
    PrintToPdfOptions {
        print_background: Some(options.print_background),
        paper_width: Some(options.paper.width_in),
        paper_height: Some(options.paper.height_in),
        margin_top: Some(margins.top.inches()),
        margin_right: Some(margins.right.inches()),
        margin_bottom: Some(margins.bottom.inches()),
        margin_left: Some(margins.left.inches()),
        ..Default::default()
    }
}

/// A single tab.
pub struct CdpPage {
    tab: Arc<Tab>,
    timeout: Duration,
    network: Arc<Mutex<NetworkTracker>>,
}

impl CdpPage {
    /// Evaluate `script`, awaiting it if it returns a promise, and return its JSON value.
    fn eval(&self, script: &str) -> Result<serde_json::Value> {
        let res = self
            .tab
            .evaluate(script, true)
            .map_err(|e| Error::LoadError(format!("Evaluation failed: {}", e)))?;
        Ok(res.value.unwrap_or(serde_json::Value::Null))
    }

    fn write_document(&self, html: &str) -> Result<()> {
        // Ship the markup base64-encoded so it never needs JS string escaping
        let b64 = Base64Engine::encode(&base64::engine::general_purpose::STANDARD, html);
        let template = r#"(function(){
            const bytes = Uint8Array.from(atob("{{B64_TOKEN}}"), function(c){ return c.charCodeAt(0); });
            const html = new TextDecoder('utf-8').decode(bytes);
            document.open();
            document.write(html);
            document.close();
            return true;
        })()"#;
        self.eval(&template.replace("{{B64_TOKEN}}", &b64))?;
        Ok(())
    }

    fn wait_for_ready_state(&self, states: &[&str]) -> Result<()> {
        let list = serde_json::to_string(states)
            .map_err(|e| Error::LoadError(format!("Failed to encode ready states: {}", e)))?;
        let template = r#"new Promise(function(resolve){
            const ok = function(){ return {{STATES}}.indexOf(document.readyState) !== -1; };
            if (ok()) { resolve(true); return; }
            document.addEventListener('readystatechange', function(){ if (ok()) resolve(true); });
        })"#;
        self.eval(&template.replace("{{STATES}}", &list))?;
        Ok(())
    }

    fn wait_for_network_idle(&self) -> Result<()> {
        self.wait_for_ready_state(&["complete"])?;

        let budget = network_idle_deadline(self.timeout);
        let deadline = Instant::now().checked_add(budget);
        loop {
            let now = Instant::now();
            let idle = self
                .network
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .is_idle(now, NETWORK_IDLE_QUIET);
            if idle {
                return Ok(());
            }
            if deadline.is_some_and(|d| now >= d) {
                return Err(Error::Timeout(duration_ms(budget)));
            }
            std::thread::sleep(NETWORK_IDLE_POLL);
        }
    }

    fn wait_for_fonts(&self) -> Result<()> {
        self.eval("document.fonts.ready.then(function(){ return true; })")?;
        Ok(())
    }
}

impl PageContext for CdpPage {
    fn set_content(&mut self, html: &str, wait: &WaitOptions) -> Result<()> {
        // Quiet time counts from the new document, not from page creation
        *self.network.lock().unwrap_or_else(PoisonError::into_inner) =
            NetworkTracker::new(Instant::now());
        self.write_document(html)?;

        for condition in &wait.until {
            debug!("Waiting for {:?}", condition);
            match condition {
                WaitUntil::DomContentLoaded => self.wait_for_ready_state(&["interactive", "complete"])?,
                WaitUntil::NetworkIdle => self.wait_for_network_idle()?,
            }
        }

        if wait.fonts {
            self.wait_for_fonts()?;
        }
        Ok(())
    }

    fn render_pdf(&mut self, options: &PdfOptions) -> Result<Vec<u8>> {
        self.tab
            .print_to_pdf(Some(print_options(options)))
            .map_err(|e| Error::RenderError(format!("Print to PDF failed: {}", e)))
    }
}
