//! Recording automation backend for tests that must not launch Chrome.

#![allow(dead_code)]

use pdfrender::{Automation, Error, PageContext, PdfOptions, Result, Session, WaitOptions};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const MOCK_PDF: &[u8] = b"%PDF-1.7\n% mock document\n%%EOF\n";

/// Step at which the mock backend should fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    OpenSession,
    OpenPage,
    SetContent,
    RenderPdf,
    Close,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    OpenSession(usize),
    OpenPage(usize),
    SetContent {
        session: usize,
        html: String,
        wait: WaitOptions,
        /// Cookies present in the session before the content ran
        cookies_before: Vec<String>,
    },
    RenderPdf {
        session: usize,
        options: PdfOptions,
    },
    Close(usize),
}

#[derive(Clone)]
pub struct MockAutomation {
    events: Arc<Mutex<Vec<Event>>>,
    next_session: Arc<AtomicUsize>,
    fail_at: Option<Step>,
    pdf: Vec<u8>,
    delay: Option<Duration>,
}

impl MockAutomation {
    pub fn new() -> Self {
        Self {
            events: Arc::new(Mutex::new(Vec::new())),
            next_session: Arc::new(AtomicUsize::new(0)),
            fail_at: None,
            pdf: MOCK_PDF.to_vec(),
            delay: None,
        }
    }

    pub fn failing_at(step: Step) -> Self {
        Self {
            fail_at: Some(step),
            ..Self::new()
        }
    }

    pub fn with_pdf(pdf: &[u8]) -> Self {
        Self {
            pdf: pdf.to_vec(),
            ..Self::new()
        }
    }

    /// Make `set_content` sleep, to simulate a hung page
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::new()
        }
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn opened(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, Event::OpenSession(_)))
            .count()
    }

    pub fn closed(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, Event::Close(_)))
            .count()
    }

    fn record(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }

    fn check(&self, step: Step) -> Result<()> {
        if self.fail_at == Some(step) {
            return Err(Error::Other(format!("mock failure at {:?}", step)));
        }
        Ok(())
    }
}

impl Automation for MockAutomation {
    type Session = MockSession;

    fn open_session(&self) -> Result<MockSession> {
        self.check(Step::OpenSession)?;
        let id = self.next_session.fetch_add(1, Ordering::SeqCst);
        self.record(Event::OpenSession(id));
        Ok(MockSession {
            id,
            backend: self.clone(),
            cookies: Arc::new(Mutex::new(Vec::new())),
        })
    }
}

pub struct MockSession {
    id: usize,
    backend: MockAutomation,
    cookies: Arc<Mutex<Vec<String>>>,
}

impl Session for MockSession {
    type Page = MockPage;

    fn open_page(&mut self) -> Result<MockPage> {
        self.backend.check(Step::OpenPage)?;
        self.backend.record(Event::OpenPage(self.id));
        Ok(MockPage {
            session: self.id,
            backend: self.backend.clone(),
            cookies: self.cookies.clone(),
        })
    }

    fn close(self) -> Result<()> {
        // The close is recorded even when it fails, the process is gone either way
        self.backend.record(Event::Close(self.id));
        self.backend.check(Step::Close)
    }
}

pub struct MockPage {
    session: usize,
    backend: MockAutomation,
    cookies: Arc<Mutex<Vec<String>>>,
}

impl PageContext for MockPage {
    fn set_content(&mut self, html: &str, wait: &WaitOptions) -> Result<()> {
        if let Some(delay) = self.backend.delay {
            std::thread::sleep(delay);
        }
        self.backend.check(Step::SetContent)?;

        let mut jar = self.cookies.lock().unwrap();
        let cookies_before = jar.clone();
        // Minimal stand-in for scripts that set `document.cookie='name=value'`
        for part in html.split("document.cookie='").skip(1) {
            if let Some(end) = part.find('\'') {
                jar.push(part[..end].to_string());
            }
        }

        self.backend.record(Event::SetContent {
            session: self.session,
            html: html.to_string(),
            wait: wait.clone(),
            cookies_before,
        });
        Ok(())
    }

    fn render_pdf(&mut self, options: &PdfOptions) -> Result<Vec<u8>> {
        self.backend.check(Step::RenderPdf)?;
        self.backend.record(Event::RenderPdf {
            session: self.session,
            options: options.clone(),
        });
        Ok(self.backend.pdf.clone())
    }
}
