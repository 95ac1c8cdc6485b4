//! Fake driver implementations for testing
//!
//! These fakes let the registry and command layer be exercised without a
//! browser binary anywhere near the test run.

use super::{BrowserDriver, DriverError, DriverPage, Engine, EngineOptions};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Eight-byte PNG signature, enough payload for file-writing tests.
pub const FAKE_PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// Every call a fake driver or one of its pages has observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FakeCall {
    Launch { engine: Engine, headless: bool },
    Navigate(String),
    Click(String),
    Fill(String, String),
    ReadText(String),
    Screenshot { full_page: bool },
    Close,
}

/// Fake driver that records every call and can be scripted to fail.
pub struct FakeDriver {
    /// Errors handed to upcoming `launch` calls, in order.
    launch_errors: Mutex<VecDeque<String>>,
    /// When set, every page navigation fails with this message.
    navigate_error: Mutex<Option<String>>,
    /// When set, every page close fails with this message.
    close_error: Mutex<Option<String>>,
    /// Selectors that pages treat as matching nothing.
    missing_selectors: Mutex<Vec<String>>,
    /// What `read_text` returns. `None` models an element with no text.
    text: Mutex<Option<String>>,
    /// Record of all driver and page calls
    pub calls: Arc<Mutex<Vec<FakeCall>>>,
    /// Pages launched and not yet successfully closed
    open_pages: Arc<AtomicUsize>,
}

impl FakeDriver {
    pub fn new() -> Self {
        Self {
            launch_errors: Mutex::new(VecDeque::new()),
            navigate_error: Mutex::new(None),
            close_error: Mutex::new(None),
            missing_selectors: Mutex::new(Vec::new()),
            text: Mutex::new(Some("hello".to_string())),
            calls: Arc::new(Mutex::new(Vec::new())),
            open_pages: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Queue a failure for the next `launch` call.
    pub fn queue_launch_error(&self, message: impl Into<String>) {
        self.launch_errors.lock().unwrap().push_back(message.into());
    }

    /// Make every page navigation fail with `message`.
    pub fn fail_navigate(&self, message: impl Into<String>) {
        *self.navigate_error.lock().unwrap() = Some(message.into());
    }

    /// Make every page close fail with `message`.
    pub fn fail_close(&self, message: impl Into<String>) {
        *self.close_error.lock().unwrap() = Some(message.into());
    }

    /// Make pages report `selector` as matching no element.
    pub fn mark_selector_missing(&self, selector: impl Into<String>) {
        self.missing_selectors.lock().unwrap().push(selector.into());
    }

    /// Script what pages return from `read_text`.
    pub fn set_text(&self, text: Option<&str>) {
        *self.text.lock().unwrap() = text.map(String::from);
    }

    /// Get recorded calls
    pub fn recorded_calls(&self) -> Vec<FakeCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Pages launched and not yet successfully closed
    pub fn open_pages(&self) -> usize {
        self.open_pages.load(Ordering::SeqCst)
    }
}

impl Default for FakeDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BrowserDriver for FakeDriver {
    async fn launch(
        &self,
        engine: Engine,
        headless: bool,
        _options: &EngineOptions,
    ) -> Result<Box<dyn DriverPage>, DriverError> {
        self.calls
            .lock()
            .unwrap()
            .push(FakeCall::Launch { engine, headless });

        if let Some(message) = self.launch_errors.lock().unwrap().pop_front() {
            return Err(DriverError::Launch(message));
        }

        self.open_pages.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakePage {
            calls: Arc::clone(&self.calls),
            navigate_error: self.navigate_error.lock().unwrap().clone(),
            close_error: self.close_error.lock().unwrap().clone(),
            missing: self.missing_selectors.lock().unwrap().clone(),
            text: self.text.lock().unwrap().clone(),
            open_pages: Arc::clone(&self.open_pages),
        }))
    }
}

/// Page handed out by [`FakeDriver`]; shares its parent's call log.
pub struct FakePage {
    calls: Arc<Mutex<Vec<FakeCall>>>,
    navigate_error: Option<String>,
    close_error: Option<String>,
    missing: Vec<String>,
    text: Option<String>,
    open_pages: Arc<AtomicUsize>,
}

impl FakePage {
    fn require_selector(&self, selector: &str) -> Result<(), DriverError> {
        if self.missing.iter().any(|s| s == selector) {
            return Err(DriverError::Interaction(format!(
                "no element matched selector {selector:?}"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl DriverPage for FakePage {
    async fn navigate(&self, url: &str) -> Result<String, DriverError> {
        self.calls
            .lock()
            .unwrap()
            .push(FakeCall::Navigate(url.to_string()));
        if let Some(message) = &self.navigate_error {
            return Err(DriverError::Navigation(message.clone()));
        }
        Ok(url.to_string())
    }

    async fn click(&self, selector: &str) -> Result<(), DriverError> {
        self.calls
            .lock()
            .unwrap()
            .push(FakeCall::Click(selector.to_string()));
        self.require_selector(selector)
    }

    async fn fill(&self, selector: &str, text: &str) -> Result<(), DriverError> {
        self.calls
            .lock()
            .unwrap()
            .push(FakeCall::Fill(selector.to_string(), text.to_string()));
        self.require_selector(selector)
    }

    async fn read_text(&self, selector: &str) -> Result<Option<String>, DriverError> {
        self.calls
            .lock()
            .unwrap()
            .push(FakeCall::ReadText(selector.to_string()));
        self.require_selector(selector)?;
        Ok(self.text.clone())
    }

    async fn screenshot(&self, full_page: bool) -> Result<Vec<u8>, DriverError> {
        self.calls
            .lock()
            .unwrap()
            .push(FakeCall::Screenshot { full_page });
        Ok(FAKE_PNG.to_vec())
    }

    async fn close(&self) -> Result<(), DriverError> {
        self.calls.lock().unwrap().push(FakeCall::Close);
        if let Some(message) = &self.close_error {
            return Err(DriverError::Close(message.clone()));
        }
        self.open_pages.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }
}
