//! CDP-backed production driver
//!
//! Drives Chromium over the `DevTools` protocol. Every launch gets its own
//! browser process with a throwaway profile directory, which is what keeps
//! sessions invisible to each other. Firefox and WebKit do not speak CDP,
//! so launches for them are refused up front.

use super::{BrowserDriver, DriverError, DriverPage, Engine, EngineOptions, ViewportSize};
use async_trait::async_trait;
use chromiumoxide::{
    browser::{Browser, BrowserConfig},
    cdp::browser_protocol::page::CaptureScreenshotFormat,
    element::Element,
    fetcher::{BrowserFetcher, BrowserFetcherOptions},
    page::ScreenshotParams,
    Page,
};
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// Viewport applied when `engineOptions.viewport` is absent.
const DEFAULT_VIEWPORT: ViewportSize = ViewportSize {
    width: 1920,
    height: 1080,
};

/// User agent applied when `engineOptions.userAgent` is absent.
const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Flags passed to every launch, ahead of any `engineOptions.args` extras.
/// `--no-sandbox` is applied through the config builder.
const LAUNCH_ARGS: &[&str] = &[
    "--disable-dev-shm-usage",
    "--disable-setuid-sandbox",
    "--disable-gpu",
    "--disable-extensions",
    "--no-first-run",
    "--disable-default-apps",
];

/// Poll interval while waiting for a selector to match.
const ELEMENT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Launches Chromium processes over CDP.
#[derive(Debug, Default)]
pub struct CdpDriver;

impl CdpDriver {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl BrowserDriver for CdpDriver {
    async fn launch(
        &self,
        engine: Engine,
        headless: bool,
        options: &EngineOptions,
    ) -> Result<Box<dyn DriverPage>, DriverError> {
        if engine != Engine::Chromium {
            return Err(DriverError::Launch(format!(
                "engine '{engine}' is not supported by the CDP driver (chromium only)"
            )));
        }

        let session = CdpSession::launch(headless, options).await?;
        Ok(Box::new(session))
    }
}

/// One Chromium process with its event loop and a single open page.
struct CdpSession {
    /// `None` once the browser has been closed.
    browser: Mutex<Option<Browser>>,
    handler_task: JoinHandle<()>,
    page: Page,
    profile_dir: PathBuf,
}

impl CdpSession {
    /// Launch a browser and open its page.
    ///
    /// Tries system Chrome first (zero download). On failure, downloads a
    /// compatible Chromium via `BrowserFetcher` and caches it for future
    /// runs.
    async fn launch(headless: bool, options: &EngineOptions) -> Result<Self, DriverError> {
        let first = match Self::launch_with_executable(headless, options, None).await {
            Ok(session) => return Ok(session),
            Err(e) => e,
        };
        tracing::info!("System Chrome not available ({first}), trying fetcher...");

        let cache_dir = fetcher_cache_dir();
        std::fs::create_dir_all(&cache_dir).map_err(|e| {
            DriverError::Launch(format!(
                "failed to create cache dir {}: {e}",
                cache_dir.display()
            ))
        })?;

        let fetcher_opts = BrowserFetcherOptions::builder()
            .with_path(&cache_dir)
            .build()
            .map_err(|e| DriverError::Launch(format!("fetcher config error: {e}")))?;

        let fetcher = BrowserFetcher::new(fetcher_opts);
        let info = fetcher
            .fetch()
            .await
            .map_err(|e| DriverError::Launch(format!("chromium download failed: {e:#}")))?;

        tracing::info!("Using Chromium at {:?}", info.executable_path);

        Self::launch_with_executable(headless, options, Some(&info.executable_path)).await
    }

    async fn launch_with_executable(
        headless: bool,
        options: &EngineOptions,
        executable: Option<&Path>,
    ) -> Result<Self, DriverError> {
        let profile_dir =
            std::env::temp_dir().join(format!("browserd-profile-{}", uuid::Uuid::new_v4()));
        let config = browser_config(headless, options, &profile_dir, executable)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| DriverError::Launch(e.to_string()))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::warn!("CDP handler error: {e}");
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| DriverError::Launch(e.to_string()))?;

        let user_agent = options.user_agent.as_deref().unwrap_or(DEFAULT_USER_AGENT);
        page.set_user_agent(user_agent)
            .await
            .map_err(|e| DriverError::Launch(e.to_string()))?;

        Ok(Self {
            browser: Mutex::new(Some(browser)),
            handler_task,
            page,
            profile_dir,
        })
    }

    /// Poll for a selector until it matches. Callers bound this with their
    /// own timeout, so the loop itself never gives up.
    async fn wait_for_element(&self, selector: &str) -> Result<Element, DriverError> {
        loop {
            match self.page.find_element(selector).await {
                Ok(element) => return Ok(element),
                Err(_) => tokio::time::sleep(ELEMENT_POLL_INTERVAL).await,
            }
        }
    }
}

#[async_trait]
impl DriverPage for CdpSession {
    async fn navigate(&self, url: &str) -> Result<String, DriverError> {
        self.page
            .goto(url)
            .await
            .map_err(|e| DriverError::Navigation(e.to_string()))?;

        // Best-effort settle: the navigation itself already succeeded.
        let _ = self.page.wait_for_navigation().await;

        Ok(self
            .page
            .url()
            .await
            .ok()
            .flatten()
            .unwrap_or_else(|| url.to_string()))
    }

    async fn click(&self, selector: &str) -> Result<(), DriverError> {
        let element = self.wait_for_element(selector).await?;
        element
            .click()
            .await
            .map_err(|e| DriverError::Interaction(e.to_string()))?;
        Ok(())
    }

    async fn fill(&self, selector: &str, text: &str) -> Result<(), DriverError> {
        let element = self.wait_for_element(selector).await?;

        // Click to focus, clear whatever is there, then type real key events.
        element
            .click()
            .await
            .map_err(|e| DriverError::Interaction(e.to_string()))?;

        let sel = serde_json::to_string(selector)
            .map_err(|e| DriverError::Interaction(e.to_string()))?;
        let clear = format!(
            "(() => {{ const el = document.querySelector({sel}); \
             if (el && 'value' in el) {{ el.value = ''; \
             el.dispatchEvent(new Event('input', {{ bubbles: true }})); }} }})()"
        );
        self.page
            .evaluate(clear)
            .await
            .map_err(|e| DriverError::Interaction(e.to_string()))?;

        element
            .type_str(text)
            .await
            .map_err(|e| DriverError::Interaction(e.to_string()))?;
        Ok(())
    }

    async fn read_text(&self, selector: &str) -> Result<Option<String>, DriverError> {
        let element = self.wait_for_element(selector).await?;
        element
            .inner_text()
            .await
            .map_err(|e| DriverError::Interaction(e.to_string()))
    }

    async fn screenshot(&self, full_page: bool) -> Result<Vec<u8>, DriverError> {
        let params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .full_page(full_page)
            .build();

        self.page
            .screenshot(params)
            .await
            .map_err(|e| DriverError::Screenshot(e.to_string()))
    }

    async fn close(&self) -> Result<(), DriverError> {
        let taken = self.browser.lock().await.take();
        let result = match taken {
            Some(mut browser) => browser
                .close()
                .await
                .map(|_| ())
                .map_err(|e| DriverError::Close(e.to_string())),
            None => Ok(()),
        };

        self.handler_task.abort();

        // Profile dirs are throwaway; a leftover one only wastes disk.
        if let Err(e) = tokio::fs::remove_dir_all(&self.profile_dir).await {
            tracing::debug!(
                dir = %self.profile_dir.display(),
                "Could not remove profile dir: {e}"
            );
        }

        result
    }
}

/// Build a `BrowserConfig` with the launch defaults merged under
/// `engineOptions`, an isolated profile dir, and an optional explicit
/// executable path.
fn browser_config(
    headless: bool,
    options: &EngineOptions,
    profile_dir: &Path,
    executable: Option<&Path>,
) -> Result<BrowserConfig, DriverError> {
    // Remove a stale profile dir to avoid Chrome SingletonLock conflicts.
    let _ = std::fs::remove_dir_all(profile_dir);

    let viewport = options.viewport.unwrap_or(DEFAULT_VIEWPORT);

    let mut builder = BrowserConfig::builder()
        .no_sandbox()
        .user_data_dir(profile_dir)
        .viewport(chromiumoxide::handler::viewport::Viewport {
            width: viewport.width,
            height: viewport.height,
            device_scale_factor: Some(1.0),
            emulating_mobile: false,
            is_landscape: true,
            has_touch: false,
        });

    builder = if headless {
        builder.new_headless_mode()
    } else {
        builder.with_head()
    };

    for arg in LAUNCH_ARGS {
        builder = builder.arg(*arg);
    }
    for arg in &options.args {
        builder = builder.arg(arg);
    }

    if let Some(path) = executable {
        builder = builder.chrome_executable(path);
    }

    builder
        .build()
        .map_err(DriverError::Launch)
}

fn fetcher_cache_dir() -> PathBuf {
    let base = std::env::var("HOME").map_or_else(|_| std::env::temp_dir(), PathBuf::from);
    base.join(".cache/browserd/chromium")
}
