//! Sends narrow viewports to a lighter fallback page.
//!
//! The width is checked once when the viewer is ready and again after every
//! burst of resizes has settled. The spacebar jumps to the fallback page at any
//! width. Time is passed in explicitly so the debounce can be driven by tests.

use instant::{Duration, Instant};
use winit::keyboard::{KeyCode, PhysicalKey};

use crate::config::RedirectConfig;

/// Access to the page the viewer is embedded in.
pub trait Navigator {
    /// Width of the document in logical pixels.
    fn client_width(&self) -> f64;

    fn current_path(&self) -> String;

    fn navigate(&mut self, href: &str);
}

/// Trailing-edge debounce: fires once `wait` after the last trigger.
#[derive(Clone, Debug, PartialEq)]
pub struct Debouncer {
    wait: Duration,
    deadline: Option<Instant>,
}

impl Debouncer {
    pub fn new(wait: Duration) -> Self {
        Self {
            wait,
            deadline: None,
        }
    }

    /// Restart the quiet period.
    pub fn trigger(&mut self, now: Instant) {
        self.deadline = Some(now + self.wait);
    }

    /// `true` exactly once when the quiet period has elapsed.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }
}

/// Whether `path` already points at `page`.
pub fn is_fallback_page(path: &str, page: &str) -> bool {
    let page = page.trim_start_matches('/');
    path == page || path.ends_with(&format!("/{page}"))
}

pub struct Redirector<N: Navigator> {
    config: RedirectConfig,
    navigator: N,
    debounce: Debouncer,
    evaluations: usize,
}

impl<N: Navigator> Redirector<N> {
    pub fn new(config: RedirectConfig, navigator: N) -> Self {
        let debounce = Debouncer::new(config.debounce);
        Self {
            config,
            navigator,
            debounce,
            evaluations: 0,
        }
    }

    /// Create a redirector and run the initial width check right away.
    pub fn start(config: RedirectConfig, navigator: N) -> Self {
        let mut redirector = Self::new(config, navigator);
        redirector.on_load();
        redirector
    }

    /// Initial check once the page has loaded. Returns whether it navigated.
    pub fn on_load(&mut self) -> bool {
        self.check_width()
    }

    pub fn on_resize(&mut self, now: Instant) {
        self.debounce.trigger(now);
    }

    /// Run the pending width check if its quiet period is over.
    pub fn poll(&mut self, now: Instant) -> bool {
        if self.debounce.poll(now) {
            self.check_width()
        } else {
            false
        }
    }

    pub fn on_key(&mut self, key: PhysicalKey) -> bool {
        if self.config.space_redirects && key == PhysicalKey::Code(KeyCode::Space) {
            log::info!("Space pressed, leaving for {}", self.config.fallback_page);
            self.navigator.navigate(&self.config.fallback_page);
            true
        } else {
            false
        }
    }

    /// Navigate to the fallback page if the document is narrower than the breakpoint.
    pub fn check_width(&mut self) -> bool {
        self.evaluations += 1;
        let width = self.navigator.client_width();
        if width >= self.config.breakpoint_width {
            return false;
        }
        if is_fallback_page(&self.navigator.current_path(), &self.config.fallback_page) {
            log::debug!("Width {width} is narrow but already on the fallback page");
            return false;
        }
        log::info!(
            "Width {width} is below {}, leaving for {}",
            self.config.breakpoint_width,
            self.config.fallback_page
        );
        self.navigator.navigate(&self.config.fallback_page);
        true
    }

    /// When the pending width check is due, if any.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.debounce.deadline()
    }

    /// Number of width checks run so far.
    pub fn evaluations(&self) -> usize {
        self.evaluations
    }

    pub fn cancel(&mut self) {
        self.debounce.cancel();
    }

    pub fn navigator(&self) -> &N {
        &self.navigator
    }

    pub fn navigator_mut(&mut self) -> &mut N {
        &mut self.navigator
    }
}

/// Navigator for the desktop window. There is no page to leave, so navigations
/// are logged and remembered.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DesktopNavigator {
    width: f64,
    path: String,
    history: Vec<String>,
}

impl DesktopNavigator {
    pub fn new(width: f64) -> Self {
        Self {
            width,
            path: "/index.html".to_string(),
            history: Vec::new(),
        }
    }

    pub fn set_width(&mut self, width: f64) {
        self.width = width;
    }

    pub fn history(&self) -> &[String] {
        &self.history
    }
}

impl Navigator for DesktopNavigator {
    fn client_width(&self) -> f64 {
        self.width
    }

    fn current_path(&self) -> String {
        self.path.clone()
    }

    fn navigate(&mut self, href: &str) {
        log::info!("Navigating to {href}");
        self.path = format!("/{}", href.trim_start_matches('/'));
        self.history.push(href.to_string());
    }
}

#[cfg(target_arch = "wasm32")]
pub use web::{BrowserNavigator, KeyListener};

#[cfg(target_arch = "wasm32")]
mod web {
    use wasm_bindgen::{JsCast, JsValue, closure::Closure};

    use super::Navigator;

    /// Reads and changes `window.location`.
    #[derive(Debug, Default)]
    pub struct BrowserNavigator;

    impl Navigator for BrowserNavigator {
        fn client_width(&self) -> f64 {
            web_sys::window()
                .and_then(|window| window.document())
                .and_then(|document| document.document_element())
                .map(|element| element.client_width() as f64)
                .unwrap_or_default()
        }

        fn current_path(&self) -> String {
            web_sys::window()
                .and_then(|window| window.location().pathname().ok())
                .unwrap_or_default()
        }

        fn navigate(&mut self, href: &str) {
            let Some(window) = web_sys::window() else {
                log::warn!("No window to navigate to {href}");
                return;
            };
            if let Err(err) = window.location().set_href(href) {
                log::warn!("Navigating to {href} failed: {err:?}");
            }
        }
    }

    /// Calls back on spacebar keydowns anywhere in the document. Detaches on drop.
    pub struct KeyListener {
        document: web_sys::Document,
        closure: Closure<dyn FnMut(web_sys::KeyboardEvent)>,
    }

    impl KeyListener {
        pub fn on_space(mut callback: impl FnMut() + 'static) -> Result<Self, JsValue> {
            let document = web_sys::window()
                .and_then(|window| window.document())
                .ok_or_else(|| JsValue::from_str("no document"))?;
            let closure = Closure::wrap(Box::new(move |event: web_sys::KeyboardEvent| {
                if event.code() == "Space" {
                    callback();
                }
            }) as Box<dyn FnMut(web_sys::KeyboardEvent)>);
            document
                .add_event_listener_with_callback("keydown", closure.as_ref().unchecked_ref())?;
            Ok(Self { document, closure })
        }
    }

    impl Drop for KeyListener {
        fn drop(&mut self) {
            let _ = self.document.remove_event_listener_with_callback(
                "keydown",
                self.closure.as_ref().unchecked_ref(),
            );
        }
    }
}
