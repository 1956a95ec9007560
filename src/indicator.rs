//! The loading indicator shown while the model streams in.

use crate::loader::{LoadError, LoadProgress};

pub const LOAD_FAILED_MESSAGE: &str = "Failed to load model";

pub trait ProgressIndicator {
    fn set_progress(&mut self, progress: LoadProgress);

    fn hide(&mut self);

    fn show_error(&mut self, message: &str);
}

/// Hand a finished load to `attach` and then settle `indicator` on the outcome.
///
/// The indicator is hidden only once `attach` succeeded. A failed fetch or a
/// failed attach shows [`LOAD_FAILED_MESSAGE`]; a cancelled load leaves it
/// untouched. Returns whatever `attach` produced.
pub fn finish_load<T, R>(
    indicator: &mut dyn ProgressIndicator,
    path: &str,
    result: Result<T, LoadError>,
    attach: impl FnOnce(T) -> anyhow::Result<R>,
) -> Option<R> {
    let attached = match result {
        Ok(asset) => attach(asset),
        Err(LoadError::Cancelled) => {
            log::info!("Model load of {path} was cancelled");
            return None;
        }
        Err(err) => Err(err.into()),
    };
    match attached {
        Ok(value) => {
            indicator.hide();
            log::info!("Loaded model {path}");
            Some(value)
        }
        Err(err) => {
            log::error!("Failed to load model {path}: {err:#}");
            indicator.show_error(LOAD_FAILED_MESSAGE);
            None
        }
    }
}

/// Indicator without a DOM. Keeps its state and logs changes.
#[derive(Debug, Clone, PartialEq)]
pub struct LogIndicator {
    visible: bool,
    progress: Option<LoadProgress>,
    error: Option<String>,
}

impl Default for LogIndicator {
    fn default() -> Self {
        Self {
            visible: true,
            progress: None,
            error: None,
        }
    }
}

impl LogIndicator {
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn progress(&self) -> Option<LoadProgress> {
        self.progress
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

impl ProgressIndicator for LogIndicator {
    fn set_progress(&mut self, progress: LoadProgress) {
        log::info!("Loading model: {:.0}%", progress.percent());
        self.progress = Some(progress);
    }

    fn hide(&mut self) {
        self.visible = false;
    }

    fn show_error(&mut self, message: &str) {
        log::error!("{message}");
        self.visible = true;
        self.error = Some(message.to_string());
    }
}

#[cfg(target_arch = "wasm32")]
pub use web::DomIndicator;

#[cfg(target_arch = "wasm32")]
mod web {
    use wasm_bindgen::JsCast;

    use super::ProgressIndicator;
    use crate::loader::LoadProgress;

    /// Drives the page's `#progress-container` element.
    pub struct DomIndicator {
        element_id: String,
    }

    impl DomIndicator {
        pub fn new(element_id: &str) -> Self {
            Self {
                element_id: element_id.to_string(),
            }
        }

        fn element(&self) -> Option<web_sys::HtmlElement> {
            let element = web_sys::window()
                .and_then(|window| window.document())
                .and_then(|document| document.get_element_by_id(&self.element_id))
                .and_then(|element| element.dyn_into::<web_sys::HtmlElement>().ok());
            if element.is_none() {
                log::warn!("No #{} element on the page", self.element_id);
            }
            element
        }
    }

    impl Default for DomIndicator {
        fn default() -> Self {
            Self::new("progress-container")
        }
    }

    impl ProgressIndicator for DomIndicator {
        fn set_progress(&mut self, progress: LoadProgress) {
            if let Some(element) = self.element() {
                let percent = format!("{:.0}", progress.percent());
                if element.set_attribute("data-progress", &percent).is_err() {
                    log::warn!("Could not update the loading progress");
                }
            }
        }

        fn hide(&mut self) {
            if let Some(element) = self.element() {
                if element.style().set_property("display", "none").is_err() {
                    log::warn!("Could not hide #{}", self.element_id);
                }
            }
        }

        fn show_error(&mut self, message: &str) {
            log::error!("{message}");
            if let Some(element) = self.element() {
                element.set_text_content(Some(message));
                let _ = element.set_attribute("data-state", "error");
                // a hidden indicator has to come back to show the message
                if element.style().remove_property("display").is_err() {
                    log::warn!("Could not show #{}", self.element_id);
                }
            }
        }
    }
}
