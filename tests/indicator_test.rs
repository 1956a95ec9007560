use std::{cell::RefCell, rc::Rc};

use vitrine::{
    indicator::{LOAD_FAILED_MESSAGE, LogIndicator, ProgressIndicator, finish_load},
    loader::{LoadError, LoadProgress},
};

#[test]
fn should_start_visible_without_progress() {
    let indicator = LogIndicator::default();

    assert!(indicator.is_visible());
    assert_eq!(indicator.progress(), None);
    assert_eq!(indicator.error(), None);
}

#[test]
fn should_track_latest_progress() {
    let mut indicator = LogIndicator::default();

    indicator.set_progress(LoadProgress { loaded: 1, total: 3 });
    indicator.set_progress(LoadProgress { loaded: 2, total: 3 });

    assert_eq!(indicator.progress(), Some(LoadProgress { loaded: 2, total: 3 }));
    assert!(indicator.is_visible());
}

#[test]
fn should_hide_after_model_is_attached() {
    let mut indicator = LogIndicator::default();
    let result: Result<&str, LoadError> = Ok("chair");

    let attached = finish_load(&mut indicator, "chair/scene.gltf", result, |asset| Ok(asset.len()));

    assert_eq!(attached, Some(5));
    assert!(!indicator.is_visible());
    assert_eq!(indicator.error(), None);
}

#[test]
fn should_show_generic_message_on_failure() {
    let mut indicator = LogIndicator::default();
    let result: Result<(), LoadError> = Err(LoadError::MissingBuffer { index: 0 });

    let attached = finish_load(&mut indicator, "chair/scene.gltf", result, |_| -> anyhow::Result<()> {
        panic!("a failed fetch has nothing to attach")
    });

    assert_eq!(attached, None);
    assert!(indicator.is_visible());
    assert_eq!(indicator.error(), Some(LOAD_FAILED_MESSAGE));
    assert_eq!(LOAD_FAILED_MESSAGE, "Failed to load model");
}

#[test]
fn should_show_error_when_attaching_fetched_model_fails() {
    let mut indicator = LogIndicator::default();
    indicator.set_progress(LoadProgress { loaded: 3, total: 3 });
    let result: Result<(), LoadError> = Ok(());

    let attached = finish_load(&mut indicator, "chair/scene.gltf", result, |_| -> anyhow::Result<()> {
        anyhow::bail!("texture upload failed")
    });

    assert_eq!(attached, None);
    assert!(indicator.is_visible());
    assert_eq!(indicator.error(), Some(LOAD_FAILED_MESSAGE));
}

/// Indicator that writes what happens to it into a shared journal.
struct Journal(Rc<RefCell<Vec<&'static str>>>);

impl ProgressIndicator for Journal {
    fn set_progress(&mut self, _progress: LoadProgress) {
        self.0.borrow_mut().push("progress");
    }

    fn hide(&mut self) {
        self.0.borrow_mut().push("hide");
    }

    fn show_error(&mut self, _message: &str) {
        self.0.borrow_mut().push("error");
    }
}

#[test]
fn should_attach_before_hiding() {
    let entries = Rc::new(RefCell::new(Vec::new()));
    let mut indicator = Journal(entries.clone());
    let result: Result<(), LoadError> = Ok(());

    finish_load(&mut indicator, "chair/scene.gltf", result, |_| {
        entries.borrow_mut().push("attach");
        Ok(())
    });

    assert_eq!(*entries.borrow(), vec!["attach", "hide"]);
}

#[test]
fn should_leave_indicator_alone_when_cancelled() {
    let mut indicator = LogIndicator::default();
    indicator.set_progress(LoadProgress { loaded: 1, total: 2 });
    let before = indicator.clone();
    let result: Result<(), LoadError> = Err(LoadError::Cancelled);

    let attached = finish_load(&mut indicator, "chair/scene.gltf", result, |_| -> anyhow::Result<()> {
        panic!("a cancelled load has nothing to attach")
    });

    assert_eq!(attached, None);
    assert_eq!(indicator, before);
}

#[test]
fn should_describe_load_errors() {
    let error = LoadError::Fetch {
        url: "https://example.org/assets/scene.gltf".to_string(),
        message: "404 Not Found".to_string(),
    };

    assert_eq!(
        error.to_string(),
        "failed to fetch https://example.org/assets/scene.gltf: 404 Not Found"
    );
    assert_eq!(LoadError::Cancelled.to_string(), "model load was cancelled");
}
