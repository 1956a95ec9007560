//! Background model loading.
//!
//! A [`ModelLoad`] pairs a future that fetches and decodes a glTF asset with the
//! receiving ends the event loop polls once per frame. The future never touches
//! the scene: it reports [`LoadProgress`] over an unbounded channel and its
//! terminal result over a one-shot channel. GPU upload happens on the event
//! loop thread once the result arrives.

use futures::{
    channel::{mpsc, oneshot},
    future::{AbortHandle, Abortable, Aborted},
};
use thiserror::Error;

use crate::resources::{self, AssetSource, ModelAsset};

/// Bytes of a model that have arrived so far.
///
/// `total` covers the glTF document plus every external buffer and base colour
/// image it references. It is known once the document is parsed and only grows
/// if a resource turns out larger than announced.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LoadProgress {
    pub loaded: u64,
    pub total: u64,
}

impl LoadProgress {
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.loaded.min(self.total) as f64 / self.total as f64 * 100.0
    }

    pub fn is_complete(&self) -> bool {
        self.total > 0 && self.loaded >= self.total
    }
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to fetch {url}: {message}")]
    Fetch { url: String, message: String },
    #[error("invalid glTF document {path}: {source}")]
    Gltf {
        path: String,
        #[source]
        source: gltf::Error,
    },
    #[error("failed to decode image {name}: {source}")]
    Image {
        name: String,
        #[source]
        source: image::ImageError,
    },
    #[error("buffer {index} is missing or shorter than declared")]
    MissingBuffer { index: usize },
    #[error("unsupported resource uri {0}")]
    UnsupportedUri(String),
    #[error("model load was cancelled")]
    Cancelled,
}

/// Receiving side of a model load running elsewhere.
pub struct ModelLoad {
    path: String,
    progress: mpsc::UnboundedReceiver<LoadProgress>,
    result: oneshot::Receiver<Result<ModelAsset, LoadError>>,
    abort: AbortHandle,
    latest: Option<LoadProgress>,
    finished: bool,
}

impl ModelLoad {
    /// Create the load and the future doing the work. The caller decides where
    /// the future runs (a tokio runtime natively, the browser's microtask queue
    /// on the web).
    pub fn new(
        source: AssetSource,
        path: impl Into<String>,
    ) -> (Self, impl std::future::Future<Output = ()>) {
        let path = path.into();
        let (progress_tx, progress_rx) = mpsc::unbounded();
        let (result_tx, result_rx) = oneshot::channel();
        let (abort, registration) = AbortHandle::new_pair();

        let task_path = path.clone();
        let task = async move {
            let fetch = Abortable::new(
                resources::fetch_model(&source, &task_path, progress_tx),
                registration,
            );
            let result = match fetch.await {
                Ok(result) => result,
                Err(Aborted) => Err(LoadError::Cancelled),
            };
            if result_tx.send(result).is_err() {
                log::debug!("Nobody is waiting for {task_path} anymore");
            }
        };

        let load = Self {
            path,
            progress: progress_rx,
            result: result_rx,
            abort,
            latest: None,
            finished: false,
        };
        (load, task)
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Drain pending progress reports. Returns the newest one if anything arrived.
    pub fn poll_progress(&mut self) -> Option<LoadProgress> {
        let mut newest = None;
        while let Ok(progress) = self.progress.try_recv() {
            newest = Some(progress);
        }
        if newest.is_some() {
            self.latest = newest;
        }
        newest
    }

    pub fn latest_progress(&self) -> Option<LoadProgress> {
        self.latest
    }

    /// The terminal result, handed out exactly once.
    pub fn try_result(&mut self) -> Option<Result<ModelAsset, LoadError>> {
        if self.finished {
            return None;
        }
        match self.result.try_recv() {
            Ok(None) => None,
            Ok(Some(result)) => {
                self.finished = true;
                Some(result)
            }
            // the task was dropped before it could answer
            Err(oneshot::Canceled) => {
                self.finished = true;
                Some(Err(LoadError::Cancelled))
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn cancel(&self) {
        self.abort.abort();
    }
}
