// src/watch/watcher.rs

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use anyhow::anyhow;
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use crate::config::WatcherOptions;
use crate::engine::{ManagerCore, ManagerEvent, Query, Runtime};
use crate::errors::{DirError, Result, TreewatchError};
use crate::fs::{FsClassifier, PathClassifier};
use crate::types::{EventKind, WatchEvent};
use crate::watch::notify_backend::NotifyPrimitive;
use crate::watch::path_utils::absolutize;
use crate::watch::patterns::EntryFilter;
use crate::watch::primitive::WatchPrimitive;
use crate::watch::walker::{DirectoryWalker, WalkdirWalker};

/// Handle to a running watch-set manager.
///
/// Cheap to clone; every clone talks to the same manager. The manager runs
/// on the Tokio runtime it was spawned from until [`close`](Self::close) is
/// called, or until every handle is dropped (see
/// [`WatcherOptions::persistent`]).
#[derive(Debug, Clone)]
pub struct Watcher {
    tx: mpsc::UnboundedSender<ManagerEvent>,
    /// Never sent on; the manager notices when the last clone is dropped.
    _handle: mpsc::Sender<()>,
}

impl Watcher {
    /// Spawn a manager with the native backends.
    pub fn create(options: WatcherOptions) -> Result<Self> {
        Self::builder(options).spawn()
    }

    pub fn builder(options: WatcherOptions) -> WatcherBuilder {
        WatcherBuilder {
            options,
            primitive: None,
            walker: None,
            classifier: None,
        }
    }

    fn send(&self, event: ManagerEvent) -> Result<()> {
        self.tx.send(event).map_err(|_| TreewatchError::Closed)
    }

    /// Start watching the given roots. Already watched roots are left alone.
    ///
    /// The returned [`Ready`] resolves once every root emitted `watch`, or
    /// with the first root that could not be watched. Dropping it does not
    /// cancel anything.
    pub fn watch<I, P>(&self, paths: I) -> Ready
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let paths: Vec<PathBuf> = paths.into_iter().map(|p| absolutize(p.as_ref())).collect();
        let (ready, rx) = oneshot::channel();
        // On a closed manager the sender is dropped and `Ready` says so.
        let _ = self.send(ManagerEvent::Watch {
            paths,
            ready: Some(ready),
        });
        Ready { rx }
    }

    /// Stop watching the given roots and everything beneath them. A root
    /// that was unwatched is never rewatched automatically.
    pub fn unwatch<I, P>(&self, paths: I) -> Result<()>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let paths = paths.into_iter().map(|p| absolutize(p.as_ref())).collect();
        self.send(ManagerEvent::Unwatch { paths })
    }

    /// Receive every event. The stream ends when the watcher is closed.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<WatchEvent> {
        self.subscribe_with(None)
    }

    /// Receive only events of the given kinds.
    pub fn subscribe_to(&self, kinds: &[EventKind]) -> mpsc::UnboundedReceiver<WatchEvent> {
        self.subscribe_with(Some(kinds.to_vec()))
    }

    fn subscribe_with(&self, kinds: Option<Vec<EventKind>>) -> mpsc::UnboundedReceiver<WatchEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        let _ = self.send(ManagerEvent::Subscribe { kinds, tx });
        rx
    }

    async fn ask<T>(&self, query: impl FnOnce(oneshot::Sender<T>) -> Query) -> Result<T> {
        let (tx, rx) = oneshot::channel();
        self.send(ManagerEvent::Query(query(tx)))?;
        rx.await.map_err(|_| TreewatchError::Closed)
    }

    /// Whether `path` currently has a native watch.
    pub async fn is_watching(&self, path: impl AsRef<Path>) -> Result<bool> {
        let path = absolutize(path.as_ref());
        self.ask(|tx| Query::IsWatching(path, tx)).await
    }

    /// Every directory with a native watch, sorted.
    pub async fn watched_dirs(&self) -> Result<Vec<PathBuf>> {
        self.ask(Query::WatchedDirs).await
    }

    /// Every root currently tracked (watched, walking or waiting), sorted.
    pub async fn roots(&self) -> Result<Vec<PathBuf>> {
        self.ask(Query::Roots).await
    }

    /// Close every watch, cancel every timer and end every subscription.
    /// Calling it again (from any clone) is a no-op.
    pub async fn close(&self) -> Result<()> {
        let (done, rx) = oneshot::channel();
        if self.send(ManagerEvent::Close { done: Some(done) }).is_err() {
            return Ok(());
        }
        // The manager may already be shutting down, in which case the reply
        // is dropped; either way it is closed afterwards.
        let _ = rx.await;
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Replaceable parts of a watcher. Everything defaults to the native
/// implementation.
pub struct WatcherBuilder {
    options: WatcherOptions,
    primitive: Option<Arc<dyn WatchPrimitive>>,
    walker: Option<Arc<dyn DirectoryWalker>>,
    classifier: Option<Arc<dyn PathClassifier>>,
}

impl WatcherBuilder {
    pub fn primitive(mut self, primitive: impl WatchPrimitive + 'static) -> Self {
        self.primitive = Some(Arc::new(primitive));
        self
    }

    pub fn walker(mut self, walker: impl DirectoryWalker + 'static) -> Self {
        self.walker = Some(Arc::new(walker));
        self
    }

    pub fn classifier(mut self, classifier: impl PathClassifier + 'static) -> Self {
        self.classifier = Some(Arc::new(classifier));
        self
    }

    /// Start the manager task. Must be called from within a Tokio runtime.
    pub fn spawn(self) -> Result<Watcher> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| anyhow!("a watcher must be created inside a Tokio runtime: {e}"))?;

        let filter = EntryFilter::from_options(&self.options)?;
        let primitive: Arc<dyn WatchPrimitive> = match self.primitive {
            Some(primitive) => primitive,
            None => Arc::new(NotifyPrimitive::new()?),
        };
        let walker = self.walker.unwrap_or_else(|| Arc::new(WalkdirWalker));
        let classifier = self.classifier.unwrap_or_else(|| Arc::new(FsClassifier));

        let (tx, inbox) = mpsc::unbounded_channel();
        let (handle, handles) = mpsc::channel(1);

        debug!(options = ?self.options, "spawning watch manager");
        let core = ManagerCore::new(self.options, filter, primitive, walker, tx.clone());
        runtime.spawn(Runtime::new(core, inbox, handles, classifier).run());

        Ok(Watcher {
            tx,
            _handle: handle,
        })
    }
}

/// Resolves when a `watch()` request is fully established.
#[derive(Debug)]
pub struct Ready {
    rx: oneshot::Receiver<std::result::Result<(), DirError>>,
}

impl Future for Ready {
    type Output = Result<()>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx).poll(cx).map(|reply| match reply {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => Err(TreewatchError::Dir(err)),
            Err(_) => Err(TreewatchError::Closed),
        })
    }
}
