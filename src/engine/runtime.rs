// src/engine/runtime.rs

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use futures::StreamExt;
use futures::stream::FuturesOrdered;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::fs::{Classification, PathClassifier};

use super::core::ManagerCore;
use super::{ClassifyJob, CoreCommand, CoreStep, ManagerEvent};

type Classifying = Pin<Box<dyn Future<Output = (ClassifyJob, Classification)> + Send>>;

/// Drives a [`ManagerCore`] from its event queue and performs the
/// classifications it asks for.
///
/// Classifications run concurrently, but their results are fed back in the
/// order they were requested, so changes reported by one directory reach
/// subscribers in the order the native watch reported them.
pub struct Runtime {
    core: ManagerCore,
    inbox: mpsc::UnboundedReceiver<ManagerEvent>,
    /// Yields `None` once every public handle is dropped.
    handles: mpsc::Receiver<()>,
    classifier: Arc<dyn PathClassifier>,
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("core", &self.core)
            .finish_non_exhaustive()
    }
}

impl Runtime {
    pub fn new(
        core: ManagerCore,
        inbox: mpsc::UnboundedReceiver<ManagerEvent>,
        handles: mpsc::Receiver<()>,
        classifier: Arc<dyn PathClassifier>,
    ) -> Self {
        Self {
            core,
            inbox,
            handles,
            classifier,
        }
    }

    /// Main event loop. Returns once the manager is closed, either
    /// explicitly or because nothing can observe it anymore.
    pub async fn run(mut self) {
        debug!("watch manager started");
        let mut classifying: FuturesOrdered<Classifying> = FuturesOrdered::new();
        let mut detached = false;

        loop {
            let step = tokio::select! {
                Some((job, outcome)) = classifying.next(), if !classifying.is_empty() => {
                    self.core.classified(job, outcome)
                }
                event = self.inbox.recv() => match event {
                    Some(event) => self.core.step(event),
                    None => break,
                },
                _ = self.handles.recv(), if !detached => {
                    detached = true;
                    CoreStep::idle()
                }
            };

            for command in step.commands {
                self.execute(command, &mut classifying);
            }

            if !step.keep_running {
                break;
            }
            if detached && self.unobserved() {
                info!("all handles dropped; closing watch manager");
                self.core.close();
                break;
            }
        }

        debug!("watch manager stopped");
    }

    /// No handle is left. A non-persistent manager stops right away; a
    /// persistent one keeps reporting while anyone still subscribes.
    fn unobserved(&mut self) -> bool {
        !self.core.options().persistent || !self.core.has_subscribers()
    }

    fn execute(&self, command: CoreCommand, classifying: &mut FuturesOrdered<Classifying>) {
        match command {
            CoreCommand::Classify(job) => {
                let stat = self.classifier.classify(job.path().to_path_buf());
                classifying.push_back(Box::pin(async move { (job, stat.await) }));
            }
        }
    }
}
