#![allow(dead_code)]

use std::path::{Path, PathBuf};

use tokio::sync::mpsc::UnboundedReceiver;
use treewatch::fs::mock::MockFileSystem;
use treewatch::{WatchEvent, Watcher, WatcherOptions};

pub use treewatch_test_utils::*;

/// A watcher wired to an in-memory tree and a scriptable primitive.
pub struct FakeSetup {
    pub watcher: Watcher,
    pub events: UnboundedReceiver<WatchEvent>,
    pub fs: MockFileSystem,
    pub primitive: FakePrimitive,
}

pub fn fake_watcher(options: WatcherOptions, fs: MockFileSystem) -> FakeSetup {
    init_tracing();
    let primitive = FakePrimitive::backed_by(fs.clone());
    let watcher = Watcher::builder(options)
        .primitive(primitive.clone())
        .walker(fs.clone())
        .classifier(fs.clone())
        .spawn()
        .expect("spawn watcher");
    let events = watcher.subscribe();
    FakeSetup {
        watcher,
        events,
        fs,
        primitive,
    }
}

pub fn p(s: &str) -> PathBuf {
    PathBuf::from(s)
}

pub fn is_change_at(event: &WatchEvent, kind: treewatch::EventKind, path: &Path) -> bool {
    event.kind() == kind && event.path() == path
}

/// Poll `cond` until it holds, yielding to the manager in between.
pub async fn eventually(mut cond: impl AsyncFnMut() -> bool) {
    with_timeout(async {
        loop {
            if cond().await {
                return;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
    })
    .await
}
