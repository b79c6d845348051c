// tests/rewatch_fake.rs
//
// Vanished roots coming back, on a paused clock.
#![cfg(unix)]

mod common;

use std::time::Duration;

use treewatch::fs::mock::MockFileSystem;
use treewatch::{ChangeKind, EventKind, WatchEvent, WatcherOptions};

use crate::common::{FakeSetup, assert_quiet, fake_watcher, next_event, next_matching, p};

const INTERVAL: Duration = Duration::from_secs(1);

async fn watched_root() -> FakeSetup {
    let fs = MockFileSystem::new();
    fs.add_dir("/w/root/a");
    let mut setup = fake_watcher(WatcherOptions::default().rewatch_interval(INTERVAL), fs);
    setup.watcher.watch(["/w/root"]).await.unwrap();
    assert_eq!(
        next_event(&mut setup.events).await,
        WatchEvent::Watch(p("/w/root"))
    );
    setup
}

/// Delete the root and let the manager notice through the root's own watch.
async fn remove_root(setup: &mut FakeSetup) {
    setup.fs.remove("/w/root");
    assert!(setup
        .primitive
        .emit("/w/root", ChangeKind::Structural, None));

    assert_eq!(
        next_event(&mut setup.events).await,
        WatchEvent::Unwatch(p("/w/root"))
    );
    let all = next_event(&mut setup.events).await;
    assert_eq!(all.kind(), EventKind::All);
    let removed = next_event(&mut setup.events).await;
    assert_eq!(removed.kind(), EventKind::Remove);
    assert_eq!(removed.path(), p("/w/root"));
    assert!(removed.change().unwrap().is_directory);
}

#[tokio::test(start_paused = true)]
async fn recreated_root_is_watched_again() {
    let mut setup = watched_root().await;
    remove_root(&mut setup).await;
    assert!(setup.primitive.open_dirs().is_empty());

    setup.fs.add_dir("/w/root/a/new");

    let ev = next_matching(&mut setup.events, |e| e.kind() == EventKind::Watch).await;
    assert_eq!(ev, WatchEvent::Watch(p("/w/root")));
    assert!(setup.watcher.is_watching("/w/root/a/new").await.unwrap());

    // And it reports changes again.
    setup.fs.add_file("/w/root/back.txt");
    assert!(setup.primitive.structural("/w/root", "back.txt"));
    let ev = next_matching(&mut setup.events, |e| e.kind() == EventKind::File).await;
    assert_eq!(ev.path(), p("/w/root/back.txt"));
}

#[tokio::test(start_paused = true)]
async fn missing_root_stays_registered_between_ticks() {
    let mut setup = watched_root().await;
    remove_root(&mut setup).await;
    let opens_before = setup.primitive.opened().len();

    tokio::time::sleep(INTERVAL * 5).await;

    assert_eq!(setup.watcher.roots().await.unwrap(), vec![p("/w/root")]);
    assert!(!setup.watcher.is_watching("/w/root").await.unwrap());
    assert_eq!(setup.primitive.opened().len(), opens_before);
    assert_quiet(&mut setup.events, INTERVAL).await;

    setup.fs.add_dir("/w/root");
    next_matching(&mut setup.events, |e| *e == WatchEvent::Watch(p("/w/root"))).await;
}

#[tokio::test(start_paused = true)]
async fn unwatched_root_is_never_rewatched() {
    let mut setup = watched_root().await;
    remove_root(&mut setup).await;

    setup.watcher.unwatch(["/w/root"]).unwrap();
    setup.fs.add_dir("/w/root");

    // Already reported as unwatched when it vanished: nothing more to say.
    assert_quiet(&mut setup.events, INTERVAL * 5).await;
    assert!(setup.watcher.roots().await.unwrap().is_empty());
    assert!(setup.primitive.open_dirs().is_empty());
}

#[tokio::test(start_paused = true)]
async fn explicit_watch_of_missing_root_fails_without_watch_error() {
    let mut setup = watched_root().await;
    remove_root(&mut setup).await;

    assert!(setup.watcher.watch(["/w/root"]).await.is_err());
    // Still waiting for it to come back.
    assert_eq!(setup.watcher.roots().await.unwrap(), vec![p("/w/root")]);

    setup.fs.add_dir("/w/root");
    let ev = next_event(&mut setup.events).await;
    assert_eq!(ev, WatchEvent::Watch(p("/w/root")));
}

#[tokio::test(start_paused = true)]
async fn explicit_watch_of_recreated_root_does_not_wait_for_a_tick() {
    let mut setup = watched_root().await;
    remove_root(&mut setup).await;

    setup.fs.add_dir("/w/root");
    let started = tokio::time::Instant::now();
    setup.watcher.watch(["/w/root"]).await.unwrap();

    assert!(started.elapsed() < INTERVAL);
    assert_eq!(
        next_event(&mut setup.events).await,
        WatchEvent::Watch(p("/w/root"))
    );
}

#[tokio::test(start_paused = true)]
async fn without_interval_a_vanished_root_is_dropped() {
    let fs = MockFileSystem::new();
    fs.add_dir("/w/root");
    let mut setup = fake_watcher(WatcherOptions::default(), fs);
    setup.watcher.watch(["/w/root"]).await.unwrap();
    next_event(&mut setup.events).await;

    remove_root(&mut setup).await;
    assert!(setup.watcher.roots().await.unwrap().is_empty());

    setup.fs.add_dir("/w/root");
    assert_quiet(&mut setup.events, INTERVAL * 5).await;
}
