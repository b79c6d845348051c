use std::time::Duration;

use tokio::sync::mpsc::UnboundedReceiver;
use treewatch::WatchEvent;

/// Next event, or panic after 5 seconds.
pub async fn next_event(rx: &mut UnboundedReceiver<WatchEvent>) -> WatchEvent {
    crate::with_timeout(rx.recv())
        .await
        .expect("event stream ended")
}

/// Skip events until one satisfies `pred`; panic after 5 seconds.
pub async fn next_matching(
    rx: &mut UnboundedReceiver<WatchEvent>,
    pred: impl Fn(&WatchEvent) -> bool,
) -> WatchEvent {
    crate::with_timeout(async {
        loop {
            match rx.recv().await {
                Some(event) if pred(&event) => return event,
                Some(_) => continue,
                None => panic!("event stream ended before a matching event"),
            }
        }
    })
    .await
}

/// Collect events up to and including the first one satisfying `pred`.
pub async fn collect_until(
    rx: &mut UnboundedReceiver<WatchEvent>,
    pred: impl Fn(&WatchEvent) -> bool,
) -> Vec<WatchEvent> {
    crate::with_timeout(async {
        let mut seen = Vec::new();
        loop {
            match rx.recv().await {
                Some(event) => {
                    let done = pred(&event);
                    seen.push(event);
                    if done {
                        return seen;
                    }
                }
                None => panic!("event stream ended; got {seen:?}"),
            }
        }
    })
    .await
}

/// Assert nothing arrives within `window`.
pub async fn assert_quiet(rx: &mut UnboundedReceiver<WatchEvent>, window: Duration) {
    if let Ok(Some(event)) = tokio::time::timeout(window, rx.recv()).await {
        panic!("expected no events, got {event:?}");
    }
}
