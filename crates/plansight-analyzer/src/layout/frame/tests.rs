use super::*;
use pretty_assertions::assert_eq;

#[test]
fn test_request_replaces_pending() {
    let mut frames = FrameScheduler::new();
    assert!(!frames.is_pending());

    let first = frames.request();
    let second = frames.request();
    let third = frames.request();

    assert_ne!(first, second);
    assert_ne!(second, third);
    assert_eq!(frames.take(), Some(third));
}

#[test]
fn test_take_consumes_request() {
    let mut frames = FrameScheduler::new();
    let token = frames.request();

    assert_eq!(frames.take(), Some(token));
    assert_eq!(frames.take(), None);
    assert!(!frames.is_pending());
}

#[test]
fn test_cancel() {
    let mut frames = FrameScheduler::new();
    assert_eq!(frames.cancel(), None);

    frames.request();
    assert!(frames.cancel().is_some());
    assert!(!frames.is_pending());
}
