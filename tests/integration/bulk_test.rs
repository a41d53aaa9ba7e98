// Bulk operations on a background thread with streamed progress

use qdesk::core::ops::bulk::{self, BulkStep, ProgressEvent};
use qdesk::core::ops::{OpOutcome, Status};

#[test]
fn test_progress_stream_and_summary() {
    let steps = vec![
        BulkStep::new("first", || OpOutcome::success("ok")),
        BulkStep::new("second", || panic!("step blew up")),
        BulkStep::detailed("third", || OpOutcome::warning("partial").with_detail(7u32)),
    ];
    let mut handle = bulk::spawn("mixed", steps).unwrap();

    let mut completed = Vec::new();
    let mut finished = None;
    while let Some(event) = handle.events.blocking_recv() {
        match event {
            ProgressEvent::Started { total, .. } => assert_eq!(total, 3),
            ProgressEvent::Step {
                completed: c,
                status,
                name,
                ..
            } => {
                if name == "second" {
                    assert_eq!(status, Status::Error);
                }
                completed.push(c);
            }
            ProgressEvent::Finished(summary) => finished = Some(summary),
        }
    }
    assert_eq!(completed, vec![1, 2, 3]);

    let summary = handle.join().unwrap();
    assert_eq!(Some(summary.clone()), finished);
    assert_eq!(summary.attempted, 3);
    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.status(), Status::Warning);
}

#[test]
fn test_closed_receiver_does_not_abort() {
    let steps = (0..4)
        .map(|i| BulkStep::new(format!("step{}", i), || OpOutcome::success("done")))
        .collect();
    let mut handle = bulk::spawn("unobserved", steps).unwrap();
    handle.events.close();

    let summary = handle.join().unwrap();
    assert_eq!(summary.succeeded, 4);
}
