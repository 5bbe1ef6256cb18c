//! Scenario tests for the lifecycle services over in-memory doubles.

mod support;

use std::sync::atomic::Ordering;

use support::{encode, push_payload, ConflictOnFirstWrite, Fixture, MemoryRecords, JOB_NAME};
use vtrans_lifecycle::{
    LifecycleError, MessageDisposition, ReconcileDisposition, ReconcileOutcome, RecordStore,
    StatusReconciler,
};
use vtrans_models::{JobId, JobState, TimeOffset, VideoId, VideoRecord, VideoStatus};

fn start() -> Option<TimeOffset> {
    Some(TimeOffset::new(100, 0))
}

fn end() -> Option<TimeOffset> {
    Some(TimeOffset::new(160, 500_000_000))
}

// ===== Submission =====

#[tokio::test]
async fn test_submit_creates_job_and_records_assignment() {
    let f = Fixture::new();
    let id = f.seed_uploaded("vid-1", "vid-1-clip.mp4").await;

    let job_id = f
        .submitter()
        .submit(&id, "gs://test-bucket/vid-1-clip.mp4", "gs://test-bucket/output/vid-1/")
        .await
        .expect("submit");

    assert_eq!(job_id, JobId::from("job-42"));

    let record = f.records.stored(&id).await.expect("record kept");
    assert_eq!(record.status, VideoStatus::Processing);
    assert_eq!(record.job_id, Some(JobId::from("job-42")));
    assert!(f.objects.contains("vid-1-clip.mp4").await);
}

#[tokio::test]
async fn test_submit_unknown_video_is_not_found() {
    let f = Fixture::new();

    let err = f
        .submitter()
        .submit(&VideoId::from("missing"), "gs://in", "gs://out/")
        .await
        .unwrap_err();

    assert!(matches!(err, LifecycleError::RecordNotFound(_)));
    assert_eq!(f.engine.created.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_submit_rejects_resubmission() {
    let f = Fixture::new();
    let (id, job_id) = f.seed_submitted("vid-1", "vid-1-clip.mp4", "job-7").await;

    let err = f
        .submitter()
        .submit(&id, "gs://in", "gs://out/")
        .await
        .unwrap_err();

    assert!(matches!(err, LifecycleError::Submission(_)));
    // Not a creation failure, so nothing was unwound.
    assert_eq!(f.engine.created.load(Ordering::SeqCst), 0);
    let record = f.records.stored(&id).await.expect("record kept");
    assert_eq!(record.job_id, Some(job_id));
    assert!(f.objects.contains("vid-1-clip.mp4").await);
}

#[tokio::test]
async fn test_submit_engine_failure_unwinds_upload() {
    let f = Fixture::new();
    f.engine.fail_create().await;
    let id = f.seed_uploaded("vid-1", "vid-1-clip.mp4").await;

    let err = f
        .submitter()
        .submit(&id, "gs://in", "gs://out/")
        .await
        .unwrap_err();

    assert!(matches!(err, LifecycleError::Submission(_)));
    assert!(f.records.stored(&id).await.is_none());
    assert!(!f.objects.contains("vid-1-clip.mp4").await);
}

#[tokio::test]
async fn test_submit_unnamed_job_unwinds_upload() {
    let f = Fixture::new();
    // Engine "succeeds" but the handle names no job.
    f.engine.set_create_name("").await;
    let id = f.seed_uploaded("vid-1", "vid-1-clip.mp4").await;

    let err = f
        .submitter()
        .submit(&id, "gs://in", "gs://out/")
        .await
        .unwrap_err();

    assert!(matches!(err, LifecycleError::Submission(_)));
    assert_eq!(f.engine.created.load(Ordering::SeqCst), 1);
    assert!(f.records.stored(&id).await.is_none());
    assert!(!f.objects.contains("vid-1-clip.mp4").await);
}

#[tokio::test]
async fn test_submit_assignment_failure_unwinds_upload() {
    let f = Fixture::new();
    f.records.fail_assign.store(true, Ordering::SeqCst);
    let id = f.seed_uploaded("vid-1", "vid-1-clip.mp4").await;

    let err = f
        .submitter()
        .submit(&id, "gs://in", "gs://out/")
        .await
        .unwrap_err();

    assert!(matches!(err, LifecycleError::Submission(_)));
    assert!(f.records.stored(&id).await.is_none());
    assert!(!f.objects.contains("vid-1-clip.mp4").await);
}

#[tokio::test]
async fn test_compensation_failures_do_not_mask_submission_error() {
    let f = Fixture::new();
    f.engine.fail_create().await;
    f.objects.fail_delete.store(true, Ordering::SeqCst);
    f.records.fail_delete.store(true, Ordering::SeqCst);
    let id = f.seed_uploaded("vid-1", "vid-1-clip.mp4").await;

    let err = f
        .submitter()
        .submit(&id, "gs://in", "gs://out/")
        .await
        .unwrap_err();

    // The submission error comes back, and the record delete was still
    // attempted after the object delete failed.
    assert!(matches!(err, LifecycleError::Submission(_)));
    assert_eq!(f.objects.delete_calls.load(Ordering::SeqCst), 1);
    assert_eq!(f.records.delete_calls.load(Ordering::SeqCst), 1);
    assert!(f.records.stored(&id).await.is_some());
}

// ===== Reconciliation =====

#[tokio::test]
async fn test_reconcile_applies_terminal_status_with_duration() {
    let f = Fixture::new();
    let (id, job_id) = f.seed_submitted("vid-1", "vid-1-clip.mp4", "job-42").await;

    let outcome = f
        .reconciler()
        .reconcile(&job_id, JobState::Succeeded, start(), end())
        .await
        .expect("reconcile");

    let record = match outcome {
        ReconcileOutcome::Applied(record) => record,
        other => panic!("expected Applied, got {other:?}"),
    };
    assert_eq!(record.status, VideoStatus::Succeeded);
    assert_eq!(record.process_duration_seconds, Some(60.5));

    let stored = f.records.stored(&id).await.expect("record kept");
    assert_eq!(stored.status, VideoStatus::Succeeded);
    assert_eq!(stored.process_duration_seconds, Some(60.5));
}

#[tokio::test]
async fn test_reconcile_duplicate_delivery_is_a_no_op() {
    let f = Fixture::new();
    let (id, job_id) = f.seed_submitted("vid-1", "vid-1-clip.mp4", "job-42").await;
    let reconciler = f.reconciler();

    reconciler
        .reconcile(&job_id, JobState::Succeeded, start(), end())
        .await
        .expect("first delivery");
    let outcome = reconciler
        .reconcile(&job_id, JobState::Succeeded, start(), end())
        .await
        .expect("duplicate delivery");

    assert!(matches!(outcome, ReconcileOutcome::Applied(_)));
    // The duplicate resolved without a second write.
    assert_eq!(f.records.apply_calls.load(Ordering::SeqCst), 1);
    let stored = f.records.stored(&id).await.expect("record kept");
    assert_eq!(stored.status, VideoStatus::Succeeded);
    assert_eq!(stored.process_duration_seconds, Some(60.5));
}

#[tokio::test]
async fn test_reconcile_late_duplicate_fills_missing_duration() {
    let f = Fixture::new();
    let (id, job_id) = f.seed_submitted("vid-1", "vid-1-clip.mp4", "job-42").await;
    let reconciler = f.reconciler();

    // First terminal observation arrived without timestamps.
    reconciler
        .reconcile(&job_id, JobState::Succeeded, None, None)
        .await
        .expect("first delivery");
    let stored = f.records.stored(&id).await.expect("record kept");
    assert_eq!(stored.process_duration_seconds, None);

    let outcome = reconciler
        .reconcile(&job_id, JobState::Succeeded, start(), end())
        .await
        .expect("duplicate with timestamps");

    assert!(matches!(outcome, ReconcileOutcome::Applied(_)));
    let stored = f.records.stored(&id).await.expect("record kept");
    assert_eq!(stored.status, VideoStatus::Succeeded);
    assert_eq!(stored.process_duration_seconds, Some(60.5));
}

#[tokio::test]
async fn test_reconcile_discards_late_non_terminal() {
    let f = Fixture::new();
    let (id, job_id) = f.seed_submitted("vid-1", "vid-1-clip.mp4", "job-42").await;
    let reconciler = f.reconciler();

    reconciler
        .reconcile(&job_id, JobState::Succeeded, start(), end())
        .await
        .expect("terminal delivery");
    let outcome = reconciler
        .reconcile(&job_id, JobState::Running, None, None)
        .await
        .expect("late delivery");

    let record = match outcome {
        ReconcileOutcome::Stale(record) => record,
        other => panic!("expected Stale, got {other:?}"),
    };
    assert_eq!(record.status, VideoStatus::Succeeded);

    let stored = f.records.stored(&id).await.expect("record kept");
    assert_eq!(stored.status, VideoStatus::Succeeded);
    assert_eq!(stored.process_duration_seconds, Some(60.5));
}

#[tokio::test]
async fn test_reconcile_unknown_job_is_not_found() {
    let f = Fixture::new();

    let outcome = f
        .reconciler()
        .reconcile(&JobId::from("job-nobody"), JobState::Succeeded, None, None)
        .await
        .expect("reconcile");

    assert!(matches!(outcome, ReconcileOutcome::NotFound));
}

#[tokio::test]
async fn test_reconcile_write_failure_surfaces() {
    let f = Fixture::new();
    let (_, job_id) = f.seed_submitted("vid-1", "vid-1-clip.mp4", "job-42").await;
    f.records.fail_apply.store(true, Ordering::SeqCst);

    let err = f
        .reconciler()
        .reconcile(&job_id, JobState::Running, None, None)
        .await
        .unwrap_err();

    assert!(matches!(err, LifecycleError::Firestore(_)));
}

#[tokio::test]
async fn test_reconcile_retries_after_losing_the_race() {
    let records = MemoryRecords::new();
    let id = VideoId::from("vid-1");
    let job_id = JobId::from("job-42");
    records
        .create(&VideoRecord::new(id.clone(), "url", "key"))
        .await
        .expect("seed record");
    records.assign_job(&id, &job_id).await.expect("seed assignment");

    // A rival non-terminal write lands just before our first conditional
    // write, so the terminal observation needs a second attempt.
    let store = ConflictOnFirstWrite::new(records.clone(), VideoStatus::Running);
    let reconciler = StatusReconciler::new(store);

    let outcome = reconciler
        .reconcile(&job_id, JobState::Succeeded, start(), end())
        .await
        .expect("reconcile");

    assert!(matches!(outcome, ReconcileOutcome::Applied(_)));
    // Rival write, failed conditional, successful retry.
    assert_eq!(records.apply_calls.load(Ordering::SeqCst), 3);
    let stored = records.stored(&id).await.expect("record kept");
    assert_eq!(stored.status, VideoStatus::Succeeded);
    assert_eq!(stored.process_duration_seconds, Some(60.5));
}

#[tokio::test]
async fn test_reconcile_race_lost_to_terminal_goes_stale() {
    let records = MemoryRecords::new();
    let id = VideoId::from("vid-1");
    let job_id = JobId::from("job-42");
    records
        .create(&VideoRecord::new(id.clone(), "url", "key"))
        .await
        .expect("seed record");
    records.assign_job(&id, &job_id).await.expect("seed assignment");

    // The rival write is terminal; after the conflict the re-read decides
    // our non-terminal observation is stale.
    let store = ConflictOnFirstWrite::new(records.clone(), VideoStatus::Succeeded);
    let reconciler = StatusReconciler::new(store);

    let outcome = reconciler
        .reconcile(&job_id, JobState::Running, None, None)
        .await
        .expect("reconcile");

    let record = match outcome {
        ReconcileOutcome::Stale(record) => record,
        other => panic!("expected Stale, got {other:?}"),
    };
    assert_eq!(record.status, VideoStatus::Succeeded);
    let stored = records.stored(&id).await.expect("record kept");
    assert_eq!(stored.status, VideoStatus::Succeeded);
}

#[tokio::test]
async fn test_concurrent_observers_never_lose_terminal_status() {
    let f = Fixture::new();
    let (id, job_id) = f.seed_submitted("vid-1", "vid-1-clip.mp4", "job-42").await;
    let push = f.reconciler();
    let poll = f.reconciler();

    let (pushed, polled) = tokio::join!(
        push.reconcile(&job_id, JobState::Succeeded, start(), end()),
        poll.reconcile(&job_id, JobState::Running, None, None),
    );

    pushed.expect("push reconcile");
    polled.expect("poll reconcile");

    // Whichever observer wrote first, the terminal status and its
    // duration survive.
    let stored = f.records.stored(&id).await.expect("record kept");
    assert_eq!(stored.status, VideoStatus::Succeeded);
    assert_eq!(stored.process_duration_seconds, Some(60.5));
}

// ===== Push handling =====

#[tokio::test]
async fn test_push_terminal_then_late_poll_goes_stale() {
    let f = Fixture::new();
    let id = f.seed_uploaded("vid-42", "vid-42-clip.mp4").await;
    f.submitter()
        .submit(&id, "gs://in", "gs://out/")
        .await
        .expect("submit");

    let payload = push_payload(JOB_NAME, "SUCCEEDED", Some((100, 0)), Some((160, 500_000_000)));
    assert_eq!(f.handler().handle(&payload).await, MessageDisposition::Ack);

    let stored = f.records.stored(&id).await.expect("record kept");
    assert_eq!(stored.status, VideoStatus::Succeeded);
    assert_eq!(stored.process_duration_seconds, Some(60.5));

    // A poll that races the engine's stale view still reports the stored
    // terminal state.
    f.engine.set_view(JobState::Running, None, None).await;
    let snapshot = f
        .poller()
        .poll(&JobId::from("job-42"))
        .await
        .expect("poll");
    assert_eq!(snapshot.video_id, id);
    assert_eq!(snapshot.status, VideoStatus::Succeeded);
    assert_eq!(snapshot.process_duration_seconds, Some(60.5));
    assert_eq!(snapshot.reconcile, ReconcileDisposition::Stale);
}

#[tokio::test]
async fn test_push_malformed_payload_is_settled() {
    let f = Fixture::new();
    let handler = f.handler();

    assert_eq!(
        handler.handle("not base64!!").await,
        MessageDisposition::Ack
    );
    assert_eq!(
        handler.handle(&encode("{\"whatever\":true}")).await,
        MessageDisposition::Ack
    );
    // Well-formed notification whose resource name carries no job ID.
    let unnamed = push_payload("projects/p/locations/l/jobs/", "SUCCEEDED", None, None);
    assert_eq!(handler.handle(&unnamed).await, MessageDisposition::Ack);
}

#[tokio::test]
async fn test_push_unknown_job_is_settled() {
    let f = Fixture::new();

    let payload = push_payload(JOB_NAME, "SUCCEEDED", Some((100, 0)), Some((160, 0)));
    assert_eq!(f.handler().handle(&payload).await, MessageDisposition::Ack);
}

#[tokio::test]
async fn test_push_write_failure_is_redelivered() {
    let f = Fixture::new();
    f.seed_submitted("vid-1", "vid-1-clip.mp4", "job-42").await;
    f.records.fail_apply.store(true, Ordering::SeqCst);

    let payload = push_payload(JOB_NAME, "RUNNING", None, None);
    assert_eq!(f.handler().handle(&payload).await, MessageDisposition::Nack);
}

// ===== Polling =====

#[tokio::test]
async fn test_poll_applies_engine_view() {
    let f = Fixture::new();
    let (id, job_id) = f.seed_submitted("vid-1", "vid-1-clip.mp4", "job-42").await;
    f.engine
        .set_view(JobState::Succeeded, start(), end())
        .await;

    let snapshot = f.poller().poll(&job_id).await.expect("poll");

    assert_eq!(snapshot.video_id, id);
    assert_eq!(snapshot.job_id, job_id);
    assert_eq!(snapshot.status, VideoStatus::Succeeded);
    assert_eq!(snapshot.process_duration_seconds, Some(60.5));
    assert_eq!(snapshot.reconcile, ReconcileDisposition::Applied);
}

#[tokio::test]
async fn test_poll_surfaces_engine_failures() {
    let f = Fixture::new();
    f.seed_submitted("vid-1", "vid-1-clip.mp4", "job-42").await;
    // No view configured; the engine reports the job missing.

    let err = f.poller().poll(&JobId::from("job-42")).await.unwrap_err();

    assert!(matches!(err, LifecycleError::Engine(_)));
}

#[tokio::test]
async fn test_poll_unknown_record_is_not_found() {
    let f = Fixture::new();
    f.engine.set_view(JobState::Running, None, None).await;

    let err = f.poller().poll(&JobId::from("job-42")).await.unwrap_err();

    assert!(matches!(err, LifecycleError::RecordNotFound(_)));
}
