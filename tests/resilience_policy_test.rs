//! Retry and skip policies driven the way a chunk loop drives them.

use batch_kernel::models::{Chunk, ExceptionClassFilter};
use batch_kernel::resilience::{
    ChunkError, ChunkPhase, ExceptionPolicyConfig, PolicyError, RetryPolicy,
    RetryProcessListener, RetryReadListener, SkipPolicy, SkipReadListener, SkipWriteListener,
    TypeHierarchy,
};
use parking_lot::Mutex;
use std::sync::Arc;

fn hierarchy() -> Arc<TypeHierarchy> {
    Arc::new(TypeHierarchy::standard())
}

fn io_error(message: &str) -> ChunkError {
    ChunkError::new("IoError", message)
}

fn retry_policy(limit: Option<u64>) -> RetryPolicy<u32> {
    RetryPolicy::new(
        hierarchy(),
        ExceptionPolicyConfig::new(vec!["IoError".to_string()], Vec::new(), limit),
        ExceptionPolicyConfig::default(),
    )
}

#[test]
fn test_retry_limit_absorbs_exactly_limit_failures() {
    let mut policy = retry_policy(Some(3));

    for attempt in 1..=3 {
        policy
            .handle_read_failure(io_error(&format!("attempt {attempt}")))
            .unwrap();
        assert_eq!(policy.retry_count(), attempt);
    }
    assert!(policy.is_retry_limit_reached());

    let err = policy.handle_read_failure(io_error("attempt 4")).unwrap_err();
    match err {
        PolicyError::NonRetryable { phase, source } => {
            assert_eq!(phase, ChunkPhase::Read);
            assert_eq!(source.message(), "attempt 4");
        }
        other => panic!("expected NonRetryable, got {other:?}"),
    }
    assert_eq!(policy.retry_count(), 3);
    assert_eq!(policy.last_error().map(ChunkError::message), Some("attempt 3"));
}

#[test]
fn test_zero_limit_never_retries() {
    let mut policy = retry_policy(Some(0));
    assert!(policy.handle_read_failure(io_error("first")).is_err());
    assert_eq!(policy.retry_count(), 0);
    assert!(policy.last_error().is_none());
}

#[test]
fn test_unlimited_retry_keeps_absorbing() {
    let mut policy = retry_policy(None);
    for _ in 0..10_000 {
        policy.handle_process_failure(io_error("flaky"), &1).unwrap();
    }
    assert_eq!(policy.retry_count(), 10_000);
    assert!(!policy.is_retry_limit_reached());
    assert_eq!(policy.retry_phase(), Some(ChunkPhase::Process));
}

#[test]
fn test_non_retryable_error_is_reraised_without_counting() {
    let mut policy = retry_policy(Some(5));
    let err = policy
        .handle_write_failure(ChunkError::new("ValidationError", "bad row"), &[1, 2])
        .unwrap_err();
    assert_eq!(err.phase(), Some(ChunkPhase::Write));
    assert_eq!(err.chunk_error().map(ChunkError::type_name), Some("ValidationError"));
    assert_eq!(policy.retry_count(), 0);
}

#[test]
fn test_retry_listeners_run_in_registration_order() {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let mut policy = retry_policy(None);

    for name in ["first", "second", "third"] {
        let calls = calls.clone();
        let listener = move |item: &u32, error: &ChunkError| -> anyhow::Result<()> {
            calls
                .lock()
                .push(format!("{name}:{item}:{}", error.message()));
            Ok(())
        };
        policy.add_process_listener(Arc::new(listener) as Arc<dyn RetryProcessListener<u32>>);
    }

    policy.handle_process_failure(io_error("boom"), &7).unwrap();

    assert_eq!(
        *calls.lock(),
        vec!["first:7:boom", "second:7:boom", "third:7:boom"]
    );
}

#[test]
fn test_listener_error_propagates_after_count_is_recorded() {
    let second_called = Arc::new(Mutex::new(false));
    let mut policy = retry_policy(Some(10));

    let failing = |_: &ChunkError| -> anyhow::Result<()> { anyhow::bail!("audit log unavailable") };
    let flag = second_called.clone();
    let after = move |_: &ChunkError| -> anyhow::Result<()> {
        *flag.lock() = true;
        Ok(())
    };
    policy.add_read_listener(Arc::new(failing) as Arc<dyn RetryReadListener>);
    policy.add_read_listener(Arc::new(after) as Arc<dyn RetryReadListener>);

    let err = policy.handle_read_failure(io_error("disk")).unwrap_err();

    assert!(matches!(err, PolicyError::Listener(_)));
    assert!(err.to_string().contains("audit log unavailable"));
    assert_eq!(policy.retry_count(), 1);
    assert_eq!(policy.retry_phase(), Some(ChunkPhase::Read));
    assert!(!*second_called.lock());
}

#[test]
fn test_rollback_follows_no_rollback_classes() {
    let mut chunk = Chunk::default();
    chunk.retryable_exception_classes = Some(ExceptionClassFilter::including(["Error"]));
    chunk.no_rollback_exception_classes =
        Some(ExceptionClassFilter::including(["IoError"]).excluding(["TimeoutError"]));
    let policy: RetryPolicy<u32> = RetryPolicy::from_chunk(hierarchy(), &chunk).unwrap();

    assert!(!policy.is_rollback(&io_error("socket")));
    assert!(policy.is_rollback(&ChunkError::new("TimeoutError", "slow")));
    assert!(policy.is_rollback(&ChunkError::new("DataError", "corrupt")));

    let no_classes: RetryPolicy<u32> = RetryPolicy::from_chunk(hierarchy(), &Chunk::default()).unwrap();
    assert!(no_classes.is_rollback(&io_error("socket")));
}

#[test]
fn test_negative_limit_is_rejected_when_parsing_chunk() {
    let mut chunk = Chunk::default();
    chunk.set_skip_limit("-2");
    assert!(SkipPolicy::<u32>::from_chunk(hierarchy(), &chunk).is_err());
}

#[test]
fn test_skip_policy_counts_and_notifies_write_listeners() {
    let skipped = Arc::new(Mutex::new(Vec::new()));
    let mut policy: SkipPolicy<u32> = SkipPolicy::new(
        hierarchy(),
        ExceptionPolicyConfig::new(vec!["DataError".to_string()], Vec::new(), Some(2)),
    );
    let sink = skipped.clone();
    let listener = move |items: &[u32], _: &ChunkError| -> anyhow::Result<()> {
        sink.lock().extend_from_slice(items);
        Ok(())
    };
    policy.add_write_listener(Arc::new(listener) as Arc<dyn SkipWriteListener<u32>>);

    policy
        .handle_write_with_items_failure(ChunkError::new("DataError", "bad"), &[1, 2])
        .unwrap();
    policy
        .handle_write_with_items_failure(ChunkError::new("ValidationError", "bad"), &[3])
        .unwrap();
    let err = policy
        .handle_write_with_items_failure(ChunkError::new("DataError", "bad"), &[4])
        .unwrap_err();

    assert!(matches!(err, PolicyError::NonSkippable { phase: ChunkPhase::Write, .. }));
    assert_eq!(policy.skip_count(), 2);
    assert_eq!(*skipped.lock(), vec![1, 2, 3]);
}

/// A reader fails with a transient I/O error twice, recovers, then hits a corrupt
/// record. Retry absorbs the I/O failures; the corrupt record is not retryable and
/// falls through to skip.
#[test]
fn test_retry_then_skip_sequencing() {
    let mut chunk = Chunk::default();
    chunk.retryable_exception_classes = Some(ExceptionClassFilter::including(["IoError"]));
    chunk.skippable_exception_classes = Some(ExceptionClassFilter::including(["DataError"]));
    chunk.set_retry_limit("2");
    chunk.set_skip_limit("1");

    let mut retry: RetryPolicy<u32> = RetryPolicy::from_chunk(hierarchy(), &chunk).unwrap();
    let mut skip: SkipPolicy<u32> = SkipPolicy::from_chunk(hierarchy(), &chunk).unwrap();

    let skipped_reads = Arc::new(Mutex::new(0u32));
    let counter = skipped_reads.clone();
    let on_skip = move |_: &ChunkError| -> anyhow::Result<()> {
        *counter.lock() += 1;
        Ok(())
    };
    skip.add_read_listener(Arc::new(on_skip) as Arc<dyn SkipReadListener>);

    let failures = [
        io_error("timeout talking to store"),
        io_error("connection reset"),
        ChunkError::new("DataError", "record 17 is corrupt"),
        ChunkError::new("DataError", "record 18 is corrupt"),
    ];

    let mut outcomes = Vec::new();
    for failure in failures {
        let outcome = match retry.handle_read_failure(failure) {
            Ok(()) => "retried",
            Err(PolicyError::NonRetryable { source, .. }) => {
                match skip.handle_read_failure(source) {
                    Ok(()) => "skipped",
                    Err(_) => "failed",
                }
            }
            Err(other) => panic!("unexpected policy error: {other}"),
        };
        outcomes.push(outcome);
    }

    assert_eq!(outcomes, vec!["retried", "retried", "skipped", "failed"]);
    assert_eq!(retry.retry_count(), 2);
    assert_eq!(skip.skip_count(), 1);
    assert_eq!(*skipped_reads.lock(), 1);

    retry.reset();
    assert_eq!(retry.retry_count(), 0);
    assert!(retry.last_error().is_none());
    assert!(retry.retry_phase().is_none());
}

#[test]
fn test_unlimited_skip_sentinel_keeps_absorbing() {
    for sentinel in [
        batch_kernel::MIN_UNLIMITED.to_string(),
        batch_kernel::MIN_UNLIMITED_I32.to_string(),
    ] {
        let mut chunk = Chunk::default();
        chunk.skippable_exception_classes = Some(ExceptionClassFilter::including(["DataError"]));
        chunk.set_skip_limit(sentinel.as_str());

        let mut policy: SkipPolicy<u32> = SkipPolicy::from_chunk(hierarchy(), &chunk).unwrap();
        assert_eq!(policy.skip_limit(), None);

        for _ in 0..10_000 {
            policy
                .handle_read_failure(ChunkError::new("DataError", "malformed record"))
                .unwrap();
        }
        assert_eq!(policy.skip_count(), 10_000);
        assert!(!policy.is_skip_limit_reached());
    }
}

#[test]
fn test_unlimited_retry_sentinel_from_chunk() {
    for sentinel in [
        batch_kernel::MIN_UNLIMITED.to_string(),
        batch_kernel::MIN_UNLIMITED_I32.to_string(),
    ] {
        let mut chunk = Chunk::default();
        chunk.retryable_exception_classes = Some(ExceptionClassFilter::including(["IoError"]));
        chunk.set_retry_limit(sentinel.as_str());

        let mut policy: RetryPolicy<u32> = RetryPolicy::from_chunk(hierarchy(), &chunk).unwrap();
        assert_eq!(policy.retry_limit(), None);

        for _ in 0..1_000 {
            policy.handle_read_failure(io_error("flaky")).unwrap();
        }
        assert_eq!(policy.retry_count(), 1_000);
        assert!(!policy.is_retry_limit_reached());
    }
}
