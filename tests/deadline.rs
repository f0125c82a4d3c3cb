use std::time::Duration;

use tokio_util::sync::CancellationToken;

use dns01_hook::{ChallengeError, Deadline};

#[tokio::test]
async fn unbounded_runs_to_completion() {
    let deadline = Deadline::unbounded();
    assert!(deadline.check().is_ok());
    assert_eq!(deadline.run(async { 7 }).await.unwrap(), 7);
}

#[tokio::test]
async fn zero_timeout_never_expires() {
    let deadline = Deadline::new(Some(Duration::ZERO), CancellationToken::new());
    tokio::time::sleep(Duration::from_millis(5)).await;
    assert!(deadline.check().is_ok());
}

#[tokio::test]
async fn expiry_interrupts_pending_work() {
    let deadline = Deadline::new(Some(Duration::from_millis(20)), CancellationToken::new());
    let err = deadline
        .run(std::future::pending::<()>())
        .await
        .unwrap_err();
    assert!(matches!(err, ChallengeError::DeadlineExceeded));
    assert!(matches!(
        deadline.check(),
        Err(ChallengeError::DeadlineExceeded)
    ));
}

#[tokio::test]
async fn cancellation_interrupts_sleep() {
    let token = CancellationToken::new();
    let deadline = Deadline::new(None, token.clone());
    let canceller = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(10)).await;
        token.cancel();
    });

    let err = deadline.sleep(Duration::from_secs(3600)).await.unwrap_err();

    assert!(matches!(err, ChallengeError::Cancelled));
    canceller.await.unwrap();
}

#[tokio::test]
async fn cancelled_deadline_rejects_new_work() {
    let token = CancellationToken::new();
    token.cancel();
    let deadline = Deadline::new(Some(Duration::from_secs(60)), token);
    assert!(matches!(deadline.check(), Err(ChallengeError::Cancelled)));
    assert!(deadline.run(async {}).await.is_err());
}
