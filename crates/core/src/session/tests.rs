use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use ideaflow_model::ModelMessage;
use ideaflow_test_model::{PresetFailure, PresetResponse, TestModelProvider};
use tokio::time::{sleep, timeout};

use super::*;
use crate::conversation::Speaker;
use crate::prompts::{self, APOLOGY};

fn build(model_provider: &TestModelProvider) -> ConversationSession {
    SessionBuilder::with_model_provider(model_provider.clone()).build()
}

/// Waits until the session is idle with exactly `turns` visible turns.
async fn settle(
    session: &ConversationSession,
    turns: usize,
) -> SessionSnapshot {
    let mut rx = session.subscribe();
    let snapshot = timeout(
        Duration::from_secs(60),
        rx.wait_for(|s| !s.is_busy() && s.transcript().len() == turns),
    )
    .await
    .unwrap()
    .unwrap();
    snapshot.clone()
}

fn texts(snapshot: &SessionSnapshot) -> Vec<String> {
    snapshot
        .transcript()
        .iter()
        .map(|turn| turn.text().to_owned())
        .collect()
}

#[tokio::test(start_paused = true)]
async fn test_first_turn_establishes_persona_once() {
    let mut model_provider = TestModelProvider::default();
    model_provider.add_reply("Great idea!\n\nWho is it for?");
    model_provider.add_reply("Nice.");
    let session = build(&model_provider);

    session.begin();
    session.start("TaskFlow", "A to-do app for teams");
    let snapshot = settle(&session, 3).await;
    assert_eq!(snapshot.stage(), SessionStage::InConversation);
    assert_eq!(
        texts(&snapshot),
        [
            "App Name: TaskFlow\n\nApp Idea: A to-do app for teams",
            "Great idea!",
            "Who is it for?",
        ]
    );
    assert_eq!(snapshot.transcript()[0].speaker(), Speaker::User);
    assert_eq!(snapshot.transcript()[2].speaker(), Speaker::Assistant);

    session.send_message("  Small teams  ");
    let snapshot = settle(&session, 5).await;
    assert_eq!(texts(&snapshot)[3..], ["Small teams", "Nice."]);

    let requests = model_provider.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(
        requests[0].system_instruction.as_deref(),
        Some(prompts::brainstorm_persona())
    );
    assert_eq!(
        requests[0].messages,
        [ModelMessage::User(
            "App Name: TaskFlow\n\nApp Idea: A to-do app for teams".to_owned()
        )]
    );
    assert_eq!(requests[1].system_instruction, None);
    assert_eq!(requests[1].messages.len(), 4);
    assert_eq!(
        requests[1].messages[3],
        ModelMessage::User("Small teams".to_owned())
    );
}

#[tokio::test(start_paused = true)]
async fn test_messages_while_busy_are_ignored() {
    let mut model_provider = TestModelProvider::default();
    model_provider
        .add_response(PresetResponse::reply("Tell me more.").with_delay_ms(500));
    let session = build(&model_provider);

    session.start("TaskFlow", "A to-do app");
    // Handled after the start, while the request is in flight.
    session.send_message("hello?");

    let mut rx = session.subscribe();
    rx.wait_for(|s| s.activity() == Activity::Revealing)
        .await
        .unwrap();
    session.send_message("still there?");

    let snapshot = settle(&session, 2).await;
    assert_eq!(texts(&snapshot)[1], "Tell me more.");
    assert_eq!(model_provider.request_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_blank_messages_are_ignored() {
    let mut model_provider = TestModelProvider::default();
    model_provider.add_reply("Hi.");
    let session = build(&model_provider);

    session.start("TaskFlow", "A to-do app");
    settle(&session, 2).await;
    session.send_message("   \n ");
    sleep(Duration::from_secs(1)).await;

    assert_eq!(session.snapshot().transcript().len(), 2);
    assert_eq!(model_provider.request_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_reveal_is_observable() {
    let mut model_provider = TestModelProvider::default();
    model_provider.add_reply("Hello there.");
    let session = build(&model_provider);
    let mut rx = session.subscribe();

    session.start("TaskFlow", "A to-do app");

    let mut partials = Vec::new();
    loop {
        rx.changed().await.unwrap();
        let snapshot = rx.borrow_and_update().clone();
        if let Some(turn) = snapshot.transcript().get(1) {
            assert!("Hello there.".starts_with(turn.text()));
            if snapshot.activity() == Activity::Revealing {
                partials.push(turn.text().to_owned());
            }
        }
        if snapshot.transcript().len() == 2 && !snapshot.is_busy() {
            break;
        }
    }
    assert!(partials.iter().any(|p| !p.is_empty() && p != "Hello there."));
    assert_eq!(texts(&session.snapshot())[1], "Hello there.");
}

#[tokio::test(start_paused = true)]
async fn test_reveal_takes_one_interval_per_char() {
    let mut model_provider = TestModelProvider::default();
    model_provider.add_reply("abcd");
    let session = SessionBuilder::with_model_provider(model_provider)
        .with_reveal_interval(Duration::from_millis(100))
        .build();

    let start = tokio::time::Instant::now();
    session.start("TaskFlow", "A to-do app");
    settle(&session, 2).await;
    let elapsed = start.elapsed();
    // One millisecond of fake latency plus four ticks.
    assert!(elapsed >= Duration::from_millis(400), "{elapsed:?}");
    assert!(elapsed < Duration::from_millis(500), "{elapsed:?}");
}

#[tokio::test(start_paused = true)]
async fn test_zero_interval_reveals_at_once() {
    let mut model_provider = TestModelProvider::default();
    model_provider.add_reply("One. Two.");
    let session = SessionBuilder::with_model_provider(model_provider)
        .with_reveal_interval(Duration::ZERO)
        .build();

    session.start("TaskFlow", "A to-do app");
    let snapshot = settle(&session, 3).await;
    assert_eq!(texts(&snapshot)[1..], ["One.", "Two."]);
}

#[tokio::test(start_paused = true)]
async fn test_failure_appends_apology() {
    let mut model_provider = TestModelProvider::default();
    model_provider.add_response(PresetResponse::failure(PresetFailure::Status));
    model_provider.add_reply("Back.");
    let idle_count = Arc::new(AtomicUsize::new(0));
    let idle_count_clone = Arc::clone(&idle_count);
    let session = SessionBuilder::with_model_provider(model_provider.clone())
        .on_idle(move || {
            idle_count_clone.fetch_add(1, Ordering::SeqCst);
        })
        .build();

    session.start("TaskFlow", "A to-do app");
    let snapshot = settle(&session, 2).await;
    assert_eq!(texts(&snapshot)[1], APOLOGY);
    assert_eq!(snapshot.transcript()[1].speaker(), Speaker::Assistant);
    assert_eq!(idle_count.load(Ordering::SeqCst), 1);

    // The session stays usable and the persona isn't sent again.
    session.send_message("again");
    let snapshot = settle(&session, 4).await;
    assert_eq!(texts(&snapshot)[3], "Back.");
    assert_eq!(idle_count.load(Ordering::SeqCst), 2);
    assert_eq!(model_provider.requests()[1].system_instruction, None);
}

#[tokio::test(start_paused = true)]
async fn test_timeout_appends_apology() {
    let mut model_provider = TestModelProvider::default();
    model_provider
        .add_response(PresetResponse::reply("too late").with_delay_ms(10_000));
    let session = SessionBuilder::with_model_provider(model_provider)
        .with_request_timeout(Duration::from_secs(2))
        .build();

    session.start("TaskFlow", "A to-do app");
    let snapshot = settle(&session, 2).await;
    assert_eq!(texts(&snapshot)[1], APOLOGY);
}

#[tokio::test(start_paused = true)]
async fn test_blank_start_is_ignored() {
    let model_provider = TestModelProvider::default();
    let session = build(&model_provider);

    session.begin();
    session.start("   ", "A to-do app");
    assert_eq!(
        session.end_brainstorm().await.unwrap_err(),
        HandoffError::IncompleteMetadata
    );
    let snapshot = session.snapshot();
    assert_eq!(snapshot.stage(), SessionStage::AwaitingFirstTurn);
    assert!(snapshot.transcript().is_empty());
    assert_eq!(model_provider.request_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_end_brainstorm() {
    let mut model_provider = TestModelProvider::default();
    model_provider.add_reply("What problem does it solve?");
    let session = build(&model_provider);

    session.start("TaskFlow", "A to-do app");
    settle(&session, 2).await;
    let record = session.end_brainstorm().await.unwrap();
    assert_eq!(record.metadata().app_name(), "TaskFlow");
    assert_eq!(record.metadata().app_idea(), "A to-do app");
    assert_eq!(record.transcript().len(), 2);
    assert_eq!(
        record.transcript()[1].text(),
        "What problem does it solve?"
    );

    let snapshot = session.snapshot();
    assert_eq!(snapshot.stage(), SessionStage::Ended);
    assert!(snapshot.transcript().is_empty());

    assert_eq!(
        session.end_brainstorm().await.unwrap_err(),
        HandoffError::AlreadyEnded
    );
    session.send_message("anyone?");
    sleep(Duration::from_secs(1)).await;
    assert_eq!(model_provider.request_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_end_completes_reveal_in_progress() {
    let mut model_provider = TestModelProvider::default();
    model_provider.add_reply("First paragraph.\n\nSecond paragraph.");
    let session = build(&model_provider);
    let mut rx = session.subscribe();

    session.start("TaskFlow", "A to-do app");
    rx.wait_for(|s| s.activity() == Activity::Revealing)
        .await
        .unwrap();
    let record = session.end_brainstorm().await.unwrap();

    let texts: Vec<_> =
        record.transcript().iter().map(|turn| turn.text()).collect();
    assert_eq!(texts[1..], ["First paragraph.", "Second paragraph."]);
}

#[tokio::test(start_paused = true)]
async fn test_late_reply_is_discarded() {
    let mut model_provider = TestModelProvider::default();
    model_provider
        .add_response(PresetResponse::reply("Too late.").with_delay_ms(1_000));
    let session = build(&model_provider);

    session.start("TaskFlow", "A to-do app");
    let record = session.end_brainstorm().await.unwrap();
    assert_eq!(record.transcript().len(), 1);

    sleep(Duration::from_secs(5)).await;
    assert_eq!(model_provider.request_count(), 1);
    let snapshot = session.snapshot();
    assert!(snapshot.transcript().is_empty());
    assert_eq!(snapshot.activity(), Activity::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_closed_session() {
    let model_provider = TestModelProvider::default();
    let session = build(&model_provider);

    session.close();
    assert!(session.is_closed());
    assert_eq!(
        session.end_brainstorm().await.unwrap_err(),
        HandoffError::SessionClosed
    );
    // Messages to a closed session are dropped quietly.
    session.start("TaskFlow", "A to-do app");
    sleep(Duration::from_millis(10)).await;
    assert_eq!(model_provider.request_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_close_stops_reveal_in_progress() {
    const REPLY: &str = "Hello there, this is a longer reply.";
    let mut model_provider = TestModelProvider::default();
    model_provider.add_reply(REPLY);
    let session = build(&model_provider);
    let mut rx = session.subscribe();

    session.start("TaskFlow", "A to-do app");
    rx.wait_for(|s| {
        s.activity() == Activity::Revealing
            && s.transcript().get(1).is_some_and(|t| !t.text().is_empty())
    })
    .await
    .unwrap();
    session.close();
    let before = texts(&session.snapshot())[1].clone();
    assert!(REPLY.starts_with(&before) && before != REPLY, "{before:?}");

    sleep(Duration::from_secs(5)).await;
    assert!(session.is_closed());
    assert_eq!(texts(&session.snapshot())[1], before);

    // The snapshot sender goes away with the session state.
    rx.borrow_and_update();
    assert!(rx.changed().await.is_err());
}
