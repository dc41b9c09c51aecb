use super::*;
use futures_util::stream;
use std::time::Duration;

#[derive(Default)]
struct RecordingView {
    busy: Vec<bool>,
    updates: Vec<String>,
    failures: Vec<Failure>,
}

impl View for RecordingView {
    fn set_busy(&mut self, busy: bool) {
        self.busy.push(busy);
    }

    fn update(&mut self, render: &RenderState) {
        self.updates.push(render.text.clone());
    }

    fn show_failure(&mut self, failure: &Failure) {
        self.failures.push(failure.clone());
    }
}

fn frame(kind: &str, content: &str) -> Vec<u8> {
    format!(
        "data: {}\n\n",
        serde_json::json!({"type": kind, "content": content})
    )
    .into_bytes()
}

fn ok_chunks(chunks: Vec<Vec<u8>>) -> impl Stream<Item = Result<Vec<u8>, String>> {
    stream::iter(chunks.into_iter().map(Ok))
}

#[tokio::test]
async fn test_tokens_then_done() {
    let renderer = Renderer::default();
    let mut view = RecordingView::default();
    let chunks = ok_chunks(vec![
        frame("token", "Hello"),
        frame("token", " there"),
        b"data: {\"type\":\"done\"}\n\n".to_vec(),
        frame("token", "ignored"),
    ]);
    let outcome = consume(chunks, &renderer, &mut view, &CancellationToken::new()).await;
    assert_eq!(outcome.state, StreamState::Done);
    assert_eq!(outcome.render.text, "Hello there");
    assert_eq!(outcome.render.html, "<p>Hello there</p>\n");
    assert_eq!(view.updates, vec!["Hello", "Hello there"]);
    assert!(view.failures.is_empty());
}

#[tokio::test]
async fn test_events_after_done_in_same_chunk_ignored() {
    let renderer = Renderer::default();
    let mut view = RecordingView::default();
    let mut chunk = frame("token", "a");
    chunk.extend(b"data: {\"type\":\"done\"}\n\n");
    chunk.extend(frame("token", "b"));
    let outcome = consume(
        ok_chunks(vec![chunk]),
        &renderer,
        &mut view,
        &CancellationToken::new(),
    )
    .await;
    assert_eq!(outcome.render.text, "a");
}

#[tokio::test]
async fn test_end_of_body_without_done_completes() {
    let renderer = Renderer::default();
    let mut view = RecordingView::default();
    let chunks = ok_chunks(vec![
        frame("token", "partial"),
        b"data: {\"type\":\"token\",\"content\":\" tail\"}".to_vec(),
    ]);
    let outcome = consume(chunks, &renderer, &mut view, &CancellationToken::new()).await;
    assert_eq!(outcome.state, StreamState::Done);
    assert_eq!(outcome.render.text, "partial tail");
}

#[tokio::test]
async fn test_error_event_rendered_inline_and_stream_continues() {
    let renderer = Renderer::default();
    let mut view = RecordingView::default();
    let chunks = ok_chunks(vec![
        frame("error", "tool crashed"),
        frame("token", "recovered"),
    ]);
    let outcome = consume(chunks, &renderer, &mut view, &CancellationToken::new()).await;
    assert_eq!(outcome.state, StreamState::Done);
    assert!(outcome.render.html.contains("<strong>Error:</strong> tool crashed"));
    assert!(outcome.render.text.ends_with("recovered"));
    assert!(view.failures.is_empty());
}

#[tokio::test]
async fn test_read_failure_keeps_partial_output() {
    let renderer = Renderer::default();
    let mut view = RecordingView::default();
    let chunks = stream::iter(vec![
        Ok(frame("token", "half an ans")),
        Err("connection reset".to_string()),
        Ok(frame("token", "never seen")),
    ]);
    let outcome = consume(chunks, &renderer, &mut view, &CancellationToken::new()).await;
    assert_eq!(outcome.state, StreamState::Errored);
    assert_eq!(outcome.render.text, "half an ans");
    assert_eq!(
        view.failures,
        vec![Failure::Network(
            "Stream read failed: connection reset".into()
        )]
    );
}

#[tokio::test]
async fn test_malformed_frames_counted() {
    let renderer = Renderer::default();
    let mut view = RecordingView::default();
    let chunks = ok_chunks(vec![
        b"data: {broken\n\n".to_vec(),
        frame("token", "ok"),
    ]);
    let outcome = consume(chunks, &renderer, &mut view, &CancellationToken::new()).await;
    assert_eq!(outcome.dropped_frames, 1);
    assert_eq!(outcome.render.text, "ok");
}

#[tokio::test]
async fn test_cancel_before_start_aborts() {
    let renderer = Renderer::default();
    let mut view = RecordingView::default();
    let cancel = CancellationToken::new();
    cancel.cancel();
    let outcome = consume(
        ok_chunks(vec![frame("token", "x")]),
        &renderer,
        &mut view,
        &cancel,
    )
    .await;
    assert_eq!(outcome.state, StreamState::Aborted);
    assert!(outcome.render.text.is_empty());
}

#[tokio::test]
async fn test_cancel_mid_stream_keeps_output() {
    let renderer = Renderer::default();
    let mut view = RecordingView::default();
    let cancel = CancellationToken::new();
    let chunks = ok_chunks(vec![frame("token", "first")]).chain(stream::pending());

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let outcome = consume(chunks, &renderer, &mut view, &cancel).await;
    assert_eq!(outcome.state, StreamState::Aborted);
    assert_eq!(outcome.render.text, "first");
}

#[tokio::test]
async fn test_sentinel_rendered_during_stream() {
    let renderer = Renderer::default();
    let mut view = RecordingView::default();
    let chunks = ok_chunks(vec![
        frame("token", "Listen:\n[AUDIO_"),
        frame("token", "REPLY: clip1.mp3]\n"),
    ]);
    let outcome = consume(chunks, &renderer, &mut view, &CancellationToken::new()).await;
    assert!(outcome.render.html.contains("src=\"/temp/clip1.mp3\""));
    assert!(!outcome.render.html.contains("[AUDIO_REPLY"));
}

#[test]
fn test_busy_guard_restores_ready_once() {
    let mut view = RecordingView::default();
    {
        let mut guard = Busy::new(&mut view);
        guard.show_failure(&Failure::Rejected("nope".into()));
    }
    assert_eq!(view.busy, vec![true, false]);
    assert_eq!(view.failures.len(), 1);
}

#[test]
fn test_session_feed_after_terminal_is_noop() {
    let renderer = Renderer::default();
    let mut view = RecordingView::default();
    let mut session = StreamSession::new(&renderer);
    assert_eq!(session.state(), StreamState::Idle);
    assert!(session.feed(b"data: {\"type\":\"done\"}\n", &mut view));
    assert!(session.feed(&frame("token", "late"), &mut view));
    session.finish(&mut view);
    assert_eq!(session.state(), StreamState::Done);
    assert!(session.render().text.is_empty());
}

#[test]
fn test_failure_from_error() {
    assert_eq!(
        Failure::from(&BridgeError::StreamRead("eof".into())),
        Failure::Network("Stream read failed: eof".into())
    );
    assert_eq!(
        Failure::from(&BridgeError::Rejected {
            status: 503,
            message: "warming up".into()
        }),
        Failure::Rejected("warming up".into())
    );
    assert!(matches!(
        Failure::from(&BridgeError::Config("bad".into())),
        Failure::Rejected(_)
    ));
}
