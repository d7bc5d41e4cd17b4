/// Integration tests for assessment sessions
///
/// Every test drives a real session against the in-process mock service
/// from `common`, so the full signer → connection → sender/receiver →
/// state machine path is exercised.

mod common;

use std::time::{Duration, Instant};

use common::{Behaviour, MockIseServer, SENTENCE_MARKUP, decoded_audio, pcm};
use ise_client::assessment::{
    AssessmentError, AssessmentRequest, AssessmentSession, Category, Language, SessionOutcome,
    SessionState, StreamOptions,
};
use ise_client::network::{Credentials, ServiceEndpoint};

fn credentials() -> Credentials {
    Credentials::new("test-app", "test-key", "test-secret")
}

fn fast_options(frame_size: usize, interval_ms: u64) -> StreamOptions {
    StreamOptions {
        frame_size,
        frame_interval: Duration::from_millis(interval_ms),
        connect_timeout_ms: 2_000,
    }
}

async fn run(
    endpoint: ServiceEndpoint,
    options: StreamOptions,
    audio: Vec<u8>,
    timeout: Duration,
) -> SessionOutcome {
    let request = AssessmentRequest::new("今天天气怎么样", audio).with_timeout(timeout);
    AssessmentSession::new(credentials(), endpoint, options, request)
        .run()
        .await
}

fn names(outcome: &SessionOutcome) -> Vec<&'static str> {
    outcome.history.iter().map(SessionState::name).collect()
}

#[tokio::test]
async fn test_session_completes() {
    println!("\n=== Session Completes Test ===");

    let server = MockIseServer::start(Behaviour::Complete {
        markup: SENTENCE_MARKUP.to_string(),
    })
    .await;

    let audio = pcm(3000);
    let outcome = run(
        server.endpoint(),
        fast_options(1280, 5),
        audio.clone(),
        Duration::from_secs(5),
    )
    .await;

    println!("History: {:?}", names(&outcome));

    assert_eq!(outcome.state, SessionState::Completed);
    assert_eq!(
        names(&outcome),
        vec!["Idle", "Connecting", "Open", "Sending", "AwaitingResult", "Completed"]
    );
    assert_eq!(outcome.raw(), Some(SENTENCE_MARKUP));
    assert_eq!(outcome.frames_sent, 4);

    // ack, intermediate, final; all in arrival order
    assert_eq!(outcome.frames.len(), 3);
    assert!(outcome.frames.last().unwrap().is_final());

    let (frames, uri) = server.finish().await;
    assert_eq!(frames.len(), 4);

    let control = &frames[0];
    assert_eq!(control["common"]["app_id"], "test-app");
    assert_eq!(control["business"]["cmd"], "ssb");
    assert_eq!(control["business"]["category"], "read_sentence");
    assert_eq!(control["business"]["ent"], "cn_vip");
    assert_eq!(control["business"]["extra_ability"], "multi_dimension");
    assert_eq!(control["data"]["status"], 0);
    assert!(control["business"]["text"].as_str().unwrap().starts_with('\u{FEFF}'));

    let aus: Vec<i64> = frames[1..]
        .iter()
        .map(|f| f["business"]["aus"].as_i64().unwrap())
        .collect();
    let status: Vec<i64> = frames[1..]
        .iter()
        .map(|f| f["data"]["status"].as_i64().unwrap())
        .collect();
    assert_eq!(aus, vec![1, 2, 4]);
    assert_eq!(status, vec![1, 1, 2]);
    assert_eq!(decoded_audio(&frames), audio);

    let uri = uri.unwrap();
    println!("Request URI: {}", uri);
    assert!(uri.starts_with("/v2/open-ise?authorization="));
    assert!(uri.contains("&date="));
    assert!(uri.contains("&host=127.0.0.1"));

    println!("\n✓ Session completed with ordered frames");
}

#[tokio::test]
async fn test_single_chunk_is_last() {
    let server = MockIseServer::start(Behaviour::Complete {
        markup: SENTENCE_MARKUP.to_string(),
    })
    .await;

    let outcome = run(
        server.endpoint(),
        fast_options(1280, 5),
        pcm(100),
        Duration::from_secs(5),
    )
    .await;
    assert!(outcome.is_completed());
    assert_eq!(outcome.frames_sent, 2);

    let (frames, _) = server.finish().await;
    assert_eq!(frames.len(), 2);
    assert_eq!(frames[1]["business"]["aus"], 4);
    assert_eq!(frames[1]["data"]["status"], 2);

    println!("✓ Single chunk sent once, tagged last");
}

#[tokio::test]
async fn test_service_error_fails_and_stops_sending() {
    println!("\n=== Service Error Test ===");

    let server = MockIseServer::start(Behaviour::Fail {
        after: 2,
        code: 10163,
        message: "param invalid".to_string(),
    })
    .await;

    // 20 audio frames at 20 ms would take ~400 ms to send in full
    let outcome = run(
        server.endpoint(),
        fast_options(100, 20),
        pcm(2000),
        Duration::from_secs(5),
    )
    .await;

    println!("History: {:?}", names(&outcome));

    assert!(outcome.state.is_failed());
    assert!(outcome.state.diagnostic().unwrap().contains("10163"));
    assert_eq!(
        outcome.error(),
        Some(&AssessmentError::Service {
            code: 10163,
            message: "param invalid".to_string(),
        })
    );
    assert!(outcome.raw().is_none());
    // the error arrives after the control frame and one audio frame
    assert!(outcome.frames_sent <= 3);

    let (frames, _) = server.finish().await;
    println!("Server received {} of 21 frames", frames.len());
    assert!(frames.len() <= 3);
    assert!(frames.len() >= outcome.frames_sent);

    println!("\n✓ Session failed without sending the rest");
}

#[tokio::test]
async fn test_error_frame_with_empty_data_fails() {
    let server = MockIseServer::start(Behaviour::SendRaw {
        after: 1,
        frame: r#"{"code":10114,"message":"session timeout","data":{}}"#.to_string(),
    })
    .await;

    let started = Instant::now();
    let outcome = run(
        server.endpoint(),
        fast_options(100, 20),
        pcm(2000),
        Duration::from_secs(5),
    )
    .await;

    println!("History: {:?}", names(&outcome));

    assert!(outcome.state.is_failed());
    assert_eq!(
        outcome.error(),
        Some(&AssessmentError::Service {
            code: 10114,
            message: "session timeout".to_string(),
        })
    );
    assert!(started.elapsed() < Duration::from_secs(2));
    assert!(outcome.frames_sent <= 3);

    server.finish().await;

    println!("✓ Error frame with an empty data block failed the session");
}

#[tokio::test]
async fn test_oversized_timeout_is_invalid_input() {
    let endpoint = ServiceEndpoint::new("127.0.0.1:9").with_scheme("ws");
    let outcome = run(endpoint, fast_options(1280, 5), pcm(100), Duration::MAX).await;

    assert_eq!(outcome.state, SessionState::Idle);
    assert!(matches!(
        outcome.into_result(),
        Err(AssessmentError::InvalidInput(_))
    ));
}

#[tokio::test]
async fn test_silent_service_times_out() {
    let server = MockIseServer::start(Behaviour::Silent).await;

    let started = Instant::now();
    let outcome = run(
        server.endpoint(),
        fast_options(1280, 5),
        pcm(2560),
        Duration::from_millis(300),
    )
    .await;
    let elapsed = started.elapsed();

    println!("Timed out after {:?}", elapsed);

    assert_eq!(outcome.state, SessionState::TimedOut);
    assert_eq!(
        names(&outcome),
        vec!["Idle", "Connecting", "Open", "Sending", "AwaitingResult", "TimedOut"]
    );
    assert_eq!(
        outcome.error(),
        Some(&AssessmentError::Timeout(Duration::from_millis(300)))
    );
    assert!(elapsed >= Duration::from_millis(300));
    assert!(elapsed < Duration::from_secs(3));

    let (frames, _) = server.finish().await;
    assert_eq!(frames.len(), 3);

    println!("✓ Silent service produced TimedOut, not Failed");
}

#[tokio::test]
async fn test_timeout_while_sending() {
    let server = MockIseServer::start(Behaviour::Silent).await;

    // 50 frames at 50 ms cannot finish within 200 ms
    let outcome = run(
        server.endpoint(),
        fast_options(10, 50),
        pcm(500),
        Duration::from_millis(200),
    )
    .await;

    assert_eq!(outcome.state, SessionState::TimedOut);
    assert!(!outcome.history.contains(&SessionState::AwaitingResult));
    assert!(outcome.frames_sent < 51);

    server.finish().await;
}

#[tokio::test]
async fn test_connection_refused() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let endpoint = ServiceEndpoint::new(addr.to_string()).with_scheme("ws");
    let outcome = run(endpoint, fast_options(1280, 5), pcm(100), Duration::from_secs(5)).await;

    assert!(outcome.state.is_failed());
    assert_eq!(names(&outcome), vec!["Idle", "Connecting", "Failed"]);
    assert!(matches!(outcome.error(), Some(AssessmentError::Connection(_))));
    assert_eq!(outcome.frames_sent, 0);

    println!("✓ Refused connection failed the session");
}

#[tokio::test]
async fn test_handshake_rejected() {
    let server = MockIseServer::start(Behaviour::RejectHandshake { status: 401 }).await;

    let outcome = run(
        server.endpoint(),
        fast_options(1280, 5),
        pcm(100),
        Duration::from_secs(5),
    )
    .await;

    assert!(outcome.state.is_failed());
    match outcome.error() {
        Some(AssessmentError::Connection(msg)) => assert!(msg.contains("401")),
        other => panic!("Expected connection error, got {:?}", other),
    }

    server.finish().await;
}

#[tokio::test]
async fn test_server_close_fails_fast() {
    let server = MockIseServer::start(Behaviour::CloseAfter { after: 1 }).await;

    let started = Instant::now();
    let outcome = run(
        server.endpoint(),
        fast_options(100, 10),
        pcm(1000),
        Duration::from_secs(10),
    )
    .await;

    assert!(outcome.state.is_failed());
    assert!(matches!(outcome.error(), Some(AssessmentError::Connection(_))));
    assert!(started.elapsed() < Duration::from_secs(5));

    server.finish().await;
}

#[tokio::test]
async fn test_result_during_sending_completes() {
    let server = MockIseServer::start(Behaviour::CompleteEarly {
        markup: SENTENCE_MARKUP.to_string(),
    })
    .await;

    let outcome = run(
        server.endpoint(),
        fast_options(100, 20),
        pcm(2000),
        Duration::from_secs(5),
    )
    .await;

    assert_eq!(outcome.state, SessionState::Completed);
    assert!(!outcome.history.contains(&SessionState::AwaitingResult));
    assert_eq!(outcome.raw(), Some(SENTENCE_MARKUP));
    assert!(outcome.frames_sent < 21);

    server.finish().await;
}

#[tokio::test]
async fn test_malformed_frames_skipped() {
    let server = MockIseServer::start(Behaviour::CompleteWithNoise {
        markup: SENTENCE_MARKUP.to_string(),
    })
    .await;

    let outcome = run(
        server.endpoint(),
        fast_options(1280, 5),
        pcm(1280),
        Duration::from_secs(5),
    )
    .await;

    assert!(outcome.is_completed());
    // ack + intermediate + final; the malformed frame is not logged
    assert_eq!(outcome.frames.len(), 3);

    server.finish().await;
}

#[tokio::test]
async fn test_english_category_on_the_wire() {
    let server = MockIseServer::start(Behaviour::Complete {
        markup: r#"<read_word total_score="70"/>"#.to_string(),
    })
    .await;

    let request = AssessmentRequest::new("apple", pcm(640))
        .with_language(Language::En)
        .with_category(Category::ReadWord)
        .with_timeout(Duration::from_secs(5));
    let outcome = AssessmentSession::new(
        credentials(),
        server.endpoint(),
        fast_options(1280, 5),
        request,
    )
    .run()
    .await;

    assert!(outcome.is_completed());

    let (frames, _) = server.finish().await;
    assert_eq!(frames[0]["business"]["category"], "read_word");
    assert_eq!(frames[0]["business"]["ent"], "en_vip");
}

#[tokio::test]
async fn test_empty_audio_never_connects() {
    // No server: an attempt to connect would fail the session instead
    let endpoint = ServiceEndpoint::new("127.0.0.1:9").with_scheme("ws");
    let outcome = run(endpoint, fast_options(1280, 5), Vec::new(), Duration::from_secs(1)).await;

    assert_eq!(outcome.state, SessionState::Idle);
    assert!(matches!(
        outcome.into_result(),
        Err(AssessmentError::InvalidInput(_))
    ));
}
