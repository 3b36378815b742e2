//! Integration tests for nrfeed against a mock SSE endpoint

use std::time::Duration;

use nrfeed::{FeedSupervisor, NowPlayingStore, SseTransport};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Render events as an SSE response body
fn sse_body(events: &[&str]) -> String {
    events
        .iter()
        .map(|data| format!("data: {data}\n\n"))
        .collect()
}

fn sse_response(events: &[&str]) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(sse_body(events), "text/event-stream")
}

/// Catch-all mounted last: once the scripted responses are used up, the
/// supervisor's next connect parks on a slow empty response instead of
/// spinning against the mock server.
async fn park_further_connects(mock_server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/eventsource"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw("", "text/event-stream")
                .set_delay(Duration::from_secs(60)),
        )
        .mount(mock_server)
        .await;
}

async fn wait_until(store: &NowPlayingStore, stations: &[&str]) {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if stations.iter().all(|station| store.get(station).is_some()) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("feed updates did not reach the store in time");
}

#[tokio::test]
async fn feed_events_reach_the_store() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/eventsource"))
        .and(header("Accept", "text/event-stream"))
        .respond_with(sse_response(&[
            "keepalive",
            r#"[{"station":"chillsynth","artist":"Timecop1983","title":"On the Run"}]"#,
            r#"[{"station":"rekt","title":"Carpenter Brut - Turbo Killer"}]"#,
        ]))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;
    park_further_connects(&mock_server).await;

    let store = NowPlayingStore::new();
    let transport = SseTransport::new(&format!("{}/eventsource", mock_server.uri())).unwrap();
    let supervisor = FeedSupervisor::new(transport, store.clone());
    let shutdown = supervisor.shutdown_token();
    let handle = tokio::spawn(supervisor.run());

    wait_until(&store, &["chillsynth", "rekt"]).await;

    let chillsynth = store.get("chillsynth").unwrap();
    assert_eq!(chillsynth.artist, "Timecop1983");
    assert_eq!(chillsynth.title, "On the Run");

    // Combined-title station split on the wire path too
    let rekt = store.get("rekt").unwrap();
    assert_eq!(rekt.artist, "Carpenter Brut");
    assert_eq!(rekt.title, "Turbo Killer");

    shutdown.cancel();
    handle.await.unwrap();
}

#[tokio::test]
async fn reconnect_picks_up_later_events() {
    let mock_server = MockServer::start().await;

    // First connection delivers one track and closes; the replacement
    // connection delivers the next one.
    Mock::given(method("GET"))
        .and(path("/eventsource"))
        .respond_with(sse_response(&[
            r#"[{"station":"datawave","artist":"FM-84","title":"Running in the Night"}]"#,
        ]))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/eventsource"))
        .respond_with(sse_response(&[
            r#"[{"station":"nightride","artist":"Lost Years","title":"Converter"}]"#,
        ]))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;
    park_further_connects(&mock_server).await;

    let store = NowPlayingStore::new();
    let transport = SseTransport::new(&format!("{}/eventsource", mock_server.uri())).unwrap();
    let supervisor = FeedSupervisor::new(transport, store.clone());
    let shutdown = supervisor.shutdown_token();
    let handle = tokio::spawn(supervisor.run());

    wait_until(&store, &["datawave", "nightride"]).await;
    assert_eq!(store.get("datawave").unwrap().artist, "FM-84");
    assert_eq!(store.get("nightride").unwrap().artist, "Lost Years");

    shutdown.cancel();
    handle.await.unwrap();
}

#[tokio::test]
async fn recovers_from_error_status_on_connect() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/eventsource"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/eventsource"))
        .respond_with(sse_response(&[
            r#"[{"station":"chillsynth","artist":"Kavinsky","title":"Nightcall"}]"#,
        ]))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;
    park_further_connects(&mock_server).await;

    let store = NowPlayingStore::new();
    let transport = SseTransport::new(&format!("{}/eventsource", mock_server.uri())).unwrap();
    let supervisor = FeedSupervisor::new(transport, store.clone());
    let shutdown = supervisor.shutdown_token();
    let handle = tokio::spawn(supervisor.run());

    // First attempt hits the 500 and is retried after the initial backoff.
    wait_until(&store, &["chillsynth"]).await;
    assert_eq!(store.get("chillsynth").unwrap().artist, "Kavinsky");

    shutdown.cancel();
    handle.await.unwrap();
}
