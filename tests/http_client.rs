use rustgscholar::config::USER_AGENT;
use rustgscholar::cookies::{Cookie, CookieManager};
use rustgscholar::{
    AuthorId, FetchErrorKind, RetryPolicy, ScholarClient, ScholarConfig, ScholarError,
};
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PAPER_SEARCH: &str = include_str!("fixtures/paper_search.html");
const CITATIONS: &str = include_str!("fixtures/citations.html");
const PROFILE: &str = include_str!("fixtures/profile.html");

fn config(base_url: &str, attempts: u32) -> ScholarConfig {
    ScholarConfig {
        base_url: base_url.to_string(),
        retry: RetryPolicy::new(attempts, Duration::from_millis(5), 2.0).expect("valid policy"),
        pacing: None,
        ..Default::default()
    }
}

#[tokio::test]
async fn search_then_citations_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/scholar"))
        .and(query_param("q", "attention transformer"))
        .and(query_param("hl", "en"))
        .respond_with(ResponseTemplate::new(200).set_body_string(PAPER_SEARCH))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/scholar"))
        .and(query_param("cites", "2960712678066186980"))
        .respond_with(ResponseTemplate::new(200).set_body_string(CITATIONS))
        .mount(&server)
        .await;

    let client = ScholarClient::new(config(&server.uri(), 2)).expect("client");
    let papers = client
        .search_papers("attention transformer")
        .await
        .expect("search");
    let first = papers.iter().next().expect("a paper");
    assert_eq!(first.title, "Attention is all you need");

    let citing = client.get_citations(&first.id).await.expect("citations");
    assert_eq!(citing.iter().count(), 2);

    let requests = server.received_requests().await.expect("recording enabled");
    let agent = requests[0]
        .headers
        .get("user-agent")
        .and_then(|v| v.to_str().ok());
    assert_eq!(agent, Some(USER_AGENT));

    let header_value = |name: &str| {
        requests[0]
            .headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    assert_eq!(header_value("sec-fetch-dest").as_deref(), Some("document"));
    assert_eq!(header_value("sec-fetch-mode").as_deref(), Some("navigate"));
    assert_eq!(header_value("sec-fetch-site").as_deref(), Some("none"));
    assert_eq!(header_value("sec-fetch-user").as_deref(), Some("?1"));
}

#[tokio::test]
async fn transient_statuses_are_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/citations"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/citations"))
        .and(query_param("user", "JicYPdAAAAAJ"))
        .respond_with(ResponseTemplate::new(200).set_body_string(PROFILE))
        .mount(&server)
        .await;

    let client = ScholarClient::new(config(&server.uri(), 3)).expect("client");
    let author = client
        .get_author(&AuthorId::new("JicYPdAAAAAJ"))
        .await
        .expect("profile")
        .expect("profile header");
    assert_eq!(author.name, "Geoffrey Hinton");
    assert_eq!(author.publications.len(), 4);

    let requests = server.received_requests().await.expect("recording enabled");
    assert_eq!(requests.len(), 3);
}

#[tokio::test]
async fn persistent_status_exhausts_attempts() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let client = ScholarClient::new(config(&server.uri(), 3)).expect("client");
    let err = client.search_authors("nobody").await.expect_err("404s");
    match err {
        ScholarError::Fetch(fetch) => {
            assert_eq!(fetch.kind, FetchErrorKind::HttpStatus(404));
            assert_eq!(fetch.attempts, 3);
        }
        other => panic!("unexpected error: {other}"),
    }

    let requests = server.received_requests().await.expect("recording enabled");
    assert_eq!(requests.len(), 3);
}

#[tokio::test]
async fn slow_response_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(PAPER_SEARCH)
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let config = ScholarConfig {
        timeout: Some(Duration::from_millis(100)),
        ..config(&server.uri(), 2)
    };
    let client = ScholarClient::new(config).expect("client");
    let err = client.search_papers("slow").await.expect_err("timeout");
    assert!(matches!(
        err,
        ScholarError::Fetch(ref f) if f.kind == FetchErrorKind::Timeout && f.attempts == 2
    ));
}

#[tokio::test]
async fn refused_connection_is_network_error() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
        listener.local_addr().expect("addr").port()
    };

    let client =
        ScholarClient::new(config(&format!("http://127.0.0.1:{port}"), 2)).expect("client");
    let err = client.search_papers("offline").await.expect_err("refused");
    assert!(matches!(
        err,
        ScholarError::Fetch(ref f)
            if matches!(f.kind, FetchErrorKind::NetworkError(_)) && f.attempts == 2
    ));
}

#[tokio::test]
async fn stored_cookies_are_sent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/scholar"))
        .and(header("cookie", "GSP=session-1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(PAPER_SEARCH))
        .mount(&server)
        .await;

    let dir = TempDir::new().expect("tempdir");
    let cookie_file = dir.path().join("cookies.json");
    CookieManager::with_path(cookie_file.clone())
        .save(&[
            Cookie {
                name: "GSP".to_string(),
                value: "session-1".to_string(),
                domain: "127.0.0.1".to_string(),
                path: "/".to_string(),
                secure: false,
                http_only: false,
                expires: None,
            },
            Cookie {
                name: "NID".to_string(),
                value: "other-site".to_string(),
                domain: ".google.com".to_string(),
                path: "/".to_string(),
                secure: true,
                http_only: true,
                expires: None,
            },
        ])
        .expect("save cookies");

    let config = ScholarConfig {
        cookie_file: Some(cookie_file),
        ..config(&server.uri(), 1)
    };
    let client = ScholarClient::new(config).expect("client");
    let papers = client.search_papers("with cookies").await.expect("search");
    assert_eq!(papers.iter().count(), 3);
}
