use futures::StreamExt;
use gosub_xhr::{
    ClientConfig, CredentialsMode, FailureReason, HttpTransportFactory, RequestConfig, RequestObservable,
    RequestState,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// What the stub server saw of a request.
#[derive(Debug)]
struct Captured {
    head: String,
    body: String,
}

impl Captured {
    fn header(&self, name: &str) -> Option<&str> {
        self.head.lines().skip(1).find_map(|line| {
            let (n, v) = line.split_once(':')?;
            n.trim().eq_ignore_ascii_case(name).then(|| v.trim())
        })
    }
}

async fn read_request(stream: &mut TcpStream) -> std::io::Result<Captured> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];

    let head_end = loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Err(std::io::ErrorKind::UnexpectedEof.into());
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).into_owned();
    let mut captured = Captured { head, body: String::new() };
    let length = captured
        .header("content-length")
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < head_end + length {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    captured.body = String::from_utf8_lossy(&buf[head_end..]).into_owned();

    Ok(captured)
}

/// Serves exactly one connection with a canned response and reports what it received.
async fn serve_once(response: Vec<u8>) -> (SocketAddr, oneshot::Receiver<Captured>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = oneshot::channel();

    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let captured = read_request(&mut stream).await.unwrap();
        stream.write_all(&response).await.unwrap();
        stream.shutdown().await.ok();
        let _ = tx.send(captured);
    });

    (addr, rx)
}

fn http_response(status_line: &str, headers: &[(&str, &str)], body: impl AsRef<[u8]>) -> Vec<u8> {
    let body = body.as_ref();
    let mut out = format!("HTTP/1.1 {status_line}\r\n");
    for (name, value) in headers {
        out.push_str(&format!("{name}: {value}\r\n"));
    }
    out.push_str(&format!("Content-Length: {}\r\nConnection: close\r\n\r\n", body.len()));

    let mut out = out.into_bytes();
    out.extend_from_slice(body);
    out
}

fn observable(url: String, config: RequestConfig, client: ClientConfig) -> RequestObservable {
    let factory = HttpTransportFactory::new(client).unwrap();
    RequestObservable::new(url, config, Arc::new(factory))
}

#[tokio::test]
async fn get_delivers_a_response() {
    init_logging();

    let body = r#"{"name":"Kefir"}"#;
    let (addr, seen) = serve_once(http_response(
        "200 OK",
        &[("Content-Type", "application/json"), ("X-Trace", "abc")],
        body,
    ))
    .await;

    let url = format!("http://{addr}/api/user");
    let obs = observable(url.clone(), RequestConfig::default(), ClientConfig::default());
    let mut sub = obs.subscribe();

    let response = sub.next().await.unwrap().unwrap();
    assert_eq!(response.status, 200);
    assert!(response.ok());
    assert_eq!(response.status_text, "OK");
    assert_eq!(response.url, url);
    assert_eq!(response.headers.get("content-type"), Some("application/json"));
    assert_eq!(response.headers.get("x-trace"), Some("abc"));
    assert_eq!(response.body, body);
    assert_eq!(response.decode_json().unwrap()["name"], "Kefir");

    assert!(sub.next().await.is_none());
    assert_eq!(sub.state(), RequestState::Completed);

    let captured = seen.await.unwrap();
    assert!(captured.head.starts_with("GET /api/user HTTP/1.1"));
    assert_eq!(captured.header("user-agent"), Some(gosub_xhr::config::DEFAULT_USER_AGENT));
}

#[tokio::test]
async fn post_sends_headers_and_body_to_relative_url() {
    init_logging();

    let (addr, seen) = serve_once(http_response("201 Created", &[], "")).await;

    let client = ClientConfig::builder()
        .origin(format!("http://{addr}/"))
        .user_agent("Gosub-Test/1.0")
        .build()
        .unwrap();
    let cfg = RequestConfig::builder()
        .method("POST")
        .header("Content-Type", "application/json")
        .header("X-Token", "secret")
        .credentials(CredentialsMode::SameOrigin)
        .body(r#"{"a":1}"#)
        .build();

    let response = observable("submit".into(), cfg, client)
        .subscribe()
        .outcome()
        .await
        .unwrap()
        .unwrap();
    assert_eq!(response.status, 201);
    assert_eq!(response.status_text, "Created");
    assert_eq!(response.url, format!("http://{addr}/submit"));

    let captured = seen.await.unwrap();
    assert!(captured.head.starts_with("POST /submit HTTP/1.1"));
    assert_eq!(captured.header("content-type"), Some("application/json"));
    assert_eq!(captured.header("x-token"), Some("secret"));
    assert_eq!(captured.header("user-agent"), Some("Gosub-Test/1.0"));
    assert_eq!(captured.body, r#"{"a":1}"#);
}

async fn fetch_body(content_type: &str, body: &[u8]) -> String {
    let (addr, _seen) = serve_once(http_response("200 OK", &[("Content-Type", content_type)], body)).await;
    observable(format!("http://{addr}/text"), RequestConfig::default(), ClientConfig::default())
        .subscribe()
        .outcome()
        .await
        .unwrap()
        .unwrap()
        .body
}

#[tokio::test]
async fn body_is_decoded_with_the_declared_charset() {
    init_logging();

    assert_eq!(fetch_body("text/plain; charset=windows-1252", b"caf\xe9 \x80").await, "caf\u{e9} \u{20ac}");
    // WHATWG maps the latin1 labels onto windows-1252
    assert_eq!(fetch_body("text/plain; charset=\"ISO-8859-1\"", b"\x80").await, "\u{20ac}");
    assert_eq!(fetch_body("text/html; charset=UTF-8", "\u{2603}".as_bytes()).await, "\u{2603}");
}

#[tokio::test]
async fn unknown_charset_falls_back_to_utf8() {
    init_logging();

    let body = fetch_body("text/plain; charset=no-such-charset", b"\xffhello").await;
    assert!(body.ends_with("hello"));
    assert!(body.starts_with('\u{fffd}'));
}

#[tokio::test]
async fn error_statuses_are_responses() {
    init_logging();

    let (addr, _seen) = serve_once(http_response("404 Not Found", &[], "nope")).await;
    let response = observable(format!("http://{addr}/missing"), RequestConfig::default(), ClientConfig::default())
        .subscribe()
        .outcome()
        .await
        .unwrap()
        .unwrap();

    assert_eq!(response.status, 404);
    assert!(!response.ok());
    assert_eq!(response.body, "nope");
}

#[tokio::test]
async fn unreachable_host_is_a_network_error() {
    init_logging();

    // Bind and release a port so nothing listens on it
    let addr = TcpListener::bind("127.0.0.1:0").await.unwrap().local_addr().unwrap();

    let mut sub = observable(format!("http://{addr}/"), RequestConfig::default(), ClientConfig::default()).subscribe();
    assert_eq!(sub.next().await, Some(Err(FailureReason::NetworkError)));
    assert_eq!(sub.next().await, None);
    assert_eq!(sub.state(), RequestState::Failed);
}

#[tokio::test]
async fn silent_server_is_a_timeout() {
    init_logging();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        // Accept and never answer
        let (_stream, _) = listener.accept().await.unwrap();
        tokio::time::sleep(Duration::from_secs(30)).await;
    });

    let client = ClientConfig::builder().timeout(Duration::from_millis(100)).build().unwrap();
    let outcome = observable(format!("http://{addr}/slow"), RequestConfig::default(), client)
        .subscribe()
        .outcome()
        .await;

    assert_eq!(outcome, Some(Err(FailureReason::TimeoutError)));
}

#[tokio::test]
async fn dropping_the_subscription_closes_the_connection() {
    init_logging();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (accepted_tx, accepted_rx) = oneshot::channel();
    let (closed_tx, closed_rx) = oneshot::channel();

    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let _ = read_request(&mut stream).await;
        let _ = accepted_tx.send(());

        // Never answer, just wait for the client to hang up
        let mut rest = [0u8; 64];
        let closed = matches!(stream.read(&mut rest).await, Ok(0) | Err(_));
        let _ = closed_tx.send(closed);
    });

    let sub = observable(format!("http://{addr}/hang"), RequestConfig::default(), ClientConfig::default()).subscribe();
    accepted_rx.await.unwrap();
    assert_eq!(sub.state(), RequestState::Pending);
    drop(sub);

    let closed = tokio::time::timeout(Duration::from_secs(5), closed_rx)
        .await
        .expect("connection was not closed after cancel")
        .unwrap();
    assert!(closed);
}

#[tokio::test]
async fn every_subscription_sends_its_own_request() {
    init_logging();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        for i in 0..2 {
            let (mut stream, _) = listener.accept().await.unwrap();
            let _ = read_request(&mut stream).await.unwrap();
            let reply = http_response("200 OK", &[], &format!("hit {i}"));
            stream.write_all(&reply).await.unwrap();
            stream.shutdown().await.ok();
        }
    });

    let obs = observable(format!("http://{addr}/count"), RequestConfig::default(), ClientConfig::default());
    let first = obs.subscribe().outcome().await.unwrap().unwrap();
    let second = obs.subscribe().outcome().await.unwrap().unwrap();

    assert_eq!(first.body, "hit 0");
    assert_eq!(second.body, "hit 1");
}
