//! Contract Test: Redirect Resolution
//!
//! Runs the resolver against in-process fake RTSP servers, plain and TLS.
//!
//! Constraints verified:
//! - A redirect chain resolves to the final URL, not an intermediate hop
//! - A direct 200 resolves to the requested URL
//! - rtsps addresses are dialled over TLS, also when reached by redirect
//! - Credentials in the address answer Basic and Digest challenges
//! - Error statuses, loops, silence and refused connections are errors

use rtsp_resolver_core::{Error, Resolver, ResolverConfig, Source};
use rtsp_resolver_describe::RtspResolver;
use rustls::pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio_rustls::TlsAcceptor;
use tokio_test::assert_ok;

/// A DESCRIBE as the fake server received it
#[derive(Debug, Clone)]
struct Request {
    line: String,
    uri: String,
    headers: Vec<(String, String)>,
}

impl Request {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

type Seen = Arc<Mutex<Vec<Request>>>;

/// How a fake server answers a DESCRIBE
#[derive(Clone)]
enum Reply {
    Ok,
    Redirect(u16, String),
    MultipleLocations(Vec<String>),
    Unauthorized(Vec<&'static str>),
    Status(u16, &'static str),
    Silent,
}

/// Start a fake RTSP server; returns its address and the requests it saw
async fn spawn_server<F>(reply: F) -> (SocketAddr, Seen)
where
    F: Fn(&Request) -> Reply + Send + Sync + 'static,
{
    serve(None, reply).await
}

/// Start a fake RTSP server behind TLS with a self-signed certificate
async fn spawn_tls_server<F>(reply: F) -> (SocketAddr, Seen)
where
    F: Fn(&Request) -> Reply + Send + Sync + 'static,
{
    serve(Some(tls_acceptor()), reply).await
}

fn tls_acceptor() -> TlsAcceptor {
    let cert = CertificateDer::from(include_bytes!("fixtures/cert.der").to_vec());
    let key = PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(
        include_bytes!("fixtures/key.der").to_vec(),
    ));

    let config = rustls::ServerConfig::builder_with_provider(Arc::new(
        rustls::crypto::ring::default_provider(),
    ))
    .with_safe_default_protocol_versions()
    .unwrap()
    .with_no_client_auth()
    .with_single_cert(vec![cert], key)
    .unwrap();

    TlsAcceptor::from(Arc::new(config))
}

async fn serve<F>(acceptor: Option<TlsAcceptor>, reply: F) -> (SocketAddr, Seen)
where
    F: Fn(&Request) -> Reply + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let seen: Seen = Arc::new(Mutex::new(Vec::new()));
    let reply = Arc::new(reply);

    {
        let seen = Arc::clone(&seen);
        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    return;
                };
                let seen = Arc::clone(&seen);
                let reply = Arc::clone(&reply);
                let acceptor = acceptor.clone();

                tokio::spawn(async move {
                    match acceptor {
                        Some(acceptor) => {
                            if let Ok(stream) = acceptor.accept(stream).await {
                                answer(stream, &*reply, &seen).await;
                            }
                        }
                        None => answer(stream, &*reply, &seen).await,
                    }
                });
            }
        });
    }

    (addr, seen)
}

/// Read one DESCRIBE from `stream` and write the chosen reply
async fn answer<S, F>(stream: S, reply: &F, seen: &Seen)
where
    S: AsyncRead + AsyncWrite + Unpin,
    F: Fn(&Request) -> Reply,
{
    let mut stream = BufReader::new(stream);

    let mut line = String::new();
    if stream.read_line(&mut line).await.unwrap_or(0) == 0 {
        return;
    }
    let line = line.trim_end().to_string();
    let uri = line.split(' ').nth(1).unwrap_or_default().to_string();

    let mut headers = Vec::new();
    loop {
        let mut header = String::new();
        if stream.read_line(&mut header).await.unwrap_or(0) == 0 {
            break;
        }
        let header = header.trim_end();
        if header.is_empty() {
            break;
        }
        if let Some((name, value)) = header.split_once(':') {
            headers.push((name.trim().to_string(), value.trim().to_string()));
        }
    }

    let request = Request { line, uri, headers };
    let cseq = request.header("CSeq").unwrap_or_default().to_string();
    let chosen = reply(&request);
    seen.lock().unwrap().push(request);

    let response = match chosen {
        Reply::Ok => format!(
            "RTSP/1.0 200 OK\r\nCSeq: {}\r\nContent-Type: application/sdp\r\nContent-Length: 4\r\n\r\nv=0\n",
            cseq
        ),
        Reply::Redirect(status, location) => format!(
            "RTSP/1.0 {} Moved\r\nCSeq: {}\r\nLocation: {}\r\n\r\n",
            status, cseq, location
        ),
        Reply::MultipleLocations(locations) => {
            let mut response = format!("RTSP/1.0 302 Found\r\nCSeq: {}\r\n", cseq);
            for location in locations {
                response.push_str(&format!("Location: {}\r\n", location));
            }
            response + "\r\n"
        }
        Reply::Unauthorized(challenges) => {
            let mut response = format!("RTSP/1.0 401 Unauthorized\r\nCSeq: {}\r\n", cseq);
            for challenge in challenges {
                response.push_str(&format!("WWW-Authenticate: {}\r\n", challenge));
            }
            response + "\r\n"
        }
        Reply::Status(status, reason) => {
            format!("RTSP/1.0 {} {}\r\nCSeq: {}\r\n\r\n", status, reason, cseq)
        }
        Reply::Silent => {
            tokio::time::sleep(Duration::from_secs(30)).await;
            return;
        }
    };

    let _ = stream.write_all(response.as_bytes()).await;
    let _ = stream.flush().await;
    let _ = stream.shutdown().await;
}

fn request_lines(seen: &Seen) -> Vec<String> {
    seen.lock().unwrap().iter().map(|r| r.line.clone()).collect()
}

fn md5_hex(input: &str) -> String {
    format!("{:x}", md5::compute(input.as_bytes()))
}

fn resolver_with_timeout(secs: u64) -> RtspResolver {
    RtspResolver::new(ResolverConfig {
        timeout_secs: secs,
        max_redirects: 5,
        ..ResolverConfig::default()
    })
    .unwrap()
}

#[tokio::test]
async fn redirect_chain_resolves_to_final_hop() {
    let (final_addr, final_seen) = spawn_server(|_| Reply::Ok).await;
    let (middle_addr, _) = {
        let location = format!("rtsp://{}/final", final_addr);
        spawn_server(move |_| Reply::Redirect(301, location.clone())).await
    };
    let (entry_addr, _) = {
        let location = format!("rtsp://{}/middle", middle_addr);
        spawn_server(move |_| Reply::Redirect(302, location.clone())).await
    };

    let original = format!("rtsp://{}/entry", entry_addr);
    let resolved = resolver_with_timeout(5)
        .resolve(&Source::new(original.clone()))
        .await
        .unwrap();

    assert_eq!(resolved.original(), original);
    assert_eq!(resolved.resolved(), format!("rtsp://{}/final", final_addr));
    assert_eq!(
        request_lines(&final_seen),
        [format!("DESCRIBE rtsp://{}/final RTSP/1.0", final_addr)]
    );
}

#[tokio::test]
async fn direct_success_resolves_to_itself() {
    let (addr, seen) = spawn_server(|_| Reply::Ok).await;
    let original = format!("rtsp://{}/live/cam1", addr);

    let resolved = assert_ok!(resolver_with_timeout(5).resolve(&Source::new(original.clone())).await);

    assert_eq!(resolved.resolved(), original);
    assert_eq!(seen.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn rtsps_source_is_dialled_over_tls() {
    let (addr, seen) = spawn_tls_server(|_| Reply::Ok).await;
    let original = format!("rtsps://127.0.0.1:{}/secure", addr.port());

    let resolved = assert_ok!(resolver_with_timeout(5).resolve(&Source::new(original.clone())).await);

    assert_eq!(resolved.resolved(), original);
    assert_eq!(
        request_lines(&seen),
        [format!("DESCRIBE rtsps://127.0.0.1:{}/secure RTSP/1.0", addr.port())]
    );
}

#[tokio::test]
async fn redirect_to_rtsps_is_followed() {
    let (tls_addr, tls_seen) = spawn_tls_server(|_| Reply::Ok).await;
    let (entry_addr, _) = {
        let location = format!("rtsps://127.0.0.1:{}/edge", tls_addr.port());
        spawn_server(move |_| Reply::Redirect(302, location.clone())).await
    };

    let destination = resolver_with_timeout(5)
        .final_destination(&format!("rtsp://{}/entry", entry_addr))
        .await
        .unwrap();

    assert_eq!(
        destination.as_str(),
        format!("rtsps://127.0.0.1:{}/edge", tls_addr.port())
    );
    assert_eq!(tls_seen.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn plain_rtsp_against_tls_server_fails() {
    let (addr, _) = spawn_tls_server(|_| Reply::Ok).await;

    let result = resolver_with_timeout(2)
        .final_destination(&format!("rtsp://{}/s", addr))
        .await;

    assert!(result.is_err());
}

#[tokio::test]
async fn basic_credentials_answer_a_challenge() {
    let (addr, seen) = spawn_server(|request| {
        if request.header("Authorization") == Some("Basic YWRtaW46c2VjcmV0") {
            Reply::Ok
        } else {
            Reply::Unauthorized(vec!["Basic realm=\"camera\""])
        }
    })
    .await;
    let original = format!("rtsp://admin:secret@{}/live", addr);

    let resolved = assert_ok!(resolver_with_timeout(5).resolve(&Source::new(original.clone())).await);

    assert_eq!(resolved.resolved(), original);

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0].header("Authorization"), None);
    assert_eq!(seen[0].header("CSeq"), Some("1"));
    assert_eq!(seen[1].header("CSeq"), Some("2"));
    for request in seen.iter() {
        assert_eq!(request.uri, format!("rtsp://{}/live", addr));
    }
}

#[tokio::test]
async fn digest_credentials_answer_a_challenge() {
    let (addr, seen) = spawn_server(|request| {
        let ha1 = md5_hex("admin:camera:secret");
        let ha2 = md5_hex(&format!("DESCRIBE:{}", request.uri));
        let expected = md5_hex(&format!("{}:f00dcafe:{}", ha1, ha2));

        match request.header("Authorization") {
            Some(value) if value.contains(&format!("response=\"{}\"", expected)) => Reply::Ok,
            _ => Reply::Unauthorized(vec![
                "Basic realm=\"camera\"",
                "Digest realm=\"camera\", nonce=\"f00dcafe\"",
            ]),
        }
    })
    .await;

    let destination = resolver_with_timeout(5)
        .final_destination(&format!("rtsp://admin:secret@{}/live", addr))
        .await
        .unwrap();

    assert_eq!(destination.path(), "/live");

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 2);
    let authorization = seen[1].header("Authorization").unwrap();
    assert!(authorization.starts_with("Digest username=\"admin\", realm=\"camera\""));
    assert!(authorization.contains(&format!("uri=\"rtsp://{}/live\"", addr)));
}

#[tokio::test]
async fn unauthorized_without_credentials_is_a_protocol_error() {
    let (addr, seen) = spawn_server(|_| Reply::Unauthorized(vec!["Basic realm=\"camera\""])).await;

    let err = resolver_with_timeout(5)
        .final_destination(&format!("rtsp://{}/live", addr))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Protocol { status: 401, .. }));
    assert_eq!(seen.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn rejected_credentials_are_tried_once() {
    let (addr, seen) = spawn_server(|_| Reply::Unauthorized(vec!["Basic realm=\"camera\""])).await;

    let err = resolver_with_timeout(5)
        .final_destination(&format!("rtsp://admin:wrong@{}/live", addr))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Protocol { status: 401, .. }));
    assert_eq!(seen.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn relative_location_is_joined() {
    let (addr, _) = spawn_server(|request| {
        if request.uri.ends_with("/old/stream") {
            Reply::Redirect(302, "/new/stream".to_string())
        } else {
            Reply::Ok
        }
    })
    .await;

    let destination = resolver_with_timeout(5)
        .final_destination(&format!("rtsp://{}/old/stream", addr))
        .await
        .unwrap();

    assert_eq!(destination.as_str(), format!("rtsp://{}/new/stream", addr));
}

#[tokio::test]
async fn error_status_is_a_protocol_error() {
    let (addr, _) = spawn_server(|_| Reply::Status(404, "Stream Not Found")).await;

    let err = resolver_with_timeout(5)
        .resolve(&Source::new(format!("rtsp://{}/missing", addr)))
        .await
        .unwrap_err();

    match err {
        Error::Protocol { status, reason } => {
            assert_eq!(status, 404);
            assert_eq!(reason, "Stream Not Found");
        }
        other => panic!("expected protocol error, got {:?}", other),
    }
}

#[tokio::test]
async fn statuses_outside_301_to_305_are_not_followed() {
    for status in [300, 307] {
        let (addr, seen) = spawn_server(move |_| Reply::Redirect(status, "/elsewhere".to_string())).await;

        let err = resolver_with_timeout(5)
            .final_destination(&format!("rtsp://{}/s", addr))
            .await
            .unwrap_err();

        assert!(
            matches!(err, Error::Protocol { status: s, .. } if s == status),
            "{} gave {:?}",
            status,
            err
        );
        assert_eq!(seen.lock().unwrap().len(), 1);
    }
}

#[tokio::test]
async fn redirect_without_location_is_malformed() {
    let (addr, _) = spawn_server(|_| Reply::Status(302, "Found")).await;

    let err = resolver_with_timeout(5)
        .final_destination(&format!("rtsp://{}/s", addr))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::MalformedResponse(_)));
}

#[tokio::test]
async fn redirect_with_two_locations_is_malformed() {
    let (addr, seen) = spawn_server(|_| {
        Reply::MultipleLocations(vec!["/a".to_string(), "/b".to_string()])
    })
    .await;

    let err = resolver_with_timeout(5)
        .final_destination(&format!("rtsp://{}/s", addr))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::MalformedResponse(_)));
    assert_eq!(seen.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn redirect_loop_hits_the_limit() {
    let (addr, seen) = spawn_server(|request| Reply::Redirect(302, request.uri.clone())).await;

    let err = resolver_with_timeout(5)
        .final_destination(&format!("rtsp://{}/loop", addr))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::RedirectLimit(5)));
    // Initial request plus five followed redirects
    assert_eq!(seen.lock().unwrap().len(), 6);
}

#[tokio::test]
async fn silent_server_times_out() {
    let (addr, _) = spawn_server(|_| Reply::Silent).await;

    let err = resolver_with_timeout(1)
        .final_destination(&format!("rtsp://{}/s", addr))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Timeout(d) if d == Duration::from_secs(1)));
}

#[tokio::test]
async fn refused_connection_is_an_io_error() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let err = resolver_with_timeout(5)
        .final_destination(&format!("rtsp://127.0.0.1:{}/s", port))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Io(_)));
}

#[tokio::test]
async fn redirect_to_unsupported_scheme_is_rejected() {
    let (addr, _) = spawn_server(|_| Reply::Redirect(302, "http://example.com/s".to_string())).await;

    let err = resolver_with_timeout(5)
        .final_destination(&format!("rtsp://{}/s", addr))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::InvalidAddress(_)));
}
