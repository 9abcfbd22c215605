// # RTSP DESCRIBE Resolver
//
// This crate provides the RTSP implementation of the `Resolver` trait.
//
// ## Algorithm
//
// 1. Parse the address into scheme, host, port and path
// 2. Connect to host:port (554 for `rtsp`, 322 for `rtsps` when no port is
//    given); `rtsps` runs the exchange over TLS
// 3. Send DESCRIBE for the resource
// 4. On 401 with credentials in the address, answer the challenge (Digest or
//    Basic) once on a fresh connection
// 5. On 301-305 with a single `Location`, follow it on a fresh connection, up
//    to `max_redirects` hops
// 6. On 2xx, the URL that was served is the resolved address
// 7. Anything else is a protocol error
//
// The whole exchange, every hop included, shares one deadline (15 seconds by
// default). A single call makes a single attempt: retries only happen through
// the next refresh cycle.
//
// ## Limitations
//
// - `rtsps` accepts any server certificate
// - Digest authentication supports MD5 only

mod auth;
mod protocol;
mod tls;

use async_trait::async_trait;
use auth::Credentials;
use rtsp_resolver_core::{Error, Resolver, ResolverConfig, Result, Source};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tracing::debug;
use url::{Host, Url};

/// Default RTSP port
pub const DEFAULT_RTSP_PORT: u16 = 554;

/// Default RTSP-over-TLS port
pub const DEFAULT_RTSPS_PORT: u16 = 322;

/// Resolver speaking RTSP DESCRIBE with redirect following
#[derive(Debug, Clone)]
pub struct RtspResolver {
    config: ResolverConfig,
}

impl RtspResolver {
    /// Create a resolver
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `config` fails validation.
    pub fn new(config: ResolverConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Find the URL that finally serves `address`
    pub async fn final_destination(&self, address: &str) -> Result<Url> {
        let start = parse_address(address)?;
        let timeout = self.config.timeout();

        tokio::time::timeout(timeout, self.follow(start))
            .await
            .map_err(|_| Error::Timeout(timeout))?
    }

    async fn follow(&self, mut url: Url) -> Result<Url> {
        let mut cseq = 1;

        for hop in 0..=self.config.max_redirects {
            let mut response = self.describe(&url, cseq, None).await?;
            cseq += 1;

            if response.is_unauthorized()
                && let Some(credentials) = Credentials::from_url(&url)
            {
                let target = protocol::request_target(&url)?;
                let authorization = credentials.authorize(
                    response.header_values("WWW-Authenticate"),
                    "DESCRIBE",
                    &target,
                );

                match authorization {
                    Some(authorization) => {
                        debug!("{} requires authentication, retrying", target);
                        response = self.describe(&url, cseq, Some(&authorization)).await?;
                        cseq += 1;
                    }
                    None => debug!("{} offers no supported authentication scheme", target),
                }
            }

            if response.is_success() {
                return Ok(url);
            }

            if !response.is_redirect() {
                return Err(Error::protocol(response.status, response.reason));
            }

            let location = response.location()?;
            let next = url
                .join(location)
                .map_err(|e| Error::malformed(format!("bad Location {:?}: {}", location, e)))?;
            check_scheme(&next)?;

            debug!("{} redirected to {} (hop {})", url, next, hop + 1);
            url = next;
        }

        Err(Error::RedirectLimit(self.config.max_redirects))
    }

    async fn describe(
        &self,
        url: &Url,
        cseq: u32,
        authorization: Option<&str>,
    ) -> Result<protocol::Response> {
        let host = match url.host() {
            Some(Host::Domain(domain)) => domain.to_string(),
            Some(Host::Ipv4(addr)) => addr.to_string(),
            Some(Host::Ipv6(addr)) => addr.to_string(),
            None => return Err(Error::invalid_address(format!("no host in {}", url))),
        };
        let secure = url.scheme() == "rtsps";
        let port = url
            .port()
            .unwrap_or(if secure { DEFAULT_RTSPS_PORT } else { DEFAULT_RTSP_PORT });

        let target = protocol::request_target(url)?;
        let request =
            protocol::describe_request(&target, cseq, &self.config.user_agent, authorization);

        let tcp = TcpStream::connect((host.as_str(), port)).await?;
        let response = if secure {
            exchange(tls::connect(&host, tcp).await?, &request).await?
        } else {
            exchange(tcp, &request).await?
        };

        if let Some(echoed) = response.header("CSeq")
            && echoed != cseq.to_string()
        {
            return Err(Error::malformed(format!(
                "CSeq mismatch: sent {}, got {}",
                cseq, echoed
            )));
        }

        Ok(response)
    }
}

/// Send one request and read its response
async fn exchange<S>(stream: S, request: &str) -> Result<protocol::Response>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut stream = BufReader::new(stream);
    stream.write_all(request.as_bytes()).await?;
    stream.flush().await?;

    protocol::read_response(&mut stream).await
}

impl Default for RtspResolver {
    fn default() -> Self {
        Self {
            config: ResolverConfig::default(),
        }
    }
}

#[async_trait]
impl Resolver for RtspResolver {
    async fn resolve(&self, source: &Source) -> Result<Source> {
        let destination = self.final_destination(source.original()).await?;
        Ok(source.resolve_to(destination.to_string()))
    }

    fn resolver_name(&self) -> &'static str {
        "rtsp"
    }
}

fn check_scheme(url: &Url) -> Result<()> {
    match url.scheme() {
        "rtsp" | "rtsps" => Ok(()),
        other => Err(Error::invalid_address(format!(
            "unsupported scheme {:?} in {}",
            other, url
        ))),
    }
}

/// Parse and check a stream address
fn parse_address(address: &str) -> Result<Url> {
    let url = Url::parse(address)
        .map_err(|e| Error::invalid_address(format!("{}: {}", address, e)))?;

    check_scheme(&url)?;

    if url.host().is_none() {
        return Err(Error::invalid_address(format!("no host in {}", address)));
    }

    Ok(url)
}
