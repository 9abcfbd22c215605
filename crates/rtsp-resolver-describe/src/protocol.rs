//! Minimal RTSP/1.0 message handling
//!
//! Only what a DESCRIBE exchange needs: building the request and reading the
//! status line plus headers of the response.

use rtsp_resolver_core::{Error, Result};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};
use url::Url;

/// Upper bound on header lines accepted in one response
const MAX_HEADER_LINES: usize = 64;

/// Upper bound on a single status or header line, terminator included
pub(crate) const MAX_LINE_BYTES: u64 = 8 * 1024;

/// Upper bound on the whole header section, status line included
pub(crate) const MAX_HEADER_BYTES: u64 = 32 * 1024;

/// Upper bound on a response body that is drained
const MAX_BODY_BYTES: u64 = 1 << 20;

/// Status line and headers of an RTSP response
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Response {
    pub status: u16,
    pub reason: String,
    pub headers: Vec<(String, String)>,
}

impl Response {
    /// Case-insensitive header lookup, first match wins
    pub fn header(&self, name: &str) -> Option<&str> {
        self.header_values(name).next()
    }

    /// Every value of a header that may repeat, in arrival order
    pub fn header_values<'a, 'n>(&'a self, name: &'n str) -> impl Iterator<Item = &'a str> {
        self.headers
            .iter()
            .filter(move |(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// 301 to 305; whether it can be followed is settled by `location`
    pub fn is_redirect(&self) -> bool {
        (301..=305).contains(&self.status)
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status == 401
    }

    /// The one `Location` of a redirect
    pub fn location(&self) -> Result<&str> {
        let mut values = self.header_values("Location");
        match (values.next(), values.next()) {
            (Some(location), None) => Ok(location),
            (None, _) => Err(Error::malformed(format!(
                "{} {} without Location",
                self.status, self.reason
            ))),
            (Some(_), Some(_)) => Err(Error::malformed(format!(
                "{} {} with more than one Location",
                self.status, self.reason
            ))),
        }
    }
}

/// The request target for `url`: the address with any userinfo removed
pub(crate) fn request_target(url: &Url) -> Result<String> {
    let mut target = url.clone();
    target
        .set_username("")
        .and_then(|()| target.set_password(None))
        .map_err(|()| Error::invalid_address(format!("no host in {}", url)))?;
    Ok(target.to_string())
}

/// Build a DESCRIBE request for `target`
pub(crate) fn describe_request(
    target: &str,
    cseq: u32,
    user_agent: &str,
    authorization: Option<&str>,
) -> String {
    let mut request = format!(
        "DESCRIBE {} RTSP/1.0\r\nCSeq: {}\r\nUser-Agent: {}\r\nAccept: application/sdp\r\n",
        target, cseq, user_agent
    );
    if let Some(authorization) = authorization {
        request.push_str(&format!("Authorization: {}\r\n", authorization));
    }
    request.push_str("\r\n");
    request
}

/// Parse `RTSP/1.0 302 Moved Temporarily` into (302, "Moved Temporarily")
pub(crate) fn parse_status_line(line: &str) -> Result<(u16, String)> {
    let line = line.trim_end_matches(['\r', '\n']);
    let mut parts = line.splitn(3, ' ');

    let version = parts.next().unwrap_or_default();
    if !version.starts_with("RTSP/") {
        return Err(Error::malformed(format!("not an RTSP status line: {:?}", line)));
    }

    let status = parts
        .next()
        .and_then(|code| code.parse::<u16>().ok())
        .filter(|code| (100..600).contains(code))
        .ok_or_else(|| Error::malformed(format!("bad status code in {:?}", line)))?;

    let reason = parts.next().unwrap_or_default().trim().to_string();

    Ok((status, reason))
}

fn parse_header_line(line: &str) -> Result<(String, String)> {
    let (name, value) = line
        .split_once(':')
        .ok_or_else(|| Error::malformed(format!("bad header line: {:?}", line)))?;

    let name = name.trim();
    if name.is_empty() {
        return Err(Error::malformed(format!("empty header name: {:?}", line)));
    }

    Ok((name.to_string(), value.trim().to_string()))
}

/// Read one line of at most `limit` bytes into `line`
///
/// Returns the bytes consumed; 0 means the peer closed the connection.
async fn read_capped_line<R>(reader: &mut R, line: &mut String, limit: u64) -> Result<u64>
where
    R: AsyncBufRead + Unpin,
{
    line.clear();
    let read = (&mut *reader).take(limit).read_line(line).await? as u64;

    if read == limit && !line.ends_with('\n') {
        return Err(if limit < MAX_LINE_BYTES {
            Error::malformed(format!("header section exceeds {} bytes", MAX_HEADER_BYTES))
        } else {
            Error::malformed(format!("line exceeds {} bytes", MAX_LINE_BYTES))
        });
    }

    Ok(read)
}

/// Read one response
///
/// A `Content-Length` body (the SDP) is read and discarded so the exchange is
/// complete before the connection is dropped.
pub(crate) async fn read_response<R>(reader: &mut R) -> Result<Response>
where
    R: AsyncBufRead + Unpin,
{
    let mut budget = MAX_HEADER_BYTES;
    let mut line = String::new();

    let read = read_capped_line(reader, &mut line, MAX_LINE_BYTES.min(budget)).await?;
    if read == 0 {
        return Err(Error::malformed("connection closed before response"));
    }
    budget -= read;
    let (status, reason) = parse_status_line(&line)?;

    let mut headers = Vec::new();
    loop {
        if budget == 0 {
            return Err(Error::malformed(format!(
                "header section exceeds {} bytes",
                MAX_HEADER_BYTES
            )));
        }

        let read = read_capped_line(reader, &mut line, MAX_LINE_BYTES.min(budget)).await?;
        if read == 0 {
            return Err(Error::malformed("connection closed inside headers"));
        }
        budget -= read;

        let trimmed = line.trim_end_matches(['\r', '\n']);
        if trimmed.is_empty() {
            break;
        }

        if headers.len() == MAX_HEADER_LINES {
            return Err(Error::malformed("too many header lines"));
        }
        headers.push(parse_header_line(trimmed)?);
    }

    let response = Response {
        status,
        reason,
        headers,
    };

    let body_len = match response.header("Content-Length") {
        Some(value) => value
            .parse::<u64>()
            .map_err(|_| Error::malformed(format!("bad Content-Length {:?}", value)))?,
        None => 0,
    };
    if body_len > MAX_BODY_BYTES {
        return Err(Error::malformed(format!("body too large: {} bytes", body_len)));
    }

    let drained = tokio::io::copy(&mut (&mut *reader).take(body_len), &mut tokio::io::sink()).await?;
    if drained != body_len {
        return Err(Error::malformed(format!(
            "body truncated: expected {} bytes, got {}",
            body_len, drained
        )));
    }

    Ok(response)
}
