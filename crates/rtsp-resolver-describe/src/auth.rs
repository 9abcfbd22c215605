//! RTSP authentication (RFC 2617 Basic and Digest)
//!
//! Credentials come from the userinfo of the stream address. When a DESCRIBE
//! is answered with 401, the `WWW-Authenticate` challenges are turned into an
//! `Authorization` header for one retry of the same request.
//!
//! Digest supports MD5 with and without `qop=auth`. Other algorithms
//! (MD5-sess, SHA-256) are skipped in favour of a Basic challenge, if offered.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::borrow::Cow;
use std::time::{SystemTime, UNIX_EPOCH};
use url::Url;

/// Username and password taken from a stream address
#[derive(Clone, PartialEq, Eq)]
pub(crate) struct Credentials {
    username: String,
    password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Percent-decoded userinfo of `url`, if it carries a username
    pub fn from_url(url: &Url) -> Option<Self> {
        if url.username().is_empty() {
            return None;
        }

        Some(Self::new(
            decode(url.username()),
            decode(url.password().unwrap_or_default()),
        ))
    }

    /// `Authorization` value answering one of `challenges`
    ///
    /// Digest is preferred over Basic; `None` when no challenge is usable.
    pub fn authorize<'a, I>(&self, challenges: I, method: &str, uri: &str) -> Option<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut basic = false;

        for challenge in challenges {
            let (scheme, params) = challenge
                .trim()
                .split_once(' ')
                .unwrap_or((challenge.trim(), ""));

            if scheme.eq_ignore_ascii_case("Digest") {
                if let Some(digest) = DigestChallenge::parse(params) {
                    return Some(digest.authorization(self, method, uri, &cnonce(), "00000001"));
                }
            } else if scheme.eq_ignore_ascii_case("Basic") {
                basic = true;
            }
        }

        basic.then(|| self.basic())
    }

    fn basic(&self) -> String {
        let token = STANDARD.encode(format!("{}:{}", self.username, self.password));
        format!("Basic {}", token)
    }
}

/// The parameters of a `WWW-Authenticate: Digest` challenge
#[derive(Debug, Clone, PartialEq, Eq)]
struct DigestChallenge {
    realm: String,
    nonce: String,
    opaque: Option<String>,
    qop_auth: bool,
    algorithm: Option<String>,
}

impl DigestChallenge {
    /// Parse the part after `Digest `; `None` if unusable
    fn parse(params: &str) -> Option<Self> {
        let mut challenge = Self {
            realm: String::new(),
            nonce: String::new(),
            opaque: None,
            qop_auth: false,
            algorithm: None,
        };

        for part in split_params(params) {
            let (key, value) = parse_param(part)?;
            match key.to_lowercase().as_str() {
                "realm" => challenge.realm = value.to_string(),
                "nonce" => challenge.nonce = value.to_string(),
                "opaque" => challenge.opaque = Some(value.to_string()),
                "qop" => {
                    challenge.qop_auth = value
                        .split(',')
                        .any(|qop| qop.trim().eq_ignore_ascii_case("auth"));
                }
                "algorithm" => {
                    if !value.eq_ignore_ascii_case("MD5") {
                        return None;
                    }
                    challenge.algorithm = Some(value.to_string());
                }
                _ => {}
            }
        }

        if challenge.nonce.is_empty() {
            return None;
        }

        Some(challenge)
    }

    fn response(
        &self,
        credentials: &Credentials,
        method: &str,
        uri: &str,
        cnonce: &str,
        nc: &str,
    ) -> String {
        let ha1 = md5_hex(&format!(
            "{}:{}:{}",
            credentials.username, self.realm, credentials.password
        ));
        let ha2 = md5_hex(&format!("{}:{}", method, uri));

        if self.qop_auth {
            md5_hex(&format!("{}:{}:{}:{}:auth:{}", ha1, self.nonce, nc, cnonce, ha2))
        } else {
            md5_hex(&format!("{}:{}:{}", ha1, self.nonce, ha2))
        }
    }

    fn authorization(
        &self,
        credentials: &Credentials,
        method: &str,
        uri: &str,
        cnonce: &str,
        nc: &str,
    ) -> String {
        let response = self.response(credentials, method, uri, cnonce, nc);

        let mut value = format!(
            "Digest username=\"{}\", realm=\"{}\", nonce=\"{}\", uri=\"{}\", response=\"{}\"",
            credentials.username, self.realm, self.nonce, uri, response
        );
        if let Some(algorithm) = &self.algorithm {
            value.push_str(&format!(", algorithm={}", algorithm));
        }
        if let Some(opaque) = &self.opaque {
            value.push_str(&format!(", opaque=\"{}\"", opaque));
        }
        if self.qop_auth {
            value.push_str(&format!(", qop=auth, nc={}, cnonce=\"{}\"", nc, cnonce));
        }

        value
    }
}

/// Split on commas outside quoted strings
fn split_params(params: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut in_quotes = false;

    for (i, c) in params.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                let part = params[start..i].trim();
                if !part.is_empty() {
                    parts.push(part);
                }
                start = i + 1;
            }
            _ => {}
        }
    }

    let part = params[start..].trim();
    if !part.is_empty() {
        parts.push(part);
    }

    parts
}

/// `key=value` or `key="value"`
fn parse_param(param: &str) -> Option<(&str, &str)> {
    let (key, value) = param.split_once('=')?;
    let value = value.trim();
    let value = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value);
    Some((key.trim(), value))
}

fn md5_hex(input: &str) -> String {
    format!("{:x}", md5::compute(input.as_bytes()))
}

fn cnonce() -> String {
    let seed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    format!("{:016x}", seed as u64)
}

fn decode(value: &str) -> String {
    urlencoding::decode(value)
        .map(Cow::into_owned)
        .unwrap_or_else(|_| value.to_string())
}
