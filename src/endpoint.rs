//! Endpoint parsing for wstr:// and host:port addresses

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;
use crate::protocol::DEFAULT_PORT;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Address string suitable for `TcpStream::connect`
    pub fn connect_addr(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.connect_addr())
    }
}

/// Accepts `host`, `host:port`, `[v6]:port` and an optional `wstr://` scheme.
/// A missing port defaults to 9001.
pub fn parse_endpoint(input: &str) -> Result<Endpoint, ConfigError> {
    let reject = |reason: &str| ConfigError::Endpoint {
        input: input.to_string(),
        reason: reason.to_string(),
    };

    let s = input.trim();
    let lower = s.to_ascii_lowercase();
    let mut rest = if lower.starts_with("wstr://") {
        &s["wstr://".len()..]
    } else if lower.contains("://") {
        return Err(reject("unsupported scheme"));
    } else {
        s
    };
    rest = rest.trim_end_matches('/');

    let (host, port) = if let Some(v6) = rest.strip_prefix('[') {
        let (host, after) = v6
            .split_once(']')
            .ok_or_else(|| reject("unterminated IPv6 bracket"))?;
        match after.strip_prefix(':') {
            Some(p) => (host, Some(p)),
            None if after.is_empty() => (host, None),
            None => return Err(reject("unexpected text after IPv6 address")),
        }
    } else {
        match rest.rsplit_once(':') {
            Some((h, p)) => (h, Some(p)),
            None => (rest, None),
        }
    };

    if host.is_empty() {
        return Err(reject("host is empty"));
    }
    if host.contains(':') && !rest.starts_with('[') {
        return Err(reject("IPv6 address must be bracketed"));
    }
    let port = match port {
        Some(p) => p.parse::<u16>().map_err(|_| reject("invalid port"))?,
        None => DEFAULT_PORT,
    };
    Ok(Endpoint::new(host, port))
}

impl FromStr for Endpoint {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_endpoint(s)
    }
}

impl Serialize for Endpoint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.connect_addr())
    }
}

impl<'de> Deserialize<'de> for Endpoint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        parse_endpoint(&s).map_err(serde::de::Error::custom)
    }
}
