use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::HeaderMap;
use axum::http::request::Parts;
use std::convert::Infallible;
use std::net::SocketAddr;

// Shared bucket for callers we cannot tell apart
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Caller identity used as the rate-limit key.
///
/// Resolution order: first `x-forwarded-for` entry, `x-real-ip`, socket peer,
/// then [`UNKNOWN_CLIENT`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientId(pub String);

impl ClientId {
    pub fn resolve(headers: &HeaderMap, peer: Option<SocketAddr>) -> Self {
        let forwarded = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty());
        let real_ip = headers
            .get("x-real-ip")
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty());

        if let Some(ip) = forwarded.or(real_ip) {
            return Self(ip.to_string());
        }
        if let Some(peer) = peer {
            return Self(peer.ip().to_string());
        }
        tracing::warn!("no client address available, using the shared rate-limit bucket");
        Self(UNKNOWN_CLIENT.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<S> FromRequestParts<S> for ClientId
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);
        Ok(Self::resolve(&parts.headers, peer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn first_forwarded_entry_wins() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static(" 203.0.113.7 , 10.0.0.1"));
        headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.2"));
        let peer: SocketAddr = "127.0.0.1:5000".parse().unwrap();
        assert_eq!(ClientId::resolve(&headers, Some(peer)).as_str(), "203.0.113.7");
    }

    #[test]
    fn falls_back_to_real_ip_then_peer() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.2"));
        assert_eq!(ClientId::resolve(&headers, None).as_str(), "10.0.0.2");

        let peer: SocketAddr = "192.0.2.10:443".parse().unwrap();
        assert_eq!(ClientId::resolve(&HeaderMap::new(), Some(peer)).as_str(), "192.0.2.10");
    }

    #[test]
    fn unknown_when_nothing_identifies_the_caller() {
        assert_eq!(ClientId::resolve(&HeaderMap::new(), None).as_str(), UNKNOWN_CLIENT);
    }
}
