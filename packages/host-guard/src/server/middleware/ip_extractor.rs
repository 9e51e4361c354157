use axum::{
    extract::{ConnectInfo, Request},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

/// Extension key for the caller's address
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClientIp(pub IpAddr);

/// Proxies whose forwarding headers are believed. Empty means none.
#[derive(Clone, Debug, Default)]
pub struct TrustedProxies(Arc<[IpAddr]>);

impl TrustedProxies {
    pub fn new(proxies: Vec<IpAddr>) -> Self {
        Self(proxies.into())
    }

    pub fn contains(&self, ip: &IpAddr) -> bool {
        self.0.contains(ip)
    }
}

/// Middleware to record the client IP in request extensions
///
/// Used as the `requester` in consent prompts and audit logs. Requests
/// without connect info get no [`ClientIp`].
pub async fn extract_client_ip(trusted: TrustedProxies, mut request: Request, next: Next) -> Response {
    let socket = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());

    if let Some(socket) = socket {
        let ip = client_ip(request.headers(), socket, &trusted);
        request.extensions_mut().insert(ClientIp(ip));
    }
    next.run(request).await
}

/// Resolve the client address
///
/// The socket address, unless the peer is a trusted proxy. Behind one:
/// 1. Right-most X-Forwarded-For entry that is not itself a trusted proxy
/// 2. X-Real-IP
/// 3. Socket address
///
/// Unparseable header values fall through to the next source.
pub fn client_ip(headers: &HeaderMap, socket: IpAddr, trusted: &TrustedProxies) -> IpAddr {
    if !trusted.contains(&socket) {
        return socket;
    }

    // Hops are appended left to right; only the ones our proxies added are
    // trustworthy, so walk back from the right.
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| {
            value
                .rsplit(',')
                .map(|hop| hop.trim().parse::<IpAddr>())
                .find(|hop| !matches!(hop, Ok(ip) if trusted.contains(ip)))
        })
        .and_then(Result::ok);

    let real_ip = || {
        headers
            .get("x-real-ip")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<IpAddr>().ok())
    };

    forwarded.or_else(real_ip).unwrap_or(socket)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn test_headers_ignored_from_untrusted_peer() {
        let map = headers(&[
            ("x-forwarded-for", "203.0.113.10"),
            ("x-real-ip", "198.51.100.4"),
        ]);
        let socket = ip("8.8.8.8");

        assert_eq!(client_ip(&map, socket, &TrustedProxies::default()), socket);
    }

    #[test]
    fn test_trusted_proxy_uses_rightmost_untrusted_hop() {
        let proxy = ip("10.0.0.1");
        let trusted = TrustedProxies::new(vec![proxy, ip("10.0.0.2")]);
        // Client spoofed the first entry; our proxies appended the rest
        let map = headers(&[("x-forwarded-for", "1.2.3.4, 203.0.113.7, 10.0.0.2")]);

        assert_eq!(client_ip(&map, proxy, &trusted), ip("203.0.113.7"));
    }

    #[test]
    fn test_trusted_proxy_falls_back_to_real_ip_then_socket() {
        let proxy = ip("10.0.0.1");
        let trusted = TrustedProxies::new(vec![proxy]);

        let map = headers(&[("x-real-ip", "198.51.100.4")]);
        assert_eq!(client_ip(&map, proxy, &trusted), ip("198.51.100.4"));

        let map = headers(&[("x-forwarded-for", "not-an-ip")]);
        assert_eq!(client_ip(&map, proxy, &trusted), proxy);

        assert_eq!(client_ip(&HeaderMap::new(), proxy, &trusted), proxy);
    }
}
