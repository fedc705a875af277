//! IP address validation and client address resolution

use std::collections::HashMap;
use std::net::IpAddr;
use thiserror::Error;

/// Errors from address handling
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    #[error("Invalid IP address: {0:?}")]
    Invalid(String),
}

/// Validate an IPv4 or IPv6 literal and lowercase it.
///
/// The textual form is kept as given (no canonicalization), so `::FFFF:1.2.3.4`
/// becomes `::ffff:1.2.3.4` rather than being rewritten.
pub fn normalize_address(address: &str) -> Result<String, AddressError> {
    if address.is_empty() || address.parse::<IpAddr>().is_err() {
        return Err(AddressError::Invalid(address.to_string()));
    }
    Ok(address.to_lowercase())
}

/// Headers set by proxies, in order of preference
const PROXY_HEADERS: &[&str] = &[
    "x-forwarded-for",
    "x-forwarded",
    "forwarded-for",
    "forwarded",
];

/// Header some clients and load balancers use for the originating address
const CLIENT_IP_HEADER: &str = "client-ip";

/// Request headers with case-insensitive names
#[derive(Debug, Clone, Default)]
pub struct RequestHeaders {
    values: HashMap<String, String>,
}

impl RequestHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a header, replacing any previous value under the same name
    pub fn with(mut self, name: &str, value: &str) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: &str, value: &str) {
        self.values.insert(name.to_lowercase(), value.to_string());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(&name.to_lowercase()).map(String::as_str)
    }
}

impl<K: AsRef<str>, V: AsRef<str>> FromIterator<(K, V)> for RequestHeaders {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Self::new();
        for (name, value) in iter {
            headers.insert(name.as_ref(), value.as_ref());
        }
        headers
    }
}

/// Resolve the client's IP address for a request.
///
/// With `trust_proxy`, forwarding headers are consulted first so the address
/// of the client behind a proxy is returned. `Client-IP` and then the socket
/// peer address are used as fallbacks. Only the first entry of a
/// comma-separated list is considered; invalid values are skipped.
pub fn client_address(
    headers: &RequestHeaders,
    remote_addr: Option<&str>,
    trust_proxy: bool,
) -> Option<String> {
    let proxied: &[&str] = if trust_proxy { PROXY_HEADERS } else { &[] };

    proxied
        .iter()
        .chain(std::iter::once(&CLIENT_IP_HEADER))
        .filter_map(|name| headers.get(name))
        .chain(remote_addr)
        .find_map(first_valid_entry)
}

fn first_valid_entry(value: &str) -> Option<String> {
    let candidate = value.split(',').next()?.trim();
    normalize_address(candidate).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_lowercases_ipv6() {
        assert_eq!(normalize_address("2001:DB8::1").unwrap(), "2001:db8::1");
        assert_eq!(normalize_address("89.234.157.254").unwrap(), "89.234.157.254");
    }

    #[test]
    fn test_normalize_rejects_garbage() {
        for bad in ["", "not-an-ip", "256.1.1.1", "1.2.3", "1.2.3.4 ", "::g"] {
            assert_eq!(
                normalize_address(bad),
                Err(AddressError::Invalid(bad.to_string())),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_client_address_prefers_forwarded_for() {
        let headers = RequestHeaders::new()
            .with("X-Forwarded-For", "203.0.113.7, 10.0.0.1")
            .with("Client-IP", "198.51.100.2");

        let addr = client_address(&headers, Some("10.0.0.1"), true);
        assert_eq!(addr.as_deref(), Some("203.0.113.7"));
    }

    #[test]
    fn test_client_address_ignores_proxy_headers_when_untrusted() {
        let headers = RequestHeaders::new().with("X-Forwarded-For", "203.0.113.7");

        let addr = client_address(&headers, Some("192.0.2.10"), false);
        assert_eq!(addr.as_deref(), Some("192.0.2.10"));
    }

    #[test]
    fn test_client_address_skips_invalid_values() {
        let headers: RequestHeaders = [
            ("x-forwarded-for", "unknown"),
            ("forwarded", "2001:DB8::5"),
        ]
        .into_iter()
        .collect();

        let addr = client_address(&headers, None, true);
        assert_eq!(addr.as_deref(), Some("2001:db8::5"));
    }

    #[test]
    fn test_client_address_none_when_nothing_valid() {
        let headers = RequestHeaders::new().with("Client-IP", "garbage");
        assert_eq!(client_address(&headers, Some(""), true), None);
    }
}
