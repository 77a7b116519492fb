use std::net::IpAddr;
use thiserror::Error;
use url::Url;

/// Errors that can occur while validating an upstream URL.
///
/// Covers parse failures and the policy checks that stop the audio proxy
/// from being pointed at internal hosts (SSRF).
#[derive(Error, Debug)]
pub enum UrlValidationError {
    /// The URL string could not be parsed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    /// The URL uses a scheme other than http or https.
    #[error("Unsupported scheme: {0} (only http/https allowed)")]
    UnsupportedScheme(String),
    /// The URL has no host component.
    #[error("URL has no host")]
    MissingHost,
    /// The URL points to a private/internal IP address.
    #[error("Private IP address not allowed: {0}")]
    PrivateIp(String),
    /// The URL points to localhost.
    #[error("Localhost not allowed")]
    Localhost,
}

/// Parses and validates a URL the server is about to fetch on a client's
/// behalf.
///
/// Rejects non-HTTP(S) schemes and URLs without a host. Unless
/// `allow_private` is set, also rejects `localhost`, loopback, and private
/// or link-local IP literals.
///
/// # Examples
///
/// ```
/// use podcast_site::util::validate_upstream_url;
///
/// let url = validate_upstream_url("https://cdn.example.com/ep.mp3", false).unwrap();
/// assert_eq!(url.host_str(), Some("cdn.example.com"));
///
/// assert!(validate_upstream_url("http://localhost/ep.mp3", false).is_err());
/// assert!(validate_upstream_url("http://192.168.1.1/ep.mp3", false).is_err());
/// assert!(validate_upstream_url("http://127.0.0.1:8080/ep.mp3", true).is_ok());
/// ```
pub fn validate_upstream_url(url_str: &str, allow_private: bool) -> Result<Url, UrlValidationError> {
    let url = Url::parse(url_str)?;

    match url.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlValidationError::UnsupportedScheme(scheme.to_owned())),
    }

    let host = match url.host_str() {
        Some(host) if !host.is_empty() => host,
        _ => return Err(UrlValidationError::MissingHost),
    };

    if allow_private {
        return Ok(url);
    }

    if host.eq_ignore_ascii_case("localhost") {
        return Err(UrlValidationError::Localhost);
    }

    // Strip brackets from IPv6 addresses for parsing
    let host_for_parse = host
        .strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(host);

    if let Ok(ip) = host_for_parse.parse::<IpAddr>() {
        if ip.is_loopback() {
            return Err(UrlValidationError::Localhost);
        }
        if is_private_ip(&ip) {
            return Err(UrlValidationError::PrivateIp(ip.to_string()));
        }
    }

    Ok(url)
}

fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(ipv4) => {
            ipv4.is_private() || ipv4.is_loopback() || ipv4.is_link_local() || ipv4.is_unspecified()
        }
        IpAddr::V6(ipv6) => {
            if ipv6.is_loopback() || ipv6.is_unspecified() {
                return true;
            }
            let segments = ipv6.segments();
            // Unique Local (fc00::/7)
            let is_unique_local = (segments[0] & 0xfe00) == 0xfc00;
            // Link-Local (fe80::/10)
            let is_link_local = (segments[0] & 0xffc0) == 0xfe80;
            is_unique_local || is_link_local
        }
    }
}
