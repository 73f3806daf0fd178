use axum::http::HeaderMap;

// Bucket shared by every request that carries no forwarding headers
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Resolve the rate limit identifier for a request.
///
/// Preference order: Cloudflare's `cf-connecting-ip`, then `x-real-ip`, then the
/// leftmost entry of `x-forwarded-for`. Requests with none of them all share the
/// [`UNKNOWN_CLIENT`] bucket.
pub fn client_identifier(headers: &HeaderMap) -> String {
    from_header(headers, "cf-connecting-ip")
        .or_else(|| from_header(headers, "x-real-ip"))
        .or_else(|| from_forwarded_for(headers))
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

fn from_header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

// X-Forwarded-For can contain multiple IPs: "client, proxy1, proxy2"
fn from_forwarded_for(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.split(',').next())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, value.parse().unwrap());
        }
        map
    }

    #[test]
    fn cloudflare_header_wins() {
        let h = headers(&[
            ("x-forwarded-for", "9.9.9.9"),
            ("x-real-ip", "8.8.8.8"),
            ("cf-connecting-ip", "1.2.3.4"),
        ]);
        assert_eq!(client_identifier(&h), "1.2.3.4");
    }

    #[test]
    fn real_ip_before_forwarded_for() {
        let h = headers(&[("x-forwarded-for", "9.9.9.9"), ("x-real-ip", " 8.8.8.8 ")]);
        assert_eq!(client_identifier(&h), "8.8.8.8");
    }

    #[test]
    fn forwarded_for_takes_leftmost_entry() {
        let h = headers(&[("x-forwarded-for", " 203.0.113.7 , 10.0.0.1, 10.0.0.2")]);
        assert_eq!(client_identifier(&h), "203.0.113.7");
    }

    #[test]
    fn empty_header_falls_through() {
        let h = headers(&[("cf-connecting-ip", ""), ("x-real-ip", "8.8.8.8")]);
        assert_eq!(client_identifier(&h), "8.8.8.8");
    }

    #[test]
    fn no_headers_share_unknown_bucket() {
        assert_eq!(client_identifier(&HeaderMap::new()), UNKNOWN_CLIENT);
    }
}
