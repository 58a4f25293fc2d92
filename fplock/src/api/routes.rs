//! Route table and matching
//!
//! {method, path-template} pairs with single-segment `{name}` placeholders.
//! First match wins; a bare GET / falls back to a liveness response.

use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    ListFingerprints,
    EnrollFingerprint,
    DeleteFingerprint,
    ServoUnlock,
    ServoLock,
    ServoStatus,
    MonitorStart,
    MonitorStop,
    MonitorStatus,
    ListLogs,
    GetLog,
    Liveness,
}

const ROUTES: &[(&str, &str, Route)] = &[
    ("GET", "/fingerprints", Route::ListFingerprints),
    ("POST", "/fingerprints", Route::EnrollFingerprint),
    ("DELETE", "/fingerprints/{id}", Route::DeleteFingerprint),
    ("POST", "/servo/unlock", Route::ServoUnlock),
    ("POST", "/servo/lock", Route::ServoLock),
    ("GET", "/servo/status", Route::ServoStatus),
    ("POST", "/monitoring/start", Route::MonitorStart),
    ("POST", "/monitoring/stop", Route::MonitorStop),
    ("GET", "/monitoring/status", Route::MonitorStatus),
    ("GET", "/logs", Route::ListLogs),
    ("GET", "/logs/{name}", Route::GetLog),
];

/// Match a request against the route table
pub fn match_route(method: &str, path: &str) -> Option<(Route, HashMap<String, String>)> {
    for (route_method, pattern, route) in ROUTES {
        if *route_method != method {
            continue;
        }
        if let Some(params) = match_pattern(pattern, path) {
            return Some((*route, params));
        }
    }

    if method == "GET" && path == "/" {
        return Some((Route::Liveness, HashMap::new()));
    }

    None
}

fn match_pattern(pattern: &str, path: &str) -> Option<HashMap<String, String>> {
    let pattern_parts: Vec<&str> = pattern.trim_matches('/').split('/').collect();
    let path_parts: Vec<&str> = path.trim_matches('/').split('/').collect();

    if pattern_parts.len() != path_parts.len() {
        return None;
    }

    let mut params = HashMap::new();
    for (pattern_part, path_part) in pattern_parts.iter().zip(&path_parts) {
        if let Some(name) = pattern_part
            .strip_prefix('{')
            .and_then(|p| p.strip_suffix('}'))
        {
            if path_part.is_empty() {
                return None;
            }
            params.insert(name.to_string(), (*path_part).to_string());
        } else if pattern_part != path_part {
            return None;
        }
    }

    Some(params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_exact_routes() {
        let (route, params) = match_route("GET", "/fingerprints").unwrap();
        assert_eq!(route, Route::ListFingerprints);
        assert!(params.is_empty());

        let (route, _) = match_route("POST", "/monitoring/stop").unwrap();
        assert_eq!(route, Route::MonitorStop);
    }

    #[test]
    fn test_method_distinguishes_routes() {
        let (route, _) = match_route("POST", "/fingerprints").unwrap();
        assert_eq!(route, Route::EnrollFingerprint);

        assert!(match_route("PUT", "/fingerprints").is_none());
    }

    #[test]
    fn test_placeholder_extraction() {
        let (route, params) = match_route("DELETE", "/fingerprints/17").unwrap();
        assert_eq!(route, Route::DeleteFingerprint);
        assert_eq!(params.get("id").map(String::as_str), Some("17"));

        let (route, params) = match_route("GET", "/logs/fplock.2026-08-06.log").unwrap();
        assert_eq!(route, Route::GetLog);
        assert_eq!(
            params.get("name").map(String::as_str),
            Some("fplock.2026-08-06.log")
        );
    }

    #[test]
    fn test_placeholder_is_single_segment() {
        assert!(match_route("DELETE", "/fingerprints/1/extra").is_none());
        assert!(match_route("DELETE", "/fingerprints/").is_none());
    }

    #[test]
    fn test_root_liveness_fallback() {
        let (route, _) = match_route("GET", "/").unwrap();
        assert_eq!(route, Route::Liveness);

        assert!(match_route("POST", "/").is_none());
    }

    #[test]
    fn test_unknown_route() {
        assert!(match_route("GET", "/nope").is_none());
    }
}
