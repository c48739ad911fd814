use reqwest::Url;

pub const REDACTED: &str = "REDACTED";

/// Query parameters whose values never leave the crate in errors or logs.
pub const SENSITIVE_PARAMS: [&str; 5] = [
    "corpsecret",
    "provider_secret",
    "suite_secret",
    "suite_access_token",
    "access_token",
];

fn is_sensitive(name: &str) -> bool {
    SENSITIVE_PARAMS.contains(&name)
}

/// Copy of `url` with every non-empty sensitive query value replaced by `REDACTED`.
pub fn sanitize_url(url: &Url) -> Url {
    let changed = url
        .query_pairs()
        .any(|(name, value)| is_sensitive(&name) && !value.is_empty());
    if !changed {
        return url.clone();
    }

    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(name, value)| {
            let value = if is_sensitive(&name) && !value.is_empty() {
                REDACTED.to_owned()
            } else {
                value.into_owned()
            };
            (name.into_owned(), value)
        })
        .collect();

    let mut sanitized = url.clone();
    sanitized.query_pairs_mut().clear().extend_pairs(pairs);
    sanitized
}

/// Redacts the URL a transport error refers to.
pub fn sanitize_error(mut err: reqwest::Error) -> reqwest::Error {
    if let Some(url) = err.url_mut() {
        *url = sanitize_url(url);
    }
    err
}
