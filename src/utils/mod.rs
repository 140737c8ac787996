use url::Url;

/// How an entered URL should be handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlKind {
    InstagramPost,
    Media,
}

pub fn classify_url(url: &str) -> UrlKind {
    if url.contains("instagram.com/p/") || url.contains("instagram.com/reel/") {
        UrlKind::InstagramPost
    } else {
        UrlKind::Media
    }
}

/// yt-dlp only knows the `threads.net` host.
pub fn normalize_threads_url(url: &str) -> String {
    match Url::parse(url) {
        Ok(mut parsed) => {
            let host = parsed.host_str().unwrap_or_default().to_string();
            if let Some(prefix) = host.strip_suffix("threads.com") {
                if prefix.is_empty() || prefix.ends_with('.') {
                    let new_host = format!("{}threads.net", prefix);
                    if parsed.set_host(Some(&new_host)).is_ok() {
                        return parsed.to_string();
                    }
                }
            }
            url.to_string()
        }
        Err(_) => url.replace("threads.com", "threads.net"),
    }
}

/// Keep only characters safe for a default file name.
pub fn sanitize_title(title: &str) -> String {
    title
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '.' | '_'))
        .collect::<String>()
        .trim_end()
        .to_string()
}

/// Parse `v1.2.3` or `1.2.3` into integer components.
pub fn parse_version(version: &str) -> Option<Vec<u64>> {
    version
        .trim()
        .trim_start_matches('v')
        .split('.')
        .map(|part| part.parse::<u64>().ok())
        .collect()
}

/// Tuple comparison, so `1.10.0 > 1.9.9` and `1.3.0.1 > 1.3.0`.
pub fn is_newer_version(remote: &str, current: &str) -> bool {
    match (parse_version(remote), parse_version(current)) {
        (Some(remote), Some(current)) => remote > current,
        _ => false,
    }
}
