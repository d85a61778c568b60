// crates/core/src/url.rs
//! Resolve job result paths into download URLs.

/// Turn a job `result` into an absolute download URL.
///
/// The server returns report artifacts as API-relative paths
/// (`/api/reports/results/{job}`). The host is prepended exactly once:
/// results that already carry a scheme, or already start with `api_host`,
/// are returned unchanged.
pub fn resolve_download_url(api_host: &str, result: &str) -> String {
    let host = api_host.trim_end_matches('/');

    if result.starts_with("http://") || result.starts_with("https://") {
        return result.to_string();
    }
    if !host.is_empty() && result.starts_with(host) {
        return result.to_string();
    }

    if result.starts_with('/') {
        format!("{host}{result}")
    } else {
        format!("{host}/{result}")
    }
}

/// Default file name for a downloaded report.
pub fn report_file_name(name: Option<&str>) -> String {
    match name.map(str::trim).filter(|n| !n.is_empty()) {
        Some(name) => {
            let safe: String = name
                .chars()
                .map(|c| if matches!(c, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|') { '_' } else { c })
                .collect();
            format!("Southeast Species Status Landscape Assessment Report - {safe}.xlsx")
        }
        None => "Southeast Species Status Landscape Assessment Report.xlsx".to_string(),
    }
}
