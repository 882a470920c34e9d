//! Streaming gateway — serves swarm files as partial content while the
//! transfer is still running.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::{debug, error};

use hayase_core::{mime_for_path, SwarmFile};

use crate::state::AppState;

/// Open-ended and range-less requests are clamped to this window so the
/// first byte goes out without waiting on a huge piece run. Players
/// follow up with real range requests.
const STARTUP_WINDOW_BYTES: u64 = 8 * 1024 * 1024;

#[derive(Debug, Deserialize)]
pub struct StreamParams {
    #[serde(default)]
    pub hash: Option<String>,
    #[serde(default)]
    pub filepath: Option<String>,
}

/// Strip whitespace and newlines before the value touches lookups or
/// response headers.
fn sanitize(value: &str) -> String {
    value.replace(['\n', '\r'], "").trim().to_string()
}

/// Pick the served file: single-file swarms ignore `filepath`,
/// multi-file swarms need an exact display-path match.
fn resolve_target<'a>(files: &'a [SwarmFile], filepath: &str) -> Option<&'a SwarmFile> {
    match files {
        [only] => Some(only),
        _ if !filepath.is_empty() => files.iter().find(|f| f.display_path == filepath),
        _ => None,
    }
}

#[derive(Debug, PartialEq, Eq)]
enum ParsedRange {
    StartEnd {
        start: u64,
        end_inclusive: Option<u64>,
    },
    Suffix {
        len: u64,
    },
}

/// Parse a Range header value.
/// Supports:
/// - bytes=start-end
/// - bytes=start-
/// - bytes=-suffix_len
fn parse_range_header(value: &str) -> Option<ParsedRange> {
    let value = value.trim();
    let rest = value.strip_prefix("bytes=")?;
    let mut parts = rest.splitn(2, '-');
    let start_str = parts.next()?.trim();
    let end_str = parts.next()?.trim();

    if start_str.is_empty() {
        let len: u64 = end_str.parse().ok()?;
        if len == 0 {
            return None;
        }
        Some(ParsedRange::Suffix { len })
    } else {
        let start: u64 = start_str.parse().ok()?;
        let end_inclusive = if end_str.is_empty() {
            None
        } else {
            Some(end_str.parse::<u64>().ok()?)
        };
        Some(ParsedRange::StartEnd {
            start,
            end_inclusive,
        })
    }
}

/// GET /stream?hash=<id>&filepath=<path optional>
pub async fn stream(
    State(state): State<Arc<AppState>>,
    Query(params): Query<StreamParams>,
    headers: HeaderMap,
) -> Response {
    let hash = params.hash.as_deref().map(sanitize).unwrap_or_default();
    let filepath = params.filepath.as_deref().map(sanitize).unwrap_or_default();

    if hash.is_empty() {
        error!("stream request with empty hash");
        return (StatusCode::BAD_REQUEST, "hash query is empty").into_response();
    }

    let files = match state.sessions().files(&hash).await {
        Ok(files) => files,
        Err(e) => {
            error!(hash = %hash, error = %e, "stream request for unknown swarm");
            return (StatusCode::INTERNAL_SERVER_ERROR, "swarm not found").into_response();
        }
    };

    let Some(target) = resolve_target(&files, &filepath) else {
        error!(hash = %hash, filepath = %filepath, "stream request matched no file");
        return (StatusCode::INTERNAL_SERVER_ERROR, "file not found").into_response();
    };

    let total = target.size_bytes;
    let content_type = mime_for_path(&target.display_path);

    let range = headers
        .get(header::RANGE)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_range_header);

    let (start, end, is_partial) = match range {
        Some(ParsedRange::StartEnd {
            start,
            end_inclusive: Some(end),
        }) => {
            // Inclusive end in HTTP Range, exclusive end internally.
            let end = (end + 1).min(total);
            if start >= total || end <= start {
                return range_not_satisfiable(total);
            }
            (start, end, true)
        }
        Some(ParsedRange::StartEnd {
            start,
            end_inclusive: None,
        }) => {
            if start >= total {
                return range_not_satisfiable(total);
            }
            // Players probe with open-ended ranges; keep the response
            // small so playback starts before the window is on disk.
            let end = (start + STARTUP_WINDOW_BYTES).min(total);
            (start, end, true)
        }
        Some(ParsedRange::Suffix { len }) => {
            let start = total.saturating_sub(len);
            (start, total, true)
        }
        None => {
            let end = STARTUP_WINDOW_BYTES.min(total);
            (0, end, end < total)
        }
    };

    debug!(
        hash = %hash,
        file = %target.display_path,
        start = start,
        end = end,
        partial = is_partial,
        "stream request"
    );

    let data = match state
        .sessions()
        .read_range(&hash, target.index, start, end)
        .await
    {
        Ok(data) => data,
        Err(e) => {
            error!(hash = %hash, error = %e, "stream read failed");
            return (StatusCode::INTERNAL_SERVER_ERROR, format!("error: {}", e))
                .into_response();
        }
    };

    let status = if is_partial {
        StatusCode::PARTIAL_CONTENT
    } else {
        StatusCode::OK
    };

    let mut resp_headers = HeaderMap::new();
    resp_headers.insert(header::CONTENT_TYPE, content_type.parse().unwrap());
    resp_headers.insert(
        header::CONTENT_LENGTH,
        data.len().to_string().parse().unwrap(),
    );
    resp_headers.insert(header::ACCEPT_RANGES, "bytes".parse().unwrap());

    if is_partial {
        // Content-Range carries the inclusive end.
        let content_range = format!("bytes {}-{}/{}", start, end.saturating_sub(1), total);
        resp_headers.insert(header::CONTENT_RANGE, content_range.parse().unwrap());
    }

    (status, resp_headers, data).into_response()
}

fn range_not_satisfiable(total: u64) -> Response {
    (
        StatusCode::RANGE_NOT_SATISFIABLE,
        [(header::CONTENT_RANGE, format!("bytes */{}", total))],
        "range not satisfiable",
    )
        .into_response()
}
