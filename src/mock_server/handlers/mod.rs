//! HTTP request handlers for the mock server.

pub mod issues;
pub mod measures;
pub mod projects;
pub mod repos;

pub use issues::*;
pub use measures::*;
pub use projects::*;
pub use repos::*;

use std::ops::Range;
use std::sync::Arc;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tokio::sync::RwLock;

use super::state::MockState;

pub type SharedState = Arc<RwLock<MockState>>;

/// Largest `ps` the search endpoints accept.
const MAX_PAGE_SIZE: u32 = 500;

/// An error in the Web API's `{"errors": [{"msg": ...}]}` envelope.
pub fn sonar_error(status: StatusCode, msg: impl Into<String>) -> Response {
    (
        status,
        Json(serde_json::json!({ "errors": [{ "msg": msg.into() }] })),
    )
        .into_response()
}

/// Slice bounds of page `p` (1-indexed) of size `ps` over `len` items.
pub fn page_bounds(p: u32, ps: u32, len: usize) -> Range<usize> {
    let start = (p.saturating_sub(1) as usize).saturating_mul(ps as usize);
    let start = start.min(len);
    let end = start.saturating_add(ps as usize).min(len);
    start..end
}

/// Reject pages past the deepest result a search may reach.
pub fn check_result_window(p: u32, ps: u32, cap: u64) -> Result<(), Response> {
    if ps > MAX_PAGE_SIZE {
        return Err(sonar_error(
            StatusCode::BAD_REQUEST,
            format!("'ps' value ({ps}) must be less than {MAX_PAGE_SIZE}"),
        ));
    }
    let deepest = u64::from(p) * u64::from(ps);
    if deepest > cap {
        return Err(sonar_error(
            StatusCode::BAD_REQUEST,
            format!("Can return only the first {cap} results. {deepest}th result asked."),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_bounds() {
        assert_eq!(page_bounds(1, 5, 12), 0..5);
        assert_eq!(page_bounds(3, 5, 12), 10..12);
        assert_eq!(page_bounds(4, 5, 12), 12..12);
    }

    #[test]
    fn test_result_window() {
        assert!(check_result_window(20, 500, 10_000).is_ok());
        assert!(check_result_window(21, 500, 10_000).is_err());
        assert!(check_result_window(1, 501, 10_000).is_err());
    }
}
