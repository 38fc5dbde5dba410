//! Query handler
//!
//! Author: hephaex@gmail.com

use crate::error::{AppError, EMPTY_QUERY_MESSAGE};
use crate::state::AppState;
use axum::{
    extract::{Query, State},
    Json,
};
use docqa_core::{DocQaError, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};

/// Query string parameters
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct QueryParams {
    /// Question to answer; a missing value counts as empty
    #[param(example = "What does the handbook say about vacation?")]
    pub q: Option<String>,
}

impl QueryParams {
    /// Collect parameters from raw query pairs.
    ///
    /// A repeated `q` keeps its last value; unknown keys are ignored.
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        let q = pairs
            .into_iter()
            .filter(|(key, _)| key == "q")
            .map(|(_, value)| value)
            .last();
        Self { q }
    }
}

/// Query response body
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct QueryResponse {
    /// Generated answer
    #[schema(example = "Employees receive twenty days of paid vacation.")]
    pub response: String,
}

/// Trim the raw query and reject it when nothing is left
pub fn validate_query(raw: Option<&str>) -> Result<&str> {
    let query = raw.unwrap_or_default().trim();
    if query.is_empty() {
        return Err(DocQaError::Validation(EMPTY_QUERY_MESSAGE.to_string()));
    }
    Ok(query)
}

/// Answer a question from the indexed documents
#[utoipa::path(
    get,
    path = "/query",
    tag = "query",
    params(QueryParams),
    responses(
        (status = 200, description = "Query successful", body = QueryResponse),
        (status = 400, description = "Empty query", body = crate::error::ErrorDetail),
        (status = 500, description = "Query failed", body = crate::error::ErrorDetail)
    )
)]
pub async fn query_handler(
    State(state): State<Arc<AppState>>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> std::result::Result<Json<QueryResponse>, AppError> {
    let params = QueryParams::from_pairs(pairs);
    let query = validate_query(params.q.as_deref()).map_err(AppError::bad_request)?;

    tracing::debug!("Query received: {} chars", query.chars().count());

    // Any failure from here on, including a missing index, is a 500
    let engine = state.provider.get_query_engine().await?;
    let result = engine.query(query).await?;

    Ok(Json(QueryResponse {
        response: result.response,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(raw: &[(&str, &str)]) -> Vec<(String, String)> {
        raw.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_repeated_parameter_keeps_last() {
        let params = QueryParams::from_pairs(pairs(&[("q", "a"), ("lang", "en"), ("q", "b")]));
        assert_eq!(params.q.as_deref(), Some("b"));

        let params = QueryParams::from_pairs(pairs(&[("lang", "en")]));
        assert!(params.q.is_none());
    }

    #[test]
    fn test_validate_query() {
        assert_eq!(validate_query(Some("  hello ")).unwrap(), "hello");

        for raw in [None, Some(""), Some(" \t\n")] {
            let err = validate_query(raw).unwrap_err();
            assert!(matches!(err, DocQaError::Validation(_)));
            assert_eq!(err.to_string(), EMPTY_QUERY_MESSAGE);
        }
    }
}
