use anyhow::{Context, Result};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use okapi_core::persist::{load_meta, IndexPaths, MetaFile};
use okapi_core::{IndexError, IndexReader, IndexView, Scorer};
use serde::{Deserialize, Serialize};
use std::io::{BufRead, Write};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Answer one query per input line. Each ranked hit is written as
/// `docNo score`, and every query's result set ends with a blank line.
pub fn answer_queries<I, R, W>(index: &I, mut input: R, mut output: W, limit: Option<usize>) -> Result<usize>
where
    I: IndexView + ?Sized,
    R: BufRead,
    W: Write,
{
    let scorer = Scorer::new(index);
    let mut answered = 0;
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if input.read_until(b'\n', &mut buf).context("failed to read query")? == 0 {
            break;
        }
        let line = buf.strip_suffix(b"\n").unwrap_or(&buf[..]);
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        // Invalid UTF-8 becomes U+FFFD, which the normalizer treats as a separator.
        let query = String::from_utf8_lossy(line);
        let results = scorer
            .search(&query)
            .with_context(|| format!("failed to answer query {query:?}"))?;
        tracing::debug!(%query, hits = results.len(), "query answered");
        for hit in results.iter().take(limit.unwrap_or(usize::MAX)) {
            writeln!(output, "{} {:.6}", hit.doc_no, hit.score)?;
        }
        writeln!(output)?;
        output.flush()?;
        answered += 1;
    }
    Ok(answered)
}

#[derive(Deserialize)]
pub struct SearchParams {
    pub q: String,
    #[serde(default = "default_k")]
    pub k: usize,
}
fn default_k() -> usize { 10 }

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub took_ms: f64,
    pub total_hits: usize,
    pub results: Vec<SearchHit>,
}

#[derive(Serialize)]
pub struct SearchHit {
    pub doc_id: u32,
    pub doc_no: String,
    pub score: f64,
}

#[derive(Serialize)]
pub struct DocResponse {
    pub doc_id: u32,
    pub doc_no: String,
    pub length: u32,
}

#[derive(Serialize)]
pub struct StatsResponse {
    pub num_docs: u32,
    pub num_terms: u32,
    pub num_postings: u64,
    pub average_document_length: f64,
    pub created_at: Option<String>,
}

#[derive(Clone)]
pub struct AppState {
    pub index: Arc<IndexReader>,
    pub meta: Option<Arc<MetaFile>>,
}

pub fn build_app(index_dir: String) -> Result<Router> {
    // Load index header at startup
    let paths = IndexPaths::new(&index_dir);
    let index = IndexReader::open(&paths).with_context(|| format!("failed to load index from {index_dir}"))?;
    let meta = match load_meta(&paths) {
        Ok(meta) => Some(Arc::new(meta)),
        Err(e) => {
            tracing::warn!(error = %e, "index manifest unavailable");
            None
        }
    };
    let app_state = AppState { index: Arc::new(index), meta };

    // CORS: read CORS_ALLOW_ORIGIN (comma-separated) or allow Any by default
    let cors = match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(val) => {
            let origins: Vec<_> = val
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            if origins.is_empty() {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
            }
        }
        Err(_) => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    let app = Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/search", get(search_handler))
        .route("/doc/:doc_id", get(doc_handler))
        .route("/stats", get(stats_handler))
        .with_state(app_state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());
    Ok(app)
}

fn internal(e: IndexError) -> (StatusCode, String) {
    tracing::error!(error = %e, "index failure");
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

pub async fn search_handler(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, (StatusCode, String)> {
    let start = std::time::Instant::now();
    let ranked = Scorer::new(state.index.as_ref()).search(&params.q).map_err(internal)?;
    let total_hits = ranked.len();
    let k = params.k.clamp(1, 100);
    let results = ranked
        .into_iter()
        .take(k)
        .map(|r| SearchHit { doc_id: r.doc_id, doc_no: r.doc_no, score: r.score })
        .collect();

    let took_ms = start.elapsed().as_secs_f64() * 1000.0;
    Ok(Json(SearchResponse { query: params.q, took_ms, total_hits, results }))
}

pub async fn doc_handler(
    State(state): State<AppState>,
    Path(doc_id): Path<u32>,
) -> Result<Json<DocResponse>, (StatusCode, String)> {
    match state.index.document_identifier(doc_id) {
        Ok(doc_no) => Ok(Json(DocResponse {
            doc_id,
            doc_no: doc_no.to_string(),
            length: state.index.document_length(doc_id),
        })),
        Err(e @ IndexError::DocIdOutOfRange { .. }) => Err((StatusCode::NOT_FOUND, e.to_string())),
        Err(e) => Err(internal(e)),
    }
}

pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let summary = state.index.summary();
    Json(StatsResponse {
        num_docs: summary.num_docs,
        num_terms: summary.num_terms,
        num_postings: summary.num_postings,
        average_document_length: state.index.average_document_length(),
        created_at: state.meta.as_ref().map(|m| m.created_at.clone()),
    })
}
