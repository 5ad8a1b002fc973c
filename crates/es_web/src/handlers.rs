use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{Duration, Utc};
use es_core::{ArticleStorage, CatalogStorage, Error, OverviewStats, ScanRequest, TrendPoint, WhitelistDomain};
use es_scanner::trust::normalize_domain;
use serde_json::{json, Value};
use tracing::info;
use crate::dto::{
    ArticleBody, ArticleDto, KeywordCreate, KeywordDto, Pagination, ScanResultDto, TrendQuery,
    WhitelistCreate,
};
use crate::error::ApiResult;
use crate::AppState;

pub async fn scan(
    State(state): State<AppState>,
    Json(request): Json<ScanRequest>,
) -> ApiResult<Json<ScanResultDto>> {
    info!(
        "🔎 Scan requested (days_limit={}, max_execution_time={}, fetch_unknown={})",
        request.days_limit, request.max_execution_time, request.fetch_unknown
    );
    let result = state.scanner.scan(&request).await?;
    Ok(Json(ScanResultDto::from(&result)))
}

pub async fn list_articles(
    State(state): State<AppState>,
    Query(page): Query<Pagination>,
) -> ApiResult<Json<Vec<ArticleDto>>> {
    let articles = state.storage.list_articles(page.skip, page.limit).await?;
    Ok(Json(articles.iter().map(ArticleDto::from).collect()))
}

pub async fn save_article(
    State(state): State<AppState>,
    Json(body): Json<ArticleBody>,
) -> ApiResult<Json<ArticleDto>> {
    if normalize_domain(&body.link).is_empty() {
        return Err(Error::InvalidUrl(format!("Article link is not a valid URL: {}", body.link)).into());
    }
    if state.storage.article_exists_by_link(&body.link).await? {
        return Err(Error::AlreadyExists("Article already saved".to_string()).into());
    }
    let candidate = body.into_candidate(Utc::now());
    let id = state.storage.save_article(&candidate).await.map_err(|e| match e {
        Error::AlreadyExists(_) => Error::AlreadyExists("Article already saved".to_string()),
        other => other,
    })?;
    Ok(Json(ArticleDto {
        id,
        article: ArticleBody::from(&candidate),
    }))
}

pub async fn stats_overview(State(state): State<AppState>) -> ApiResult<Json<OverviewStats>> {
    Ok(Json(state.storage.overview_stats(Utc::now()).await?))
}

pub async fn stats_trends(
    State(state): State<AppState>,
    Query(query): Query<TrendQuery>,
) -> ApiResult<Json<Vec<TrendPoint>>> {
    let since = Duration::try_days(query.days)
        .and_then(|span| Utc::now().checked_sub_signed(span))
        .ok_or_else(|| Error::Config(format!("days out of range: {}", query.days)))?;
    Ok(Json(state.storage.trend_data(since).await?))
}

pub async fn list_keywords(
    State(state): State<AppState>,
    Query(page): Query<Pagination>,
) -> ApiResult<Json<Vec<KeywordDto>>> {
    let keywords = state.storage.keywords(page.skip, page.limit).await?;
    Ok(Json(keywords.into_iter().map(KeywordDto::from).collect()))
}

pub async fn create_keyword(
    State(state): State<AppState>,
    Json(body): Json<KeywordCreate>,
) -> ApiResult<Json<KeywordDto>> {
    let keyword = state.storage.create_keyword(&body.text).await.map_err(|e| match e {
        Error::AlreadyExists(_) => Error::AlreadyExists("Keyword already exists".to_string()),
        other => other,
    })?;
    Ok(Json(KeywordDto::from(keyword)))
}

pub async fn delete_keyword(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Value>> {
    state.storage.delete_keyword(id).await.map_err(|e| match e {
        Error::NotFound(_) => Error::NotFound("Keyword not found".to_string()),
        other => other,
    })?;
    Ok(Json(json!({ "status": "success", "id": id })))
}

pub async fn list_whitelist(
    State(state): State<AppState>,
    Query(page): Query<Pagination>,
) -> ApiResult<Json<Vec<WhitelistDomain>>> {
    Ok(Json(state.storage.whitelist(page.skip, page.limit).await?))
}

pub async fn create_whitelist(
    State(state): State<AppState>,
    Json(body): Json<WhitelistCreate>,
) -> ApiResult<Json<WhitelistDomain>> {
    let domain = state
        .storage
        .create_whitelist_domain(&body.domain, body.is_active)
        .await
        .map_err(|e| match e {
            Error::AlreadyExists(_) => Error::AlreadyExists("Domain already whitelisted".to_string()),
            other => other,
        })?;
    Ok(Json(domain))
}
