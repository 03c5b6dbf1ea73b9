// src/api/handlers.rs

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};

use crate::api::AppState;
use crate::models::{BrandStats, StoredStory};

/// JSON body of a failed request.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiResult<T> = std::result::Result<Json<T>, (StatusCode, Json<ErrorResponse>)>;

fn internal_error(message: &str) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
}

pub async fn index() -> &'static str {
    "Hacker News Fetcher is running"
}

pub async fn brand_stats(State(state): State<AppState>) -> ApiResult<Vec<BrandStats>> {
    state.repository.brand_stats().await.map(Json).map_err(|e| {
        log::error!("Failed to fetch brand stats: {e}");
        internal_error("Failed to fetch stats")
    })
}

pub async fn brand_stories(
    State(state): State<AppState>,
    Path(brand): Path<String>,
) -> ApiResult<Vec<StoredStory>> {
    state
        .repository
        .stories_by_brand(&brand)
        .await
        .map(Json)
        .map_err(|e| {
            log::error!("Failed to fetch stories for brand {brand:?}: {e}");
            internal_error("Failed to fetch stories")
        })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use axum::response::Response;
    use chrono::DateTime;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use crate::api::build_router;
    use crate::error::{AppError, Result};
    use crate::models::{StoryId, StoryRecord};
    use crate::storage::{InsertOutcome, MemoryStoryRepository, StoryRepository};

    use super::*;

    struct BrokenRepository;

    #[async_trait]
    impl StoryRepository for BrokenRepository {
        async fn insert_if_new(&self, _story: &StoryRecord) -> Result<InsertOutcome> {
            Err(AppError::Database(sqlx::Error::PoolClosed))
        }

        async fn brand_stats(&self) -> Result<Vec<BrandStats>> {
            Err(AppError::Database(sqlx::Error::PoolClosed))
        }

        async fn stories_by_brand(&self, _brand: &str) -> Result<Vec<StoredStory>> {
            Err(AppError::Database(sqlx::Error::PoolClosed))
        }
    }

    async fn seeded() -> Arc<MemoryStoryRepository> {
        let repo = Arc::new(MemoryStoryRepository::new());
        for (id, time) in [(1, 1_700_000_100), (2, 1_700_000_300)] {
            let record = StoryRecord {
                hn_id: StoryId(id),
                title: format!("Story {id}"),
                author: "alice".to_string(),
                url: None,
                time: DateTime::from_timestamp(time, 0).unwrap(),
            };
            repo.insert_if_new(&record).await.unwrap();
            repo.add_mention(StoryId(id), "rust");
        }
        repo.add_mention(StoryId(2), "go");
        repo
    }

    async fn get(repository: Arc<dyn StoryRepository>, uri: &str) -> Response {
        build_router(AppState::new(repository))
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    async fn json<T: serde::de::DeserializeOwned>(response: Response) -> T {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_index() {
        let response = get(Arc::new(MemoryStoryRepository::new()), "/").await;
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], b"Hacker News Fetcher is running");
    }

    #[tokio::test]
    async fn test_brand_stats() {
        let response = get(seeded().await, "/brands/stats").await;
        assert_eq!(response.status(), StatusCode::OK);

        let stats: Vec<BrandStats> = json(response).await;
        assert_eq!(
            stats,
            vec![
                BrandStats {
                    brand: "rust".to_string(),
                    mentions: 2
                },
                BrandStats {
                    brand: "go".to_string(),
                    mentions: 1
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_brand_stories_newest_first() {
        let response = get(seeded().await, "/brands/rust/stories").await;
        assert_eq!(response.status(), StatusCode::OK);

        let stories: Vec<StoredStory> = json(response).await;
        let ids: Vec<StoryId> = stories.iter().map(|s| s.hn_id).collect();
        assert_eq!(ids, vec![StoryId(2), StoryId(1)]);
    }

    #[tokio::test]
    async fn test_unknown_brand_is_empty_list() {
        let response = get(seeded().await, "/brands/zig/stories").await;
        assert_eq!(response.status(), StatusCode::OK);

        let stories: Vec<StoredStory> = json(response).await;
        assert!(stories.is_empty());
    }

    #[tokio::test]
    async fn test_repository_failure_is_500() {
        let response = get(Arc::new(BrokenRepository), "/brands/stats").await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: ErrorResponse = json(response).await;
        assert_eq!(body.error, "Failed to fetch stats");

        let response = get(Arc::new(BrokenRepository), "/brands/rust/stories").await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: ErrorResponse = json(response).await;
        assert_eq!(body.error, "Failed to fetch stories");
    }
}
