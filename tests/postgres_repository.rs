//! Postgres repository tests.
//!
//! Require a disposable database:
//! `TEST_DATABASE_URL=postgres://... cargo test -- --ignored`

use std::sync::Arc;

use chrono::DateTime;
use hn_fetcher::models::{DatabaseConfig, StoryId, StoryRecord};
use hn_fetcher::storage::{InsertOutcome, PgStoryRepository, StoryRepository};

async fn repository() -> PgStoryRepository {
    let url = std::env::var("TEST_DATABASE_URL").expect("TEST_DATABASE_URL must be set");
    let config = DatabaseConfig {
        url,
        max_connections: 16,
    };
    let repository = PgStoryRepository::connect(&config).await.unwrap();
    sqlx::query("TRUNCATE stories, brand_mentions RESTART IDENTITY")
        .execute(repository.pool())
        .await
        .unwrap();
    repository
}

fn record(id: i64, time: i64) -> StoryRecord {
    StoryRecord {
        hn_id: StoryId(id),
        title: format!("Story {id}"),
        author: "alice".to_string(),
        url: Some(format!("https://example.com/{id}")),
        time: DateTime::from_timestamp(time, 0).unwrap(),
    }
}

async fn mention(repository: &PgStoryRepository, id: i64, brand: &str) {
    sqlx::query("INSERT INTO brand_mentions (hn_id, brand) VALUES ($1, $2)")
        .bind(id)
        .bind(brand)
        .execute(repository.pool())
        .await
        .unwrap();
}

// The tests share one database, so they run as a single sequence.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore]
async fn test_postgres_repository() {
    let repository = Arc::new(repository().await);

    // Sequential duplicate
    let first = repository.insert_if_new(&record(42, 100)).await.unwrap();
    let second = repository.insert_if_new(&record(42, 200)).await.unwrap();
    match first {
        InsertOutcome::Inserted(stored) => {
            assert_eq!(stored.hn_id, StoryId(42));
            assert_eq!(stored.url.as_deref(), Some("https://example.com/42"));
        }
        InsertOutcome::AlreadyExists => panic!("first insert must create the row"),
    }
    assert_eq!(second, InsertOutcome::AlreadyExists);

    // Concurrent duplicates
    let handles: Vec<_> = (0..16)
        .map(|_| {
            let repository = Arc::clone(&repository);
            tokio::spawn(async move { repository.insert_if_new(&record(7, 300)).await.unwrap() })
        })
        .collect();
    let mut inserted = 0;
    for handle in handles {
        if matches!(handle.await.unwrap(), InsertOutcome::Inserted(_)) {
            inserted += 1;
        }
    }
    assert_eq!(inserted, 1);

    let (rows,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM stories WHERE hn_id = 7")
        .fetch_one(repository.pool())
        .await
        .unwrap();
    assert_eq!(rows, 1);

    // Brand queries
    mention(&repository, 42, "rust").await;
    mention(&repository, 7, "rust").await;
    mention(&repository, 7, "rust").await;
    mention(&repository, 7, "go").await;

    let stats = repository.brand_stats().await.unwrap();
    assert_eq!(stats[0].brand, "rust");
    assert_eq!(stats[0].mentions, 3);
    assert_eq!(stats[1].brand, "go");

    let stories = repository.stories_by_brand("rust").await.unwrap();
    let ids: Vec<StoryId> = stories.iter().map(|s| s.hn_id).collect();
    assert_eq!(ids, vec![StoryId(7), StoryId(42)]);

    repository.close().await;
}
