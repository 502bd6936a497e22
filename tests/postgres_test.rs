//! Integration tests against a live PostgreSQL
//!
//! Run with `DATABASE_URL` pointing at a scratch database; without it every
//! test returns early.

use serde_json::json;
use sqlx::PgPool;
use thingbase::prelude::*;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Note {
    pub id: Option<i32>,
    pub title: String,
    pub body: Option<String>,
    pub rating: i16,
    pub deleted: bool,
    pub labels: Vec<String>,
}

impl Thing for Note {
    const TABLE: &'static str = "thingbase_notes";
    const SOFT_DELETE: bool = true;
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NoteTag {
    pub note_id: i32,
    pub tag: String,
}

impl Thing for NoteTag {
    const TABLE: &'static str = "thingbase_note_tags";
}

async fn setup_pool() -> Option<PgPool> {
    let database_url = std::env::var("DATABASE_URL").ok()?;
    let pool = PgPool::connect(&database_url)
        .await
        .expect("Failed to connect to DATABASE_URL");

    for statement in [
        "DROP TABLE IF EXISTS thingbase_note_tags",
        "DROP TABLE IF EXISTS thingbase_notes",
        "CREATE TABLE thingbase_notes (
            id SERIAL PRIMARY KEY,
            title VARCHAR(200) NOT NULL,
            body TEXT,
            rating SMALLINT NOT NULL DEFAULT 0,
            deleted BOOLEAN NOT NULL DEFAULT FALSE,
            labels JSONB NOT NULL DEFAULT '[]',
            created_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )",
        "CREATE TABLE thingbase_note_tags (
            note_id INTEGER NOT NULL,
            tag TEXT NOT NULL,
            PRIMARY KEY (note_id, tag)
        )",
    ] {
        sqlx::query(statement)
            .execute(&pool)
            .await
            .expect("Failed to prepare tables");
    }

    Some(pool)
}

// The tables are shared, so everything runs in one test
#[tokio::test]
async fn test_postgres_round_trip() {
    let Some(pool) = setup_pool().await else {
        eprintln!("DATABASE_URL not set, skipping");
        return;
    };
    let thingbase = ThingBase::from_pool(pool, CacheConfig::default());
    thingbase.health_check().await.unwrap();

    let notes = thingbase.store::<Note>();
    let fields = notes.fields().await.unwrap();
    assert_eq!(fields.len(), 7);
    assert!(notes.is_field("created_at").await.unwrap());

    for (title, rating) in [("First", 3), ("Second", 5), ("Third", 1)] {
        let mut note = Entity::new(Note {
            title: title.to_string(),
            rating,
            labels: vec![title.to_lowercase(), "draft".to_string()],
            ..Note::default()
        });
        assert!(notes.save(&mut note).await.unwrap());
        assert!(note.id.is_some());
        assert!(note.metadata().contains_key("created_at"));
    }

    let found = notes.by_pk(1, true).await.unwrap().unwrap();
    assert_eq!(found.title, "First");
    assert_eq!(found.labels, vec!["first", "draft"]);

    let filter = json!({"rating": ">=3", "title": "%i%"});
    let page = notes
        .list_by_attributes(
            filter.as_object().unwrap(),
            &ListOptions::new().order_by("rating", SortOrder::Desc).with_limit(1),
        )
        .await
        .unwrap();
    assert_eq!(page.count, 2);
    assert_eq!(page.list[0].title, "First");

    let raw = notes
        .list_by_query("rating < $1", vec![5i64.into()], &ListOptions::new())
        .await
        .unwrap();
    assert_eq!(raw.count, 2);

    let third = notes
        .one_by_query("title = $1", vec!["Third".into()])
        .await
        .unwrap()
        .unwrap();
    assert_eq!(third.rating, 1);

    let mut second = notes
        .one_by_attributes(json!({"title": "Second"}).as_object().unwrap(), false)
        .await
        .unwrap()
        .unwrap();
    second.body = Some("Updated".to_string());
    second.labels = vec!["published".to_string()];
    assert!(notes.save(&mut second).await.unwrap());
    assert!(!notes.save(&mut second).await.unwrap());

    assert!(notes.delete(&mut second).await.unwrap());
    let reloaded = notes.by_pk(second.id.unwrap(), false).await.unwrap().unwrap();
    assert!(reloaded.deleted);
    assert_eq!(reloaded.body.as_deref(), Some("Updated"));
    assert_eq!(reloaded.labels, vec!["published"]);

    let tags = thingbase.store::<NoteTag>();
    let mut tag = Entity::new(NoteTag {
        note_id: 1,
        tag: "rust".to_string(),
    });
    assert!(tags.save(&mut tag).await.unwrap());
    assert!(tags
        .by_pk(json!({"note_id": 1, "tag": "rust"}), false)
        .await
        .unwrap()
        .is_some());
    assert!(tags.delete(&mut tag).await.unwrap());
}
