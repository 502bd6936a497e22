use crate::driver::MemoryDatabase;
use crate::entity::{Attributes, Entity, EntityState, Metadata};
use crate::errors::ThingError;
use crate::fields::{PrimaryKey, RawColumn};
use crate::query_builder::{ListOptions, SortOrder};
use crate::thing_store::ThingStore;
use crate::traits::{Database, Thing};
use crate::validation::{FieldErrors, ValidatedTableName};
use crate::query_builder::{Assignment, Condition};
use cache_system::ThingCache;
use config::CacheConfig;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::{Arc, LazyLock, Mutex};

static EVENTS: LazyLock<Mutex<Vec<String>>> = LazyLock::new(|| Mutex::new(Vec::new()));

fn record(event: String) {
    EVENTS.lock().unwrap().push(event);
}

fn recorded(event: &str) -> bool {
    EVENTS.lock().unwrap().iter().any(|e| e == event)
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Article {
    id: Option<i64>,
    title: String,
    views: i64,
    deleted: i16,
}

impl Thing for Article {
    const TABLE: &'static str = "articles";
    const SOFT_DELETE: bool = true;

    fn validate(&self, errors: &mut FieldErrors) {
        if self.title.trim().is_empty() {
            errors.add("title", "Title is required");
        }
    }

    fn before_save(&mut self) {
        self.title = self.title.trim().to_string();
    }

    fn after_save(&self) {
        record(format!("after_save:{}", self.title));
    }

    fn after_delete(&self) {
        record(format!("after_delete:{}", self.title));
    }

    fn item_extension(&mut self, metadata: &mut Metadata) {
        metadata.insert(
            "slug".to_string(),
            json!(self.title.to_lowercase().replace(' ', "-")),
        );
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Tag {
    article_id: i64,
    tag: String,
    weight: i64,
}

impl Thing for Tag {
    const TABLE: &'static str = "article_tags";

    fn after_delete(&self) {
        record(format!("tag_deleted:{}:{}", self.article_id, self.tag));
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct LogLine {
    line: String,
}

impl Thing for LogLine {
    const TABLE: &'static str = "log_lines";
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Ghost {
    id: i64,
}

impl Thing for Ghost {
    const TABLE: &'static str = "ghosts";
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Misnamed {
    id: i64,
}

impl Thing for Misnamed {
    const TABLE: &'static str = "bad-name";
}

fn database() -> Arc<MemoryDatabase> {
    let database = MemoryDatabase::new();
    database.create_table(
        "articles",
        vec![
            RawColumn::new("id", "integer")
                .primary()
                .default_value("nextval('articles_id_seq'::regclass)"),
            RawColumn::new("title", "text").not_null(),
            RawColumn::new("views", "integer").not_null().default_value("0"),
            RawColumn::new("deleted", "smallint").not_null().default_value("0"),
            RawColumn::new("summary", "text"),
        ],
    );
    database.create_table(
        "article_tags",
        vec![
            RawColumn::new("article_id", "integer").primary(),
            RawColumn::new("tag", "text").primary(),
            RawColumn::new("weight", "integer").default_value("1"),
        ],
    );
    database.create_table("log_lines", vec![RawColumn::new("line", "text")]);
    Arc::new(database)
}

fn store<T: Thing>(database: &Arc<MemoryDatabase>) -> ThingStore<T> {
    ThingStore::new(database.clone(), CacheConfig::default())
}

fn filter(value: Value) -> Attributes {
    value.as_object().cloned().unwrap()
}

fn article(title: &str, views: i64) -> Entity<Article> {
    Entity::new(Article {
        title: title.to_string(),
        views,
        ..Article::default()
    })
}

async fn seed_articles(articles: &ThingStore<Article>, count: i64) {
    for n in 1..=count {
        let mut entity = article(&format!("Post {}", n), n);
        assert!(articles.save(&mut entity).await.unwrap());
    }
}

fn cached_keys(articles: &ThingStore<Article>, operation: &str) -> usize {
    let prefix = articles.model_key().prefix();
    ThingCache::list_keys()
        .iter()
        .filter(|key| key.starts_with(&prefix) && key.contains(operation))
        .count()
}

// ========================================
// Field metadata
// ========================================

#[tokio::test]
async fn test_fields_and_primary_key() {
    let database = database();
    let articles = store::<Article>(&database);

    let fields = articles.fields().await.unwrap();
    assert_eq!(fields.len(), 5);
    assert!(articles.is_field("summary").await.unwrap());
    assert!(!articles.is_field("slug").await.unwrap());
    assert_eq!(
        articles.primary_key().await.unwrap(),
        Some(PrimaryKey::Single("id".to_string()))
    );

    let tags = store::<Tag>(&database);
    assert!(tags.primary_key().await.unwrap().unwrap().is_composite());

    let lines = store::<LogLine>(&database);
    assert_eq!(lines.primary_key().await.unwrap(), None);
}

#[tokio::test]
async fn test_fields_are_memoized() {
    let database = database();
    let articles = store::<Article>(&database);
    articles.fields().await.unwrap();

    // Dropping the table does not matter once the columns are cached
    database.drop_table("articles");
    assert_eq!(articles.fields().await.unwrap().len(), 5);
}

#[tokio::test]
async fn test_missing_and_invalid_tables() {
    let database = database();

    let ghosts = store::<Ghost>(&database);
    assert!(matches!(ghosts.fields().await, Err(ThingError::TableNotFound(t)) if t == "ghosts"));

    let misnamed = store::<Misnamed>(&database);
    assert!(matches!(
        misnamed.fields().await,
        Err(ThingError::InvalidTable { model: "Misnamed", .. })
    ));
}

// ========================================
// Save
// ========================================

#[tokio::test]
async fn test_insert_reads_row_back() {
    let database = database();
    let articles = store::<Article>(&database);

    let mut entity = article("  Hello world  ", 0);
    assert!(entity.is_new());
    assert!(articles.save(&mut entity).await.unwrap());

    assert!(!entity.is_new());
    assert_eq!(entity.id, Some(1));
    assert_eq!(entity.title, "Hello world");
    assert_eq!(entity.original().get("summary"), Some(&Value::Null));
    assert!(recorded("after_save:Hello world"));

    let rows = database.rows("articles");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("title"), Some(&json!("Hello world")));
}

#[tokio::test]
async fn test_update_writes_only_changes() {
    let database = database();
    let articles = store::<Article>(&database);

    let mut entity = article("Draft", 1);
    articles.save(&mut entity).await.unwrap();

    // unchanged entity: nothing to write
    assert!(!articles.save(&mut entity).await.unwrap());

    entity.title = "Final".to_string();
    assert!(articles.save(&mut entity).await.unwrap());
    assert_eq!(database.rows("articles")[0].get("title"), Some(&json!("Final")));
    assert_eq!(entity.original().get("title"), Some(&json!("Final")));
    assert!(recorded("after_save:Final"));

    // snapshot was refreshed, so the same value is no longer a change
    assert!(!articles.save(&mut entity).await.unwrap());
}

#[tokio::test]
async fn test_validation_errors_abort_save() {
    let database = database();
    let articles = store::<Article>(&database);

    let mut entity = article("   ", 0);
    let result = articles.save(&mut entity).await;

    match result {
        Err(ThingError::Validation(errors)) => {
            assert_eq!(errors.get("title"), Some("Title is required"));
        }
        other => panic!("Expected validation error, got {:?}", other),
    }
    assert_eq!(entity.error("title"), Some("Title is required"));
    assert!(database.rows("articles").is_empty());

    entity.title = "Fixed".to_string();
    assert!(articles.save(&mut entity).await.unwrap());
    assert!(entity.errors().is_empty());
}

#[tokio::test]
async fn test_metadata_columns_are_persisted() {
    let database = database();
    let articles = store::<Article>(&database);

    let mut entity = article("With summary", 0);
    entity.set_attribute("summary", json!("Short")).unwrap();
    entity.set_attribute("not_a_column", json!(1)).unwrap();
    assert!(articles.save(&mut entity).await.unwrap());

    let row = &database.rows("articles")[0];
    assert_eq!(row.get("summary"), Some(&json!("Short")));
    assert!(!row.contains_key("not_a_column"));

    entity.set_attribute("summary", json!("Longer")).unwrap();
    assert!(articles.save(&mut entity).await.unwrap());
    assert_eq!(database.rows("articles")[0].get("summary"), Some(&json!("Longer")));
}

#[tokio::test]
async fn test_update_without_key_is_an_error() {
    let database = database();
    let articles = store::<Article>(&database);

    let row = filter(json!({"title": "Orphan", "views": 0, "deleted": 0}));
    let mut entity = Entity::<Article>::from_row(row, EntityState::Persisted).unwrap();
    entity.title = "Changed".to_string();

    let result = articles.save(&mut entity).await;
    assert!(matches!(result, Err(ThingError::MissingPrimaryKey(_))));
}

#[tokio::test]
async fn test_table_without_key_is_never_saved() {
    let database = database();
    let lines = store::<LogLine>(&database);

    let mut entity = Entity::new(LogLine {
        line: "hello".to_string(),
    });
    assert!(!lines.save(&mut entity).await.unwrap());
    assert!(lines.by_pk("hello", false).await.unwrap().is_none());
    assert!(database.rows("log_lines").is_empty());
}

// ========================================
// Lookups
// ========================================

#[tokio::test]
async fn test_by_pk_shapes() {
    let database = database();
    let articles = store::<Article>(&database);
    seed_articles(&articles, 2).await;

    let found = articles.by_pk(2, false).await.unwrap().unwrap();
    assert_eq!(found.title, "Post 2");
    assert!(!found.is_new());
    assert_eq!(found.metadata().get("slug"), Some(&json!("post-2")));

    let by_map = articles.by_pk(json!({"id": 1}), false).await.unwrap().unwrap();
    assert_eq!(by_map.title, "Post 1");

    assert!(articles.by_pk(json!({"id": 1, "x": 2}), false).await.unwrap().is_none());
    assert!(articles.by_pk(99, false).await.unwrap().is_none());
    assert!(articles.by_pk("2", false).await.unwrap().is_some());
}

#[tokio::test]
async fn test_by_pk_composite() {
    let database = database();
    let tags = store::<Tag>(&database);

    let mut tag = Entity::new(Tag {
        article_id: 1,
        tag: "rust".to_string(),
        weight: 3,
    });
    assert!(tags.save(&mut tag).await.unwrap());

    let found = tags
        .by_pk(json!({"article_id": 1, "tag": "rust"}), false)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.weight, 3);

    assert!(tags.by_pk(1, false).await.unwrap().is_none());
    assert!(tags
        .by_pk(json!({"article_id": 1, "tag": "go"}), false)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_cached_lookups_until_a_write() {
    let database = database();
    let articles = store::<Article>(&database);
    seed_articles(&articles, 1).await;

    assert_eq!(articles.by_pk(1, true).await.unwrap().unwrap().title, "Post 1");
    assert_eq!(cached_keys(&articles, "byPk"), 1);

    // change the row behind the store's back
    let table = ValidatedTableName::new("articles").unwrap();
    database
        .update(
            &table,
            &[Assignment::new("title", "Edited").unwrap()],
            &[Condition::eq("id", 1i64).unwrap()],
        )
        .await
        .unwrap();

    assert_eq!(articles.by_pk(1, true).await.unwrap().unwrap().title, "Post 1");
    assert_eq!(articles.by_pk(1, false).await.unwrap().unwrap().title, "Edited");

    // any write through the store drops the cached lookups
    let mut other = article("Another", 0);
    articles.save(&mut other).await.unwrap();
    assert_eq!(cached_keys(&articles, "byPk"), 0);
    assert_eq!(articles.by_pk(1, true).await.unwrap().unwrap().title, "Edited");
}

#[tokio::test]
async fn test_cache_can_be_disabled() {
    let database = database();
    let articles: ThingStore<Article> =
        ThingStore::new(database.clone(), CacheConfig::disabled());
    seed_articles(&articles, 1).await;

    assert!(articles.by_pk(1, true).await.unwrap().is_some());
    assert!(articles
        .one_by_attributes(&filter(json!({"id": 1})), true)
        .await
        .unwrap()
        .is_some());
    assert_eq!(cached_keys(&articles, "_"), 0);
}

#[tokio::test]
async fn test_one_by_attributes_dsl() {
    let database = database();
    let articles = store::<Article>(&database);
    seed_articles(&articles, 5).await;

    let found = articles
        .one_by_attributes(&filter(json!({"title": "%3%"})), false)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.views, 3);

    let found = articles
        .one_by_attributes(&filter(json!({"views": ">4"})), false)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.title, "Post 5");

    let found = articles
        .one_by_attributes(&filter(json!({"views": "!1", "title": "<Post 3"})), false)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.title, "Post 2");

    assert!(articles
        .one_by_attributes(&filter(json!({"summary": "!x"})), false)
        .await
        .unwrap()
        .is_none());
    assert!(articles
        .one_by_attributes(&filter(json!({"summary": null, "views": [9, 5]})), true)
        .await
        .unwrap()
        .is_some());
    assert_eq!(cached_keys(&articles, "oneByAttributes"), 1);
}

#[tokio::test]
async fn test_operator_prefixes_share_a_cache_key() {
    let database = database();
    let articles = store::<Article>(&database);
    seed_articles(&articles, 5).await;

    let above = filter(json!({"views": ">4"}));
    let below = filter(json!({"views": "<4"}));
    assert_eq!(
        articles.lookup_key("oneByAttributes", &Value::Object(above.clone())),
        articles.lookup_key("oneByAttributes", &Value::Object(below.clone()))
    );

    let high = articles.one_by_attributes(&above, true).await.unwrap().unwrap();
    assert_eq!(high.views, 5);

    // uncached lookups always go by the operator
    let low = articles.one_by_attributes(&below, false).await.unwrap().unwrap();
    assert_eq!(low.views, 1);
}

#[tokio::test]
async fn test_list_by_attributes_counts_all_matches() {
    let database = database();
    let articles = store::<Article>(&database);
    seed_articles(&articles, 5).await;

    let options = ListOptions::new()
        .order_by("views", SortOrder::Desc)
        .with_offset(1)
        .with_limit(2);
    let page = articles
        .list_by_attributes(&filter(json!({"views": ">=2"})), &options)
        .await
        .unwrap();

    assert_eq!(page.count, 4);
    let titles: Vec<&str> = page.list.iter().map(|a| a.title.as_str()).collect();
    assert_eq!(titles, vec!["Post 4", "Post 3"]);

    let all = articles
        .list_by_attributes(&Attributes::new(), &ListOptions::new())
        .await
        .unwrap();
    assert_eq!(all.count, 5);
    assert_eq!(all.len(), 5);
    assert!(all.list.iter().all(|a| a.metadata().contains_key("slug")));

    let none = articles
        .list_by_attributes(&filter(json!({"id": []})), &ListOptions::new())
        .await
        .unwrap();
    assert!(none.is_empty());
    assert_eq!(none.count, 0);
}

#[tokio::test]
async fn test_raw_queries_need_sql() {
    let database = database();
    let articles = store::<Article>(&database);

    let result = articles.one_by_query("views > $1", vec![1i64.into()]).await;
    assert!(matches!(result, Err(ThingError::Unsupported(_))));

    let result = articles
        .list_by_query("views > $1", vec![1i64.into()], &ListOptions::new())
        .await;
    assert!(matches!(result, Err(ThingError::Unsupported(_))));
}

#[tokio::test]
async fn test_items_objects_run_extension() {
    let database = database();
    let articles = store::<Article>(&database);

    let rows = vec![
        filter(json!({"id": 1, "title": "One Two", "views": 0, "deleted": 0})),
        filter(json!({"id": 2, "title": "Three", "views": 0, "deleted": 0, "extra": true})),
    ];
    let items = articles.items_objects(rows, EntityState::Persisted).unwrap();

    assert_eq!(items[0].metadata().get("slug"), Some(&json!("one-two")));
    assert_eq!(items[1].metadata().get("extra"), Some(&json!(true)));
}

// ========================================
// Delete
// ========================================

#[tokio::test]
async fn test_soft_delete_flags_once() {
    let database = database();
    let articles = store::<Article>(&database);
    seed_articles(&articles, 1).await;

    let mut entity = articles.by_pk(1, false).await.unwrap().unwrap();
    assert!(articles.delete(&mut entity).await.unwrap());
    assert_eq!(entity.deleted, 1);
    assert_eq!(database.rows("articles")[0].get("deleted"), Some(&json!(1)));
    assert!(recorded("after_delete:Post 1"));

    // already flagged
    assert!(!articles.delete(&mut entity).await.unwrap());
    assert_eq!(database.rows("articles").len(), 1);
}

#[tokio::test]
async fn test_hard_delete_composite_key() {
    let database = database();
    let tags = store::<Tag>(&database);

    let mut unsaved = Entity::new(Tag {
        article_id: 7,
        tag: "draft".to_string(),
        weight: 0,
    });
    assert!(!tags.delete(&mut unsaved).await.unwrap());

    assert!(tags.save(&mut unsaved).await.unwrap());
    assert!(tags.delete(&mut unsaved).await.unwrap());
    assert!(database.rows("article_tags").is_empty());
    assert!(recorded("tag_deleted:7:draft"));
}
