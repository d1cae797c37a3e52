//! SQLite-backed [`DocumentStore`].
//!
//! Tags are stored as a JSON array in a TEXT column and queried with
//! `json_each`. Embeddings are little-endian `f32` BLOBs (see
//! [`vec_to_blob`]). Timestamps are Unix milliseconds.
//!
//! Text matching uses `lower(col) LIKE ?`. SQLite's `lower()` only folds
//! ASCII, so the needle is folded the same way: non-ASCII letters match
//! case-sensitively, ASCII letters case-insensitively.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};

use doclens_core::embedding::{blob_to_vec, vec_to_blob};
use doclens_core::models::{Document, DocumentUpdate};
use doclens_core::store::{DocumentFilter, DocumentStore, SortOrder};

const COLUMNS: &str =
    "id, title, content, tags, summary, embedding, owner, created_at, updated_at";

/// Document store over a [`SqlitePool`]. Run migrations before use.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn like_pattern(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len() + 2);
    escaped.push('%');
    for c in needle.to_ascii_lowercase().chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

fn from_millis(ms: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms).ok_or_else(|| anyhow!("timestamp out of range: {}", ms))
}

fn row_to_document(row: &SqliteRow) -> Result<Document> {
    let tags_json: String = row.try_get("tags")?;
    let blob: Option<Vec<u8>> = row.try_get("embedding")?;

    Ok(Document {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        content: row.try_get("content")?,
        tags: serde_json::from_str(&tags_json)?,
        summary: row.try_get("summary")?,
        embedding: blob.map(|b| blob_to_vec(&b)),
        owner: row.try_get("owner")?,
        created_at: from_millis(row.try_get("created_at")?)?,
        updated_at: from_millis(row.try_get("updated_at")?)?,
    })
}

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn insert(&self, doc: &Document) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO documents (id, title, content, tags, summary, embedding, owner, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&doc.id)
        .bind(&doc.title)
        .bind(&doc.content)
        .bind(serde_json::to_string(&doc.tags)?)
        .bind(doc.summary.as_deref())
        .bind(doc.embedding.as_deref().map(vec_to_blob))
        .bind(&doc.owner)
        .bind(doc.created_at.timestamp_millis())
        .bind(doc.updated_at.timestamp_millis())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<Document>> {
        let row = sqlx::query(&format!("SELECT {} FROM documents WHERE id = ?", COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_document).transpose()
    }

    async fn find(&self, filter: &DocumentFilter) -> Result<Vec<Document>> {
        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {} FROM documents WHERE 1 = 1", COLUMNS));

        if filter.has_embedding {
            qb.push(" AND embedding IS NOT NULL");
        }
        if let Some(tag) = &filter.tag {
            qb.push(" AND EXISTS (SELECT 1 FROM json_each(documents.tags) WHERE json_each.value = ")
                .push_bind(tag.clone())
                .push(")");
        }
        if let Some(text) = &filter.text {
            let pattern = like_pattern(text);
            qb.push(" AND (lower(title) LIKE ")
                .push_bind(pattern.clone())
                .push(" ESCAPE '\\' OR lower(content) LIKE ")
                .push_bind(pattern.clone())
                .push(" ESCAPE '\\' OR lower(COALESCE(summary, '')) LIKE ")
                .push_bind(pattern.clone())
                .push(" ESCAPE '\\'");
            if filter.match_tags {
                qb.push(
                    " OR EXISTS (SELECT 1 FROM json_each(documents.tags) \
                     WHERE lower(json_each.value) LIKE ",
                )
                .push_bind(pattern)
                .push(" ESCAPE '\\')");
            }
            qb.push(")");
        }

        match filter.sort {
            SortOrder::Insertion => qb.push(" ORDER BY rowid ASC"),
            SortOrder::UpdatedDesc => qb.push(" ORDER BY updated_at DESC, id ASC"),
        };

        let limit = filter.limit.map(|l| l as i64).unwrap_or(-1);
        qb.push(" LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(filter.skip as i64);

        let rows = qb.build().fetch_all(&self.pool).await?;
        rows.iter().map(row_to_document).collect()
    }

    async fn update_fields(&self, id: &str, update: &DocumentUpdate) -> Result<Option<Document>> {
        let now = Utc::now().timestamp_millis();
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE documents SET updated_at = ");
        qb.push_bind(now);

        if let Some(title) = &update.title {
            qb.push(", title = ").push_bind(title.clone());
        }
        if let Some(content) = &update.content {
            qb.push(", content = ").push_bind(content.clone());
        }
        if let Some(tags) = &update.tags {
            qb.push(", tags = ").push_bind(serde_json::to_string(tags)?);
        }
        if let Some(summary) = &update.summary {
            qb.push(", summary = ").push_bind(summary.clone());
        }
        if let Some(embedding) = &update.embedding {
            qb.push(", embedding = ").push_bind(vec_to_blob(embedding));
        }
        qb.push(" WHERE id = ").push_bind(id.to_string());

        let result = qb.build().execute(&self.pool).await?;
        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get(id).await
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM documents WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::{db, migrate};
    use doclens_core::models::NewDocument;

    async fn store() -> (tempfile::TempDir, SqliteStore) {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::minimal(dir.path().join("test.sqlite"));
        let pool = db::connect(&config).await.unwrap();
        migrate::migrate_pool(&pool).await.unwrap();
        (dir, SqliteStore::new(pool))
    }

    fn doc(title: &str, content: &str, tags: &[&str]) -> Document {
        Document::new(
            NewDocument {
                title: title.into(),
                content: content.into(),
                tags: tags.iter().map(|t| t.to_string()).collect(),
            },
            "alice",
        )
    }

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("50%_Off"), "%50\\%\\_off%");
    }

    #[tokio::test]
    async fn test_insert_get_roundtrip() {
        let (_dir, store) = store().await;
        let mut d = doc("Title", "Body", &["a", "b"]);
        d.embedding = Some(vec![0.5, -1.0]);
        store.insert(&d).await.unwrap();

        let got = store.get(&d.id).await.unwrap().unwrap();
        assert_eq!(got.title, "Title");
        assert_eq!(got.tags, vec!["a", "b"]);
        assert_eq!(got.embedding, Some(vec![0.5, -1.0]));
        assert_eq!(got.owner, "alice");
        assert!(store.get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_find_text_and_tag_filters() {
        let (_dir, store) = store().await;
        let a = doc("Rust Guide", "ownership", &["lang"]);
        let b = doc("Cooking", "pasta 100%", &["food", "RustBelt"]);
        store.insert(&a).await.unwrap();
        store.insert(&b).await.unwrap();

        let title_only = store
            .find(&DocumentFilter {
                text: Some("rust".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(title_only.len(), 1);
        assert_eq!(title_only[0].id, a.id);

        let with_tags = store
            .find(&DocumentFilter {
                text: Some("rust".into()),
                match_tags: true,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(with_tags.len(), 2);

        let tagged = store
            .find(&DocumentFilter {
                tag: Some("food".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(tagged.len(), 1);
        assert_eq!(tagged[0].id, b.id);

        let percent = store
            .find(&DocumentFilter {
                text: Some("100%".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(percent.len(), 1);
    }

    #[tokio::test]
    async fn test_find_non_ascii_text() {
        let (_dir, store) = store().await;
        let d = doc("École notes", "Über café", &["Année"]);
        store.insert(&d).await.unwrap();

        // Non-ASCII letters compare case-sensitively, ASCII letters fold.
        let cases = [
            ("École", 1),
            ("École NOTES", 1),
            ("ÉCOLE", 0),
            ("Über CAFÉ", 0),
            ("Über CAFé", 1),
        ];
        for (needle, expected) in cases {
            let found = store
                .find(&DocumentFilter {
                    text: Some(needle.into()),
                    ..Default::default()
                })
                .await
                .unwrap();
            assert_eq!(found.len(), expected, "needle {:?}", needle);
        }

        let hits = doclens_core::search::text_matches(&store, "Année", 50)
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[tokio::test]
    async fn test_find_pagination_and_sort() {
        let (_dir, store) = store().await;
        let first = doc("one", "x", &[]);
        let second = doc("two", "x", &[]);
        store.insert(&first).await.unwrap();
        store.insert(&second).await.unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        store
            .update_fields(
                &first.id,
                &DocumentUpdate {
                    summary: Some("s".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let native = store.find(&DocumentFilter::all()).await.unwrap();
        assert_eq!(native[0].id, first.id);

        let recent = store
            .find(&DocumentFilter {
                sort: SortOrder::UpdatedDesc,
                limit: Some(1),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].id, first.id);

        let page2 = store
            .find(&DocumentFilter {
                sort: SortOrder::UpdatedDesc,
                skip: 1,
                limit: Some(1),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(page2[0].id, second.id);
    }

    #[tokio::test]
    async fn test_has_embedding_filter() {
        let (_dir, store) = store().await;
        let mut with = doc("a", "x", &[]);
        with.embedding = Some(vec![1.0]);
        store.insert(&with).await.unwrap();
        store.insert(&doc("b", "x", &[])).await.unwrap();

        let found = store
            .find(&DocumentFilter {
                has_embedding: true,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, with.id);
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let (_dir, store) = store().await;
        let d = doc("a", "x", &[]);
        store.insert(&d).await.unwrap();

        let updated = store
            .update_fields(
                &d.id,
                &DocumentUpdate {
                    tags: Some(vec!["t".into()]),
                    embedding: Some(vec![0.25]),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.tags, vec!["t"]);
        assert_eq!(updated.embedding, Some(vec![0.25]));
        assert!(updated.updated_at >= d.updated_at);

        assert!(store.delete(&d.id).await.unwrap());
        assert!(!store.delete(&d.id).await.unwrap());
        assert!(store
            .update_fields(&d.id, &DocumentUpdate::default())
            .await
            .unwrap()
            .is_none());
    }
}
