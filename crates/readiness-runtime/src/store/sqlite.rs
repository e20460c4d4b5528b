//! Embedded SQLite implementation of the store traits.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

use readiness_core::{CriterionRow, EvidenceItem, LevelRow, SubjectId};

use super::{DocumentRegistry, EvidenceStore, RubricStore, RunStatus, StatusTracker, StoreError};

const SCHEMA: [&str; 5] = [
    r#"
    CREATE TABLE IF NOT EXISTS trl_levels (
        level INTEGER PRIMARY KEY,
        name TEXT NOT NULL,
        min_score INTEGER NOT NULL,
        description TEXT NOT NULL DEFAULT ''
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS trl_criteria (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        level INTEGER NOT NULL,
        name TEXT NOT NULL,
        points INTEGER NOT NULL,
        importance TEXT NOT NULL,
        justification TEXT NOT NULL DEFAULT ''
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS evidence (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        project_id INTEGER NOT NULL,
        file_name TEXT NOT NULL,
        mime_type TEXT NOT NULL,
        payload BLOB NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS documents (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        file_name TEXT NOT NULL,
        created_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS assessment_status (
        subject_kind TEXT NOT NULL,
        subject_id INTEGER NOT NULL,
        status TEXT NOT NULL,
        message TEXT,
        updated_at TEXT NOT NULL,
        PRIMARY KEY (subject_kind, subject_id)
    )
    "#,
];

const INSERT_LEVEL: &str =
    "INSERT INTO trl_levels (level, name, min_score, description) VALUES (?, ?, ?, ?)";
const INSERT_CRITERION: &str =
    "INSERT INTO trl_criteria (level, name, points, importance, justification) VALUES (?, ?, ?, ?, ?)";

/// SQLite-backed rubric store, evidence source, document registry and
/// status tracker.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Connect to `url` (e.g. `sqlite://readiness.db?mode=rwc`) and create
    /// missing tables.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        tracing::debug!(url = %url, "Connecting to database");
        let pool = SqlitePoolOptions::new().max_connections(5).connect(url).await?;
        Self::with_pool(pool).await
    }

    /// Private in-memory database. One connection, kept for the pool's
    /// lifetime, so every query sees the same data.
    pub async fn in_memory() -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;
        Self::with_pool(pool).await
    }

    pub async fn with_pool(pool: SqlitePool) -> Result<Self, StoreError> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&pool).await?;
        }
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn insert_level(&self, row: &LevelRow) -> Result<(), StoreError> {
        sqlx::query(INSERT_LEVEL)
            .bind(row.ordinal)
            .bind(&row.name)
            .bind(row.min_score)
            .bind(&row.description)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn insert_criterion(&self, row: &CriterionRow) -> Result<(), StoreError> {
        sqlx::query(INSERT_CRITERION)
            .bind(row.level)
            .bind(&row.name)
            .bind(row.points)
            .bind(&row.importance)
            .bind(&row.justification)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Replace the whole rubric in one transaction.
    pub async fn replace_rubric(
        &self,
        levels: &[LevelRow],
        criteria: &[CriterionRow],
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM trl_criteria").execute(&mut *tx).await?;
        sqlx::query("DELETE FROM trl_levels").execute(&mut *tx).await?;
        for row in levels {
            sqlx::query(INSERT_LEVEL)
                .bind(row.ordinal)
                .bind(&row.name)
                .bind(row.min_score)
                .bind(&row.description)
                .execute(&mut *tx)
                .await?;
        }
        for row in criteria {
            sqlx::query(INSERT_CRITERION)
                .bind(row.level)
                .bind(&row.name)
                .bind(row.points)
                .bind(&row.importance)
                .bind(&row.justification)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// Attach an evidence file to a project; returns the row id.
    pub async fn add_evidence(
        &self,
        project_id: i64,
        item: &EvidenceItem,
    ) -> Result<i64, StoreError> {
        let result = sqlx::query(
            "INSERT INTO evidence (project_id, file_name, mime_type, payload) VALUES (?, ?, ?, ?)",
        )
        .bind(project_id)
        .bind(&item.name)
        .bind(&item.mime_type)
        .bind(&item.payload)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    /// Current status of a subject.
    pub async fn status(&self, subject: SubjectId) -> Result<Option<RunStatus>, StoreError> {
        let row: Option<(String, Option<String>)> = sqlx::query_as(
            "SELECT status, message FROM assessment_status WHERE subject_kind = ? AND subject_id = ?",
        )
        .bind(subject.kind())
        .bind(subject.id())
        .fetch_optional(&self.pool)
        .await?;
        row.map(|(status, message)| RunStatus::from_stored(&status, message))
            .transpose()
    }
}

#[async_trait]
impl RubricStore for SqliteStore {
    async fn rubric_rows(&self) -> Result<(Vec<LevelRow>, Vec<CriterionRow>), StoreError> {
        let levels = sqlx::query_as::<_, (i64, String, i64, String)>(
            "SELECT level, name, min_score, description FROM trl_levels ORDER BY level",
        )
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(|(ordinal, name, min_score, description)| LevelRow {
            ordinal,
            name,
            min_score,
            description,
        })
        .collect();

        let criteria = sqlx::query_as::<_, (i64, String, i64, String, String)>(
            "SELECT level, name, points, importance, justification FROM trl_criteria ORDER BY level, id",
        )
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(|(level, name, points, importance, justification)| CriterionRow {
            level,
            name,
            points,
            importance,
            justification,
        })
        .collect();

        Ok((levels, criteria))
    }
}

#[async_trait]
impl EvidenceStore for SqliteStore {
    async fn project_evidence(&self, project_id: i64) -> Result<Vec<EvidenceItem>, StoreError> {
        let rows = sqlx::query_as::<_, (i64, String, String, Vec<u8>)>(
            "SELECT id, file_name, mime_type, payload FROM evidence WHERE project_id = ? ORDER BY id",
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, name, mime_type, payload)| {
                EvidenceItem::new(name, mime_type, payload).with_id(id)
            })
            .collect())
    }
}

#[async_trait]
impl DocumentRegistry for SqliteStore {
    async fn register_document(&self, file_name: &str) -> Result<i64, StoreError> {
        let result = sqlx::query("INSERT INTO documents (file_name, created_at) VALUES (?, ?)")
            .bind(file_name)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;
        Ok(result.last_insert_rowid())
    }
}

#[async_trait]
impl StatusTracker for SqliteStore {
    async fn mark(&self, subject: SubjectId, status: &RunStatus) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO assessment_status (subject_kind, subject_id, status, message, updated_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT (subject_kind, subject_id) DO UPDATE SET
                status = excluded.status,
                message = excluded.message,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(subject.kind())
        .bind(subject.id())
        .bind(status.as_str())
        .bind(status.message())
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use readiness_core::{Rubric, PDF_MIME};

    async fn seeded() -> SqliteStore {
        let store = SqliteStore::in_memory().await.unwrap();
        for (ordinal, name, min_score) in [
            (2, "Concepto formulado", 60),
            (1, "Principios observados", 50),
            (3, "Prueba de concepto", 70),
        ] {
            store
                .insert_level(&LevelRow {
                    ordinal,
                    name: name.to_string(),
                    min_score,
                    description: String::new(),
                })
                .await
                .unwrap();
        }
        store
            .insert_criterion(&CriterionRow {
                level: 1,
                name: "Documento identifica problema tecnico".to_string(),
                points: 80,
                importance: "alta".to_string(),
                justification: String::new(),
            })
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_rubric_rows_are_ordered() {
        let store = seeded().await;
        let (levels, criteria) = store.rubric_rows().await.unwrap();
        let ordinals: Vec<i64> = levels.iter().map(|l| l.ordinal).collect();
        assert_eq!(ordinals, vec![1, 2, 3]);
        assert_eq!(criteria.len(), 1);

        let rubric = Rubric::from_rows(levels, criteria).unwrap();
        assert_eq!(rubric.levels().len(), 3);
    }

    #[tokio::test]
    async fn test_replace_rubric() {
        let store = seeded().await;
        let levels = vec![LevelRow {
            ordinal: 1,
            name: "Principios basicos".to_string(),
            min_score: 40,
            description: String::new(),
        }];

        store.replace_rubric(&levels, &[]).await.unwrap();

        let (stored, criteria) = store.rubric_rows().await.unwrap();
        assert_eq!(stored, levels);
        assert!(criteria.is_empty());
    }

    #[tokio::test]
    async fn test_project_evidence() {
        let store = SqliteStore::in_memory().await.unwrap();
        let first = store
            .add_evidence(7, &EvidenceItem::new("a.pdf", PDF_MIME, vec![1, 2, 3]))
            .await
            .unwrap();
        store
            .add_evidence(7, &EvidenceItem::new("b.png", "image/png", vec![4]))
            .await
            .unwrap();
        store
            .add_evidence(8, &EvidenceItem::new("other.pdf", PDF_MIME, vec![5]))
            .await
            .unwrap();

        let items = store.project_evidence(7).await.unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].id, Some(first));
        assert_eq!(items[0].payload, vec![1, 2, 3]);
        assert_eq!(items[1].mime_type, "image/png");

        assert!(store.project_evidence(99).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_document_ids_increase() {
        let store = SqliteStore::in_memory().await.unwrap();
        let a = store.register_document("a.pdf").await.unwrap();
        let b = store.register_document("b.pdf").await.unwrap();
        assert!(b > a);
    }

    #[tokio::test]
    async fn test_status_upsert() {
        let store = SqliteStore::in_memory().await.unwrap();
        let subject = SubjectId::Project(3);
        assert_eq!(store.status(subject).await.unwrap(), None);

        store.mark(subject, &RunStatus::Processing).await.unwrap();
        assert_eq!(store.status(subject).await.unwrap(), Some(RunStatus::Processing));

        store
            .mark(subject, &RunStatus::Failed("timeout".to_string()))
            .await
            .unwrap();
        assert_eq!(
            store.status(subject).await.unwrap(),
            Some(RunStatus::Failed("timeout".to_string()))
        );

        // Documents and projects with the same id are distinct subjects.
        assert_eq!(store.status(SubjectId::Document(3)).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_unknown_status_is_corrupt() {
        let store = SqliteStore::in_memory().await.unwrap();
        sqlx::query(
            "INSERT INTO assessment_status (subject_kind, subject_id, status, message, updated_at) VALUES ('document', 4, 'archived', NULL, '2025-01-01')",
        )
        .execute(store.pool())
        .await
        .unwrap();

        let err = store.status(SubjectId::Document(4)).await.unwrap_err();
        assert!(matches!(err, StoreError::Corrupt(_)));
        assert!(err.to_string().contains("archived"));
    }
}
