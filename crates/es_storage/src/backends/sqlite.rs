use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use es_core::{
    split_tags, ArticleCandidate, ArticleId, ArticleStorage, CatalogStorage, DiseaseCaseRecord, Error,
    Keyword, OverviewStats, Result, StoredArticle, Tag, TrendPoint, WhitelistDomain,
};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use std::path::Path;
use tracing::debug;
use std::sync::Arc;
use crate::{StorageBackend, StorageConfig};

// Articles are split into an identity row (what makes an article unique)
// and a details row (everything derived by the scanner).
const MIGRATIONS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS article_identity (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT,
        link TEXT NOT NULL UNIQUE,
        published_date TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS article_details (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        article_id INTEGER NOT NULL UNIQUE REFERENCES article_identity(id) ON DELETE CASCADE,
        summary TEXT,
        source TEXT,
        keywords_matched TEXT,
        tags TEXT,
        is_whitelisted INTEGER NOT NULL DEFAULT 0
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS disease_cases (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        article_id INTEGER NOT NULL REFERENCES article_identity(id) ON DELETE CASCADE,
        disease_name TEXT NOT NULL,
        case_count INTEGER NOT NULL DEFAULT 0,
        location TEXT,
        report_date TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_disease_cases_name ON disease_cases(disease_name)",
    r#"
    CREATE TABLE IF NOT EXISTS whitelist_domains (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        domain TEXT NOT NULL UNIQUE,
        is_active INTEGER NOT NULL DEFAULT 1
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS keywords (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        text TEXT NOT NULL UNIQUE,
        created_at TEXT NOT NULL
    )
    "#,
    // Add future migrations here
];

const KEYWORD_SEPARATOR: &str = ", ";

/// Timestamps are stored as second-precision UTC RFC 3339 text so that
/// string order is time order.
fn to_db_time(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn from_db_time(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| Error::Database(format!("Failed to parse date {:?}: {}", raw, e)))
}

fn db_error(context: &'static str) -> impl Fn(sqlx::Error) -> Error {
    move |e| Error::Database(format!("{}: {}", context, e))
}

/// SQLite binds integers as i64; larger page sizes mean "everything".
fn page(skip: usize, limit: usize) -> (i64, i64) {
    (
        i64::try_from(skip).unwrap_or(i64::MAX),
        i64::try_from(limit).unwrap_or(-1),
    )
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.is_unique_violation())
}

pub struct SQLiteStorage {
    pool: Arc<SqlitePool>,
}

#[async_trait]
impl StorageBackend for SQLiteStorage {
    fn get_error_message() -> &'static str {
        "SQLite database should be writable at the configured path"
    }

    async fn open(config: &StorageConfig) -> Result<Self> where Self: Sized {
        Self::new_with_path(&config.database_path).await
    }
}

impl SQLiteStorage {
    pub async fn new_with_path(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(db_error("Failed to connect to database"))?;

        for (i, migration) in MIGRATIONS.iter().enumerate() {
            sqlx::query(migration)
                .execute(&pool)
                .await
                .map_err(|e| Error::Database(format!("Failed to run migration {}: {}", i, e)))?;
        }

        debug!("SQLite database ready at {}", db_path.display());
        Ok(Self {
            pool: Arc::new(pool),
        })
    }

    fn article_from_row(row: &SqliteRow) -> Result<StoredArticle> {
        let get_err = db_error("Failed to read article row");
        let keywords: Option<String> = row.try_get("keywords_matched").map_err(&get_err)?;
        let tags: Option<String> = row.try_get("tags").map_err(&get_err)?;
        let published: String = row.try_get("published_date").map_err(&get_err)?;

        Ok(StoredArticle {
            id: row.try_get("id").map_err(&get_err)?,
            article: ArticleCandidate {
                title: row.try_get::<Option<String>, _>("title").map_err(&get_err)?.unwrap_or_default(),
                link: row.try_get("link").map_err(&get_err)?,
                summary: row.try_get::<Option<String>, _>("summary").map_err(&get_err)?.unwrap_or_default(),
                source_domain: row.try_get::<Option<String>, _>("source").map_err(&get_err)?.unwrap_or_default(),
                published_at: from_db_time(&published)?,
                matched_keywords: keywords
                    .filter(|k| !k.is_empty())
                    .map(|k| k.split(KEYWORD_SEPARATOR).map(str::to_string).collect())
                    .unwrap_or_default(),
                tags: split_tags(tags.as_deref()),
                is_trusted: row.try_get::<Option<bool>, _>("is_whitelisted").map_err(&get_err)?.unwrap_or(false),
            },
        })
    }

    fn keyword_from_row(row: &SqliteRow) -> Result<Keyword> {
        let get_err = db_error("Failed to read keyword row");
        let created: String = row.try_get("created_at").map_err(&get_err)?;
        Ok(Keyword {
            id: row.try_get("id").map_err(&get_err)?,
            text: row.try_get("text").map_err(&get_err)?,
            created_at: from_db_time(&created)?,
        })
    }

    fn whitelist_from_row(row: &SqliteRow) -> Result<WhitelistDomain> {
        let get_err = db_error("Failed to read whitelist row");
        Ok(WhitelistDomain {
            id: row.try_get("id").map_err(&get_err)?,
            domain: row.try_get("domain").map_err(&get_err)?,
            is_active: row.try_get("is_active").map_err(&get_err)?,
        })
    }
}

#[async_trait]
impl ArticleStorage for SQLiteStorage {
    async fn article_exists_by_link(&self, link: &str) -> Result<bool> {
        let found: Option<i64> = sqlx::query_scalar("SELECT id FROM article_identity WHERE link = ?")
            .bind(link)
            .fetch_optional(&*self.pool)
            .await
            .map_err(db_error("Failed to look up article"))?;
        Ok(found.is_some())
    }

    async fn save_article(&self, candidate: &ArticleCandidate) -> Result<ArticleId> {
        let mut tx = self.pool.begin().await.map_err(db_error("Failed to begin transaction"))?;

        let inserted = sqlx::query(
            "INSERT INTO article_identity (title, link, published_date) VALUES (?, ?, ?)",
        )
        .bind(&candidate.title)
        .bind(&candidate.link)
        .bind(to_db_time(&candidate.published_at))
        .execute(&mut *tx)
        .await;

        let article_id = match inserted {
            Ok(done) => done.last_insert_rowid(),
            Err(e) if is_unique_violation(&e) => {
                return Err(Error::AlreadyExists(format!("Article already saved: {}", candidate.link)));
            }
            Err(e) => return Err(db_error("Failed to store article")(e)),
        };

        sqlx::query(
            r#"
            INSERT INTO article_details
            (article_id, summary, source, keywords_matched, tags, is_whitelisted)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(article_id)
        .bind(&candidate.summary)
        .bind(&candidate.source_domain)
        .bind(candidate.matched_keywords.join(KEYWORD_SEPARATOR))
        .bind(candidate.tags_label())
        .bind(candidate.is_trusted)
        .execute(&mut *tx)
        .await
        .map_err(db_error("Failed to store article details"))?;

        tx.commit().await.map_err(db_error("Failed to commit article"))?;
        Ok(article_id)
    }

    async fn save_disease_case(&self, record: &DiseaseCaseRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO disease_cases (article_id, disease_name, case_count, location, report_date)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(record.article_id)
        .bind(&record.disease_name)
        // INTEGER columns are signed 64-bit
        .bind(i64::try_from(record.case_count).unwrap_or(i64::MAX))
        .bind(&record.location)
        .bind(to_db_time(&record.report_date))
        .execute(&*self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                Error::NotFound(format!("Article {} not found", record.article_id))
            }
            _ => Error::Database(format!("Failed to store disease case: {}", e)),
        })?;
        Ok(())
    }

    async fn list_keywords(&self) -> Result<Vec<String>> {
        sqlx::query_scalar("SELECT text FROM keywords ORDER BY id DESC")
            .fetch_all(&*self.pool)
            .await
            .map_err(db_error("Failed to list keywords"))
    }

    async fn list_whitelist_domains(&self) -> Result<Vec<String>> {
        let domains: Vec<String> =
            sqlx::query_scalar("SELECT domain FROM whitelist_domains WHERE is_active = 1 ORDER BY id")
                .fetch_all(&*self.pool)
                .await
                .map_err(db_error("Failed to list whitelist"))?;
        Ok(domains.into_iter().map(|d| d.to_lowercase()).collect())
    }
}

#[async_trait]
impl CatalogStorage for SQLiteStorage {
    fn as_article_storage(self: Arc<Self>) -> Arc<dyn ArticleStorage> {
        self
    }

    async fn list_articles(&self, skip: usize, limit: usize) -> Result<Vec<StoredArticle>> {
        let (skip, limit) = page(skip, limit);
        let rows = sqlx::query(
            r#"
            SELECT i.id, i.title, i.link, i.published_date,
                   d.summary, d.source, d.keywords_matched, d.tags, d.is_whitelisted
            FROM article_identity i
            LEFT JOIN article_details d ON d.article_id = i.id
            ORDER BY i.published_date DESC, i.id DESC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(limit)
        .bind(skip)
        .fetch_all(&*self.pool)
        .await
        .map_err(db_error("Failed to list articles"))?;

        rows.iter().map(Self::article_from_row).collect()
    }

    async fn keywords(&self, skip: usize, limit: usize) -> Result<Vec<Keyword>> {
        let (skip, limit) = page(skip, limit);
        let rows = sqlx::query("SELECT id, text, created_at FROM keywords ORDER BY id DESC LIMIT ? OFFSET ?")
            .bind(limit)
            .bind(skip)
            .fetch_all(&*self.pool)
            .await
            .map_err(db_error("Failed to list keywords"))?;
        rows.iter().map(Self::keyword_from_row).collect()
    }

    async fn create_keyword(&self, text: &str) -> Result<Keyword> {
        let text = text.trim();
        if text.is_empty() {
            return Err(Error::Config("Keyword must not be empty".to_string()));
        }
        let created_at = Utc::now();
        let inserted = sqlx::query("INSERT INTO keywords (text, created_at) VALUES (?, ?)")
            .bind(text)
            .bind(to_db_time(&created_at))
            .execute(&*self.pool)
            .await;
        match inserted {
            Ok(done) => Ok(Keyword {
                id: done.last_insert_rowid(),
                text: text.to_string(),
                created_at: from_db_time(&to_db_time(&created_at))?,
            }),
            Err(e) if is_unique_violation(&e) => {
                Err(Error::AlreadyExists(format!("Keyword already exists: {}", text)))
            }
            Err(e) => Err(db_error("Failed to create keyword")(e)),
        }
    }

    async fn delete_keyword(&self, id: i64) -> Result<()> {
        let done = sqlx::query("DELETE FROM keywords WHERE id = ?")
            .bind(id)
            .execute(&*self.pool)
            .await
            .map_err(db_error("Failed to delete keyword"))?;
        if done.rows_affected() == 0 {
            return Err(Error::NotFound(format!("Keyword {} not found", id)));
        }
        Ok(())
    }

    async fn whitelist(&self, skip: usize, limit: usize) -> Result<Vec<WhitelistDomain>> {
        let (skip, limit) = page(skip, limit);
        let rows = sqlx::query("SELECT id, domain, is_active FROM whitelist_domains ORDER BY id LIMIT ? OFFSET ?")
            .bind(limit)
            .bind(skip)
            .fetch_all(&*self.pool)
            .await
            .map_err(db_error("Failed to list whitelist"))?;
        rows.iter().map(Self::whitelist_from_row).collect()
    }

    async fn create_whitelist_domain(&self, domain: &str, is_active: bool) -> Result<WhitelistDomain> {
        let domain = domain.trim().to_lowercase();
        if domain.is_empty() {
            return Err(Error::Config("Domain must not be empty".to_string()));
        }
        let inserted = sqlx::query("INSERT INTO whitelist_domains (domain, is_active) VALUES (?, ?)")
            .bind(&domain)
            .bind(is_active)
            .execute(&*self.pool)
            .await;
        match inserted {
            Ok(done) => Ok(WhitelistDomain {
                id: done.last_insert_rowid(),
                domain,
                is_active,
            }),
            Err(e) if is_unique_violation(&e) => {
                Err(Error::AlreadyExists(format!("Domain already whitelisted: {}", domain)))
            }
            Err(e) => Err(db_error("Failed to create whitelist domain")(e)),
        }
    }

    async fn overview_stats(&self, now: DateTime<Utc>) -> Result<OverviewStats> {
        let total_articles: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM article_identity")
            .fetch_one(&*self.pool)
            .await
            .map_err(db_error("Failed to count articles"))?;
        let total_cases: i64 = sqlx::query_scalar("SELECT COALESCE(SUM(case_count), 0) FROM disease_cases")
            .fetch_one(&*self.pool)
            .await
            .map_err(db_error("Failed to sum cases"))?;
        let alert_count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM article_identity i
            JOIN article_details d ON d.article_id = i.id
            WHERE d.tags LIKE ?
            "#,
        )
        .bind(format!("%{}%", Tag::Alert.label()))
        .fetch_one(&*self.pool)
        .await
        .map_err(db_error("Failed to count alerts"))?;

        Ok(OverviewStats {
            total_articles: total_articles.max(0) as u64,
            total_cases: total_cases.max(0) as u64,
            alert_count: alert_count.max(0) as u64,
            last_updated: now,
        })
    }

    async fn trend_data(&self, since: DateTime<Utc>) -> Result<Vec<TrendPoint>> {
        let rows = sqlx::query(
            r#"
            SELECT substr(report_date, 1, 10) AS day, SUM(case_count) AS cases
            FROM disease_cases
            WHERE report_date >= ?
            GROUP BY day
            ORDER BY day
            "#,
        )
        .bind(to_db_time(&since))
        .fetch_all(&*self.pool)
        .await
        .map_err(db_error("Failed to load trend data"))?;

        let get_err = db_error("Failed to read trend row");
        rows.iter()
            .map(|row| {
                Ok(TrendPoint {
                    date: row.try_get("day").map_err(&get_err)?,
                    cases: row.try_get::<i64, _>("cases").map_err(&get_err)?.max(0) as u64,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use tempfile::tempdir;

    fn candidate(link: &str, published_at: DateTime<Utc>, tags: Vec<Tag>) -> ArticleCandidate {
        ArticleCandidate {
            title: "Hà Nội ghi nhận 15 ca mắc sởi".to_string(),
            link: link.to_string(),
            summary: "Tóm tắt".to_string(),
            source_domain: "vnexpress.net".to_string(),
            published_at,
            matched_keywords: vec!["sởi".to_string(), "Sốt xuất huyết".to_string()],
            tags,
            is_trusted: true,
        }
    }

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, d, 9, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_sqlite_storage() {
        let temp_dir = tempdir().unwrap();
        let db_path = temp_dir.path().join("test.db");
        let storage = SQLiteStorage::new_with_path(&db_path).await.unwrap();
        assert!(db_path.exists());

        let article = candidate("https://vnexpress.net/soi-1.html", day(1), vec![Tag::New, Tag::Alert]);
        assert!(!storage.article_exists_by_link(&article.link).await.unwrap());
        let id = storage.save_article(&article).await.unwrap();
        assert!(storage.article_exists_by_link(&article.link).await.unwrap());
        assert!(matches!(storage.save_article(&article).await, Err(Error::AlreadyExists(_))));

        let listed = storage.list_articles(0, 10).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, id);
        assert_eq!(listed[0].article, article);
    }

    #[tokio::test]
    async fn test_reopen_keeps_data() {
        let temp_dir = tempdir().unwrap();
        let db_path = temp_dir.path().join("nested").join("episcout.db");
        {
            let storage = SQLiteStorage::new_with_path(&db_path).await.unwrap();
            storage.create_keyword("sởi").await.unwrap();
        }
        let storage = SQLiteStorage::new_with_path(&db_path).await.unwrap();
        assert_eq!(storage.list_keywords().await.unwrap(), vec!["sởi".to_string()]);
    }

    #[tokio::test]
    async fn test_keywords_and_whitelist() {
        let temp_dir = tempdir().unwrap();
        let storage = SQLiteStorage::new_with_path(&temp_dir.path().join("kw.db")).await.unwrap();

        let soi = storage.create_keyword("sởi").await.unwrap();
        storage.create_keyword("cúm A").await.unwrap();
        assert!(matches!(storage.create_keyword("sởi").await, Err(Error::AlreadyExists(_))));
        assert_eq!(storage.list_keywords().await.unwrap(), vec!["cúm A".to_string(), "sởi".to_string()]);
        storage.delete_keyword(soi.id).await.unwrap();
        assert!(matches!(storage.delete_keyword(soi.id).await, Err(Error::NotFound(_))));
        assert_eq!(storage.keywords(0, usize::MAX).await.unwrap().len(), 1);

        storage.create_whitelist_domain("Tuoitre.vn", true).await.unwrap();
        storage.create_whitelist_domain("old.example.com", false).await.unwrap();
        assert!(matches!(
            storage.create_whitelist_domain("tuoitre.vn", true).await,
            Err(Error::AlreadyExists(_))
        ));
        assert_eq!(storage.list_whitelist_domains().await.unwrap(), vec!["tuoitre.vn".to_string()]);
        assert_eq!(storage.whitelist(0, 10).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_cases_and_stats() {
        let temp_dir = tempdir().unwrap();
        let storage = SQLiteStorage::new_with_path(&temp_dir.path().join("stats.db")).await.unwrap();

        let a = storage.save_article(&candidate("https://a.vn/1", day(1), vec![Tag::Alert])).await.unwrap();
        let b = storage.save_article(&candidate("https://a.vn/2", day(3), vec![])).await.unwrap();
        for (article_id, count, date) in [(a, 5, day(1)), (a, 2, day(1)), (b, 10, day(3))] {
            storage
                .save_disease_case(&DiseaseCaseRecord {
                    article_id,
                    disease_name: "sởi".to_string(),
                    case_count: count,
                    location: "Việt Nam".to_string(),
                    report_date: date,
                })
                .await
                .unwrap();
        }

        let orphan = DiseaseCaseRecord {
            article_id: 999,
            disease_name: "sởi".to_string(),
            case_count: 1,
            location: "Việt Nam".to_string(),
            report_date: day(1),
        };
        assert!(storage.save_disease_case(&orphan).await.is_err());

        let overview = storage.overview_stats(day(4)).await.unwrap();
        assert_eq!(overview.total_articles, 2);
        assert_eq!(overview.total_cases, 17);
        assert_eq!(overview.alert_count, 1);

        let trend = storage.trend_data(day(4) - Duration::days(7)).await.unwrap();
        assert_eq!(
            trend,
            vec![
                TrendPoint { date: "2024-06-01".to_string(), cases: 7 },
                TrendPoint { date: "2024-06-03".to_string(), cases: 10 },
            ]
        );
    }
}
