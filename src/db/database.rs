use std::str::FromStr;
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::db::models::{MovieRow, NewMovie};

const MOVIE_COLUMNS: &str = "id, title, file_ref, kind, raw_caption, added_at";
const CONNECT_ATTEMPTS: u32 = 3;

#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

/// Makes `%`, `_` and `\` in user queries match literally. Every pattern
/// query below carries `ESCAPE '\'`.
fn escape_like(query: &str) -> String {
    query
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

fn contains_pattern(query: &str) -> String {
    format!("%{}%", escape_like(query))
}

impl Database {
    pub async fn init(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);

        let mut delay = Duration::from_secs(1);
        let mut attempt = 0;
        let pool = loop {
            attempt += 1;
            match SqlitePoolOptions::new()
                .max_connections(5)
                .connect_with(options.clone())
                .await
            {
                Ok(pool) => break pool,
                Err(err) if attempt < CONNECT_ATTEMPTS => {
                    warn!("Database connect attempt {attempt} failed: {err}");
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                }
                Err(err) => return Err(err.into()),
            }
        };

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS movies (\
                id INTEGER PRIMARY KEY AUTOINCREMENT,\
                title TEXT NOT NULL UNIQUE,\
                file_ref TEXT NOT NULL,\
                kind TEXT NOT NULL,\
                raw_caption TEXT,\
                added_at TEXT NOT NULL\
            );",
        )
        .execute(&pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_movies_file_ref ON movies(file_ref);")
            .execute(&pool)
            .await?;

        info!("Catalog database ready");
        Ok(Database { pool })
    }

    /// Insert-or-replace keyed on the normalized title: a re-upload with
    /// the same title replaces the media reference, keeping the row id.
    pub async fn upsert_movie(&self, movie: NewMovie) -> Result<i64> {
        let (id,): (i64,) = sqlx::query_as(
            "INSERT INTO movies (title, file_ref, kind, raw_caption, added_at) \
             VALUES (?, ?, ?, ?, ?) \
             ON CONFLICT(title) DO UPDATE SET \
             file_ref = excluded.file_ref, \
             kind = excluded.kind, \
             raw_caption = excluded.raw_caption \
             RETURNING id",
        )
        .bind(&movie.title)
        .bind(&movie.file_ref)
        .bind(&movie.kind)
        .bind(&movie.raw_caption)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;
        Ok(id)
    }

    /// First entry whose title contains `query` as a substring, in
    /// insertion order. Callers pass normalized (lowercased) queries, so
    /// SQLite's ASCII-case-insensitive LIKE suffices.
    pub async fn find_one_by_title(&self, query: &str) -> Result<Option<MovieRow>> {
        let row = sqlx::query_as::<_, MovieRow>(&format!(
            "SELECT {MOVIE_COLUMNS} FROM movies WHERE title LIKE ? ESCAPE '\\' \
             ORDER BY id LIMIT 1"
        ))
        .bind(contains_pattern(query))
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn find_all_by_title(&self, query: &str, limit: i64) -> Result<Vec<MovieRow>> {
        let rows = sqlx::query_as::<_, MovieRow>(&format!(
            "SELECT {MOVIE_COLUMNS} FROM movies WHERE title LIKE ? ESCAPE '\\' \
             ORDER BY id LIMIT ?"
        ))
        .bind(contains_pattern(query))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn count_by_title(&self, query: &str) -> Result<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM movies WHERE title LIKE ? ESCAPE '\\'")
                .bind(contains_pattern(query))
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    pub async fn delete_by_title(&self, query: &str) -> Result<u64> {
        let result = sqlx::query("DELETE FROM movies WHERE title LIKE ? ESCAPE '\\'")
            .bind(contains_pattern(query))
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn delete_all(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM movies").execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    pub async fn count_all(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM movies")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<MovieRow>> {
        let row = sqlx::query_as::<_, MovieRow>(&format!(
            "SELECT {MOVIE_COLUMNS} FROM movies WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn find_by_exact_title(&self, title: &str) -> Result<Option<MovieRow>> {
        let row = sqlx::query_as::<_, MovieRow>(&format!(
            "SELECT {MOVIE_COLUMNS} FROM movies WHERE title = ?"
        ))
        .bind(title)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn find_by_file_ref(&self, file_ref: &str) -> Result<Option<MovieRow>> {
        let row = sqlx::query_as::<_, MovieRow>(&format!(
            "SELECT {MOVIE_COLUMNS} FROM movies WHERE file_ref = ? LIMIT 1"
        ))
        .bind(file_ref)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::KIND_VIDEO;

    async fn fresh_db(name: &str) -> Database {
        let path = std::env::temp_dir().join(format!("movie_filter_bot_{name}.db"));
        for suffix in ["", "-wal", "-shm"] {
            let _ = std::fs::remove_file(format!("{}{suffix}", path.display()));
        }
        Database::init(&format!("sqlite://{}", path.display()))
            .await
            .expect("test database should initialize")
    }

    fn movie(title: &str, file_ref: &str) -> NewMovie {
        NewMovie {
            title: title.to_string(),
            file_ref: file_ref.to_string(),
            kind: KIND_VIDEO.to_string(),
            raw_caption: None,
        }
    }

    #[tokio::test]
    async fn find_by_id_returns_the_stored_file_ref() {
        let db = fresh_db("find_by_id").await;
        let id = db.upsert_movie(movie("pathaan 2023", "file-a")).await.unwrap();
        let row = db.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(row.file_ref, "file-a");
        assert_eq!(row.title, "pathaan 2023");
    }

    #[tokio::test]
    async fn upsert_replaces_file_ref_on_duplicate_title() {
        let db = fresh_db("upsert").await;
        let first = db.upsert_movie(movie("pathaan 2023", "file-a")).await.unwrap();
        let second = db.upsert_movie(movie("pathaan 2023", "file-b")).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(db.count_all().await.unwrap(), 1);
        let row = db.find_by_id(first).await.unwrap().unwrap();
        assert_eq!(row.file_ref, "file-b");
    }

    #[tokio::test]
    async fn substring_search_matches_only_the_requested_title() {
        let db = fresh_db("substring").await;
        db.upsert_movie(movie("pathaan 2023", "file-a")).await.unwrap();
        db.upsert_movie(movie("jawan 2023", "file-b")).await.unwrap();

        let hit = db.find_one_by_title("pathaan").await.unwrap().unwrap();
        assert_eq!(hit.title, "pathaan 2023");
        assert!(db.find_one_by_title("dunki").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn ties_resolve_in_insertion_order() {
        let db = fresh_db("ordering").await;
        db.upsert_movie(movie("jawan 2023", "file-a")).await.unwrap();
        db.upsert_movie(movie("jawan 2023 extended", "file-b")).await.unwrap();

        let hit = db.find_one_by_title("jawan").await.unwrap().unwrap();
        assert_eq!(hit.file_ref, "file-a");
        assert_eq!(db.count_by_title("jawan").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn like_wildcards_in_queries_match_literally() {
        let db = fresh_db("wildcards").await;
        db.upsert_movie(movie("pathaan 2023", "file-a")).await.unwrap();
        db.upsert_movie(movie("100% love", "file-b")).await.unwrap();

        let hit = db.find_one_by_title("100%").await.unwrap().unwrap();
        assert_eq!(hit.title, "100% love");
        assert!(db.find_one_by_title("%").await.unwrap().map(|row| row.title)
            == Some("100% love".to_string()));
        assert!(db.find_one_by_title("___").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_by_title_reports_the_removed_count() {
        let db = fresh_db("delete_pattern").await;
        db.upsert_movie(movie("jawan 2023", "file-a")).await.unwrap();
        db.upsert_movie(movie("jawan 2023 extended", "file-b")).await.unwrap();
        db.upsert_movie(movie("pathaan 2023", "file-c")).await.unwrap();

        assert_eq!(db.delete_by_title("jawan").await.unwrap(), 2);
        assert_eq!(db.count_all().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn delete_all_then_count_is_zero() {
        let db = fresh_db("delete_all").await;
        db.upsert_movie(movie("pathaan 2023", "file-a")).await.unwrap();
        db.upsert_movie(movie("jawan 2023", "file-b")).await.unwrap();

        assert_eq!(db.delete_all().await.unwrap(), 2);
        assert_eq!(db.count_all().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn dedup_lookup_finds_entries_by_file_ref() {
        let db = fresh_db("file_ref").await;
        db.upsert_movie(movie("pathaan 2023", "file-a")).await.unwrap();

        let row = db.find_by_file_ref("file-a").await.unwrap().unwrap();
        assert_eq!(row.title, "pathaan 2023");
        assert!(db.find_by_file_ref("file-z").await.unwrap().is_none());
    }
}
