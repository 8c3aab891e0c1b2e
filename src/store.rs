use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

/// Trimmed and validated book details as handed to the store. Lives for one
/// request.
#[derive(Debug, Clone)]
pub struct SanitizedBookDetails {
    pub family_name: String,
    pub first_name: String,
    pub genre_name: String,
    pub book_title: String,
}

/// The created book record as serialized into the success response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookRecord {
    pub id: i64,
    pub book_title: String,
    pub family_name: String,
    pub first_name: String,
    pub genre_name: String,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("author \"{first_name} {family_name}\" not found")]
    AuthorNotFound {
        family_name: String,
        first_name: String,
    },
    #[error("genre \"{name}\" not found")]
    GenreNotFound { name: String },
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("store task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Embedded SQLite store for authors, genres and books.
///
/// The connection sits behind a [`Mutex`] and every operation runs on the
/// blocking pool, so the store call is the request's one suspension point.
#[derive(Clone)]
pub struct BookStore {
    conn: Arc<Mutex<Connection>>,
}

impl BookStore {
    pub fn open(path: &str) -> Result<Self, StoreError> {
        Self::from_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        init_schema(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub async fn add_author(&self, family_name: &str, first_name: &str) -> Result<i64, StoreError> {
        let conn = Arc::clone(&self.conn);
        let family_name = family_name.to_owned();
        let first_name = first_name.to_owned();

        tokio::task::spawn_blocking(move || {
            let conn = lock(&conn);

            conn.execute(
                "insert into authors (family_name, first_name) values (?1, ?2)",
                params![family_name, first_name],
            )?;

            Ok(conn.last_insert_rowid())
        })
        .await?
    }

    pub async fn add_genre(&self, name: &str) -> Result<i64, StoreError> {
        let conn = Arc::clone(&self.conn);
        let name = name.to_owned();

        tokio::task::spawn_blocking(move || {
            let conn = lock(&conn);

            conn.execute("insert into genres (name) values (?1)", params![name])?;

            Ok(conn.last_insert_rowid())
        })
        .await?
    }

    /// Looks up the author and genre by name and creates a book referencing
    /// both. Fails without inserting anything if either lookup misses.
    pub async fn save_book_of_existing_author_and_genre(
        &self,
        details: SanitizedBookDetails,
    ) -> Result<BookRecord, StoreError> {
        let conn = Arc::clone(&self.conn);

        tokio::task::spawn_blocking(move || {
            let conn = lock(&conn);

            let author_id: Option<i64> = conn
                .query_row(
                    "select id from authors
                         where family_name = ?1
                           and first_name = ?2",
                    params![details.family_name, details.first_name],
                    |row| row.get(0),
                )
                .optional()?;
            let author_id = author_id.ok_or_else(|| StoreError::AuthorNotFound {
                family_name: details.family_name.clone(),
                first_name: details.first_name.clone(),
            })?;

            let genre_id: Option<i64> = conn
                .query_row(
                    "select id from genres where name = ?1",
                    params![details.genre_name],
                    |row| row.get(0),
                )
                .optional()?;
            let genre_id = genre_id.ok_or_else(|| StoreError::GenreNotFound {
                name: details.genre_name.clone(),
            })?;

            conn.execute(
                "insert into books (title, author_id, genre_id) values (?1, ?2, ?3)",
                params![details.book_title, author_id, genre_id],
            )?;

            Ok(BookRecord {
                id: conn.last_insert_rowid(),
                book_title: details.book_title,
                family_name: details.family_name,
                first_name: details.first_name,
                genre_name: details.genre_name,
            })
        })
        .await?
    }

    #[cfg(test)]
    pub(crate) fn count_books(&self) -> i64 {
        lock(&self.conn)
            .query_row("select count(*) from books", [], |row| row.get(0))
            .expect("Failed to count books")
    }
}

fn lock(conn: &Mutex<Connection>) -> MutexGuard<'_, Connection> {
    conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "pragma foreign_keys = on;

        create table if not exists authors (
            id integer primary key,
            family_name text not null,
            first_name text not null
        );
        create unique index if not exists
            idx_author_name on authors (family_name, first_name);

        create table if not exists genres (
            id integer primary key,
            name text not null unique
        );

        create table if not exists books (
            id integer primary key,
            title text not null,
            author_id integer not null references authors(id),
            genre_id integer not null references genres(id)
        );",
    )
}
