use chrono::Utc;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, OptionalExtension, Result};

/// A user known to the bot.
///
/// One row per requester. The Instagram link is optional and last-write-wins;
/// download history lives in the separate `downloads` table, ordered by
/// insertion.
#[derive(Debug, Clone)]
pub struct User {
    /// Telegram chat/user ID
    pub telegram_id: i64,
    /// Linked Instagram account (username or numeric ID), if any
    pub instagram_id: Option<String>,
    /// Creation timestamp (RFC 3339)
    pub created_at: String,
}

pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConnection = PooledConnection<SqliteConnectionManager>;

/// Create a new database connection pool
///
/// Initializes a connection pool with up to 10 connections and ensures the
/// schema exists on the first connection.
pub fn create_pool(database_path: &str) -> Result<DbPool, r2d2::Error> {
    let manager = SqliteConnectionManager::file(database_path);
    let pool = Pool::builder().max_size(10).build(manager)?;

    let conn = pool.get()?;
    if let Err(e) = migrate_schema(&conn) {
        log::warn!("Failed to migrate schema: {}", e);
    }

    Ok(pool)
}

/// Get a connection from the pool
///
/// The connection is automatically returned to the pool when dropped.
pub fn get_connection(pool: &DbPool) -> Result<DbConnection, r2d2::Error> {
    pool.get()
}

/// Create tables if they do not exist yet. Idempotent.
fn migrate_schema(conn: &rusqlite::Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS users (
            telegram_id  INTEGER PRIMARY KEY,
            instagram_id TEXT,
            created_at   TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS downloads (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            telegram_id INTEGER NOT NULL,
            url         TEXT NOT NULL,
            created_at  TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_downloads_telegram_id ON downloads(telegram_id);
        CREATE INDEX IF NOT EXISTS idx_users_instagram_id ON users(instagram_id);",
    )
}

/// Insert the user if they are not known yet.
pub fn ensure_user(conn: &rusqlite::Connection, telegram_id: i64) -> Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO users (telegram_id, created_at) VALUES (?1, ?2)",
        params![telegram_id, Utc::now().to_rfc3339()],
    )?;
    Ok(())
}

/// Fetch a user by Telegram ID.
pub fn get_user(conn: &rusqlite::Connection, telegram_id: i64) -> Result<Option<User>> {
    conn.query_row(
        "SELECT telegram_id, instagram_id, created_at FROM users WHERE telegram_id = ?1",
        params![telegram_id],
        |row| {
            Ok(User {
                telegram_id: row.get(0)?,
                instagram_id: row.get(1)?,
                created_at: row.get(2)?,
            })
        },
    )
    .optional()
}

/// Fetch the user linked to an Instagram account, if any.
pub fn find_by_instagram_id(conn: &rusqlite::Connection, instagram_id: &str) -> Result<Option<User>> {
    conn.query_row(
        "SELECT telegram_id, instagram_id, created_at FROM users WHERE instagram_id = ?1",
        params![instagram_id],
        |row| {
            Ok(User {
                telegram_id: row.get(0)?,
                instagram_id: row.get(1)?,
                created_at: row.get(2)?,
            })
        },
    )
    .optional()
}

/// Link (or relink) an Instagram account to a Telegram user.
///
/// Last-write-wins: relinking simply overwrites the previous value.
pub fn link_instagram(conn: &rusqlite::Connection, telegram_id: i64, instagram_id: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO users (telegram_id, instagram_id, created_at) VALUES (?1, ?2, ?3)
         ON CONFLICT(telegram_id) DO UPDATE SET instagram_id = excluded.instagram_id",
        params![telegram_id, instagram_id, Utc::now().to_rfc3339()],
    )?;
    Ok(())
}

/// Append a delivered source URL to the user's download history.
pub fn append_download(conn: &rusqlite::Connection, telegram_id: i64, url: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO downloads (telegram_id, url, created_at) VALUES (?1, ?2, ?3)",
        params![telegram_id, url, Utc::now().to_rfc3339()],
    )?;
    Ok(())
}

/// Past source URLs for a user, oldest first.
pub fn get_downloads(conn: &rusqlite::Connection, telegram_id: i64) -> Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT url FROM downloads WHERE telegram_id = ?1 ORDER BY id ASC")?;
    let rows = stmt.query_map(params![telegram_id], |row| row.get::<_, String>(0))?;

    let mut urls = Vec::new();
    for row in rows {
        urls.push(row?);
    }
    Ok(urls)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn test_conn() -> (NamedTempFile, rusqlite::Connection) {
        let file = NamedTempFile::new().unwrap();
        let conn = rusqlite::Connection::open(file.path()).unwrap();
        migrate_schema(&conn).unwrap();
        (file, conn)
    }

    #[test]
    fn test_ensure_user_is_idempotent() {
        let (_file, conn) = test_conn();
        ensure_user(&conn, 42).unwrap();
        ensure_user(&conn, 42).unwrap();

        let user = get_user(&conn, 42).unwrap().unwrap();
        assert_eq!(user.telegram_id, 42);
        assert!(user.instagram_id.is_none());
    }

    #[test]
    fn test_get_user_missing() {
        let (_file, conn) = test_conn();
        assert!(get_user(&conn, 1).unwrap().is_none());
    }

    #[test]
    fn test_link_instagram_upserts() {
        let (_file, conn) = test_conn();

        // Linking creates the row when the user is not known yet.
        link_instagram(&conn, 7, "alice").unwrap();
        let user = find_by_instagram_id(&conn, "alice").unwrap().unwrap();
        assert_eq!(user.telegram_id, 7);

        // Relinking overwrites (last-write-wins).
        link_instagram(&conn, 7, "alice_new").unwrap();
        assert!(find_by_instagram_id(&conn, "alice").unwrap().is_none());
        let user = find_by_instagram_id(&conn, "alice_new").unwrap().unwrap();
        assert_eq!(user.telegram_id, 7);
    }

    #[test]
    fn test_download_history_is_ordered() {
        let (_file, conn) = test_conn();
        ensure_user(&conn, 9).unwrap();

        append_download(&conn, 9, "https://youtu.be/first").unwrap();
        append_download(&conn, 9, "https://youtu.be/second").unwrap();
        append_download(&conn, 9, "https://youtu.be/third").unwrap();

        let urls = get_downloads(&conn, 9).unwrap();
        assert_eq!(
            urls,
            vec![
                "https://youtu.be/first".to_string(),
                "https://youtu.be/second".to_string(),
                "https://youtu.be/third".to_string(),
            ]
        );

        // Histories are per-user.
        assert!(get_downloads(&conn, 10).unwrap().is_empty());
    }
}
