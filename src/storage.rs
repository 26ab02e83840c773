use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, Row};

#[derive(Debug, Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

/// A signed-in session remembered across restarts.
#[derive(Debug, Clone, PartialEq)]
pub struct SavedSession {
    pub user_id: String,
    pub email: String,
    pub full_name: String,
    pub token: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Default, Clone)]
pub struct Options {
    pub path: Option<PathBuf>,
}

impl Store {
    pub fn open(opts: Options) -> Result<Self> {
        let path = if let Some(path) = opts.path {
            path
        } else {
            default_path().context("storage: resolve default path")?
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("storage: create directory {}", parent.display()))?;
        }

        let conn = Connection::open(&path)
            .with_context(|| format!("storage: open database at {}", path.display()))?;
        conn.pragma_update(None, "journal_mode", "WAL")
            .context("storage: set WAL")?;
        conn.pragma_update(None, "busy_timeout", 5000)
            .context("storage: set busy timeout")?;
        migrate(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn close(self) -> Result<()> {
        let conn = Arc::try_unwrap(self.conn)
            .map_err(|_| anyhow!("storage: connection still in use"))?
            .into_inner();
        conn.close()
            .map_err(|(_, err)| err)
            .context("storage: close connection")
    }

    pub fn save_session(&self, mut session: SavedSession) -> Result<()> {
        if session.user_id.is_empty() {
            bail!("storage: user id required");
        }
        if session.token.is_empty() {
            bail!("storage: token required");
        }
        let now = Utc::now();
        if session.created_at.timestamp() == 0 {
            session.created_at = now;
        }
        session.updated_at = now;

        let conn = self.conn.lock();
        conn.execute(
            r#"
INSERT INTO sessions (user_id, email, full_name, token, created_at, updated_at)
VALUES (?1, ?2, ?3, ?4, ?5, ?6)
ON CONFLICT(user_id) DO UPDATE SET
  email = excluded.email,
  full_name = excluded.full_name,
  token = excluded.token,
  updated_at = excluded.updated_at
"#,
            params![
                session.user_id,
                session.email,
                session.full_name,
                session.token,
                session.created_at.timestamp(),
                session.updated_at.timestamp(),
            ],
        )
        .context("storage: save session")?;
        Ok(())
    }

    /// The most recently used session, if any.
    pub fn latest_session(&self) -> Result<Option<SavedSession>> {
        let conn = self.conn.lock();
        conn.query_row(
            r#"
SELECT user_id, email, full_name, token, created_at, updated_at
FROM sessions
ORDER BY updated_at DESC, rowid DESC
LIMIT 1
"#,
            [],
            session_from_row,
        )
        .optional()
        .context("storage: query latest session")
    }

    pub fn delete_session(&self, user_id: &str) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute("DELETE FROM sessions WHERE user_id = ?1", params![user_id])
            .context("storage: delete session")?;
        Ok(())
    }

    pub fn clear_sessions(&self) -> Result<usize> {
        let conn = self.conn.lock();
        conn.execute("DELETE FROM sessions", [])
            .context("storage: clear sessions")
    }
}

fn timestamp(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).single().unwrap_or_else(Utc::now)
}

fn session_from_row(row: &Row<'_>) -> rusqlite::Result<SavedSession> {
    let created: i64 = row.get(4)?;
    let updated: i64 = row.get(5)?;
    Ok(SavedSession {
        user_id: row.get(0)?,
        email: row.get(1)?,
        full_name: row.get(2)?,
        token: row.get(3)?,
        created_at: timestamp(created),
        updated_at: timestamp(updated),
    })
}

fn migrate(conn: &Connection) -> Result<()> {
    conn.execute(
        r#"
CREATE TABLE IF NOT EXISTS schema_migrations (
  version INTEGER PRIMARY KEY,
  applied_at INTEGER NOT NULL
)
"#,
        [],
    )?;

    let current: i64 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )
        .unwrap_or(0);

    for (idx, sql) in migrations().iter().enumerate() {
        let version = (idx + 1) as i64;
        if version <= current {
            continue;
        }
        conn.execute_batch(sql)?;
        conn.execute(
            "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
            params![
                version,
                SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .unwrap_or(Duration::from_secs(0))
                    .as_secs() as i64,
            ],
        )?;
    }
    Ok(())
}

fn migrations() -> Vec<&'static str> {
    vec![r#"
CREATE TABLE IF NOT EXISTS sessions (
  user_id TEXT PRIMARY KEY,
  email TEXT NOT NULL,
  full_name TEXT NOT NULL,
  token TEXT NOT NULL,
  created_at INTEGER NOT NULL,
  updated_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_sessions_updated_at ON sessions(updated_at);
"#]
}

pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("gameboard").join("state.db"))
}
