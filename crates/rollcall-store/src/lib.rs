//! rollcall-store — SQLite-backed roster of identity records.
//!
//! One row per registered identity: an opaque attribute bag plus the
//! signature vectors, serialized as JSON text columns. Records are
//! immutable after insertion; the only mutation is deletion by id.
//!
//! Reads come in two shapes: [`RosterStore::snapshot`] returns full
//! records (vectors included) for the matcher, while [`RosterStore::list`]
//! and [`RosterStore::profile`] never select the signature columns at all,
//! so redaction happens at the SQL level rather than by field-stripping.

use std::path::Path;

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use thiserror::Error;
use uuid::Uuid;

use rollcall_core::{IdentityRecord, Profile, Signature};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("signature codec: {0}")]
    Codec(#[from] serde_json::Error),
    #[error("invalid signature: {0}")]
    InvalidSignature(&'static str),
}

/// Fields supplied by the registration flow; ids and timestamps are minted
/// by the store.
#[derive(Debug, Clone)]
pub struct NewRecord {
    pub attributes: serde_json::Value,
    pub primary: Signature,
    pub secondary: Option<Signature>,
}

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS roster (
    id                  TEXT PRIMARY KEY,
    attributes          TEXT NOT NULL,
    primary_signature   TEXT NOT NULL,
    secondary_signature TEXT,
    created_at          TEXT NOT NULL
);
";

/// SQLite-backed signature store.
pub struct RosterStore {
    conn: Connection,
}

impl RosterStore {
    /// Open (or create) the roster database at the given path.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        Self::with_connection(conn)
    }

    /// In-memory roster, used by tests and ephemeral sessions.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// Insert one record, minting its id and timestamp. The primary
    /// signature must be non-empty and fully finite; nothing else is
    /// validated here (duplicate-person policy belongs to the caller).
    pub fn append(&self, new: NewRecord) -> Result<IdentityRecord, StoreError> {
        if new.primary.is_empty() {
            return Err(StoreError::InvalidSignature("primary signature is empty"));
        }
        if !new.primary.is_finite() {
            return Err(StoreError::InvalidSignature(
                "primary signature contains non-finite values",
            ));
        }

        let record = IdentityRecord {
            id: Uuid::new_v4().to_string(),
            attributes: new.attributes,
            primary: new.primary,
            secondary: new.secondary,
            created_at: Utc::now().to_rfc3339(),
        };

        let secondary_json = record
            .secondary
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        self.conn.execute(
            "INSERT INTO roster (id, attributes, primary_signature, secondary_signature, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                record.id,
                serde_json::to_string(&record.attributes)?,
                serde_json::to_string(&record.primary)?,
                secondary_json,
                record.created_at,
            ],
        )?;

        tracing::info!(id = %record.id, dim = record.primary.len(), "record registered");
        Ok(record)
    }

    /// Delete by id. Returns whether a record was actually removed.
    pub fn remove(&self, id: &str) -> Result<bool, StoreError> {
        let deleted = self
            .conn
            .execute("DELETE FROM roster WHERE id = ?1", params![id])?;
        if deleted > 0 {
            tracing::info!(id, "record removed");
        }
        Ok(deleted > 0)
    }

    /// Point-in-time view of every record, vectors included, in insertion
    /// order. Insertion order is what makes the matcher's first-wins
    /// tie-break reproducible across queries.
    pub fn snapshot(&self) -> Result<Vec<IdentityRecord>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, attributes, primary_signature, secondary_signature, created_at
             FROM roster ORDER BY rowid",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, Option<String>>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (id, attributes, primary, secondary, created_at) = row?;
            records.push(IdentityRecord {
                id,
                attributes: serde_json::from_str(&attributes)?,
                primary: serde_json::from_str(&primary)?,
                secondary: secondary.as_deref().map(serde_json::from_str).transpose()?,
                created_at,
            });
        }
        Ok(records)
    }

    /// Fetch one redacted profile by id.
    pub fn profile(&self, id: &str) -> Result<Option<Profile>, StoreError> {
        let row = self
            .conn
            .query_row(
                "SELECT id, attributes, created_at FROM roster WHERE id = ?1",
                params![id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                },
            )
            .optional()?;

        match row {
            Some((id, attributes, created_at)) => Ok(Some(Profile {
                id,
                attributes: serde_json::from_str(&attributes)?,
                created_at,
            })),
            None => Ok(None),
        }
    }

    /// Redacted roster listing, in insertion order.
    pub fn list(&self) -> Result<Vec<Profile>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, attributes, created_at FROM roster ORDER BY rowid")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;

        let mut profiles = Vec::new();
        for row in rows {
            let (id, attributes, created_at) = row?;
            profiles.push(Profile {
                id,
                attributes: serde_json::from_str(&attributes)?,
                created_at,
            });
        }
        Ok(profiles)
    }

    pub fn count(&self) -> Result<u64, StoreError> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM roster", [], |row| row.get(0))?;
        Ok(n as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_record(name: &str, primary: &[f32]) -> NewRecord {
        NewRecord {
            attributes: serde_json::json!({ "name": name }),
            primary: Signature::new(primary.to_vec()),
            secondary: None,
        }
    }

    #[test]
    fn test_append_then_snapshot_round_trip() {
        let store = RosterStore::open_in_memory().unwrap();
        let record = store
            .append(NewRecord {
                attributes: serde_json::json!({ "name": "Ada", "roll_number": "42" }),
                primary: Signature::new(vec![0.1, 0.2, 0.3]),
                secondary: Some(Signature::new(vec![0.9, 0.1])),
            })
            .unwrap();

        let snapshot = store.snapshot().unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].id, record.id);
        assert_eq!(snapshot[0].primary.values, vec![0.1, 0.2, 0.3]);
        assert_eq!(
            snapshot[0].secondary.as_ref().unwrap().values,
            vec![0.9, 0.1]
        );
        assert_eq!(snapshot[0].attributes["name"], "Ada");
    }

    #[test]
    fn test_snapshot_preserves_insertion_order() {
        let store = RosterStore::open_in_memory().unwrap();
        let ids: Vec<String> = (0..5)
            .map(|i| {
                store
                    .append(new_record(&format!("p{i}"), &[i as f32]))
                    .unwrap()
                    .id
            })
            .collect();
        let snapshot = store.snapshot().unwrap();
        let got: Vec<String> = snapshot.into_iter().map(|r| r.id).collect();
        assert_eq!(got, ids);
    }

    #[test]
    fn test_profile_and_list_are_redacted() {
        let store = RosterStore::open_in_memory().unwrap();
        let record = store.append(new_record("Ada", &[1.0, 2.0])).unwrap();

        let profile = store.profile(&record.id).unwrap().unwrap();
        assert_eq!(profile.id, record.id);
        assert_eq!(profile.attributes["name"], "Ada");
        let json = serde_json::to_value(&profile).unwrap();
        assert!(json.get("primary").is_none());

        let listing = store.list().unwrap();
        assert_eq!(listing.len(), 1);
        assert_eq!(listing[0].id, record.id);
    }

    #[test]
    fn test_profile_unknown_id_is_none() {
        let store = RosterStore::open_in_memory().unwrap();
        assert!(store.profile("nope").unwrap().is_none());
    }

    #[test]
    fn test_remove() {
        let store = RosterStore::open_in_memory().unwrap();
        let record = store.append(new_record("Ada", &[1.0])).unwrap();
        assert_eq!(store.count().unwrap(), 1);

        assert!(store.remove(&record.id).unwrap());
        assert_eq!(store.count().unwrap(), 0);
        assert!(!store.remove(&record.id).unwrap());
    }

    #[test]
    fn test_append_rejects_empty_primary() {
        let store = RosterStore::open_in_memory().unwrap();
        let err = store.append(new_record("Ada", &[])).unwrap_err();
        assert!(matches!(err, StoreError::InvalidSignature(_)));
    }

    #[test]
    fn test_append_rejects_non_finite_primary() {
        let store = RosterStore::open_in_memory().unwrap();
        let err = store
            .append(new_record("Ada", &[1.0, f32::INFINITY]))
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidSignature(_)));
    }

    #[test]
    fn test_ids_are_unique() {
        let store = RosterStore::open_in_memory().unwrap();
        let a = store.append(new_record("a", &[1.0])).unwrap();
        let b = store.append(new_record("b", &[2.0])).unwrap();
        assert_ne!(a.id, b.id);
    }
}
