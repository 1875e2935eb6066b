//! Diesel-backed database adapter.

use std::{
    path::Path,
    sync::{Arc, Mutex, MutexGuard},
};

use diesel::{connection::SimpleConnection, Connection as DieselConnection};
use hop_db::{
    connection::DbConnection,
    models::{NewPatchRecord, ReleaseStatus},
    repository::{PatchRepository, ReleaseRepository},
    snapshot::SchemaSnapshot,
};
use tracing::trace;

use super::{AppliedPatch, Database};
use crate::{error::HopError, patch::Patch, release::ReleaseId, HopResult};

/// Thread-safe wrapper around a [`DbConnection`].
pub struct DieselDatabase {
    conn: Arc<Mutex<DbConnection>>,
}

impl DieselDatabase {
    /// Opens the database at `path`, creating the bookkeeping tables if needed.
    pub fn open<P: AsRef<Path>>(path: P) -> HopResult<Self> {
        let conn = DbConnection::open(path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_in_memory() -> HopResult<Self> {
        let conn = DbConnection::open_in_memory()?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Locks the mutex and returns a guard.
    pub fn conn(&self) -> HopResult<MutexGuard<'_, DbConnection>> {
        Ok(self.conn.lock()?)
    }

    /// Executes a function with the connection.
    pub fn with_conn<F, T>(&self, f: F) -> HopResult<T>
    where
        F: FnOnce(&mut diesel::SqliteConnection) -> diesel::QueryResult<T>,
    {
        let mut conn = self.conn()?;
        Ok(f(conn.conn())?)
    }

    /// Executes a function within a transaction, rolling back on error.
    pub fn transaction<F, T>(&self, f: F) -> HopResult<T>
    where
        F: FnOnce(&mut diesel::SqliteConnection) -> HopResult<T>,
    {
        let mut conn = self.conn()?;
        conn.conn().transaction(f)
    }
}

impl Clone for DieselDatabase {
    fn clone(&self) -> Self {
        Self {
            conn: self.conn.clone(),
        }
    }
}

fn ordinal_key(patch: &Patch) -> HopResult<i32> {
    i32::try_from(patch.ordinal)
        .map_err(|_| HopError::Custom(format!("patch ordinal {} out of range", patch.ordinal)))
}

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

impl Database for DieselDatabase {
    fn last_applied_release(&self) -> HopResult<Option<ReleaseId>> {
        self.with_conn(|conn| ReleaseRepository::last_with_status(conn, ReleaseStatus::Applied))?
            .map(|record| ReleaseId::from_key(record.key()))
            .transpose()
    }

    fn release_status(&self, id: &ReleaseId) -> HopResult<Option<ReleaseStatus>> {
        let key = id.key()?;
        self.with_conn(|conn| ReleaseRepository::find(conn, key))?
            .map(|record| record.status().map_err(HopError::from))
            .transpose()
    }

    fn failed_releases(&self) -> HopResult<Vec<ReleaseId>> {
        self.with_conn(|conn| ReleaseRepository::list_by_status(conn, ReleaseStatus::Failed))?
            .into_iter()
            .map(|record| ReleaseId::from_key(record.key()))
            .collect()
    }

    fn applied_patches(&self, id: &ReleaseId) -> HopResult<Vec<AppliedPatch>> {
        let key = id.key()?;
        self.with_conn(|conn| PatchRepository::list_for(conn, key))?
            .into_iter()
            .map(|record| {
                Ok(AppliedPatch {
                    ordinal: u32::try_from(record.ordinal).map_err(|_| {
                        HopError::Custom(format!("invalid recorded ordinal {}", record.ordinal))
                    })?,
                    name: record.name,
                    checksum: record.checksum,
                })
            })
            .collect()
    }

    fn apply_patch(&self, patch: &Patch, sql: &str) -> HopResult<()> {
        let (major, minor, patch_level) = patch.release.key()?;
        let ordinal = ordinal_key(patch)?;
        let applied_at = now();

        trace!(release = %patch.release, ordinal, "applying patch in transaction");
        self.transaction(|conn| {
            conn.batch_execute(sql)?;
            PatchRepository::insert(
                conn,
                NewPatchRecord {
                    major,
                    minor,
                    patch: patch_level,
                    ordinal,
                    name: &patch.name,
                    checksum: &patch.forward.checksum,
                    applied_at: &applied_at,
                },
            )?;
            Ok(())
        })
    }

    fn revert_patch(&self, patch: &Patch, sql: &str) -> HopResult<()> {
        let key = patch.release.key()?;
        let ordinal = ordinal_key(patch)?;

        trace!(release = %patch.release, ordinal, "reverting patch in transaction");
        self.transaction(|conn| {
            conn.batch_execute(sql)?;
            PatchRepository::delete(conn, key, ordinal)?;
            Ok(())
        })
    }

    fn set_release_status(&self, id: &ReleaseId, status: ReleaseStatus) -> HopResult<()> {
        let key = id.key()?;
        let changed_at = now();
        self.with_conn(|conn| ReleaseRepository::upsert_status(conn, key, status, &changed_at))?;
        Ok(())
    }

    fn schema_snapshot(&self) -> HopResult<SchemaSnapshot> {
        self.with_conn(SchemaSnapshot::capture)
    }
}
