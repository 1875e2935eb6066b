//! Bookkeeping repositories for releases and patches.

use diesel::{prelude::*, upsert::excluded};

use crate::{
    models::{NewPatchRecord, NewReleaseRecord, PatchRecord, ReleaseRecord, ReleaseStatus},
    schema::{hop_patch, hop_release},
    ReleaseKey,
};

/// Repository for `hop_release` rows.
pub struct ReleaseRepository;

impl ReleaseRepository {
    /// Records `status` for a release, inserting the row if needed.
    pub fn upsert_status(
        conn: &mut SqliteConnection,
        key: ReleaseKey,
        status: ReleaseStatus,
        changed_at: &str,
    ) -> QueryResult<usize> {
        let (major, minor, patch) = key;
        diesel::insert_into(hop_release::table)
            .values(NewReleaseRecord {
                major,
                minor,
                patch,
                status: status.as_str(),
                changed_at,
            })
            .on_conflict((hop_release::major, hop_release::minor, hop_release::patch))
            .do_update()
            .set((
                hop_release::status.eq(excluded(hop_release::status)),
                hop_release::changed_at.eq(excluded(hop_release::changed_at)),
            ))
            .execute(conn)
    }

    /// Finds the record of a single release.
    pub fn find(conn: &mut SqliteConnection, key: ReleaseKey) -> QueryResult<Option<ReleaseRecord>> {
        let (major, minor, patch) = key;
        hop_release::table
            .filter(hop_release::major.eq(major))
            .filter(hop_release::minor.eq(minor))
            .filter(hop_release::patch.eq(patch))
            .select(ReleaseRecord::as_select())
            .first(conn)
            .optional()
    }

    /// Lists releases with `status`, ascending.
    pub fn list_by_status(
        conn: &mut SqliteConnection,
        status: ReleaseStatus,
    ) -> QueryResult<Vec<ReleaseRecord>> {
        hop_release::table
            .filter(hop_release::status.eq(status.as_str()))
            .order((
                hop_release::major.asc(),
                hop_release::minor.asc(),
                hop_release::patch.asc(),
            ))
            .select(ReleaseRecord::as_select())
            .load(conn)
    }

    /// Highest release with `status`.
    pub fn last_with_status(
        conn: &mut SqliteConnection,
        status: ReleaseStatus,
    ) -> QueryResult<Option<ReleaseRecord>> {
        hop_release::table
            .filter(hop_release::status.eq(status.as_str()))
            .order((
                hop_release::major.desc(),
                hop_release::minor.desc(),
                hop_release::patch.desc(),
            ))
            .select(ReleaseRecord::as_select())
            .first(conn)
            .optional()
    }
}

/// Repository for `hop_patch` rows.
pub struct PatchRepository;

impl PatchRepository {
    pub fn insert(conn: &mut SqliteConnection, record: NewPatchRecord) -> QueryResult<usize> {
        diesel::insert_into(hop_patch::table)
            .values(&record)
            .execute(conn)
    }

    pub fn delete(conn: &mut SqliteConnection, key: ReleaseKey, ordinal: i32) -> QueryResult<usize> {
        let (major, minor, patch) = key;
        diesel::delete(
            hop_patch::table
                .filter(hop_patch::major.eq(major))
                .filter(hop_patch::minor.eq(minor))
                .filter(hop_patch::patch.eq(patch))
                .filter(hop_patch::ordinal.eq(ordinal)),
        )
        .execute(conn)
    }

    /// Lists the applied patches of a release in ordinal order.
    pub fn list_for(conn: &mut SqliteConnection, key: ReleaseKey) -> QueryResult<Vec<PatchRecord>> {
        let (major, minor, patch) = key;
        hop_patch::table
            .filter(hop_patch::major.eq(major))
            .filter(hop_patch::minor.eq(minor))
            .filter(hop_patch::patch.eq(patch))
            .order(hop_patch::ordinal.asc())
            .select(PatchRecord::as_select())
            .load(conn)
    }
}
