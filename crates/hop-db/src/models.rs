use std::{fmt, str::FromStr};

use diesel::prelude::*;

use crate::{
    error::DbError,
    schema::{hop_patch, hop_release},
    ReleaseKey,
};

/// Recorded outcome of the last lifecycle step of a release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReleaseStatus {
    Applied,
    Failed,
    Reverted,
}

impl ReleaseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReleaseStatus::Applied => "applied",
            ReleaseStatus::Failed => "failed",
            ReleaseStatus::Reverted => "reverted",
        }
    }
}

impl fmt::Display for ReleaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReleaseStatus {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "applied" => Ok(ReleaseStatus::Applied),
            "failed" => Ok(ReleaseStatus::Failed),
            "reverted" => Ok(ReleaseStatus::Reverted),
            other => Err(DbError::InvalidStatus(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = hop_release)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ReleaseRecord {
    pub major: i32,
    pub minor: i32,
    pub patch: i32,
    pub status: String,
    pub changed_at: String,
}

impl ReleaseRecord {
    pub fn key(&self) -> ReleaseKey {
        (self.major, self.minor, self.patch)
    }

    pub fn status(&self) -> Result<ReleaseStatus, DbError> {
        self.status.parse()
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = hop_release)]
pub struct NewReleaseRecord<'a> {
    pub major: i32,
    pub minor: i32,
    pub patch: i32,
    pub status: &'a str,
    pub changed_at: &'a str,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = hop_patch)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct PatchRecord {
    pub major: i32,
    pub minor: i32,
    pub patch: i32,
    pub ordinal: i32,
    pub name: String,
    pub checksum: String,
    pub applied_at: String,
}

impl PatchRecord {
    pub fn key(&self) -> ReleaseKey {
        (self.major, self.minor, self.patch)
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = hop_patch)]
pub struct NewPatchRecord<'a> {
    pub major: i32,
    pub minor: i32,
    pub patch: i32,
    pub ordinal: i32,
    pub name: &'a str,
    pub checksum: &'a str,
    pub applied_at: &'a str,
}
