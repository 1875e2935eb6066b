//! Schema introspection through `sqlite_master`.

use diesel::{
    prelude::*,
    sql_query,
    sql_types::{Nullable, Text},
};
use hop_utils::hash::checksum_bytes;
use serde::Serialize;

/// One object of the user schema.
#[derive(Debug, Clone, PartialEq, Eq, QueryableByName, Serialize)]
pub struct SchemaObject {
    #[diesel(sql_type = Text)]
    pub kind: String,
    #[diesel(sql_type = Text)]
    pub name: String,
    #[diesel(sql_type = Text)]
    pub table_name: String,
    #[diesel(sql_type = Nullable<Text>)]
    pub sql: Option<String>,
}

/// The user schema at a point in time, without hop's own tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaSnapshot {
    pub objects: Vec<SchemaObject>,
    pub digest: String,
}

const SCHEMA_QUERY: &str = r"
SELECT type AS kind, name, tbl_name AS table_name, sql
FROM sqlite_master
WHERE name NOT LIKE 'sqlite\_%' ESCAPE '\'
  AND tbl_name NOT LIKE 'hop\_%' ESCAPE '\'
  AND tbl_name NOT LIKE '\_\_diesel%' ESCAPE '\'
ORDER BY type, name
";

impl SchemaSnapshot {
    /// Reads the current schema of `conn`.
    pub fn capture(conn: &mut SqliteConnection) -> QueryResult<Self> {
        let objects = sql_query(SCHEMA_QUERY).load::<SchemaObject>(conn)?;
        Ok(Self::from_objects(objects))
    }

    pub fn from_objects(objects: Vec<SchemaObject>) -> Self {
        let digest = checksum_bytes(render(&objects).as_bytes());
        Self { objects, digest }
    }

    /// Renders the schema as a SQL script, one statement per object.
    pub fn render_sql(&self) -> String {
        render(&self.objects)
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

fn render(objects: &[SchemaObject]) -> String {
    objects
        .iter()
        .filter_map(|object| object.sql.as_deref())
        .map(|sql| format!("{};\n", sql.trim()))
        .collect()
}

#[cfg(test)]
mod tests {
    use diesel::connection::SimpleConnection;

    use super::*;
    use crate::connection::DbConnection;

    #[test]
    fn test_capture_excludes_bookkeeping() {
        let mut db = DbConnection::open_in_memory().unwrap();
        let snapshot = SchemaSnapshot::capture(db.conn()).unwrap();

        assert!(snapshot.is_empty());
        assert_eq!(snapshot.render_sql(), "");
    }

    #[test]
    fn test_capture_sorted_objects() {
        let mut db = DbConnection::open_in_memory().unwrap();
        db.conn()
            .batch_execute(
                "CREATE TABLE users (id INTEGER PRIMARY KEY, email TEXT UNIQUE);
                 CREATE TABLE accounts (id INTEGER PRIMARY KEY);
                 CREATE INDEX idx_users_email ON users (email);",
            )
            .unwrap();

        let snapshot = SchemaSnapshot::capture(db.conn()).unwrap();
        let names: Vec<_> = snapshot.objects.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, vec!["idx_users_email", "accounts", "users"]);
        assert!(snapshot
            .render_sql()
            .starts_with("CREATE INDEX idx_users_email ON users (email);\n"));
    }

    #[test]
    fn test_digest_tracks_schema() {
        let mut db = DbConnection::open_in_memory().unwrap();
        let before = SchemaSnapshot::capture(db.conn()).unwrap();

        db.conn().batch_execute("CREATE TABLE t (a TEXT);").unwrap();
        let during = SchemaSnapshot::capture(db.conn()).unwrap();

        db.conn().batch_execute("DROP TABLE t;").unwrap();
        let after = SchemaSnapshot::capture(db.conn()).unwrap();

        assert_ne!(before.digest, during.digest);
        assert_eq!(before, after);
    }
}
