//! Persistence layer: sqlx queries over the SQLite schema.

pub mod catalog;
pub mod orders;
pub mod users;

pub(crate) fn unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => {
            db.code().as_deref() == Some("2067") || db.message().contains("UNIQUE constraint")
        }
        _ => false,
    }
}
