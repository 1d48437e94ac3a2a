use crate::application::repos::RepoError;

pub fn map_sqlx_error(err: sqlx::Error) -> RepoError {
    match err {
        sqlx::Error::Database(db)
            if db.message().contains("violates")
                || db.message().contains("invalid input syntax")
                || db.message().contains("value too long") =>
        {
            RepoError::InvalidInput {
                message: db.message().to_string(),
            }
        }
        other @ (sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_)) => {
            RepoError::unavailable(other)
        }
        other @ (sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_)) => {
            RepoError::decode(other)
        }
        other => RepoError::from_persistence(other),
    }
}

/// Accepts plain SQL identifiers (`articles`, `public_articles`) so a
/// configured table name can be spliced into statements.
pub fn is_sql_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
        _ => return false,
    }
    name.len() <= 63 && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers_are_validated() {
        assert!(is_sql_identifier("articles"));
        assert!(is_sql_identifier("_drafts2"));
        assert!(!is_sql_identifier(""));
        assert!(!is_sql_identifier("2articles"));
        assert!(!is_sql_identifier("articles; drop table x"));
        assert!(!is_sql_identifier("public.articles"));
    }

    #[test]
    fn pool_timeouts_are_unavailable() {
        assert!(matches!(
            map_sqlx_error(sqlx::Error::PoolTimedOut),
            RepoError::Unavailable(_)
        ));
        assert!(matches!(
            map_sqlx_error(sqlx::Error::RowNotFound),
            RepoError::Persistence(_)
        ));
    }
}
