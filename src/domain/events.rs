use super::articles::{Article, ArticleId};

/// Kind of row mutation reported by the origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

impl ChangeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::Insert => "insert",
            ChangeKind::Update => "update",
            ChangeKind::Delete => "delete",
        }
    }
}

/// A single origin mutation notification. Consumed once, never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    /// Table the row belongs to, when the sender reports it.
    pub table: Option<String>,
    /// Row state after the change; absent for deletes.
    pub record: Option<Article>,
    /// Row state before the change; only populated for deletes.
    pub old_record: Option<Article>,
}

impl ChangeEvent {
    pub fn upserted(kind: ChangeKind, record: Article) -> Self {
        Self {
            kind,
            table: None,
            record: Some(record),
            old_record: None,
        }
    }

    pub fn deleted(old_record: Article) -> Self {
        Self {
            kind: ChangeKind::Delete,
            table: None,
            record: None,
            old_record: Some(old_record),
        }
    }

    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    /// The article this event touches: the new row for inserts and updates,
    /// the prior row for deletes.
    pub fn target(&self) -> Option<&ArticleId> {
        let row = match self.kind {
            ChangeKind::Insert | ChangeKind::Update => self.record.as_ref(),
            ChangeKind::Delete => self.old_record.as_ref(),
        };
        row.map(|article| &article.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delete_targets_old_record() {
        let event = ChangeEvent::deleted(Article::new(5));
        assert_eq!(event.target(), Some(&ArticleId::Int(5)));
    }

    #[test]
    fn update_targets_new_record() {
        let event = ChangeEvent::upserted(ChangeKind::Update, Article::new(9));
        assert_eq!(event.target(), Some(&ArticleId::Int(9)));
    }

    #[test]
    fn delete_without_old_record_has_no_target() {
        let event = ChangeEvent {
            kind: ChangeKind::Delete,
            table: None,
            record: Some(Article::new(1)),
            old_record: None,
        };
        assert!(event.target().is_none());
    }
}
