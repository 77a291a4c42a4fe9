//! Reconciliation of detected changes into the summary store and the search index

use crate::summary_store::{SummaryRecord, SummaryStore};
use crate::types::{ChangeKind, ChangeRecord, IndexedDocument, UnitKind};
use std::collections::BTreeSet;

/// What one run removes from and writes to the store
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconcilePlan {
    /// `(kind, id)` of every entry to delete, including methods of removed classes
    pub removals: Vec<(UnitKind, String)>,
    /// Records to insert or overwrite
    pub upserts: Vec<SummaryRecord>,
}

/// Index mutations mirroring a plan: delete first, then insert
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexUpdate {
    /// Sorted, deduplicated
    pub delete_ids: Vec<String>,
    pub documents: Vec<IndexedDocument>,
}

impl IndexUpdate {
    pub fn is_empty(&self) -> bool {
        self.delete_ids.is_empty() && self.documents.is_empty()
    }
}

impl ReconcilePlan {
    /// Plan against the store as it is before the run
    pub fn build(changes: &[ChangeRecord], summaries: Vec<SummaryRecord>, store: &SummaryStore) -> Self {
        let mut removals = BTreeSet::new();

        for change in changes.iter().filter(|c| c.change_type == ChangeKind::Removed) {
            removals.insert((change.item_type, change.unit_id().to_string()));

            if change.item_type == UnitKind::Class {
                for id in store.method_ids_of_class(&change.file_path, &change.item_name) {
                    removals.insert((UnitKind::Method, id));
                }
            }
        }

        let mut upserts = summaries;
        upserts.sort_by_key(SummaryRecord::id);

        Self {
            removals: removals.into_iter().collect(),
            upserts,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.removals.is_empty() && self.upserts.is_empty()
    }

    /// Delete removed entries (missing ones are ignored), then upsert new records
    pub fn apply_to_store(&self, store: &mut SummaryStore) -> usize {
        let mut removed = 0;
        for (kind, id) in &self.removals {
            if store.remove(*kind, id).is_some() {
                removed += 1;
            }
        }
        for record in &self.upserts {
            store.upsert(record.clone());
        }
        removed
    }

    /// Every removed and every re-summarized id is deleted before the new documents go in
    pub fn index_update(&self) -> IndexUpdate {
        let delete_ids: BTreeSet<String> = self
            .removals
            .iter()
            .map(|(_, id)| id.clone())
            .chain(self.upserts.iter().map(SummaryRecord::id))
            .collect();

        IndexUpdate {
            delete_ids: delete_ids.into_iter().collect(),
            documents: self.upserts.iter().map(SummaryRecord::to_document).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn record(kind: UnitKind, class: Option<&str>, name: &str, summary: &str) -> SummaryRecord {
        SummaryRecord {
            file_path: "a.py".to_string(),
            kind,
            class_name: class.map(str::to_string),
            name: name.to_string(),
            summary: summary.to_string(),
            generated_at: Utc::now(),
        }
    }

    fn change(kind: UnitKind, class: Option<&str>, name: &str, change_type: ChangeKind) -> ChangeRecord {
        ChangeRecord {
            file_path: "a.py".to_string(),
            item_type: kind,
            item_name: name.to_string(),
            class_name: class.map(str::to_string),
            change_type,
        }
    }

    fn store() -> SummaryStore {
        let mut store = SummaryStore::default();
        store.upsert(record(UnitKind::Function, None, "foo", "old foo"));
        store.upsert(record(UnitKind::Class, None, "Widget", "a widget"));
        store.upsert(record(UnitKind::Method, Some("Widget"), "render", "renders"));
        store.upsert(record(UnitKind::Method, Some("Widget"), "resize", "resizes"));
        store.upsert(record(UnitKind::Method, Some("Gadget"), "render", "other"));
        store
    }

    #[test]
    fn test_removed_class_cascades_to_methods() {
        let changes = vec![change(UnitKind::Class, None, "Widget", ChangeKind::Removed)];
        let plan = ReconcilePlan::build(&changes, Vec::new(), &store());

        assert_eq!(
            plan.removals,
            vec![
                (UnitKind::Class, "a.py::Widget".to_string()),
                (UnitKind::Method, "a.py::Widget::render".to_string()),
                (UnitKind::Method, "a.py::Widget::resize".to_string()),
            ]
        );

        let mut store = store();
        assert_eq!(plan.apply_to_store(&mut store), 3);
        assert!(store.get(UnitKind::Method, "a.py::Gadget::render").is_some());
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_modified_unit_is_overwritten_not_duplicated() {
        let changes = vec![change(UnitKind::Function, None, "foo", ChangeKind::Modified)];
        let summaries = vec![record(UnitKind::Function, None, "foo", "new foo")];
        let mut store = store();

        for _ in 0..2 {
            let plan = ReconcilePlan::build(&changes, summaries.clone(), &store);
            plan.apply_to_store(&mut store);
        }

        assert_eq!(store.functions.len(), 1);
        assert_eq!(store.get(UnitKind::Function, "a.py::foo").unwrap().summary, "new foo");
    }

    #[test]
    fn test_removing_missing_entry_is_noop() {
        let changes = vec![change(UnitKind::Function, None, "never", ChangeKind::Removed)];
        let plan = ReconcilePlan::build(&changes, Vec::new(), &store());

        let mut store = store();
        assert_eq!(plan.apply_to_store(&mut store), 0);
        assert_eq!(store.len(), 5);
    }

    #[test]
    fn test_index_update_deletes_before_insert() {
        let changes = vec![
            change(UnitKind::Function, None, "foo", ChangeKind::Modified),
            change(UnitKind::Method, Some("Widget"), "resize", ChangeKind::Removed),
            change(UnitKind::Function, None, "bar", ChangeKind::Added),
        ];
        let summaries = vec![
            record(UnitKind::Function, None, "foo", "new foo"),
            record(UnitKind::Function, None, "bar", "bar"),
        ];
        let plan = ReconcilePlan::build(&changes, summaries, &store());
        let update = plan.index_update();

        assert_eq!(
            update.delete_ids,
            vec!["a.py::Widget::resize", "a.py::bar", "a.py::foo"]
        );
        let ids: Vec<&str> = update.documents.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["a.py::bar", "a.py::foo"]);
        assert_eq!(update.documents[1].text, "new foo");
    }

    #[test]
    fn test_empty_plan() {
        let plan = ReconcilePlan::build(&[], Vec::new(), &store());
        assert!(plan.is_empty());
        assert!(plan.index_update().is_empty());
    }
}
