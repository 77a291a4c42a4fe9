//! Change detection between two fingerprint snapshots

use crate::indexer::FileFingerprint;
use crate::snapshot::Snapshot;
use crate::types::{ChangeKind, ChangeRecord, UnitKind};
use std::collections::{BTreeMap, BTreeSet};

/// Change detection policy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DetectOptions {
    /// Emit method records for the methods of wholly added or removed classes
    pub enumerate_class_methods: bool,
}

/// Changes between two versions of one file; either side may be absent
pub fn diff_file(
    file_path: &str,
    old: Option<&FileFingerprint>,
    new: Option<&FileFingerprint>,
    options: DetectOptions,
) -> Vec<ChangeRecord> {
    let mut changes = Vec::new();

    match (old, new) {
        (None, None) => {}
        (None, Some(new)) => whole_file(&mut changes, file_path, new, ChangeKind::Added, options),
        (Some(old), None) => whole_file(&mut changes, file_path, old, ChangeKind::Removed, options),
        (Some(old), Some(new)) => {
            diff_hashes(&old.functions, &new.functions, |name, kind| {
                changes.push(record(file_path, UnitKind::Function, name, None, kind));
            });

            let old_classes: BTreeSet<&String> = old.classes.keys().collect();
            let new_classes: BTreeSet<&String> = new.classes.keys().collect();

            for name in new_classes.difference(&old_classes) {
                let methods = &new.classes[*name].methods;
                push_class(&mut changes, file_path, name, methods, ChangeKind::Added, options);
            }
            for name in old_classes.difference(&new_classes) {
                let methods = &old.classes[*name].methods;
                push_class(&mut changes, file_path, name, methods, ChangeKind::Removed, options);
            }
            for name in old_classes.intersection(&new_classes) {
                let old_class = &old.classes[*name];
                let new_class = &new.classes[*name];

                if old_class.source_hash != new_class.source_hash {
                    changes.push(record(
                        file_path,
                        UnitKind::Class,
                        name,
                        None,
                        ChangeKind::Modified,
                    ));
                }
                diff_hashes(&old_class.methods, &new_class.methods, |method, kind| {
                    changes.push(record(
                        file_path,
                        UnitKind::Method,
                        method,
                        Some(name.as_str()),
                        kind,
                    ));
                });
            }
        }
    }

    sort_changes(&mut changes);
    changes
}

/// Changes across the union of files in both snapshots, in a stable order
pub fn detect_changes(old: &Snapshot, new: &Snapshot, options: DetectOptions) -> Vec<ChangeRecord> {
    let files: BTreeSet<&String> = old.files.keys().chain(new.files.keys()).collect();

    let mut changes: Vec<ChangeRecord> = files
        .into_iter()
        .flat_map(|file| diff_file(file, old.get(file), new.get(file), options))
        .collect();

    sort_changes(&mut changes);
    changes
}

/// Order by file, then by owning unit (a class precedes its methods), then name
pub fn sort_changes(changes: &mut [ChangeRecord]) {
    changes.sort_by(|a, b| sort_key(a).cmp(&sort_key(b)));
}

fn sort_key(change: &ChangeRecord) -> (&str, &str, bool, &str, ChangeKind) {
    (
        change.file_path.as_str(),
        change.class_name.as_deref().unwrap_or(change.item_name.as_str()),
        change.class_name.is_some(),
        change.item_name.as_str(),
        change.change_type,
    )
}

fn whole_file(
    changes: &mut Vec<ChangeRecord>,
    file_path: &str,
    fingerprint: &FileFingerprint,
    kind: ChangeKind,
    options: DetectOptions,
) {
    for name in fingerprint.functions.keys() {
        changes.push(record(file_path, UnitKind::Function, name, None, kind));
    }
    for (name, class) in &fingerprint.classes {
        push_class(changes, file_path, name, &class.methods, kind, options);
    }
}

fn push_class(
    changes: &mut Vec<ChangeRecord>,
    file_path: &str,
    class_name: &str,
    methods: &BTreeMap<String, String>,
    kind: ChangeKind,
    options: DetectOptions,
) {
    changes.push(record(file_path, UnitKind::Class, class_name, None, kind));
    if options.enumerate_class_methods {
        for method in methods.keys() {
            changes.push(record(
                file_path,
                UnitKind::Method,
                method,
                Some(class_name),
                kind,
            ));
        }
    }
}

/// Set-compare two name -> hash maps
fn diff_hashes(
    old: &BTreeMap<String, String>,
    new: &BTreeMap<String, String>,
    mut emit: impl FnMut(&str, ChangeKind),
) {
    for (name, hash) in new {
        match old.get(name) {
            None => emit(name, ChangeKind::Added),
            Some(old_hash) if old_hash != hash => emit(name, ChangeKind::Modified),
            Some(_) => {}
        }
    }
    for name in old.keys() {
        if !new.contains_key(name) {
            emit(name, ChangeKind::Removed);
        }
    }
}

fn record(
    file_path: &str,
    item_type: UnitKind,
    item_name: &str,
    class_name: Option<&str>,
    change_type: ChangeKind,
) -> ChangeRecord {
    ChangeRecord {
        file_path: file_path.to_string(),
        item_type,
        item_name: item_name.to_string(),
        class_name: class_name.map(str::to_string),
        change_type,
    }
}
