use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;

use super::record::Record;
use crate::schema::ColumnMapping;

/// What the mapper changed while fitting a file to its table
#[derive(Debug, Default, Clone, PartialEq)]
pub struct MappingReport {
    /// Source field -> destination column, for renames that landed
    pub renamed: BTreeMap<String, String>,
    /// Source fields with no destination column (after renaming)
    pub dropped: BTreeSet<String>,
}

impl MappingReport {
    pub fn is_empty(&self) -> bool {
        self.renamed.is_empty() && self.dropped.is_empty()
    }
}

impl fmt::Display for MappingReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if !self.renamed.is_empty() {
            let renamed: Vec<String> = self
                .renamed
                .iter()
                .map(|(from, to)| format!("{}->{}", from, to))
                .collect();
            parts.push(format!("Mapped: {}", renamed.join(", ")));
        }
        if !self.dropped.is_empty() {
            let dropped: Vec<&str> = self.dropped.iter().map(String::as_str).collect();
            parts.push(format!("Skipped: {}", dropped.join(", ")));
        }
        write!(f, "{}", parts.join(" | "))
    }
}

/// Rename then filter every record against the table's live columns.
///
/// Renaming runs first; existence is checked against the renamed name, so a
/// field renamed to a missing column is dropped rather than kept under its
/// source name. When a record already carries the destination name, that
/// field wins and the renamed one is dropped.
pub fn map_records(
    records: Vec<Record>,
    mapping: &ColumnMapping,
    columns: &HashSet<String>,
) -> (Vec<Record>, MappingReport) {
    let mut report = MappingReport::default();

    let mapped = records
        .into_iter()
        .map(|mut record| {
            for (from, to) in mapping.renames {
                if record.contains_key(*to) && record.remove(*from).is_some() {
                    report.dropped.insert(from.to_string());
                }
            }

            let mut out = Record::new();
            for (field, value) in record {
                let column = mapping.destination(&field);
                if !columns.contains(column) {
                    report.dropped.insert(field);
                    continue;
                }
                if column != field {
                    report.renamed.insert(field.clone(), column.to_string());
                }
                out.insert(column.to_string(), value);
            }
            out
        })
        .collect();

    (mapped, report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    static POP_CATEGORIES: ColumnMapping =
        ColumnMapping::new("pop_categories", &[("tier", "tier_level"), ("rank", "ranking")]);

    fn record(value: serde_json::Value) -> Record {
        value.as_object().unwrap().clone()
    }

    fn columns(names: &[&str]) -> HashSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_rename_then_filter() {
        let records = vec![record(json!({"id": 1, "tier": 2, "legacy_code": "X"}))];
        let (mapped, report) =
            map_records(records, &POP_CATEGORIES, &columns(&["id", "tier_level"]));

        assert_eq!(mapped[0], record(json!({"id": 1, "tier_level": 2})));
        assert_eq!(report.renamed.get("tier").map(String::as_str), Some("tier_level"));
        assert!(report.dropped.contains("legacy_code"));
    }

    #[test]
    fn test_rename_to_missing_column_is_dropped() {
        let records = vec![record(json!({"id": 1, "rank": 3}))];
        let (mapped, report) = map_records(records, &POP_CATEGORIES, &columns(&["id", "rank"]));

        // "rank" exists, but the renamed "ranking" does not
        assert_eq!(mapped[0], record(json!({"id": 1})));
        assert!(report.dropped.contains("rank"));
        assert!(report.renamed.is_empty());
    }

    #[test]
    fn test_drops_are_aggregated_across_records() {
        let records = vec![
            record(json!({"id": 1, "a": 1})),
            record(json!({"id": 2, "b": 2})),
        ];
        let (mapped, report) = map_records(records, &POP_CATEGORIES, &columns(&["id"]));

        assert_eq!(mapped.len(), 2);
        assert_eq!(report.to_string(), "Skipped: a, b");
    }

    #[test]
    fn test_no_known_columns_filters_everything() {
        let records = vec![record(json!({"id": 1, "name": "x"}))];
        let (mapped, report) = map_records(records, &POP_CATEGORIES, &HashSet::new());

        assert!(mapped[0].is_empty());
        assert_eq!(report.dropped.len(), 2);
    }

    #[test]
    fn test_rename_collision_keeps_destination_field() {
        let records = vec![record(json!({"id": 1, "tier": 2, "tier_level": 5}))];
        let (mapped, report) =
            map_records(records, &POP_CATEGORIES, &columns(&["id", "tier_level"]));

        assert_eq!(mapped[0], record(json!({"id": 1, "tier_level": 5})));
        assert!(report.dropped.contains("tier"));
        assert!(report.renamed.is_empty());
    }

    #[test]
    fn test_report_display() {
        let records = vec![record(json!({"tier": 1, "old": 2}))];
        let (_, report) = map_records(records, &POP_CATEGORIES, &columns(&["tier_level"]));
        assert_eq!(report.to_string(), "Mapped: tier->tier_level | Skipped: old");
    }
}
