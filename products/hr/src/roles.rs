use std::collections::{HashMap, HashSet};

use entity::RecordTable;
use serde::Serialize;

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[cfg_attr(feature = "graphql", derive(async_graphql::SimpleObject))]
pub struct RoleCount {
    pub role: String,
    pub count: usize,
}

/// Distinct roles in first-appearance order, cut to `limit`. Counts cover the
/// whole table.
pub fn group_by_role(table: &RecordTable, limit: usize) -> Vec<RoleCount> {
    let mut totals: HashMap<&str, usize> = HashMap::new();
    for record in table.iter() {
        *totals.entry(record.role.as_str()).or_default() += 1;
    }
    distinct(table.iter().map(|record| record.role.as_str()))
        .into_iter()
        .take(limit)
        .map(|role| RoleCount {
            count: totals.get(role).copied().unwrap_or_default(),
            role: role.to_string(),
        })
        .collect()
}

pub fn distinct_roles(table: &RecordTable) -> Vec<String> {
    distinct(table.iter().map(|record| record.role.as_str()))
        .into_iter()
        .map(str::to_string)
        .collect()
}

pub fn distinct_locations(table: &RecordTable) -> Vec<String> {
    distinct(table.iter().map(|record| record.location.as_str()))
        .into_iter()
        .map(str::to_string)
        .collect()
}

fn distinct<'a>(values: impl Iterator<Item = &'a str>) -> Vec<&'a str> {
    let mut seen = HashSet::new();
    values.filter(|value| seen.insert(*value)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{staff, table};

    #[test]
    fn groups_in_first_appearance_order() {
        let table = table(&[
            ("a1", "A", "x", "$1"),
            ("b1", "B", "x", "$1"),
            ("a2", "A", "x", "$1"),
            ("c1", "C", "x", "$1"),
            ("a3", "A", "x", "$1"),
        ]);
        let expected = vec![
            RoleCount { role: "A".into(), count: 3 },
            RoleCount { role: "B".into(), count: 1 },
            RoleCount { role: "C".into(), count: 1 },
        ];
        assert_eq!(group_by_role(&table, 5), expected);
    }

    #[test]
    fn truncation_keeps_full_counts() {
        let table = table(&[
            ("1", "A", "x", ""),
            ("2", "B", "x", ""),
            ("3", "C", "x", ""),
            ("4", "B", "x", ""),
        ]);
        let grouped = group_by_role(&table, 2);
        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped[1], RoleCount { role: "B".into(), count: 2 });
    }

    #[test]
    fn distinct_values_feed_dropdowns() {
        let table = staff();
        assert_eq!(
            distinct_locations(&table),
            vec!["Edinburgh", "Tokyo", "San Francisco"]
        );
        assert_eq!(distinct_roles(&table).len(), 4);
        assert!(group_by_role(&RecordTable::default(), 5).is_empty());
    }
}
