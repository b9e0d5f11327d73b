use entity::RecordTable;
use serde::Serialize;

use crate::round_half_up;

/// One record's salary as shown in raw listings.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct SalaryEntry {
    pub label: String,
    /// Parsed value, zero when the cell could not be read.
    pub value: i64,
    pub value_label: String,
    pub parsed: bool,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct SalaryAggregate {
    pub average: i64,
    pub max: i64,
    /// One entry per record in table order, never sorted by salary.
    pub entries: Vec<SalaryEntry>,
}

impl SalaryAggregate {
    pub fn top(&self, n: usize) -> &[SalaryEntry] {
        &self.entries[..n.min(self.entries.len())]
    }
}

/// Average and max over parseable salaries. Unparseable cells are left out of
/// both figures but still get a zero-valued entry.
pub fn aggregate_salaries(table: &RecordTable) -> SalaryAggregate {
    let values: Vec<i64> = table
        .iter()
        .filter_map(|record| record.salary.amount())
        .collect();
    let average = if values.is_empty() {
        0
    } else {
        let sum: i128 = values.iter().map(|v| i128::from(*v)).sum();
        round_half_up(sum as f64 / values.len() as f64)
    };
    let max = values.iter().copied().max().unwrap_or(0);
    let entries = table
        .iter()
        .map(|record| SalaryEntry {
            label: record.first_name().to_string(),
            value: record.salary.or_zero(),
            value_label: record.salary_text.clone(),
            parsed: record.salary.amount().is_some(),
        })
        .collect();
    SalaryAggregate {
        average,
        max,
        entries,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::table;

    #[test]
    fn unparseable_salaries_are_excluded() {
        let table = table(&[
            ("Ann Lee", "Dev", "Tokyo", "$100,000"),
            ("Bo Chan", "Dev", "Tokyo", "$200,000"),
            ("Cy Moss", "Dev", "Tokyo", "bad"),
        ]);
        let agg = aggregate_salaries(&table);
        assert_eq!(agg.average, 150_000);
        assert_eq!(agg.max, 200_000);
        assert_eq!(agg.entries.len(), 3);
        assert_eq!(agg.entries[2].value, 0);
        assert_eq!(agg.entries[2].value_label, "bad");
        assert!(!agg.entries[2].parsed);
    }

    #[test]
    fn empty_table_is_all_zero() {
        let agg = aggregate_salaries(&RecordTable::default());
        assert_eq!((agg.average, agg.max), (0, 0));
        assert!(agg.top(10).is_empty());
    }

    #[test]
    fn average_rounds_to_nearest() {
        let table = table(&[("a", "r", "l", "$1"), ("b", "r", "l", "$2")]);
        assert_eq!(aggregate_salaries(&table).average, 2);
    }

    #[test]
    fn top_takes_table_order() {
        let table = table(&[
            ("Low One", "r", "l", "$10"),
            ("High Two", "r", "l", "$900"),
            ("Mid Three", "r", "l", "$50"),
        ]);
        let agg = aggregate_salaries(&table);
        let labels: Vec<_> = agg.top(2).iter().map(|e| e.label.as_str()).collect();
        assert_eq!(labels, vec!["Low", "High"]);
    }
}
