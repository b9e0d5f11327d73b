use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::salary::{Salary, parse_salary};

const NAME_COLUMN: usize = 0;
const ROLE_COLUMN: usize = 1;
const LOCATION_COLUMN: usize = 2;
const SALARY_COLUMN: usize = 5;
const EXTRA_COLUMNS: [usize; 2] = [3, 4];

/// A cell that had to be coerced while reading a dataset row.
///
/// The row is kept either way so that table positions stay stable.
#[derive(Clone, Debug, Error, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RowIssue {
    #[error("row {row}: column {column} missing")]
    MissingColumn { row: usize, column: usize },
    #[error("row {row}: column {column} is not text")]
    NonTextCell { row: usize, column: usize },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct EmployeeRecord {
    pub name: String,
    pub role: String,
    pub location: String,
    /// Columns 3 and 4 of the source row, passed through untouched.
    pub extra: Vec<String>,
    pub salary_text: String,
    pub salary: Salary,
}

impl EmployeeRecord {
    pub fn new(
        name: impl Into<String>,
        role: impl Into<String>,
        location: impl Into<String>,
        salary_text: impl Into<String>,
    ) -> Self {
        let salary_text = salary_text.into();
        Self {
            name: name.into(),
            role: role.into(),
            location: location.into(),
            extra: Vec::new(),
            salary: parse_salary(&salary_text),
            salary_text,
        }
    }

    /// Read one positional row. `index` is only used to label issues.
    pub fn from_row(index: usize, cells: &[Value]) -> (Self, Vec<RowIssue>) {
        let mut issues = Vec::new();
        let mut text = |column: usize| match cells.get(column) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => {
                issues.push(RowIssue::MissingColumn { row: index, column });
                String::new()
            }
            Some(other) => {
                issues.push(RowIssue::NonTextCell { row: index, column });
                other.to_string()
            }
        };
        let name = text(NAME_COLUMN);
        let role = text(ROLE_COLUMN);
        let location = text(LOCATION_COLUMN);
        let salary_text = text(SALARY_COLUMN);
        let extra = EXTRA_COLUMNS
            .iter()
            .filter_map(|column| cells.get(*column))
            .map(|cell| match cell {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect();

        let record = Self {
            name,
            role,
            location,
            extra,
            salary: parse_salary(&salary_text),
            salary_text,
        };
        (record, issues)
    }

    /// Text before the first space of the full name.
    pub fn first_name(&self) -> &str {
        self.name.split(' ').next().unwrap_or_default()
    }
}

/// The fetched employee table. A record's position is its employee id.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RecordTable {
    records: Vec<EmployeeRecord>,
}

impl RecordTable {
    pub fn new(records: Vec<EmployeeRecord>) -> Self {
        Self { records }
    }

    pub fn from_rows(rows: &[Vec<Value>]) -> (Self, Vec<RowIssue>) {
        let mut issues = Vec::new();
        let records = rows
            .iter()
            .enumerate()
            .map(|(index, cells)| {
                let (record, row_issues) = EmployeeRecord::from_row(index, cells);
                issues.extend(row_issues);
                record
            })
            .collect();
        (Self { records }, issues)
    }

    pub fn get(&self, id: usize) -> Option<&EmployeeRecord> {
        self.records.get(id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[EmployeeRecord] {
        &self.records
    }

    pub fn iter(&self) -> impl Iterator<Item = &EmployeeRecord> {
        self.records.iter()
    }
}

impl FromIterator<EmployeeRecord> for RecordTable {
    fn from_iter<T: IntoIterator<Item = EmployeeRecord>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
