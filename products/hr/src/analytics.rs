use entity::RecordTable;
use serde::Serialize;

use crate::{round_half_up, salary::aggregate_salaries};

const TOP_SALARIES: usize = 10;
const HIGHLIGHTS: usize = 5;
const BASELINE_RATIO: f64 = 0.84;
const EVEN_COLOR: &str = "#b45309";
const ODD_COLOR: &str = "#0f766e";

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[cfg_attr(feature = "graphql", derive(async_graphql::SimpleObject))]
pub struct TopSalary {
    pub label: String,
    pub value: i64,
    pub value_label: String,
    pub color: String,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[cfg_attr(feature = "graphql", derive(async_graphql::SimpleObject))]
pub struct TrendPoint {
    pub step: usize,
    pub salary: i64,
    pub baseline: i64,
}

#[derive(Clone, Debug, Serialize)]
#[cfg_attr(feature = "graphql", derive(async_graphql::SimpleObject))]
pub struct AnalyticsView {
    pub average_salary: i64,
    pub highest_salary: i64,
    pub profiles_compared: usize,
    pub top_salaries: Vec<TopSalary>,
    pub trend: Vec<TrendPoint>,
    pub highlights: Vec<TopSalary>,
}

pub fn analytics(table: &RecordTable) -> AnalyticsView {
    let aggregate = aggregate_salaries(table);
    let top_salaries: Vec<TopSalary> = aggregate
        .top(TOP_SALARIES)
        .iter()
        .enumerate()
        .map(|(index, entry)| TopSalary {
            label: entry.label.clone(),
            value: entry.value,
            value_label: entry.value_label.clone(),
            color: if index % 2 == 0 { EVEN_COLOR } else { ODD_COLOR }.to_string(),
        })
        .collect();
    let trend = top_salaries
        .iter()
        .enumerate()
        .map(|(index, entry)| TrendPoint {
            step: index + 1,
            salary: entry.value,
            baseline: round_half_up(entry.value as f64 * BASELINE_RATIO),
        })
        .collect();

    AnalyticsView {
        average_salary: aggregate.average,
        highest_salary: aggregate.max,
        profiles_compared: top_salaries.len(),
        highlights: top_salaries.iter().take(HIGHLIGHTS).cloned().collect(),
        trend,
        top_salaries,
    }
}
