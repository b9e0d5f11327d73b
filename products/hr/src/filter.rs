use entity::{EmployeeRecord, PhotoOverrides, RecordTable};
use serde::{Deserialize, Serialize};

pub const ALL: &str = "all";

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
#[cfg_attr(feature = "graphql", derive(async_graphql::Enum))]
pub enum PhotoFilter {
    #[default]
    All,
    WithPhoto,
    WithoutPhoto,
}

impl PhotoFilter {
    fn admits(self, has_photo: bool) -> bool {
        match self {
            PhotoFilter::All => true,
            PhotoFilter::WithPhoto => has_photo,
            PhotoFilter::WithoutPhoto => !has_photo,
        }
    }
}

/// Search and filter selection for the employee list.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct FilterCriteria {
    pub query: String,
    pub location: String,
    pub role: String,
    pub photo: PhotoFilter,
}

impl Default for FilterCriteria {
    fn default() -> Self {
        Self {
            query: String::new(),
            location: ALL.into(),
            role: ALL.into(),
            photo: PhotoFilter::All,
        }
    }
}

impl FilterCriteria {
    pub fn matches(&self, index: usize, record: &EmployeeRecord, photos: &PhotoOverrides) -> bool {
        self.query_matches(record)
            && (self.location == ALL || record.location == self.location)
            && (self.role == ALL || record.role == self.role)
            && self.photo.admits(photos.contains(index))
    }

    // Emptiness is judged on the trimmed query, matching uses it as typed.
    fn query_matches(&self, record: &EmployeeRecord) -> bool {
        if self.query.trim().is_empty() {
            return true;
        }
        let needle = self.query.to_lowercase();
        [&record.name, &record.role, &record.location]
            .iter()
            .any(|field| field.to_lowercase().contains(&needle))
    }
}

#[derive(Clone, Copy, Debug)]
pub struct FilteredRecord<'a> {
    pub record: &'a EmployeeRecord,
    pub index: usize,
}

/// Records admitted by `criteria`, in table order with their original index.
pub fn filter_records<'a>(
    table: &'a RecordTable,
    criteria: &FilterCriteria,
    photos: &PhotoOverrides,
) -> Vec<FilteredRecord<'a>> {
    table
        .iter()
        .enumerate()
        .filter(|(index, record)| criteria.matches(*index, record, photos))
        .map(|(index, record)| FilteredRecord { record, index })
        .collect()
}
