use entity::{PhotoOverrides, RecordTable};
use serde::Serialize;

use crate::{
    filter::{FilterCriteria, filter_records},
    roles::{RoleCount, distinct_locations, distinct_roles, group_by_role},
};

const SALARY_BARS: usize = 8;
const SALARY_FLOW: usize = 6;
const ROLE_SLICES: usize = 5;

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[cfg_attr(feature = "graphql", derive(async_graphql::SimpleObject))]
pub struct SalaryPoint {
    pub label: String,
    pub value: i64,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[cfg_attr(feature = "graphql", derive(async_graphql::SimpleObject))]
pub struct CandidateCard {
    pub id: usize,
    pub name: String,
    pub role: String,
    pub location: String,
    pub salary: String,
    pub has_photo: bool,
    pub photo: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
#[cfg_attr(feature = "graphql", derive(async_graphql::SimpleObject))]
pub struct Dashboard {
    pub loading: bool,
    pub total: usize,
    pub location_count: usize,
    pub role_count: usize,
    pub locations: Vec<String>,
    pub roles: Vec<String>,
    pub salary_bars: Vec<SalaryPoint>,
    pub salary_flow: Vec<SalaryPoint>,
    pub role_distribution: Vec<RoleCount>,
    pub candidates: Vec<CandidateCard>,
    pub showing: usize,
}

pub fn dashboard(
    table: &RecordTable,
    criteria: &FilterCriteria,
    photos: &PhotoOverrides,
    loading: bool,
) -> Dashboard {
    let locations = distinct_locations(table);
    let roles = distinct_roles(table);

    let salary_bars = table
        .iter()
        .take(SALARY_BARS)
        .enumerate()
        .map(|(index, record)| SalaryPoint {
            label: format!("#{}", index + 1),
            value: record.salary.or_zero(),
        })
        .collect();
    let salary_flow = table
        .iter()
        .take(SALARY_FLOW)
        .map(|record| SalaryPoint {
            label: record.first_name().to_string(),
            value: record.salary.or_zero(),
        })
        .collect();

    let candidates: Vec<CandidateCard> = if loading {
        Vec::new()
    } else {
        filter_records(table, criteria, photos)
            .into_iter()
            .map(|hit| CandidateCard {
                id: hit.index,
                name: hit.record.name.clone(),
                role: hit.record.role.clone(),
                location: hit.record.location.clone(),
                salary: hit.record.salary_text.clone(),
                has_photo: photos.contains(hit.index),
                photo: photos.get(hit.index).map(|p| p.to_data_url()),
            })
            .collect()
    };

    Dashboard {
        loading,
        total: table.len(),
        location_count: locations.len(),
        role_count: roles.len(),
        locations,
        roles,
        salary_bars,
        salary_flow,
        role_distribution: group_by_role(table, ROLE_SLICES),
        showing: candidates.len(),
        candidates,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{filter::PhotoFilter, fixtures::staff};
    use entity::PhotoPayload;

    #[test]
    fn summarises_the_table() {
        let table = staff();
        let view = dashboard(&table, &FilterCriteria::default(), &PhotoOverrides::default(), false);
        assert_eq!(view.total, 5);
        assert_eq!(view.location_count, 3);
        assert_eq!(view.role_count, 4);
        assert_eq!(view.salary_bars.len(), 5);
        assert_eq!(view.salary_bars[0], SalaryPoint { label: "#1".into(), value: 320_800 });
        assert_eq!(view.salary_flow[1].label, "Garrett");
        assert_eq!(view.role_distribution[1], RoleCount { role: "Accountant".into(), count: 2 });
        assert_eq!(view.showing, 5);
    }

    #[test]
    fn cards_carry_original_ids_and_photos() {
        let table = staff();
        let mut photos = PhotoOverrides::default();
        photos.set(4, PhotoPayload::from_bytes("image/png", b"x").unwrap());
        let criteria = FilterCriteria {
            photo: PhotoFilter::WithPhoto,
            ..FilterCriteria::default()
        };
        let view = dashboard(&table, &criteria, &photos, false);
        assert_eq!(view.showing, 1);
        let card = &view.candidates[0];
        assert_eq!(card.id, 4);
        assert_eq!(card.name, "Airi Satou");
        assert_eq!(card.salary, "$162,700");
        assert_eq!(card.photo.as_deref(), Some("data:image/png;base64,eA=="));
    }

    #[test]
    fn loading_hides_candidates() {
        let view = dashboard(
            &RecordTable::default(),
            &FilterCriteria::default(),
            &PhotoOverrides::default(),
            true,
        );
        assert!(view.loading);
        assert_eq!((view.total, view.showing), (0, 0));
    }

    #[test]
    fn unparseable_salary_charts_as_zero() {
        let table = crate::fixtures::table(&[("Ann Lee", "Dev", "Oslo", "n/a")]);
        let view = dashboard(&table, &FilterCriteria::default(), &PhotoOverrides::default(), false);
        assert_eq!(view.salary_flow[0], SalaryPoint { label: "Ann".into(), value: 0 });
    }
}
