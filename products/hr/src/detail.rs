use entity::{EmployeeRecord, PhotoOverrides, RecordTable};
use serde::Serialize;

use crate::round_half_up;

/// Salary that maps to a full salary scale.
const SALARY_CEILING: f64 = 450_000.0;
const MAP_ZOOM: u8 = 4;
const FALLBACK_COORDS: (f64, f64) = (20.0, 0.0);

const CITY_COORDS: &[(&str, f64, f64)] = &[
    ("Edinburgh", 55.9533, -3.1883),
    ("Tokyo", 35.6762, 139.6503),
    ("San Francisco", 37.7749, -122.4194),
    ("New York", 40.7128, -74.006),
    ("London", 51.5074, -0.1278),
];

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[cfg_attr(feature = "graphql", derive(async_graphql::SimpleObject))]
pub struct EmployeeInfo {
    pub id: usize,
    pub badge: String,
    pub name: String,
    pub role: String,
    pub location: String,
    pub salary: String,
    pub photo_status: String,
    pub photo: Option<String>,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[cfg_attr(feature = "graphql", derive(async_graphql::SimpleObject))]
pub struct FitPoint {
    pub step: String,
    pub progress: i64,
    pub quality: i64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[cfg_attr(feature = "graphql", derive(async_graphql::SimpleObject))]
pub struct MapLocation {
    pub city: String,
    pub latitude: f64,
    pub longitude: f64,
    pub zoom: u8,
    pub known_city: bool,
    pub popup_title: String,
    pub popup_detail: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[cfg_attr(feature = "graphql", derive(async_graphql::SimpleObject))]
pub struct EmployeeDetail {
    pub info: EmployeeInfo,
    pub fit_chart: Vec<FitPoint>,
    pub map: MapLocation,
}

/// The detail workspace for one employee, or `None` for an unknown id.
pub fn employee_detail(
    table: &RecordTable,
    id: usize,
    photos: &PhotoOverrides,
) -> Option<EmployeeDetail> {
    let record = table.get(id)?;
    let photo = photos.get(id);
    Some(EmployeeDetail {
        info: EmployeeInfo {
            id,
            badge: format!("ID #{}", id + 1),
            name: record.name.clone(),
            role: record.role.clone(),
            location: record.location.clone(),
            salary: record.salary_text.clone(),
            photo_status: if photo.is_some() { "Photo saved" } else { "Photo pending" }.into(),
            photo: photo.map(|p| p.to_data_url()),
        },
        fit_chart: FitScales::new(record, photo.is_some()).chart(),
        map: map_location(record),
    })
}

struct FitScales {
    salary: i64,
    role: i64,
    location: i64,
    profile: i64,
}

impl FitScales {
    fn new(record: &EmployeeRecord, has_photo: bool) -> Self {
        let salary = record.salary.or_zero() as f64;
        let role_len = record.role.chars().count() as i64;
        let location_len = record.location.chars().count() as i64;
        Self {
            salary: round_half_up(salary / SALARY_CEILING * 100.0).min(100),
            role: (42 + role_len * 2).min(100),
            location: (55 + location_len).min(100),
            profile: if has_photo { 100 } else { 25 },
        }
    }

    fn chart(&self) -> Vec<FitPoint> {
        let scaled = |scale: i64, factor: f64| round_half_up(scale as f64 * factor);
        let mean = |a: i64, b: i64| round_half_up((a + b) as f64 / 2.0);
        let point = |step: &str, progress, quality| FitPoint {
            step: step.into(),
            progress,
            quality,
        };
        vec![
            point("Onboard", scaled(self.role, 0.55), scaled(self.location, 0.5)),
            point("Screen", scaled(self.role, 0.78), scaled(self.location, 0.64)),
            point("Assess", scaled(self.salary, 0.72), scaled(self.profile, 0.54)),
            point("Verify", scaled(self.profile, 0.9), scaled(self.role, 0.66)),
            point(
                "Close",
                mean(self.salary, self.profile),
                mean(self.location, self.profile),
            ),
        ]
    }
}

fn map_location(record: &EmployeeRecord) -> MapLocation {
    let known = CITY_COORDS
        .iter()
        .find(|(city, _, _)| *city == record.location);
    let (latitude, longitude) = known
        .map(|(_, lat, lng)| (*lat, *lng))
        .unwrap_or(FALLBACK_COORDS);
    MapLocation {
        city: record.location.clone(),
        latitude,
        longitude,
        zoom: MAP_ZOOM,
        known_city: known.is_some(),
        popup_title: record.name.clone(),
        popup_detail: format!("{} - {}", record.role, record.location),
    }
}
