//! Sortable district table.

use std::cmp::Ordering;

use covid_map_district_models::MergedEntity;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

use crate::round2;

/// One table row. Incidences are rounded to two decimals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableRow {
    /// District display name.
    pub district_name: String,
    /// District 7-day incidence per 100k.
    pub cases7_per_100k: f64,
    /// Federal state.
    pub state: String,
    /// State 7-day incidence per 100k.
    pub cases7_bl_per_100k: f64,
}

impl From<&MergedEntity> for TableRow {
    fn from(entity: &MergedEntity) -> Self {
        Self {
            district_name: entity.display_name.clone(),
            cases7_per_100k: round2(entity.weight),
            state: entity.state.clone(),
            cases7_bl_per_100k: round2(entity.state_weight),
        }
    }
}

/// Column to sort the table by. Parses from the row field names.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
pub enum SortColumn {
    /// District display name.
    #[default]
    #[serde(rename = "district_name")]
    #[strum(serialize = "district_name")]
    DistrictName,
    /// District incidence.
    #[serde(rename = "cases7_per_100k")]
    #[strum(serialize = "cases7_per_100k")]
    Cases7Per100k,
    /// State name.
    #[serde(rename = "state")]
    #[strum(serialize = "state")]
    State,
    /// State incidence.
    #[serde(rename = "cases7_bl_per_100k")]
    #[strum(serialize = "cases7_bl_per_100k")]
    Cases7BlPer100k,
}

impl SortColumn {
    /// All columns, in display order.
    pub const ALL: &[Self] = &[
        Self::DistrictName,
        Self::Cases7Per100k,
        Self::State,
        Self::Cases7BlPer100k,
    ];

    /// Column header text.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::DistrictName => "District",
            Self::Cases7Per100k => "District 7d/100k",
            Self::State => "State",
            Self::Cases7BlPer100k => "State 7d/100k",
        }
    }

    fn compare(self, a: &TableRow, b: &TableRow) -> Ordering {
        match self {
            Self::DistrictName => a.district_name.cmp(&b.district_name),
            Self::Cases7Per100k => a.cases7_per_100k.total_cmp(&b.cases7_per_100k),
            Self::State => a.state.cmp(&b.state),
            Self::Cases7BlPer100k => a.cases7_bl_per_100k.total_cmp(&b.cases7_bl_per_100k),
        }
    }
}

/// Sort direction.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SortDirection {
    /// Smallest first.
    #[default]
    Asc,
    /// Largest first.
    Desc,
}

impl SortDirection {
    /// The opposite direction.
    #[must_use]
    pub const fn reversed(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }
}

/// Builds table rows from merged entities, in entity order.
#[must_use]
pub fn build_table(entities: &[MergedEntity]) -> Vec<TableRow> {
    entities.iter().map(TableRow::from).collect()
}

/// Sorts rows in place. The sort is stable in both directions.
pub fn sort_rows(rows: &mut [TableRow], column: SortColumn, direction: SortDirection) {
    match direction {
        SortDirection::Asc => rows.sort_by(|a, b| column.compare(a, b)),
        SortDirection::Desc => rows.sort_by(|a, b| column.compare(b, a)),
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr as _;

    use covid_map_district_models::{Coordinate, Resolution};

    use super::*;

    fn entity(name: &str, weight: f64, state: &str, state_weight: f64) -> MergedEntity {
        MergedEntity {
            display_name: name.to_string(),
            resolution: Resolution::Found(Coordinate::new(50.0, 10.0)),
            weight,
            state: state.to_string(),
            state_weight,
        }
    }

    fn rows() -> Vec<TableRow> {
        build_table(&[
            entity("Musterstadt Kreis", 120.456, "Sachsen", 95.0),
            entity("Berlin", 180.0, "Berlin", 180.0),
            entity("Altdorf Landkreis", 12.3, "Bayern", 40.1),
        ])
    }

    fn names(rows: &[TableRow]) -> Vec<&str> {
        rows.iter().map(|r| r.district_name.as_str()).collect()
    }

    #[test]
    fn rounds_incidences() {
        let rows = rows();
        assert!((rows[0].cases7_per_100k - 120.46).abs() < 1e-9);
    }

    #[test]
    fn sorts_by_each_column() {
        let mut rows = rows();
        sort_rows(&mut rows, SortColumn::DistrictName, SortDirection::Asc);
        assert_eq!(names(&rows), ["Altdorf Landkreis", "Berlin", "Musterstadt Kreis"]);

        sort_rows(&mut rows, SortColumn::Cases7Per100k, SortDirection::Desc);
        assert_eq!(names(&rows), ["Berlin", "Musterstadt Kreis", "Altdorf Landkreis"]);

        sort_rows(&mut rows, SortColumn::State, SortDirection::Asc);
        assert_eq!(names(&rows), ["Altdorf Landkreis", "Berlin", "Musterstadt Kreis"]);

        sort_rows(&mut rows, SortColumn::Cases7BlPer100k, SortDirection::Asc);
        assert_eq!(names(&rows), ["Altdorf Landkreis", "Musterstadt Kreis", "Berlin"]);
    }

    #[test]
    fn descending_reverses_ascending_for_distinct_keys() {
        for &column in SortColumn::ALL {
            let mut asc = rows();
            let mut desc = rows();
            sort_rows(&mut asc, column, SortDirection::Asc);
            sort_rows(&mut desc, column, SortDirection::Desc);
            desc.reverse();
            assert_eq!(asc, desc, "column {column}");
        }
    }

    #[test]
    fn sort_is_stable_on_ties() {
        let mut rows = build_table(&[
            entity("B", 1.0, "S", 1.0),
            entity("A", 1.0, "S", 1.0),
            entity("C", 1.0, "S", 1.0),
        ]);
        sort_rows(&mut rows, SortColumn::State, SortDirection::Desc);
        assert_eq!(names(&rows), ["B", "A", "C"]);
    }

    #[test]
    fn parses_query_values() {
        assert_eq!(
            SortColumn::from_str("cases7_bl_per_100k").unwrap(),
            SortColumn::Cases7BlPer100k
        );
        assert_eq!(SortColumn::DistrictName.to_string(), "district_name");
        assert!(SortColumn::from_str("population").is_err());
        assert_eq!(SortDirection::from_str("desc").unwrap(), SortDirection::Desc);
        assert_eq!(SortDirection::Asc.reversed(), SortDirection::Desc);

        let col: SortColumn = serde_json::from_str("\"cases7_per_100k\"").unwrap();
        assert_eq!(col, SortColumn::Cases7Per100k);
    }
}
