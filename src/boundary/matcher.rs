//! Boundary matching.
//!
//! Each pass reads one boundary file and matches its features against the
//! rows already loaded into a region table:
//! - divisions: `shapeISO` against `iso_code`, exactly
//! - districts: `shapeName` against `name_en`, case-insensitively, after
//!   the alias table has been applied
//!
//! Updates are keyed by the matched row's primary key.

use anyhow::{bail, Context, Result};
use std::collections::{HashMap, HashSet};
use std::path::Path;

use super::feature::{read_feature_collection, Boundary, Feature, GeometryError};
use crate::ui::Reporter;
use crate::writer::{BoundaryCoverage, Database, RegionRow};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKey {
    /// Exact region code
    IsoCode,
    /// Display name, case-insensitive, through the alias table
    Name,
}

#[derive(Debug)]
pub struct BoundaryPass {
    pub label: &'static str,
    pub table: &'static str,
    pub key_column: &'static str,
    pub name_column: &'static str,
    pub file_name: &'static str,
    /// geoBoundaries administrative level
    pub admin_level: &'static str,
    pub key: MatchKey,
    /// Feature name -> destination name
    pub aliases: &'static [(&'static str, &'static str)],
}

pub static DIVISIONS: BoundaryPass = BoundaryPass {
    label: "Division",
    table: "geo_divisions",
    key_column: "iso_code",
    name_column: "name_en",
    file_name: "bgd_divisions.geojson",
    admin_level: "ADM1",
    key: MatchKey::IsoCode,
    aliases: &[],
};

pub static DISTRICTS: BoundaryPass = BoundaryPass {
    label: "District",
    table: "geo_districts",
    key_column: "name_en",
    name_column: "name_en",
    file_name: "bgd_districts.geojson",
    admin_level: "ADM2",
    key: MatchKey::Name,
    aliases: &[
        ("Bogra", "Bogura"),
        ("Brahamanbaria", "Brahmanbaria"),
        ("Chittagong", "Chattogram"),
        ("Cox's Bazar", "Coxsbazar"),
        ("Jessore", "Jashore"),
        ("Jhalokati", "Jhalakathi"),
        ("Maulvibazar", "Moulvibazar"),
        ("Nawabganj", "Chapainawabganj"),
        ("Netrakona", "Netrokona"),
    ],
};

/// Both passes, divisions first
pub static BOUNDARY_PASSES: &[&BoundaryPass] = &[&DIVISIONS, &DISTRICTS];

impl BoundaryPass {
    /// Destination name for a feature name
    pub fn canonical_name<'a>(&self, feature_name: &'a str) -> &'a str {
        self.aliases
            .iter()
            .find(|(from, _)| *from == feature_name)
            .map(|(_, to)| *to)
            .unwrap_or(feature_name)
    }

    fn feature_key(&self, feature: &Feature) -> String {
        match self.key {
            MatchKey::IsoCode => feature.iso_code().to_string(),
            MatchKey::Name => self.canonical_name(feature.name()).to_lowercase(),
        }
    }

    fn row_key(&self, row: &RegionRow) -> Option<String> {
        let key = row.key.as_deref()?;
        Some(match self.key {
            MatchKey::IsoCode => key.to_string(),
            MatchKey::Name => key.to_lowercase(),
        })
    }
}

/// Shape to write onto one row
#[derive(Debug, Clone)]
pub struct BoundaryUpdate {
    pub row_id: String,
    pub boundary: Boundary,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchedFeature {
    pub feature_name: String,
    pub row_id: String,
    pub row_name: String,
}

#[derive(Debug, Default)]
pub struct MatchReport {
    pub total: usize,
    pub matched: Vec<MatchedFeature>,
    /// Feature names with no destination row
    pub unmatched: Vec<String>,
    pub invalid: Vec<(String, GeometryError)>,
    /// Features whose row was already matched earlier in the pass
    pub duplicates: Vec<String>,
}

/// Match features to rows; nothing is written here
pub fn match_features(
    pass: &BoundaryPass,
    rows: &[RegionRow],
    features: &[Feature],
) -> (Vec<BoundaryUpdate>, MatchReport) {
    let lookup: HashMap<String, &RegionRow> = rows
        .iter()
        .filter_map(|row| pass.row_key(row).map(|key| (key, row)))
        .collect();

    let mut report = MatchReport {
        total: features.len(),
        ..Default::default()
    };
    let mut updates = Vec::new();
    let mut used: HashSet<&str> = HashSet::new();

    for feature in features {
        let feature_name = feature.name().to_string();

        let Some(row) = lookup.get(&pass.feature_key(feature)) else {
            report.unmatched.push(match pass.key {
                MatchKey::IsoCode => format!("{} ({})", feature.iso_code(), feature_name),
                MatchKey::Name => feature_name,
            });
            continue;
        };

        if used.contains(row.id.as_str()) {
            report.duplicates.push(feature_name);
            continue;
        }

        match Boundary::from_geometry(feature.geometry.as_ref()) {
            Ok(boundary) => {
                used.insert(row.id.as_str());
                updates.push(BoundaryUpdate {
                    row_id: row.id.clone(),
                    boundary,
                });
                report.matched.push(MatchedFeature {
                    feature_name,
                    row_id: row.id.clone(),
                    row_name: row.name.clone().unwrap_or_default(),
                });
            }
            Err(err) => report.invalid.push((feature_name, err)),
        }
    }

    (updates, report)
}

/// Fail unless every pass has its file in `dir`
pub fn check_files(dir: &Path) -> Result<()> {
    for pass in BOUNDARY_PASSES {
        let path = dir.join(pass.file_name);
        if !path.exists() {
            bail!("{} GeoJSON not found: {}", pass.label, path.display());
        }
    }
    Ok(())
}

/// Run one pass and commit its updates
pub fn load_boundaries<D, R>(
    db: &mut D,
    pass: &BoundaryPass,
    dir: &Path,
    reporter: &mut R,
) -> Result<MatchReport>
where
    D: Database + ?Sized,
    R: Reporter,
{
    let collection = read_feature_collection(&dir.join(pass.file_name))?;
    reporter.log(format!(
        "\n--- Loading {} Boundaries ({} features) ---",
        pass.label,
        collection.features.len()
    ));

    let rows = db
        .region_rows(pass.table, pass.key_column, pass.name_column)
        .with_context(|| format!("Failed to read {}", pass.table))?;
    let (updates, report) = match_features(pass, &rows, &collection.features);

    for matched in &report.matched {
        let note = if matched.feature_name != matched.row_name {
            format!(" (from '{}')", matched.feature_name)
        } else {
            String::new()
        };
        reporter.log(format!("  {}{} (id={})", matched.row_name, note, matched.row_id));
    }

    let updated = db
        .apply_boundaries(pass.table, &updates)
        .with_context(|| format!("Failed to update {}", pass.table))?;
    tracing::debug!(table = pass.table, updated, "boundaries committed");

    reporter.log(format!("  Matched: {}/{}", report.matched.len(), report.total));
    if !report.unmatched.is_empty() {
        reporter.warn(format!("UNMATCHED: {}", report.unmatched.join(", ")));
    }
    for (name, err) in &report.invalid {
        reporter.warn(format!("invalid geometry for {}: {}", name, err));
    }
    if !report.duplicates.is_empty() {
        reporter.warn(format!(
            "already matched, not written: {}",
            report.duplicates.join(", ")
        ));
    }

    Ok(report)
}

/// Print boundary coverage for every pass table, then a few sample divisions
pub fn verify_coverage<D, R>(db: &mut D, reporter: &mut R) -> Result<Vec<(&'static str, BoundaryCoverage)>>
where
    D: Database + ?Sized,
    R: Reporter,
{
    reporter.log("\n--- Verification ---");
    let mut coverage = Vec::new();

    for pass in BOUNDARY_PASSES {
        let counts = db
            .boundary_coverage(pass.table)
            .with_context(|| format!("Failed to count {}", pass.table))?;
        reporter.log(format!(
            "  {}: {} total, {} boundaries, {} centroids",
            pass.table, counts.total, counts.with_boundary, counts.with_centroid
        ));
        coverage.push((pass.table, counts));
    }

    let samples = db
        .boundary_samples(DIVISIONS.table, DIVISIONS.name_column, 4)
        .with_context(|| format!("Failed to sample {}", DIVISIONS.table))?;
    if !samples.is_empty() {
        reporter.log("\n  Sample divisions (area in km²):");
        for sample in &samples {
            reporter.log(format!(
                "    {}: {:.0} km², centroid ({:.4}, {:.4})",
                sample.name, sample.area_km2, sample.lat, sample.lon
            ));
        }
    }

    Ok(coverage)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boundary::FeatureCollection;
    use serde_json::json;

    fn row(id: &str, key: &str, name: &str) -> RegionRow {
        RegionRow {
            id: id.to_string(),
            key: Some(key.to_string()),
            name: Some(name.to_string()),
        }
    }

    fn features(items: serde_json::Value) -> Vec<Feature> {
        let collection: FeatureCollection =
            serde_json::from_value(json!({"type": "FeatureCollection", "features": items})).unwrap();
        collection.features
    }

    fn feature(iso: &str, name: &str) -> serde_json::Value {
        json!({
            "type": "Feature",
            "properties": {"shapeISO": iso, "shapeName": name},
            "geometry": {
                "type": "Polygon",
                "coordinates": [[[90.0, 23.0], [91.0, 23.0], [91.0, 24.0], [90.0, 24.0], [90.0, 23.0]]]
            }
        })
    }

    #[test]
    fn test_division_matched_by_iso_code() {
        let rows = vec![row("1", "BD-A", "Barishal"), row("2", "BD-B", "Chattogram")];
        let items = features(json!([feature("BD-A", "Barisal Division"), feature("BD-Z", "Nowhere")]));

        let (updates, report) = match_features(&DIVISIONS, &rows, &items);

        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].row_id, "1");
        assert_eq!(report.matched[0].row_name, "Barishal");
        assert_eq!(report.unmatched, vec!["BD-Z (Nowhere)".to_string()]);
    }

    #[test]
    fn test_district_aliases_and_case() {
        let rows = vec![
            row("10", "Chattogram", "Chattogram"),
            row("11", "Coxsbazar", "Coxsbazar"),
            row("12", "Dhaka", "Dhaka"),
        ];
        let items = features(json!([
            feature("", "Chittagong"),
            feature("", "Cox's Bazar"),
            feature("", "DHAKA"),
            feature("", "Atlantis")
        ]));

        let (updates, report) = match_features(&DISTRICTS, &rows, &items);

        let ids: Vec<&str> = updates.iter().map(|u| u.row_id.as_str()).collect();
        assert_eq!(ids, vec!["10", "11", "12"]);
        assert_eq!(report.unmatched, vec!["Atlantis".to_string()]);
    }

    #[test]
    fn test_duplicates_and_invalid_geometry_are_not_written() {
        let rows = vec![row("1", "BD-A", "Barishal"), row("2", "BD-B", "Chattogram")];
        let mut broken = feature("BD-B", "Chittagong Division");
        broken["geometry"] = json!({"type": "Point", "coordinates": [91.0, 22.0]});
        let items = features(json!([
            feature("BD-A", "Barisal Division"),
            feature("BD-A", "Barisal again"),
            broken
        ]));

        let (updates, report) = match_features(&DIVISIONS, &rows, &items);

        assert_eq!(updates.len(), 1);
        assert_eq!(report.duplicates, vec!["Barisal again".to_string()]);
        assert_eq!(report.invalid.len(), 1);
        assert_eq!(report.invalid[0].1, GeometryError::Unsupported);
    }

    #[test]
    fn test_canonical_name() {
        assert_eq!(DISTRICTS.canonical_name("Jessore"), "Jashore");
        assert_eq!(DISTRICTS.canonical_name("Khulna"), "Khulna");
        assert_eq!(DIVISIONS.canonical_name("Jessore"), "Jessore");
    }

    #[test]
    fn test_check_files_reports_missing() {
        let dir = tempfile::tempdir().unwrap();
        let err = check_files(dir.path()).unwrap_err();
        assert!(err.to_string().contains("Division GeoJSON not found"));
    }
}
