//! Fixed load sequence for the QoS POC fixture set

use super::types::*;

// =============================================================================
// Foundation: administrative regions and lookup tables
// =============================================================================

pub static GEO_DIVISIONS: LoadSpec =
    LoadSpec::new("01-foundation/F.01_geo_divisions.json", "geo_divisions", &[]);

pub static GEO_DISTRICTS: LoadSpec = LoadSpec::new(
    "01-foundation/F.02_geo_districts.json",
    "geo_districts",
    &["geo_divisions"],
);

pub static GEO_UPAZILAS: LoadSpec = LoadSpec::new(
    "01-foundation/F.03_geo_upazilas.json",
    "geo_upazilas",
    &["geo_districts"],
);

pub static GEO_UNIONS: LoadSpec = LoadSpec::new(
    "01-foundation/F.04_geo_unions.json",
    "geo_unions",
    &["geo_upazilas"],
);

pub static ISP_LICENSE_CATEGORIES: LoadSpec = LoadSpec::new(
    "01-foundation/F.05_isp_license_categories.json",
    "isp_license_categories",
    &[],
);

pub static POP_CATEGORIES: LoadSpec =
    LoadSpec::new("01-foundation/F.06_pop_categories.json", "pop_categories", &[]);

pub static UPSTREAM_TYPES: LoadSpec =
    LoadSpec::new("01-foundation/F.07_upstream_types.json", "upstream_types", &[]);

pub static PACKAGE_TYPES: LoadSpec =
    LoadSpec::new("01-foundation/F.08_package_types.json", "package_types", &[]);

pub static CONNECTION_TYPES: LoadSpec = LoadSpec::new(
    "01-foundation/F.09_connection_types.json",
    "connection_types",
    &[],
);

pub static QOS_PARAMETERS: LoadSpec =
    LoadSpec::new("01-foundation/F.10_qos_parameters.json", "qos_parameters", &[]);

// =============================================================================
// Master entities
// =============================================================================

pub static ISPS: LoadSpec = LoadSpec::new(
    "02-master/M.01_isps.json",
    "isps",
    &["isp_license_categories", "geo_divisions", "geo_districts"],
);

pub static POPS: LoadSpec = LoadSpec::new(
    "02-master/M.02_pops.json",
    "pops",
    &[
        "isps",
        "pop_categories",
        "upstream_types",
        "geo_divisions",
        "geo_districts",
        "geo_upazilas",
    ],
);

pub static SOFTWARE_AGENTS: LoadSpec =
    LoadSpec::new("02-master/M.03_agents.json", "software_agents", &["isps"]);

pub static PACKAGES: LoadSpec = LoadSpec::new(
    "02-master/M.04_packages.json",
    "packages",
    &["isps", "package_types", "connection_types"],
);

pub static QOS_TEST_TARGETS: LoadSpec =
    LoadSpec::new("02-master/M.05_qos_test_targets.json", "qos_test_targets", &[]);

pub static SLA_THRESHOLDS: LoadSpec = LoadSpec::new(
    "02-master/M.06_sla_thresholds.json",
    "sla_thresholds",
    &["qos_parameters", "isp_license_categories", "package_types"],
);

// =============================================================================
// Relationships
// =============================================================================

pub static AGENT_POP_ASSIGNMENTS: LoadSpec = LoadSpec::new(
    "03-relationships/R.01_agent_pop_assignments.json",
    "agent_pop_assignments",
    &["software_agents", "pops"],
);

pub static ISP_SUBSCRIBER_SNAPSHOTS: LoadSpec = LoadSpec::new(
    "03-relationships/R.02_subscriber_snapshots.json",
    "isp_subscriber_snapshots",
    &["isps", "packages", "geo_districts"],
);

// =============================================================================
// Time series
// =============================================================================

pub static TS_INTERFACE_METRICS: LoadSpec = LoadSpec::new(
    "04-timeseries/T.01_ts_interface_metrics.json",
    "ts_interface_metrics",
    &["pops", "isps"],
);

pub static TS_SUBSCRIBER_COUNTS: LoadSpec = LoadSpec::new(
    "04-timeseries/T.02_ts_subscriber_counts.json",
    "ts_subscriber_counts",
    &["isps", "pops", "packages"],
);

pub static TS_QOS_MEASUREMENTS: LoadSpec = LoadSpec::new(
    "04-timeseries/T.03_ts_qos_measurements.json",
    "ts_qos_measurements",
    &[
        "software_agents",
        "pops",
        "isps",
        "packages",
        "qos_test_targets",
        "qos_parameters",
    ],
);

// =============================================================================
// Compliance
// =============================================================================

pub static SLA_VIOLATIONS: LoadSpec = LoadSpec::new(
    "05-compliance/C.01_violations.json",
    "sla_violations",
    &["isps", "pops", "qos_parameters", "sla_thresholds"],
);

// =============================================================================
// Registry
// =============================================================================

/// All load steps in FK-safe order
pub static LOAD_SEQUENCE: &[&LoadSpec] = &[
    // Foundation
    &GEO_DIVISIONS,
    &GEO_DISTRICTS,
    &GEO_UPAZILAS,
    &GEO_UNIONS,
    &ISP_LICENSE_CATEGORIES,
    &POP_CATEGORIES,
    &UPSTREAM_TYPES,
    &PACKAGE_TYPES,
    &CONNECTION_TYPES,
    &QOS_PARAMETERS,
    // Master
    &ISPS,
    &POPS,
    &SOFTWARE_AGENTS,
    &PACKAGES,
    &QOS_TEST_TARGETS,
    &SLA_THRESHOLDS,
    // Relationships
    &AGENT_POP_ASSIGNMENTS,
    &ISP_SUBSCRIBER_SNAPSHOTS,
    // Time series
    &TS_INTERFACE_METRICS,
    &TS_SUBSCRIBER_COUNTS,
    &TS_QOS_MEASUREMENTS,
    // Compliance
    &SLA_VIOLATIONS,
];

/// Fixture field names that differ from the destination DDL
pub static COLUMN_MAPPINGS: &[ColumnMapping] = &[
    ColumnMapping::new("pop_categories", &[("tier", "tier_level")]),
    ColumnMapping::new("upstream_types", &[("priority", "display_order")]),
];

/// Get load step by table name
pub fn get_spec(table: &str) -> Option<&'static LoadSpec> {
    LOAD_SEQUENCE.iter().find(|s| s.table == table).copied()
}

/// Column mapping for a table, identity when none is registered
pub fn column_mapping(table: &str) -> &'static ColumnMapping {
    COLUMN_MAPPINGS
        .iter()
        .find(|m| m.table == table)
        .unwrap_or(&IDENTITY)
}

/// Get all table names in load order
pub fn table_names() -> Vec<&'static str> {
    LOAD_SEQUENCE.iter().map(|s| s.table).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_tables_are_unique() {
        let names = table_names();
        let mut deduped = names.clone();
        deduped.sort();
        deduped.dedup();
        assert_eq!(names.len(), deduped.len());
        assert_eq!(names.len(), 22);
    }

    #[test]
    fn test_column_mapping_lookup() {
        assert_eq!(column_mapping("pop_categories").destination("tier"), "tier_level");
        assert_eq!(column_mapping("pop_categories").destination("name"), "name");
        assert_eq!(column_mapping("isps").destination("tier"), "tier");
    }

    #[test]
    fn test_get_spec() {
        let spec = get_spec("geo_upazilas").unwrap();
        assert_eq!(spec.source_file, "01-foundation/F.03_geo_upazilas.json");
        assert!(get_spec("dashboards").is_none());
    }
}
