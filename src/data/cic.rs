//! CIC-IDS-2017 preset: the published capture surface, pinned as constants.
//!
//! The dataset ships as eight per-day CSVs produced by CICFlowMeter. The
//! exports carry well-known drift: whitespace-padded header cells, a UTF-8
//! BOM on the first column, one duplicated `Fwd Header Length` column, and
//! `Infinity`/`NaN` strings in the rate columns. The schema built here
//! absorbs all of it.

use std::path::Path;

use chrono::Weekday;

use crate::assemble::ScenarioPolicy;
use crate::domain::SourceFileDescriptor;
use crate::error::Error;
use crate::schema::{ColumnSpec, SchemaDefinition};

/// Canonical numeric feature names, in file order.
pub const FEATURE_NAMES: [&str; 77] = [
    "destination port",
    "flow duration",
    "total fwd packets",
    "total backward packets",
    "total length of fwd packets",
    "total length of bwd packets",
    "fwd packet length max",
    "fwd packet length min",
    "fwd packet length mean",
    "fwd packet length std",
    "bwd packet length max",
    "bwd packet length min",
    "bwd packet length mean",
    "bwd packet length std",
    "flow bytes/s",
    "flow packets/s",
    "flow iat mean",
    "flow iat std",
    "flow iat max",
    "flow iat min",
    "fwd iat total",
    "fwd iat mean",
    "fwd iat std",
    "fwd iat max",
    "fwd iat min",
    "bwd iat total",
    "bwd iat mean",
    "bwd iat std",
    "bwd iat max",
    "bwd iat min",
    "fwd psh flags",
    "bwd psh flags",
    "fwd urg flags",
    "bwd urg flags",
    "fwd header length",
    "bwd header length",
    "fwd packets/s",
    "bwd packets/s",
    "min packet length",
    "max packet length",
    "packet length mean",
    "packet length std",
    "packet length variance",
    "fin flag count",
    "syn flag count",
    "rst flag count",
    "psh flag count",
    "ack flag count",
    "urg flag count",
    "cwe flag count",
    "ece flag count",
    "down/up ratio",
    "average packet size",
    "avg fwd segment size",
    "avg bwd segment size",
    "fwd avg bytes/bulk",
    "fwd avg packets/bulk",
    "fwd avg bulk rate",
    "bwd avg bytes/bulk",
    "bwd avg packets/bulk",
    "bwd avg bulk rate",
    "subflow fwd packets",
    "subflow fwd bytes",
    "subflow bwd packets",
    "subflow bwd bytes",
    "init_win_bytes_forward",
    "init_win_bytes_backward",
    "act_data_pkt_fwd",
    "min_seg_size_forward",
    "active mean",
    "active std",
    "active max",
    "active min",
    "idle mean",
    "idle std",
    "idle max",
    "idle min",
];

/// Ground-truth label vocabulary across the five capture days.
pub const LABELS: [&str; 15] = [
    "BENIGN",
    "FTP-Patator",
    "SSH-Patator",
    "DoS Hulk",
    "DoS GoldenEye",
    "DoS slowloris",
    "DoS Slowhttptest",
    "Heartbleed",
    "Web Attack - Brute Force",
    "Web Attack - XSS",
    "Web Attack - Sql Injection",
    "Infiltration",
    "Bot",
    "PortScan",
    "DDoS",
];

pub const BENIGN: &str = "BENIGN";

/// The canonical schema for the published per-day CSVs.
///
/// The flow rate columns are nullable: the exports leave them empty (or set
/// to `Infinity`/`NaN`) for zero-duration flows.
pub fn schema() -> Result<SchemaDefinition, Error> {
    let mut columns: Vec<ColumnSpec> = FEATURE_NAMES
        .iter()
        .map(|&name| match name {
            "flow bytes/s" | "flow packets/s" => ColumnSpec::nullable_float(name),
            _ => ColumnSpec::float(name),
        })
        .collect();
    columns.push(ColumnSpec::label("label"));

    let mut schema = SchemaDefinition::new(columns, LABELS)?;
    // Pandas-style suffix given to the duplicated column by some re-exports;
    // the raw duplicate (same name twice) is handled by first-wins binding.
    schema.add_alias("fwd header length.1", "fwd header length")?;
    Ok(schema)
}

/// Scenario→label policy for the eight capture sessions.
pub fn scenario_policy() -> ScenarioPolicy {
    ScenarioPolicy::new(BENIGN)
        .allow("Benign", &[])
        .allow("Brute Force", &["FTP-Patator", "SSH-Patator"])
        .allow(
            "DoS",
            &[
                "DoS Hulk",
                "DoS GoldenEye",
                "DoS slowloris",
                "DoS Slowhttptest",
                "Heartbleed",
            ],
        )
        .allow(
            "Web Attacks",
            &[
                "Web Attack - Brute Force",
                "Web Attack - XSS",
                "Web Attack - Sql Injection",
            ],
        )
        .allow("Infiltration", &["Infiltration"])
        .allow("Botnet", &["Bot"])
        .allow("PortScan", &["PortScan"])
        .allow("DDoS", &["DDoS"])
}

/// The eight published per-day capture files under `data_dir`.
///
/// Expected-record brackets are coarse (±10% of the published counts): they
/// catch truncated downloads, not byte-exact dataset revisions.
pub fn descriptors(data_dir: &Path) -> Vec<SourceFileDescriptor> {
    let file = |name: &str, day: Weekday, scenario: &str, records: u64| {
        SourceFileDescriptor::new(data_dir.join(name), day, scenario)
            .with_expected_records(records - records / 10..=records + records / 10)
    };

    vec![
        file(
            "Monday-WorkingHours.pcap_ISCX.csv",
            Weekday::Mon,
            "Benign",
            529_918,
        ),
        file(
            "Tuesday-WorkingHours.pcap_ISCX.csv",
            Weekday::Tue,
            "Brute Force",
            445_909,
        ),
        file(
            "Wednesday-workingHours.pcap_ISCX.csv",
            Weekday::Wed,
            "DoS",
            692_703,
        ),
        file(
            "Thursday-WorkingHours-Morning-WebAttacks.pcap_ISCX.csv",
            Weekday::Thu,
            "Web Attacks",
            170_366,
        ),
        // The published file name carries the "Infilteration" misspelling.
        file(
            "Thursday-WorkingHours-Afternoon-Infilteration.pcap_ISCX.csv",
            Weekday::Thu,
            "Infiltration",
            288_602,
        ),
        file(
            "Friday-WorkingHours-Morning.pcap_ISCX.csv",
            Weekday::Fri,
            "Botnet",
            191_033,
        ),
        file(
            "Friday-WorkingHours-Afternoon-PortScan.pcap_ISCX.csv",
            Weekday::Fri,
            "PortScan",
            286_467,
        ),
        file(
            "Friday-WorkingHours-Afternoon-DDos.pcap_ISCX.csv",
            Weekday::Fri,
            "DDoS",
            225_745,
        ),
    ]
}
