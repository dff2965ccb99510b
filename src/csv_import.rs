//! Interval data export ("HDF") import
//!
//! The portal offers a CSV download of smart-meter reads:
//!
//! ```text
//! MPRN,Meter Serial Number,Read Value,Read Type,Read Date and End Time
//! 10000000000,000000000000,0.412000,Active Import Interval (kW),01-12-2025 00:30
//! ```
//!
//! Only import rows are kept. `(kW)` reads are half-hour average demand and
//! are converted to kWh; `(kWh)` reads are taken as-is.

use crate::error::Result;
use crate::logging::StructuredLogger;
use crate::usage::Datapoint;
use chrono::{LocalResult, NaiveDateTime, TimeZone};
use chrono_tz::Tz;
use csv::{ReaderBuilder, Trim};
use serde::Deserialize;
use std::collections::HashSet;
use std::io::Read;
use std::path::Path;

const READ_TIME_FORMAT: &str = "%d-%m-%Y %H:%M";
const HALF_HOUR_IN_HOURS: f64 = 0.5;

#[derive(Debug, Deserialize)]
struct HdfRecord {
    #[serde(rename = "MPRN")]
    mprn: String,
    #[serde(rename = "Read Value")]
    read_value: String,
    #[serde(rename = "Read Type")]
    read_type: String,
    #[serde(rename = "Read Date and End Time")]
    read_end: String,
}

/// kWh for an import read, or `None` for export and unknown read types
fn energy_kwh(read_type: &str, value: f64) -> Option<f64> {
    if !read_type.contains("Import") {
        return None;
    }
    if read_type.contains("(kWh)") {
        Some(value)
    } else if read_type.contains("(kW)") {
        Some(value * HALF_HOUR_IN_HOURS)
    } else {
        None
    }
}

/// Parse an HDF export; read times are local wall-clock times in `tz`
pub fn parse_hdf<R: Read>(
    reader: R,
    tz: Tz,
    logger: &StructuredLogger,
) -> Result<Vec<Datapoint>> {
    let mut rdr = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .from_reader(reader);

    let mut points = Vec::new();
    // Earlier instants of fall-back wall times already taken by a row
    let mut repeated_hour: HashSet<i64> = HashSet::new();
    for (line, record) in rdr.deserialize::<HdfRecord>().enumerate() {
        let record = match record {
            Ok(r) => r,
            Err(e) => {
                logger.warn(&format!("Skipping malformed row {}: {}", line + 2, e));
                continue;
            }
        };

        let Ok(value) = record.read_value.parse::<f64>() else {
            logger.warn(&format!(
                "Skipping row {} for MPRN {}: bad value {}",
                line + 2,
                record.mprn,
                record.read_value
            ));
            continue;
        };
        let Some(kwh) = energy_kwh(&record.read_type, value) else {
            continue;
        };

        let Ok(naive) = NaiveDateTime::parse_from_str(&record.read_end, READ_TIME_FORMAT) else {
            logger.warn(&format!(
                "Skipping row {}: bad read time {}",
                line + 2,
                record.read_end
            ));
            continue;
        };
        let local = match tz.from_local_datetime(&naive) {
            LocalResult::Single(dt) => dt,
            // The clock goes back: first read is the earlier instant, a
            // second read of the same wall time is the later one
            LocalResult::Ambiguous(earlier, later) => {
                if repeated_hour.insert(earlier.timestamp()) {
                    earlier
                } else {
                    later
                }
            }
            LocalResult::None => {
                logger.warn(&format!(
                    "Skipping row {}: {} does not exist in {}",
                    line + 2,
                    record.read_end,
                    tz
                ));
                continue;
            }
        };

        points.push(Datapoint {
            consumption: Some(kwh),
            cost: None,
            interval_end: local.timestamp(),
        });
    }

    points.sort_by_key(|p| p.interval_end);
    Ok(points)
}

/// Parse an HDF export file
pub fn import_file<P: AsRef<Path>>(
    path: P,
    tz: Tz,
    logger: &StructuredLogger,
) -> Result<Vec<Datapoint>> {
    let file = std::fs::File::open(path)?;
    parse_hdf(file, tz, logger)
}
