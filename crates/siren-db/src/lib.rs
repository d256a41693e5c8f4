//! # siren-db
//!
//! Loudest-event queries against search coincidence databases.
//!
//! A search pipeline stores coincident triggers in a coincidence table
//! alongside experiment bookkeeping (`coinc_event`, `experiment_map`,
//! `experiment_summary`). The loudest surviving event per instrument
//! combination, measured by its combined false-alarm rate, bounds the
//! rate posterior. The caller owns the connection; the single query runs
//! synchronously with no state held between calls.

#![warn(missing_docs)]
#![warn(clippy::all)]

use rusqlite::Connection;
use siren_core::{Error, Result};
use std::collections::BTreeSet;

/// The loudest (minimum combined false-alarm-rate) event for one
/// instrument combination.
#[derive(Debug, Clone, PartialEq)]
pub struct LoudestEvent {
    /// Instruments participating in the coincidence.
    pub instruments: BTreeSet<String>,
    /// Minimum combined false-alarm rate within the combination.
    pub combined_far: f64,
}

/// Parse an instrument-set string (`"H1,L1"`, `"H1, L1, V1"`) into an
/// ordered set of interferometer names.
pub fn instrument_set(ifos: &str) -> BTreeSet<String> {
    ifos.split([',', ' ', '\t'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect()
}

fn valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn db_err(e: rusqlite::Error) -> Error {
    Error::Database(e.to_string())
}

/// Loudest event per instrument combination for one analysis category.
///
/// Aggregates the coincidence table against the experiment bookkeeping
/// tables, grouping by the `coinc_event.instruments` string and
/// filtering on the experiment-summary datatype (`"all_data"`,
/// `"exclude_play"`, ...). Combinations whose aggregate FAR is NULL are
/// skipped with a warning.
///
/// SQL identifiers cannot be bound, so `coinc_table` is validated as a
/// bare identifier before interpolation; the datatype is bound.
pub fn get_loudest_event(
    conn: &Connection,
    coinc_table: &str,
    datatype: &str,
) -> Result<Vec<LoudestEvent>> {
    if !valid_identifier(coinc_table) {
        return Err(Error::Validation(format!(
            "invalid coincidence table name: {:?}",
            coinc_table
        )));
    }

    let sql = format!(
        "SELECT coinc_event.instruments, MIN({t}.combined_far) \
         FROM {t} \
         JOIN coinc_event ON ({t}.coinc_event_id == coinc_event.coinc_event_id) \
         JOIN experiment_map ON (coinc_event.coinc_event_id == experiment_map.coinc_event_id) \
         JOIN experiment_summary ON (experiment_summary.experiment_summ_id == experiment_map.experiment_summ_id) \
         WHERE experiment_summary.datatype == ?1 \
         GROUP BY coinc_event.instruments",
        t = coinc_table
    );

    let mut stmt = conn.prepare(&sql).map_err(db_err)?;
    let rows = stmt
        .query_map([datatype], |row| {
            let ifos: Option<String> = row.get(0)?;
            let far: Option<f64> = row.get(1)?;
            Ok((ifos.unwrap_or_default(), far))
        })
        .map_err(db_err)?;

    let mut events = Vec::new();
    for row in rows {
        let (ifos, far) = row.map_err(db_err)?;
        match far {
            Some(combined_far) => {
                events.push(LoudestEvent { instruments: instrument_set(&ifos), combined_far })
            }
            None => log::warn!(
                "instrument combination {:?} has no combined FAR in {}; skipping",
                ifos,
                coinc_table
            ),
        }
    }
    Ok(events)
}
