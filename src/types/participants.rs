//! F&O participant-wise open interest archive.
//!
//! The exchange publishes one CSV per trading day. It opens with an optional
//! quoted title line, then a header row, then one row per participant
//! category keyed by the `Client Type` column.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::error::{NseError, Result};
use crate::types::enums::ClientType;

const COL_CLIENT_TYPE: &str = "Client Type";

/// One participant category's open positions, in contracts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParticipantRecord {
    pub client_type: String,
    pub future_index_long: i64,
    pub future_index_short: i64,
    pub future_stock_long: i64,
    pub future_stock_short: i64,
    pub option_index_call_long: i64,
    pub option_index_put_long: i64,
    pub option_index_call_short: i64,
    pub option_index_put_short: i64,
    pub option_stock_call_long: i64,
    pub option_stock_put_long: i64,
    pub option_stock_call_short: i64,
    pub option_stock_put_short: i64,
    pub total_long_contracts: i64,
    pub total_short_contracts: i64,
}

impl ParticipantRecord {
    pub fn net_future_index_position(&self) -> i64 {
        self.future_index_long - self.future_index_short
    }

    pub fn net_option_index_call_position(&self) -> i64 {
        self.option_index_call_long - self.option_index_call_short
    }

    pub fn net_option_index_put_position(&self) -> i64 {
        self.option_index_put_long - self.option_index_put_short
    }

    /// Net index call position minus net index put position.
    pub fn net_option_index_open_interest(&self) -> i64 {
        self.net_option_index_call_position() - self.net_option_index_put_position()
    }
}

/// The record for `client_type`, if the archive has one.
pub fn find_client(
    records: &[ParticipantRecord],
    client_type: ClientType,
) -> Option<&ParticipantRecord> {
    records.iter().find(|r| client_type.matches(&r.client_type))
}

/// Date suffix of the archive file name (`DDMMYYYY`).
pub fn archive_date_suffix(date: NaiveDate) -> String {
    date.format("%d%m%Y").to_string()
}

/// Parse an archive CSV body.
///
/// Numeric cells that fail to parse are logged and read as zero; a missing
/// `Client Type` header is a [`NseError::MalformedPayload`].
pub fn parse_participant_csv(data: &[u8]) -> Result<Vec<ParticipantRecord>> {
    let body = skip_title_line(data);
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(body);

    let headers = reader.headers()?.clone();
    let columns: HashMap<&str, usize> = headers.iter().enumerate().map(|(i, h)| (h, i)).collect();
    let client_col = *columns
        .get(COL_CLIENT_TYPE)
        .ok_or_else(|| NseError::malformed(COL_CLIENT_TYPE, "header is missing"))?;

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row?;
        let client_type = row.get(client_col).unwrap_or_default();
        if client_type.is_empty() {
            continue;
        }
        let cell = |name: &str| -> i64 {
            let raw = columns.get(name).and_then(|&i| row.get(i)).unwrap_or_default();
            raw.parse().unwrap_or_else(|_| {
                tracing::warn!(client_type, column = name, raw, "unparsable archive cell; using 0");
                0
            })
        };
        records.push(ParticipantRecord {
            client_type: client_type.to_owned(),
            future_index_long: cell("Future Index Long"),
            future_index_short: cell("Future Index Short"),
            future_stock_long: cell("Future Stock Long"),
            future_stock_short: cell("Future Stock Short"),
            option_index_call_long: cell("Option Index Call Long"),
            option_index_put_long: cell("Option Index Put Long"),
            option_index_call_short: cell("Option Index Call Short"),
            option_index_put_short: cell("Option Index Put Short"),
            option_stock_call_long: cell("Option Stock Call Long"),
            option_stock_put_long: cell("Option Stock Put Long"),
            option_stock_call_short: cell("Option Stock Call Short"),
            option_stock_put_short: cell("Option Stock Put Short"),
            total_long_contracts: cell("Total Long Contracts"),
            total_short_contracts: cell("Total Short Contracts"),
        });
    }
    tracing::debug!(rows = records.len(), "parsed participant archive");
    Ok(records)
}

fn skip_title_line(data: &[u8]) -> &[u8] {
    if data.first() != Some(&b'"') {
        return data;
    }
    match data.iter().position(|&b| b == b'\n') {
        Some(end) => &data[end + 1..],
        None => &[],
    }
}
