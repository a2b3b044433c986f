//! Broker account rows and the partial-update payload

use serde::{Deserialize, Serialize};

/// CSV header, in column order. Also the JSON field names.
pub const TABLE_COLUMNS: [&str; 7] = [
    "user",
    "broker",
    "API_key",
    "API_secret",
    "pnl",
    "margin",
    "max_risk",
];

/// One row of the table. `user` identifies the row but is not unique.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableRecord {
    pub user: String,
    pub broker: String,
    #[serde(rename = "API_key")]
    pub api_key: String,
    #[serde(rename = "API_secret")]
    pub api_secret: String,
    pub pnl: f64,
    pub margin: f64,
    pub max_risk: f64,
}

/// Update payload: `None` means the field was omitted and stays as it is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub broker: Option<String>,
    #[serde(default, rename = "API_key", skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(
        default,
        rename = "API_secret",
        skip_serializing_if = "Option::is_none"
    )]
    pub api_secret: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pnl: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub margin: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_risk: Option<f64>,
}

impl RecordPatch {
    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn apply(&self, record: &mut TableRecord) {
        if let Some(user) = &self.user {
            record.user.clone_from(user);
        }
        if let Some(broker) = &self.broker {
            record.broker.clone_from(broker);
        }
        if let Some(api_key) = &self.api_key {
            record.api_key.clone_from(api_key);
        }
        if let Some(api_secret) = &self.api_secret {
            record.api_secret.clone_from(api_secret);
        }
        if let Some(pnl) = self.pnl {
            record.pnl = pnl;
        }
        if let Some(margin) = self.margin {
            record.margin = margin;
        }
        if let Some(max_risk) = self.max_risk {
            record.max_risk = max_risk;
        }
    }
}

/// A full record as a patch overwrites every field.
impl From<TableRecord> for RecordPatch {
    fn from(record: TableRecord) -> Self {
        Self {
            user: Some(record.user),
            broker: Some(record.broker),
            api_key: Some(record.api_key),
            api_secret: Some(record.api_secret),
            pnl: Some(record.pnl),
            margin: Some(record.margin),
            max_risk: Some(record.max_risk),
        }
    }
}
