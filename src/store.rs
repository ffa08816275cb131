//! Feature record store - property and address records keyed by account
//!
//! Built once at load time, read-only afterwards.

use geojson::{FeatureCollection, JsonObject, JsonValue};
use std::collections::HashMap;

use crate::tabular::{ParseReport, Row};

/// Account field aliases, in priority order
pub const ACCOUNT_FIELD_CANDIDATES: [&str; 5] =
    ["ACCOUNTNO", "ACCOUNTNUM", "ACCOUNT", "ACCTNO", "ACCT_NO"];

const ADDRESS_FIELDS: [&str; 4] = ["FULLADDR", "ADDRESS", "SITEADDR", "ADDR"];
const CITY_FIELDS: [&str; 2] = ["CITY", "POSTAL_CITY"];
const ZIP_FIELDS: [&str; 3] = ["ZIP", "ZIPCODE", "ZIP_CODE"];

/// Sentinel for absent categorical values
pub const UNKNOWN: &str = "Unknown";
/// Sentinel for absent free-text values
pub const NOT_AVAILABLE: &str = "N/A";

/// Coerce attribute text to a number
///
/// Trims whitespace and strips `$` and `,` before parsing. Missing,
/// non-numeric or non-finite input yields 0.
pub fn parse_value(raw: Option<&str>) -> f64 {
    let Some(raw) = raw else { return 0.0 };
    let cleaned: String = raw.trim().chars().filter(|c| *c != '$' && *c != ',').collect();
    match cleaned.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => v,
        _ => 0.0,
    }
}

/// Read a property as trimmed text; numbers use their plain decimal form
pub fn property_text(props: &JsonObject, key: &str) -> Option<String> {
    match props.get(key)? {
        JsonValue::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        JsonValue::Number(n) => Some(number_text(n)),
        _ => None,
    }
}

/// Whole floats (shapefile Real fields) print as integers: `123.0` -> `"123"`
fn number_text(n: &serde_json::Number) -> String {
    match n.as_f64() {
        Some(v) if n.is_f64() && v.is_finite() && v.fract() == 0.0 && v.abs() < i64::MAX as f64 => {
            (v as i64).to_string()
        }
        _ => n.to_string(),
    }
}

/// Read a numeric property, accepting numbers or numeric text
pub fn property_number(props: &JsonObject, key: &str) -> f64 {
    match props.get(key) {
        Some(JsonValue::Number(n)) => n.as_f64().filter(|v| v.is_finite()).unwrap_or(0.0),
        Some(JsonValue::String(s)) => parse_value(Some(s)),
        _ => 0.0,
    }
}

fn first_text(props: &JsonObject, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| property_text(props, k))
}

/// Detect which account alias a dataset uses
///
/// Only the first feature carrying a property block is inspected.
pub fn detect_account_field(collection: &FeatureCollection) -> Option<String> {
    let props = collection.features.iter().find_map(|f| f.properties.as_ref())?;
    let field = ACCOUNT_FIELD_CANDIDATES
        .iter()
        .find(|candidate| props.contains_key(**candidate))
        .map(|s| s.to_string());

    match &field {
        Some(f) => tracing::debug!("Account field detected: {}", f),
        None => tracing::warn!(
            "No account field among {:?} in {} features",
            ACCOUNT_FIELD_CANDIDATES,
            collection.features.len()
        ),
    }
    field
}

/// Detailed property attributes from the tabular source
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyRecord {
    pub account_id: String,
    pub quality: Option<String>,
    pub view: Option<String>,
    pub total_value: f64,
    pub situs: Option<String>,
    pub subdivision: Option<String>,
    pub year_built: Option<String>,
}

impl PropertyRecord {
    /// Build from a parsed row; empty cells become `None`
    pub fn from_row(account_id: String, row: &Row) -> Self {
        let cell = |name: &str| row.get(name).filter(|v| !v.is_empty()).cloned();
        Self {
            quality: cell("EXT CONDITION"),
            view: cell("ATTRIBUTESUBTYPE"),
            total_value: parse_value(row.get("SumOfACTUALVALUE").map(String::as_str)),
            situs: cell("SITUS"),
            subdivision: cell("SUBNAME"),
            year_built: cell("AYB"),
            account_id,
        }
    }
}

/// Address point enrichment, popup only
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct AddressRecord {
    pub account_id: String,
    pub address: Option<String>,
    pub city: Option<String>,
    pub zip: Option<String>,
}

/// Both keyed mappings
#[derive(Debug, Default)]
pub struct FeatureStore {
    pub properties: HashMap<String, PropertyRecord>,
    pub addresses: HashMap<String, AddressRecord>,
}

impl FeatureStore {
    /// Build from the parsed property table and the address point layer
    pub fn build(report: ParseReport, addresses: &FeatureCollection) -> Self {
        let properties: HashMap<String, PropertyRecord> = report
            .rows
            .into_iter()
            .map(|(account, row)| {
                let record = PropertyRecord::from_row(account.clone(), &row);
                (account, record)
            })
            .collect();

        let addresses = build_addresses(addresses);
        tracing::info!(
            "Store built: {} property records, {} address records",
            properties.len(),
            addresses.len()
        );

        Self { properties, addresses }
    }

    pub fn property(&self, account: &str) -> Option<&PropertyRecord> {
        self.properties.get(account)
    }

    pub fn address(&self, account: &str) -> Option<&AddressRecord> {
        self.addresses.get(account)
    }
}

fn build_addresses(collection: &FeatureCollection) -> HashMap<String, AddressRecord> {
    let Some(field) = detect_account_field(collection) else {
        return HashMap::new();
    };

    let mut addresses = HashMap::new();
    let mut dropped = 0usize;
    for props in collection.features.iter().filter_map(|f| f.properties.as_ref()) {
        let Some(account_id) = property_text(props, &field) else {
            dropped += 1;
            continue;
        };
        let record = AddressRecord {
            address: first_text(props, &ADDRESS_FIELDS),
            city: first_text(props, &CITY_FIELDS),
            zip: first_text(props, &ZIP_FIELDS),
            account_id: account_id.clone(),
        };
        addresses.insert(account_id, record);
    }
    if dropped > 0 {
        tracing::debug!("{} address points without an account", dropped);
    }

    addresses
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{collection, point};
    use crate::tabular;
    use serde_json::json;

    #[test]
    fn test_parse_value() {
        assert_eq!(parse_value(Some("350000")), 350000.0);
        assert_eq!(parse_value(Some(" $1,250,000.50 ")), 1250000.5);
        assert_eq!(parse_value(Some("abc")), 0.0);
        assert_eq!(parse_value(Some("")), 0.0);
        assert_eq!(parse_value(Some("NaN")), 0.0);
        assert_eq!(parse_value(None), 0.0);
    }

    #[test]
    fn test_property_text_number() {
        let props = json!({ "ACCOUNTNO": 123, "NAME": "  ", "F": 1.5 });
        let props = props.as_object().unwrap();
        assert_eq!(property_text(props, "ACCOUNTNO").as_deref(), Some("123"));
        assert_eq!(property_text(props, "NAME"), None);
        assert_eq!(property_text(props, "MISSING"), None);
        assert_eq!(property_number(props, "F"), 1.5);
    }

    #[test]
    fn test_property_text_whole_float() {
        let props = json!({ "ACCOUNTNO": 123.0, "TAXYEAR": 2023.0, "ACRES": 0.25, "NEG": -7.0 });
        let props = props.as_object().unwrap();
        assert_eq!(property_text(props, "ACCOUNTNO").as_deref(), Some("123"));
        assert_eq!(property_text(props, "TAXYEAR").as_deref(), Some("2023"));
        assert_eq!(property_text(props, "ACRES").as_deref(), Some("0.25"));
        assert_eq!(property_text(props, "NEG").as_deref(), Some("-7"));
    }

    #[test]
    fn test_detect_priority() {
        let fc = collection(json!([point(json!({ "ACCT_NO": "1", "ACCOUNT": "2" }))]));
        assert_eq!(detect_account_field(&fc).as_deref(), Some("ACCOUNT"));

        let fc = collection(json!([point(json!({ "OWNER": "x" }))]));
        assert_eq!(detect_account_field(&fc), None);

        assert_eq!(detect_account_field(&collection(json!([]))), None);
    }

    #[test]
    fn test_record_from_row_defaults() {
        let report = tabular::parse("ACCOUNTNO,EXT CONDITION,SumOfACTUALVALUE,SITUS\n1,,n/a,\n", ',');
        let record = PropertyRecord::from_row("1".into(), &report.rows["1"]);
        assert_eq!(record.quality, None);
        assert_eq!(record.total_value, 0.0);
        assert_eq!(record.situs, None);
        assert_eq!(record.year_built, None);
    }

    #[test]
    fn test_build_store() {
        let report = tabular::parse("ACCOUNTNO,EXT CONDITION\nR1,Good\n", ',');
        let addresses = collection(json!([
            point(json!({ "ACCOUNTNO": "R1", "FULLADDR": "1 MAIN ST", "ZIP": 80401 })),
            point(json!({ "ACCOUNTNO": "", "FULLADDR": "NOWHERE" })),
            point(json!({ "FULLADDR": "ALSO NOWHERE" })),
        ]));
        let store = FeatureStore::build(report, &addresses);

        assert_eq!(store.property("R1").unwrap().quality.as_deref(), Some("Good"));
        assert_eq!(store.addresses.len(), 1);
        let address = store.address("R1").unwrap();
        assert_eq!(address.address.as_deref(), Some("1 MAIN ST"));
        assert_eq!(address.zip.as_deref(), Some("80401"));
        assert_eq!(address.city, None);
    }
}
