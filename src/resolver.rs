//! Hybrid resolver - one normalized attribute view per parcel
//!
//! Prefers the detailed property record; falls back to the parcel's own
//! embedded fields when the account has no record; reports no-data when the
//! parcel carries no usable account.

use geojson::{Feature, JsonObject};
use serde::Serialize;

use crate::store::{
    property_number, property_text, FeatureStore, PropertyRecord, NOT_AVAILABLE, UNKNOWN,
};

/// Parcel fallback fields
const PARCEL_VALUE: &str = "TOTALACTUA";
const PARCEL_ADDRESS: &str = "PROPERTYLO";
const PARCEL_SUBDIVISION: &str = "SUBDIVISIO";
const PARCEL_YEAR: &str = "TAXYEAR";
const PARCEL_OWNER: &str = "OWNERNAME";
const PARCEL_NUMBER: &str = "ParcelNumb";

/// Which dataset a view was built from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    Property,
    Parcel,
    None,
}

impl DataSource {
    pub fn key(&self) -> &'static str {
        match self {
            DataSource::Property => "property",
            DataSource::Parcel => "parcel",
            DataSource::None => "none",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DataSource::Property => "Property records",
            DataSource::Parcel => "Parcel data",
            DataSource::None => "No data",
        }
    }
}

/// Normalized attributes consumed by the classifier and popup builder
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedAttributeView {
    pub source: DataSource,
    pub account_id: Option<String>,
    pub total_value: f64,
    pub quality_category: String,
    pub view_category: String,
    pub situs: String,
    pub subdivision: String,
    pub year_built: String,
    pub owner_name: Option<String>,
    pub parcel_number: Option<String>,
}

impl ResolvedAttributeView {
    /// The no-data view
    pub fn none() -> Self {
        Self {
            source: DataSource::None,
            account_id: None,
            total_value: 0.0,
            quality_category: UNKNOWN.to_string(),
            view_category: UNKNOWN.to_string(),
            situs: NOT_AVAILABLE.to_string(),
            subdivision: NOT_AVAILABLE.to_string(),
            year_built: NOT_AVAILABLE.to_string(),
            owner_name: None,
            parcel_number: None,
        }
    }

    fn from_property(record: &PropertyRecord, props: &JsonObject) -> Self {
        let or_na = |v: &Option<String>| v.clone().unwrap_or_else(|| NOT_AVAILABLE.to_string());
        Self {
            source: DataSource::Property,
            account_id: Some(record.account_id.clone()),
            total_value: record.total_value,
            quality_category: record.quality.clone().unwrap_or_else(|| UNKNOWN.to_string()),
            view_category: record.view.clone().unwrap_or_else(|| UNKNOWN.to_string()),
            situs: or_na(&record.situs),
            subdivision: or_na(&record.subdivision),
            year_built: or_na(&record.year_built),
            owner_name: property_text(props, PARCEL_OWNER),
            parcel_number: property_text(props, PARCEL_NUMBER),
        }
    }

    fn from_parcel(account_id: String, props: &JsonObject) -> Self {
        let text = |key: &str| property_text(props, key).unwrap_or_else(|| NOT_AVAILABLE.to_string());
        Self {
            source: DataSource::Parcel,
            account_id: Some(account_id),
            total_value: property_number(props, PARCEL_VALUE),
            // The parcel layer never carries these
            quality_category: UNKNOWN.to_string(),
            view_category: UNKNOWN.to_string(),
            situs: text(PARCEL_ADDRESS),
            subdivision: text(PARCEL_SUBDIVISION),
            year_built: text(PARCEL_YEAR),
            owner_name: property_text(props, PARCEL_OWNER),
            parcel_number: property_text(props, PARCEL_NUMBER),
        }
    }
}

/// Resolves parcels against the store
///
/// `account_field` is detected once per parcel dataset; `None` means no
/// parcel can be identified.
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'a> {
    store: &'a FeatureStore,
    account_field: Option<&'a str>,
}

impl<'a> Resolver<'a> {
    pub fn new(store: &'a FeatureStore, account_field: Option<&'a str>) -> Self {
        Self { store, account_field }
    }

    /// Account value of a parcel, if the dataset has an account field
    pub fn account_of(&self, feature: &Feature) -> Option<String> {
        let field = self.account_field?;
        property_text(feature.properties.as_ref()?, field)
    }

    /// Resolve one parcel. Pure: same inputs, same view.
    pub fn resolve(&self, feature: &Feature) -> ResolvedAttributeView {
        let Some(props) = feature.properties.as_ref() else {
            return ResolvedAttributeView::none();
        };
        let Some(account) = self.account_of(feature) else {
            return ResolvedAttributeView::none();
        };

        match self.store.property(&account) {
            Some(record) => ResolvedAttributeView::from_property(record, props),
            None => ResolvedAttributeView::from_parcel(account, props),
        }
    }
}
