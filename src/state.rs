//! Application State - one map instance
//!
//! Loaded data is immutable behind an `Arc`; the only mutable piece is the
//! classifier's active mode.

use geojson::FeatureCollection;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::classify::{Classifier, LegendEntry, Mode, Style};
use crate::popup::{self, Popup};
use crate::resolver::{ResolvedAttributeView, Resolver};
use crate::store::{detect_account_field, FeatureStore};
use crate::tabular::{self, RowMismatch};

/// Everything loaded at startup
#[derive(Debug)]
pub struct MapData {
    pub store: FeatureStore,
    pub parcels: FeatureCollection,
    /// Account alias used by the parcel layer, detected once
    pub parcel_account_field: Option<String>,
    pub subdivisions: FeatureCollection,
    pub addresses: FeatureCollection,
    pub skipped_rows: Vec<RowMismatch>,
}

/// Style of one parcel, index-aligned with the parcel layer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureStyle {
    pub index: usize,
    pub label: String,
    pub style: Style,
}

/// Payload sent to the render surface after a selection change
#[derive(Debug, Clone, Serialize)]
pub struct Redraw {
    pub mode: Option<Mode>,
    pub styles: Vec<FeatureStyle>,
    pub legend: Vec<LegendEntry>,
}

/// Coverage statistics
#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub property_records: usize,
    pub address_records: usize,
    pub skipped_rows: usize,
    pub parcels: usize,
    pub account_field: Option<String>,
    pub by_source: BTreeMap<String, usize>,
    pub mode: Option<Mode>,
    pub categories: BTreeMap<String, usize>,
    pub hidden: usize,
}

impl MapData {
    /// Parse the property table and join it with the geographic layers
    pub fn build(
        properties_text: &str,
        delimiter: char,
        parcels: FeatureCollection,
        subdivisions: FeatureCollection,
        addresses: FeatureCollection,
    ) -> Self {
        let mut report = tabular::parse(properties_text, delimiter);
        let skipped_rows = std::mem::take(&mut report.skipped);
        let store = FeatureStore::build(report, &addresses);
        let parcel_account_field = detect_account_field(&parcels);

        if parcel_account_field.is_none() && !parcels.features.is_empty() {
            tracing::warn!("Parcel layer has no account field, nothing will be colored");
        }
        tracing::info!(
            "Map data ready: {} parcels, {} subdivisions, {} address points",
            parcels.features.len(),
            subdivisions.features.len(),
            addresses.features.len()
        );

        Self {
            store,
            parcels,
            parcel_account_field,
            subdivisions,
            addresses,
            skipped_rows,
        }
    }

    pub fn resolver(&self) -> Resolver<'_> {
        Resolver::new(&self.store, self.parcel_account_field.as_deref())
    }

    /// Resolved view of one parcel
    pub fn view(&self, index: usize) -> Option<ResolvedAttributeView> {
        let feature = self.parcels.features.get(index)?;
        Some(self.resolver().resolve(feature))
    }

    /// Click popup of one parcel, with address enrichment when available
    pub fn popup(&self, index: usize) -> Option<Popup> {
        let view = self.view(index)?;
        let address = view.account_id.as_deref().and_then(|a| self.store.address(a));
        Some(popup::build(&view, address))
    }

    /// Styles for every parcel under the classifier's active mode
    pub fn styles(&self, classifier: &Classifier) -> Vec<FeatureStyle> {
        let resolver = self.resolver();
        self.parcels
            .features
            .iter()
            .enumerate()
            .map(|(index, feature)| {
                let view = resolver.resolve(feature);
                FeatureStyle {
                    index,
                    label: popup::hover_label(&view),
                    style: classifier.style(&view),
                }
            })
            .collect()
    }

    pub fn redraw(&self, classifier: &Classifier) -> Redraw {
        Redraw {
            mode: classifier.active(),
            styles: self.styles(classifier),
            legend: classifier.legend(),
        }
    }

    pub fn summary(&self, classifier: &Classifier) -> Summary {
        let resolver = self.resolver();
        let mut by_source = BTreeMap::new();
        let mut categories = BTreeMap::new();
        let mut hidden = 0;

        for feature in &self.parcels.features {
            let view = resolver.resolve(feature);
            *by_source.entry(view.source.key().to_string()).or_insert(0) += 1;
            match classifier.categorize(&view) {
                Some((category, _)) => *categories.entry(category).or_insert(0) += 1,
                None => hidden += 1,
            }
        }

        Summary {
            property_records: self.store.properties.len(),
            address_records: self.store.addresses.len(),
            skipped_rows: self.skipped_rows.len(),
            parcels: self.parcels.features.len(),
            account_field: self.parcel_account_field.clone(),
            by_source,
            mode: classifier.active(),
            categories,
            hidden,
        }
    }
}

/// Application state shared across all requests
#[derive(Clone)]
pub struct AppState {
    pub data: Arc<MapData>,
    pub classifier: Arc<RwLock<Classifier>>,
}

impl AppState {
    pub fn new(data: MapData, classifier: Classifier) -> Self {
        Self {
            data: Arc::new(data),
            classifier: Arc::new(RwLock::new(classifier)),
        }
    }

    /// Change the active mode and recompute every parcel style
    pub async fn set_mode(&self, id: &str) -> Redraw {
        let mut classifier = self.classifier.write().await;
        classifier.set_mode(id);
        let redraw = self.data.redraw(&classifier);
        let visible = redraw.styles.iter().filter(|s| !s.style.is_hidden()).count();
        tracing::debug!(
            "Redraw for mode {:?}: {} of {} parcels rendered",
            redraw.mode,
            visible,
            redraw.styles.len()
        );
        redraw
    }

    pub async fn active_mode(&self) -> Option<Mode> {
        self.classifier.read().await.active()
    }

    pub async fn styles(&self) -> Vec<FeatureStyle> {
        let classifier = self.classifier.read().await;
        self.data.styles(&classifier)
    }

    pub async fn legend(&self) -> Vec<LegendEntry> {
        self.classifier.read().await.legend()
    }

    pub async fn summary(&self) -> Summary {
        let classifier = self.classifier.read().await;
        self.data.summary(&classifier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::ColorSchemes;
    use crate::fixtures::{collection, parcels, point};
    use crate::resolver::DataSource;
    use serde_json::json;

    const CSV: &str = "ACCOUNTNO,EXT CONDITION,ATTRIBUTESUBTYPE,SumOfACTUALVALUE,SITUS,SUBNAME,AYB\n\
                       123,Good,TYPICAL OR AVERAGE,350000,1 MAIN ST,ELK RIDGE,1998\n\
                       124,Fair,GOOD,\"1,000\",\"2 MAIN ST, UNIT B\",ELK RIDGE,2001\n";

    fn data(csv: &str) -> MapData {
        let parcel_layer = parcels(vec![
            json!({ "ACCOUNTNO": "123", "TOTALACTUA": 10 }),
            json!({ "ACCOUNTNO": "999", "TOTALACTUA": 850000, "EXT CONDITION": "Good" }),
            json!({ "ACCOUNTNO": null }),
        ]);
        let addresses = collection(json!([
            point(json!({ "ACCOUNTNO": "123", "FULLADDR": "1 MAIN ST", "CITY": "GOLDEN" })),
        ]));
        MapData::build(csv, ',', parcel_layer, collection(json!([])), addresses)
    }

    fn classifier(mode: Mode) -> Classifier {
        Classifier::new(ColorSchemes::default(), mode)
    }

    #[test]
    fn test_scenario_quality_from_property() {
        let data = data(CSV);
        let styles = data.styles(&classifier(Mode::Quality));
        let good = ColorSchemes::default().color_for(Mode::Quality, "Good").unwrap().to_string();

        assert_eq!(styles[0].style.fill_color, good);
        assert_eq!(styles[0].style.fill_opacity, 0.8);
        assert_eq!(styles[0].label, "123");
        // Parcel-sourced is never colored under a categorical mode
        assert!(styles[1].style.is_hidden());
        assert!(styles[2].style.is_hidden());
    }

    #[test]
    fn test_scenario_value_modes() {
        let data = data(CSV);
        let colors = ColorSchemes::default().value;
        for mode in [Mode::Value, Mode::ParcelValue] {
            let styles = data.styles(&classifier(mode));
            // Property value wins over the parcel's own TOTALACTUA
            assert_eq!(styles[0].style.fill_color, colors.medium);
            assert_eq!(styles[1].style.fill_color, colors.very_high);
            assert_eq!(data.view(1).unwrap().source, DataSource::Parcel);
        }
    }

    #[test]
    fn test_scenario_no_identifier_field() {
        let layer = parcels(vec![json!({ "OWNERNAME": "DOE", "TOTALACTUA": 500000 })]);
        let data = MapData::build(CSV, ',', layer, collection(json!([])), collection(json!([])));
        assert_eq!(data.parcel_account_field, None);

        for mode in Mode::ALL {
            let styles = data.styles(&classifier(mode));
            assert!(styles[0].style.is_hidden());
            assert_eq!(styles[0].style.stroke_weight, 0.0);
            assert_eq!(styles[0].label, "No account");
        }
    }

    #[test]
    fn test_scenario_malformed_row() {
        let csv = format!("{}125,Good,GOOD,1,3 MAIN ST,X,1990,extra\n", CSV);
        let data = data(&csv);
        assert_eq!(data.store.properties.len(), 2);
        assert_eq!(data.skipped_rows.len(), 1);
        assert_eq!(data.skipped_rows[0].line, 4);
        assert_eq!(data.store.property("124").unwrap().total_value, 1000.0);
        assert_eq!(data.store.property("124").unwrap().situs.as_deref(), Some("2 MAIN ST, UNIT B"));
    }

    #[test]
    fn test_byte_order_mark_table_joins() {
        let csv = "\u{feff}ACCOUNTNO,EXT CONDITION,SumOfACTUALVALUE\n123,Good,350000\n";
        let data = data(csv);
        assert_eq!(data.store.properties.len(), 1);
        assert_eq!(data.view(0).unwrap().source, DataSource::Property);
        assert!(!data.styles(&classifier(Mode::Quality))[0].style.is_hidden());
    }

    #[test]
    fn test_popup_enriched() {
        let data = data(CSV);
        let popup = data.popup(0).unwrap();
        assert_eq!(popup.title, "1 MAIN ST");
        assert!(popup.lines.iter().any(|l| l.label == "City" && l.value == "GOLDEN"));
        assert!(data.popup(3).is_none());
    }

    #[test]
    fn test_summary() {
        let data = data(CSV);
        let summary = data.summary(&classifier(Mode::Value));
        assert_eq!(summary.parcels, 3);
        assert_eq!(summary.by_source["property"], 1);
        assert_eq!(summary.by_source["parcel"], 1);
        assert_eq!(summary.by_source["none"], 1);
        assert_eq!(summary.categories["Medium"], 1);
        assert_eq!(summary.categories["Very High"], 1);
        assert_eq!(summary.hidden, 1);
    }

    #[tokio::test]
    async fn test_set_mode_redraw() {
        let state = AppState::new(data(CSV), classifier(Mode::Quality));

        let redraw = state.set_mode("value").await;
        assert_eq!(redraw.mode, Some(Mode::Value));
        assert_eq!(redraw.styles.len(), 3);
        assert_eq!(redraw.legend.len(), 4);
        assert!(!redraw.styles[1].style.is_hidden());

        let redraw = state.set_mode("nonsense").await;
        assert_eq!(redraw.mode, None);
        assert!(redraw.legend.is_empty());
        assert!(redraw.styles.iter().all(|s| s.style.is_hidden()));
        assert_eq!(state.active_mode().await, None);
    }
}
