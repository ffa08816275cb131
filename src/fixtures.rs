//! Shared GeoJSON builders for unit tests

use geojson::FeatureCollection;
use serde_json::{json, Value};

pub fn collection(features: Value) -> FeatureCollection {
    serde_json::from_value(json!({ "type": "FeatureCollection", "features": features }))
        .expect("valid feature collection")
}

pub fn point(props: Value) -> Value {
    json!({
        "type": "Feature",
        "geometry": { "type": "Point", "coordinates": [-105.0, 39.7] },
        "properties": props
    })
}

pub fn parcel(props: Value) -> Value {
    json!({
        "type": "Feature",
        "geometry": {
            "type": "Polygon",
            "coordinates": [[[-105.0, 39.7], [-105.0, 39.71], [-104.99, 39.71], [-105.0, 39.7]]]
        },
        "properties": props
    })
}

/// Parcel collection from a list of property blocks
pub fn parcels(blocks: Vec<Value>) -> FeatureCollection {
    collection(Value::Array(blocks.into_iter().map(parcel).collect()))
}
