//! Source loader - fetch the four datasets concurrently
//!
//! Each location is a local path or an http(s) URL; `.gz` locations are
//! gunzipped. A failed source degrades to an empty dataset. Only a load
//! where every source failed is an error.

use anyhow::{Context, Result};
use geojson::{FeatureCollection, GeoJson};
use std::io::Read;
use thiserror::Error;

use crate::config::{is_url, resolve_location, Config, Settings};
use crate::state::MapData;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("All sources failed to load: {}", .0.join("; "))]
    AllSourcesFailed(Vec<String>),
}

/// Read raw bytes from a path or URL
async fn fetch_bytes(location: &str) -> Result<Vec<u8>> {
    if is_url(location) {
        tracing::debug!("Fetching from: {}", location);

        let client = reqwest::Client::new();
        let response = client.get(location)
            .header("User-Agent", "ParcelMap/0.1")
            .send()
            .await?;

        if !response.status().is_success() {
            anyhow::bail!("{} returned status {}", location, response.status());
        }

        Ok(response.bytes().await?.to_vec())
    } else {
        tokio::fs::read(location)
            .await
            .with_context(|| format!("Failed to read {}", location))
    }
}

/// Fetch a source as text, gunzipping `.gz` locations
pub async fn fetch_text(location: &str) -> Result<String> {
    let bytes = fetch_bytes(location).await?;
    tracing::debug!("Read {} bytes from {}", bytes.len(), location);

    if location.ends_with(".gz") {
        let mut decoder = flate2::read::GzDecoder::new(bytes.as_slice());
        let mut text = String::new();
        decoder.read_to_string(&mut text)
            .with_context(|| format!("Failed to gunzip {}", location))?;
        Ok(text)
    } else {
        String::from_utf8(bytes).with_context(|| format!("{} is not valid UTF-8", location))
    }
}

/// Fetch a GeoJSON source; a lone feature becomes a one-feature collection
pub async fn fetch_collection(location: &str) -> Result<FeatureCollection> {
    let text = fetch_text(location).await?;
    let geojson: GeoJson = text.parse()
        .with_context(|| format!("Invalid GeoJSON in {}", location))?;

    match geojson {
        GeoJson::FeatureCollection(fc) => Ok(fc),
        GeoJson::Feature(feature) => Ok(FeatureCollection {
            bbox: None,
            features: vec![feature],
            foreign_members: None,
        }),
        GeoJson::Geometry(_) => anyhow::bail!("{} holds a bare geometry, not features", location),
    }
}

/// Fetch parcels from the primary location, then the legacy one
async fn fetch_parcels(primary: &str, legacy: Option<&str>) -> Result<FeatureCollection> {
    match fetch_collection(primary).await {
        Ok(fc) => Ok(fc),
        Err(e) => {
            let Some(legacy) = legacy else { return Err(e) };
            tracing::warn!("Primary parcels failed ({:#}), trying legacy {}", e, legacy);
            fetch_collection(legacy)
                .await
                .with_context(|| format!("Primary parcels also failed: {:#}", e))
        }
    }
}

/// Replace a failed source with its empty value, remembering the failure
fn degrade<T: Default>(name: &str, result: Result<T>, failures: &mut Vec<String>) -> T {
    match result {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!("Source '{}' unavailable, continuing without it: {:#}", name, e);
            failures.push(format!("{}: {:#}", name, e));
            T::default()
        }
    }
}

fn empty_collection() -> FeatureCollection {
    FeatureCollection { bbox: None, features: Vec::new(), foreign_members: None }
}

/// Load every source and build the map data
///
/// All four fetches run concurrently and are awaited together, so nothing is
/// styled against a partial store.
pub async fn load_all(config: &Config, settings: &Settings) -> Result<MapData, LoadError> {
    let sources = &config.sources;
    let at = |location: &str| resolve_location(&settings.data_dir, location);

    let properties = at(&sources.properties);
    let parcels = at(&sources.parcels);
    let legacy = sources.parcels_legacy.as_deref().map(at);
    let subdivisions = at(&sources.subdivisions);
    let addresses = at(&sources.addresses);
    tracing::info!("Loading sources: {}, {}, {}, {}", properties, parcels, subdivisions, addresses);

    let (properties, parcels, subdivisions, addresses) = tokio::join!(
        fetch_text(&properties),
        fetch_parcels(&parcels, legacy.as_deref()),
        fetch_collection(&subdivisions),
        fetch_collection(&addresses),
    );

    let mut failures = Vec::new();
    let properties = degrade("properties", properties, &mut failures);
    let parcels = degrade("parcels", parcels.map(Some), &mut failures).unwrap_or_else(empty_collection);
    let subdivisions = degrade("subdivisions", subdivisions.map(Some), &mut failures).unwrap_or_else(empty_collection);
    let addresses = degrade("addresses", addresses.map(Some), &mut failures).unwrap_or_else(empty_collection);

    if failures.len() == 4 {
        tracing::error!("Every source failed to load");
        return Err(LoadError::AllSourcesFailed(failures));
    }

    Ok(MapData::build(&properties, config.delimiter, parcels, subdivisions, addresses))
}
