use std::collections::HashSet;

use anyhow::bail;
use geo::MultiPolygon;
use geojson::{Feature, FeatureCollection, Geometry};
use polars::prelude::*;

/// A country of the master table.
#[derive(Debug, Clone, PartialEq)]
pub struct Country {
    pub code: String,
    pub name: String,
    pub geometry: MultiPolygon<f64>,
}

/// One row per ISO3 code; the complete set of renderable countries.
///
/// Built once and never mutated. The GeoJSON keyed by code is derived at
/// construction so renders and the `/geojson` route share it.
#[derive(Debug, Clone)]
pub struct CountryMaster {
    countries: Vec<Country>,
    frame: DataFrame,
    geojson: FeatureCollection,
}

impl CountryMaster {
    /// De-duplicates on code, first occurrence wins.
    pub fn new(countries: impl IntoIterator<Item = Country>) -> anyhow::Result<Self> {
        let mut seen = HashSet::new();
        let mut kept = Vec::new();
        for mut country in countries {
            country.code = country.code.trim().to_uppercase();
            if seen.insert(country.code.clone()) {
                kept.push(country);
            } else {
                tracing::debug!(code = %country.code, "dropping duplicate boundary");
            }
        }

        let frame = df!(
            "code" => kept.iter().map(|c| c.code.as_str()).collect::<Vec<_>>(),
            "country" => kept.iter().map(|c| c.name.as_str()).collect::<Vec<_>>(),
        )?;
        let geojson = kept.iter().map(to_feature).collect::<FeatureCollection>();

        Ok(Self {
            countries: kept,
            frame,
            geojson,
        })
    }

    /// Reads countries out of boundary features. Features without a code are
    /// skipped; a missing name falls back to the code.
    pub fn from_features(
        collection: &FeatureCollection,
        code_attribute: &str,
        name_attribute: &str,
    ) -> anyhow::Result<Self> {
        let mut countries = Vec::with_capacity(collection.features.len());
        for (index, feature) in collection.features.iter().enumerate() {
            let Some(code) = string_property(feature, code_attribute) else {
                tracing::warn!(index, "boundary feature has no `{code_attribute}`, skipping");
                continue;
            };
            let Some(geometry) = feature.geometry.as_ref() else {
                tracing::warn!(index, %code, "boundary feature has no geometry, skipping");
                continue;
            };
            let name = string_property(feature, name_attribute).unwrap_or_else(|| code.clone());
            countries.push(Country {
                code,
                name,
                geometry: to_multi_polygon(geometry.value.clone())?,
            });
        }
        Self::new(countries)
    }

    pub fn countries(&self) -> &[Country] {
        &self.countries
    }

    /// Two columns: `code` and `country`, in master order.
    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    /// Master geometries as GeoJSON, each feature's id being its code.
    pub fn geojson(&self) -> &FeatureCollection {
        &self.geojson
    }

    pub fn len(&self) -> usize {
        self.countries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.countries.is_empty()
    }
}

fn string_property(feature: &Feature, name: &str) -> Option<String> {
    match feature.property(name)? {
        serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn to_feature(country: &Country) -> Feature {
    let mut feature = Feature {
        bbox: None,
        geometry: Some(Geometry::new(geojson::Value::from(&country.geometry))),
        id: Some(geojson::feature::Id::String(country.code.clone())),
        properties: None,
        foreign_members: None,
    };
    feature.set_property("code", country.code.clone());
    feature.set_property("country", country.name.clone());
    feature
}

pub(crate) fn to_multi_polygon(value: geojson::Value) -> anyhow::Result<MultiPolygon<f64>> {
    match value {
        geojson::Value::Polygon(_) => Ok(MultiPolygon::new(vec![value.try_into()?])),
        geojson::Value::MultiPolygon(_) => Ok(value.try_into()?),
        other => bail!("expected a polygon boundary, found {}", geometry_kind(&other)),
    }
}

fn geometry_kind(value: &geojson::Value) -> &'static str {
    match value {
        geojson::Value::Point(_) => "Point",
        geojson::Value::MultiPoint(_) => "MultiPoint",
        geojson::Value::LineString(_) => "LineString",
        geojson::Value::MultiLineString(_) => "MultiLineString",
        geojson::Value::Polygon(_) => "Polygon",
        geojson::Value::MultiPolygon(_) => "MultiPolygon",
        geojson::Value::GeometryCollection(_) => "GeometryCollection",
    }
}
