use async_trait::async_trait;
use geojson::FeatureCollection;
use polars::prelude::*;

/// Gets the emissions and boundary datasets from wherever they live.
#[async_trait]
pub trait Getter: Send + Sync {
    /// Gets the raw emissions table, columns as in the source file.
    async fn emissions(&self) -> anyhow::Result<DataFrame>;
    /// Gets the boundary features with their source attributes.
    async fn boundaries(&self) -> anyhow::Result<FeatureCollection>;
}

/// Flattens feature properties into string columns, one row per feature.
pub fn attributes_dataframe(collection: &FeatureCollection) -> anyhow::Result<DataFrame> {
    let mut names: Vec<String> = Vec::new();
    for feature in &collection.features {
        for key in feature.properties.iter().flat_map(|p| p.keys()) {
            if !names.contains(key) {
                names.push(key.clone());
            }
        }
    }

    let columns = names
        .iter()
        .map(|name| {
            let values: Vec<Option<String>> = collection
                .features
                .iter()
                .map(|feature| match feature.property(name) {
                    None | Some(serde_json::Value::Null) => None,
                    Some(serde_json::Value::String(s)) => Some(s.clone()),
                    Some(other) => Some(other.to_string()),
                })
                .collect();
            Column::new(name.as_str().into(), values)
        })
        .collect::<Vec<_>>();

    Ok(DataFrame::new(columns)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geojson::Feature;

    #[test]
    fn test_attributes_dataframe() {
        let feature = |props: serde_json::Value| Feature {
            bbox: None,
            geometry: None,
            id: None,
            properties: props.as_object().cloned(),
            foreign_members: None,
        };
        let collection = FeatureCollection {
            bbox: None,
            features: vec![
                feature(serde_json::json!({ "ISO_A3": "FRA", "NAME": "France", "POP_RANK": 16 })),
                feature(serde_json::json!({ "ISO_A3": "-99", "NAME": "N. Cyprus" })),
            ],
            foreign_members: None,
        };

        let df = attributes_dataframe(&collection).unwrap();
        assert_eq!(df.shape(), (2, 3));
        let rank = df.column("POP_RANK").unwrap().str().unwrap();
        assert_eq!(rank.get(0), Some("16"));
        assert_eq!(rank.get(1), None);
    }
}
