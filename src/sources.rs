use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use async_trait::async_trait;
use geojson::{Feature, FeatureCollection, Geometry};
use polars::prelude::{CsvReadOptions, DataFrame, SerReader};
use shapefile::dbase::FieldValue;
use shapefile::{PolygonRing, Shape};

use crate::config::DataSettings;
use crate::getter::Getter;

/// Emissions CSV plus boundary file, each a local path or an http(s) URL.
///
/// Boundaries may be a shapefile (local only, it needs its `.dbf`/`.shx`
/// siblings), GeoJSON, or a zip archive holding either.
#[derive(Debug, Clone)]
pub struct DatasetFiles {
    pub emissions: String,
    pub boundaries: String,
    pub code_attribute: String,
    pub name_attribute: String,
}

impl From<&DataSettings> for DatasetFiles {
    fn from(settings: &DataSettings) -> Self {
        Self {
            emissions: settings.emissions.clone(),
            boundaries: settings.boundaries.clone(),
            code_attribute: settings.code_attribute.clone(),
            name_attribute: settings.name_attribute.clone(),
        }
    }
}

#[async_trait]
impl Getter for DatasetFiles {
    async fn emissions(&self) -> anyhow::Result<DataFrame> {
        let data = fetch(&self.emissions).await?;
        Ok(CsvReadOptions::default()
            .with_has_header(true)
            .into_reader_with_file_handle(Cursor::new(data))
            .finish()
            .with_context(|| format!("parsing {}", self.emissions))?)
    }

    async fn boundaries(&self) -> anyhow::Result<FeatureCollection> {
        let attributes = [self.code_attribute.clone(), self.name_attribute.clone()];
        match extension(&self.boundaries).as_str() {
            "shp" => {
                if is_remote(&self.boundaries) {
                    bail!("a remote shapefile needs its sidecar files; point at a .zip instead");
                }
                let path = PathBuf::from(&self.boundaries);
                tokio::task::spawn_blocking(move || read_shapefile(&path, &attributes)).await?
            }
            "zip" => {
                let data = fetch(&self.boundaries).await?;
                tokio::task::spawn_blocking(move || read_zip(data, &attributes)).await?
            }
            _ => {
                let data = fetch(&self.boundaries).await?;
                Ok(String::from_utf8(data)?.parse()?)
            }
        }
    }
}

fn is_remote(location: &str) -> bool {
    location.starts_with("http://") || location.starts_with("https://")
}

fn extension(location: &str) -> String {
    let path = location.split(['?', '#']).next().unwrap_or(location);
    Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default()
}

async fn fetch(location: &str) -> anyhow::Result<Vec<u8>> {
    if is_remote(location) {
        tracing::info!(url = location, "downloading");
        let response = reqwest::get(location).await?.error_for_status()?;
        Ok(response.bytes().await?.to_vec())
    } else {
        tokio::fs::read(location)
            .await
            .with_context(|| format!("reading {location}"))
    }
}

/// Unpacks the first shapefile (with siblings) or GeoJSON found in the archive.
fn read_zip(data: Vec<u8>, attributes: &[String]) -> anyhow::Result<FeatureCollection> {
    let mut zip = zip::ZipArchive::new(Cursor::new(data))?;
    let names: Vec<String> = zip.file_names().map(str::to_string).collect();

    if let Some(shp) = names.iter().find(|n| extension(n) == "shp") {
        let stem = shp.trim_end_matches(|c| c != '.');
        let dir = tempfile::tempdir()?;
        for name in names.iter().filter(|n| n.starts_with(stem)) {
            let mut file = zip.by_name(name)?;
            let file_name = Path::new(name)
                .file_name()
                .context("archive member without a file name")?;
            let mut out = std::fs::File::create(dir.path().join(file_name))?;
            std::io::copy(&mut file, &mut out)?;
        }
        let file_name = Path::new(shp)
            .file_name()
            .context("archive member without a file name")?;
        return read_shapefile(&dir.path().join(file_name), attributes);
    }

    if let Some(json) = names
        .iter()
        .find(|n| matches!(extension(n).as_str(), "geojson" | "json"))
    {
        let mut buffer = String::new();
        zip.by_name(json)?.read_to_string(&mut buffer)?;
        return Ok(buffer.parse()?);
    }

    bail!("archive holds neither a shapefile nor GeoJSON: {names:?}")
}

/// Reads polygon shapes and the requested attributes into GeoJSON features.
fn read_shapefile(path: &Path, attributes: &[String]) -> anyhow::Result<FeatureCollection> {
    let mut reader = shapefile::Reader::from_path(path)
        .with_context(|| format!("opening {}", path.display()))?;

    let mut features = Vec::new();
    for result in reader.iter_shapes_and_records() {
        let (shape, record) = result?;
        let polygon = match shape {
            Shape::Polygon(polygon) => polygon,
            Shape::NullShape => continue,
            other => bail!(
                "{} holds {:?} shapes, expected polygons",
                path.display(),
                other.shapetype()
            ),
        };

        let mut feature = Feature {
            bbox: None,
            geometry: Some(Geometry::new(geojson::Value::from(&to_multi_polygon(&polygon)))),
            id: None,
            properties: None,
            foreign_members: None,
        };
        for name in attributes {
            if let Some(value) = record.get(name).and_then(field_text) {
                feature.set_property(name.clone(), value);
            }
        }
        features.push(feature);
    }

    tracing::info!(path = %path.display(), features = features.len(), "read shapefile");
    Ok(features.into_iter().collect())
}

fn field_text(value: &FieldValue) -> Option<String> {
    match value {
        FieldValue::Character(Some(s)) => Some(s.trim().to_string()),
        FieldValue::Memo(s) => Some(s.trim().to_string()),
        _ => None,
    }
}

/// Outer rings open a new polygon, inner rings are holes of the last one.
fn to_multi_polygon(polygon: &shapefile::Polygon) -> geo::MultiPolygon<f64> {
    let mut polygons: Vec<geo::Polygon<f64>> = Vec::new();
    for ring in polygon.rings() {
        let line: geo::LineString<f64> = ring
            .points()
            .iter()
            .map(|p| geo::Coord { x: p.x, y: p.y })
            .collect();
        match ring {
            PolygonRing::Outer(_) => polygons.push(geo::Polygon::new(line, vec![])),
            PolygonRing::Inner(_) => match polygons.last_mut() {
                Some(last) => last.interiors_push(line),
                None => polygons.push(geo::Polygon::new(line, vec![])),
            },
        }
    }
    geo::MultiPolygon::new(polygons)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boundaries::CountryMaster;
    use std::io::Write;

    const GEOJSON: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "properties": { "ISO_A3": "FRA", "NAME": "France" },
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[0.0, 40.0], [5.0, 40.0], [5.0, 50.0], [0.0, 40.0]]]
                }
            }
        ]
    }"#;

    fn files(dir: &Path, boundaries: &str) -> DatasetFiles {
        DatasetFiles {
            emissions: dir.join("co2.csv").to_string_lossy().into_owned(),
            boundaries: dir.join(boundaries).to_string_lossy().into_owned(),
            code_attribute: "ISO_A3".to_string(),
            name_attribute: "NAME".to_string(),
        }
    }

    #[test]
    fn test_extension() {
        assert_eq!(extension("data/countries.SHP"), "shp");
        assert_eq!(extension("https://host/ne.zip?download=1"), "zip");
        assert_eq!(extension("countries"), "");
    }

    #[test]
    fn test_shapefile_rings() {
        use shapefile::Point;
        let outer = vec![
            Point::new(0.0, 0.0),
            Point::new(0.0, 10.0),
            Point::new(10.0, 10.0),
            Point::new(10.0, 0.0),
            Point::new(0.0, 0.0),
        ];
        let inner = vec![
            Point::new(2.0, 2.0),
            Point::new(4.0, 2.0),
            Point::new(4.0, 4.0),
            Point::new(2.0, 4.0),
            Point::new(2.0, 2.0),
        ];
        let polygon = shapefile::Polygon::with_rings(vec![
            PolygonRing::Outer(outer),
            PolygonRing::Inner(inner),
        ]);
        let multi = to_multi_polygon(&polygon);
        assert_eq!(multi.0.len(), 1);
        assert_eq!(multi.0[0].interiors().len(), 1);
    }

    #[tokio::test]
    async fn test_local_csv_and_geojson() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("co2.csv"),
            "Entity,Code,Year,co2\nFrance,FRA,1950,50\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("world.geojson"), GEOJSON).unwrap();

        let files = files(dir.path(), "world.geojson");
        let emissions = files.emissions().await.unwrap();
        assert_eq!(emissions.shape(), (1, 4));

        let boundaries = files.boundaries().await.unwrap();
        assert_eq!(boundaries.features.len(), 1);
    }

    #[tokio::test]
    async fn test_geojson_inside_zip() {
        let dir = tempfile::tempdir().unwrap();
        let archive = std::fs::File::create(dir.path().join("world.zip")).unwrap();
        let mut zip = zip::ZipWriter::new(archive);
        zip.start_file("ne/world.geojson", zip::write::SimpleFileOptions::default())
            .unwrap();
        zip.write_all(GEOJSON.as_bytes()).unwrap();
        zip.finish().unwrap();

        let boundaries = files(dir.path(), "world.zip").boundaries().await.unwrap();
        assert_eq!(boundaries.features.len(), 1);
    }

    const COUNTRIES: [(&str, &str, f64); 5] = [
        ("USA", "United States of America", -100.0),
        ("FRA", "France", 0.0),
        ("-99", "Somaliland", 45.0),
        ("-99", "Kosovo", 20.0),
        ("XXX", "Nowhere", 60.0),
    ];

    /// Writes `countries.shp` (with `.shx` and `.dbf`) into `dir`.
    fn write_shapefile(dir: &Path) -> PathBuf {
        use shapefile::dbase::{FieldName, FieldValue, Record, TableWriterBuilder};
        use shapefile::Point;

        let path = dir.join("countries.shp");
        let table = TableWriterBuilder::new()
            .add_character_field(FieldName::try_from("ISO_A3").unwrap(), 3)
            .add_character_field(FieldName::try_from("NAME").unwrap(), 40);
        let mut writer = shapefile::Writer::from_path(&path, table).unwrap();
        for (code, name, x) in COUNTRIES {
            let polygon = shapefile::Polygon::new(PolygonRing::Outer(vec![
                Point::new(x, 0.0),
                Point::new(x, 5.0),
                Point::new(x + 5.0, 5.0),
                Point::new(x + 5.0, 0.0),
                Point::new(x, 0.0),
            ]));
            let mut record = Record::default();
            record.insert(
                "ISO_A3".to_string(),
                FieldValue::Character(Some(code.to_string())),
            );
            record.insert(
                "NAME".to_string(),
                FieldValue::Character(Some(name.to_string())),
            );
            writer.write_shape_and_record(&polygon, &record).unwrap();
        }
        path
    }

    fn assert_master(boundaries: &FeatureCollection) {
        assert_eq!(boundaries.features.len(), COUNTRIES.len());
        let master = CountryMaster::from_features(boundaries, "ISO_A3", "NAME").unwrap();
        let rows: Vec<(&str, &str)> = master
            .countries()
            .iter()
            .map(|c| (c.code.as_str(), c.name.as_str()))
            .collect();
        assert_eq!(
            rows,
            vec![
                ("USA", "United States of America"),
                ("FRA", "France"),
                ("-99", "Somaliland"),
                ("XXX", "Nowhere"),
            ]
        );
        assert!(master.countries().iter().all(|c| c.geometry.0.len() == 1));
    }

    #[tokio::test]
    async fn test_local_shapefile() {
        let dir = tempfile::tempdir().unwrap();
        write_shapefile(dir.path());

        let boundaries = files(dir.path(), "countries.shp")
            .boundaries()
            .await
            .unwrap();
        assert_master(&boundaries);
    }

    #[tokio::test]
    async fn test_shapefile_inside_zip() {
        let dir = tempfile::tempdir().unwrap();
        let shp_dir = tempfile::tempdir().unwrap();
        let shp = write_shapefile(shp_dir.path());

        let archive = std::fs::File::create(dir.path().join("countries.zip")).unwrap();
        let mut zip = zip::ZipWriter::new(archive);
        for ext in ["shp", "shx", "dbf"] {
            let member = shp.with_extension(ext);
            zip.start_file(
                format!("ne/countries.{ext}"),
                zip::write::SimpleFileOptions::default(),
            )
            .unwrap();
            zip.write_all(&std::fs::read(member).unwrap()).unwrap();
        }
        zip.finish().unwrap();

        let boundaries = files(dir.path(), "countries.zip")
            .boundaries()
            .await
            .unwrap();
        assert_master(&boundaries);
    }

    #[tokio::test]
    async fn test_missing_file_names_location() {
        let dir = tempfile::tempdir().unwrap();
        let err = files(dir.path(), "world.geojson")
            .emissions()
            .await
            .unwrap_err();
        assert!(err.to_string().contains("co2.csv"));
    }
}
