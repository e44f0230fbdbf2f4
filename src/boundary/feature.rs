//! GeoJSON boundary features.
//!
//! Boundary files follow the geoBoundaries layout: a `FeatureCollection`
//! whose features carry `shapeISO` and `shapeName` properties and a
//! `Polygon` or `MultiPolygon` geometry in WGS 84 (SRID 4326).

use geo::{Area, Centroid, Coord, LineString, MultiPolygon, Point, Polygon};
use serde::Deserialize;
use serde_json::{json, Value};
use std::fs;
use std::path::Path;
use thiserror::Error;

use anyhow::Context;

/// Spatial reference of every stored shape
pub const SRID: i32 = 4326;

/// Geometry validation errors.
#[derive(Error, Debug, PartialEq)]
pub enum GeometryError {
    #[error("feature has no geometry")]
    Missing,

    #[error("unsupported geometry type (expected Polygon or MultiPolygon)")]
    Unsupported,

    #[error("polygon has no rings")]
    NoRings,

    #[error("ring has {0} positions, need at least 4")]
    ShortRing(usize),

    #[error("ring is not closed")]
    OpenRing,

    #[error("position has fewer than 2 coordinates")]
    ShortPosition,

    #[error("coordinate ({0}, {1}) is outside lon/lat bounds")]
    OutOfBounds(f64, f64),

    #[error("shape has zero area")]
    ZeroArea,
}

#[derive(Debug, Deserialize)]
pub struct FeatureCollection {
    pub features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
pub struct Feature {
    #[serde(default)]
    pub properties: BoundaryProperties,
    pub geometry: Option<RawGeometry>,
}

#[derive(Debug, Default, Deserialize)]
pub struct BoundaryProperties {
    #[serde(rename = "shapeISO")]
    pub shape_iso: Option<String>,
    #[serde(rename = "shapeName")]
    pub shape_name: Option<String>,
}

type Position = Vec<f64>;
type Ring = Vec<Position>;

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub enum RawGeometry {
    Polygon { coordinates: Vec<Ring> },
    MultiPolygon { coordinates: Vec<Vec<Ring>> },
    #[serde(other)]
    Other,
}

impl Feature {
    /// Display name, `?` when the file leaves it out
    pub fn name(&self) -> &str {
        self.properties.shape_name.as_deref().unwrap_or("?")
    }

    pub fn iso_code(&self) -> &str {
        self.properties.shape_iso.as_deref().unwrap_or("")
    }
}

/// A validated multi-polygon and its centroid
#[derive(Debug, Clone)]
pub struct Boundary {
    pub shape: MultiPolygon<f64>,
    pub centroid: Point<f64>,
}

impl Boundary {
    /// Validate a raw geometry, promoting a single polygon to a multi-polygon
    pub fn from_geometry(geometry: Option<&RawGeometry>) -> Result<Self, GeometryError> {
        let polygons = match geometry {
            None => return Err(GeometryError::Missing),
            Some(RawGeometry::Polygon { coordinates }) => vec![build_polygon(coordinates)?],
            Some(RawGeometry::MultiPolygon { coordinates }) => coordinates
                .iter()
                .map(|rings| build_polygon(rings))
                .collect::<Result<Vec<_>, _>>()?,
            Some(RawGeometry::Other) => return Err(GeometryError::Unsupported),
        };

        let shape = MultiPolygon::new(polygons);
        if shape.unsigned_area() == 0.0 {
            return Err(GeometryError::ZeroArea);
        }
        let centroid = shape.centroid().ok_or(GeometryError::ZeroArea)?;

        Ok(Self { shape, centroid })
    }

    /// GeoJSON `MultiPolygon` object for the shape
    pub fn to_geojson(&self) -> Value {
        let polygons: Vec<Value> = self
            .shape
            .iter()
            .map(|polygon| {
                let mut rings = vec![ring_coordinates(polygon.exterior())];
                rings.extend(polygon.interiors().iter().map(ring_coordinates));
                Value::Array(rings)
            })
            .collect();

        json!({ "type": "MultiPolygon", "coordinates": polygons })
    }

    /// Centroid as WKT, `POINT(lon lat)`
    pub fn centroid_wkt(&self) -> String {
        format!("POINT({} {})", self.centroid.x(), self.centroid.y())
    }
}

fn ring_coordinates(ring: &LineString<f64>) -> Value {
    Value::Array(ring.coords().map(|c| json!([c.x, c.y])).collect())
}

fn build_polygon(rings: &[Ring]) -> Result<Polygon<f64>, GeometryError> {
    let (exterior, interiors) = rings.split_first().ok_or(GeometryError::NoRings)?;
    let exterior = build_ring(exterior)?;
    let interiors = interiors
        .iter()
        .map(|ring| build_ring(ring))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Polygon::new(exterior, interiors))
}

fn build_ring(positions: &[Position]) -> Result<LineString<f64>, GeometryError> {
    if positions.len() < 4 {
        return Err(GeometryError::ShortRing(positions.len()));
    }

    let coords = positions
        .iter()
        .map(|p| {
            let [x, y] = p
                .get(..2)
                .and_then(|xy| <[f64; 2]>::try_from(xy).ok())
                .ok_or(GeometryError::ShortPosition)?;
            if !x.is_finite() || !y.is_finite() || x.abs() > 180.0 || y.abs() > 90.0 {
                return Err(GeometryError::OutOfBounds(x, y));
            }
            Ok(Coord { x, y })
        })
        .collect::<Result<Vec<_>, _>>()?;

    if coords.first() != coords.last() {
        return Err(GeometryError::OpenRing);
    }

    Ok(LineString::new(coords))
}

/// Read a boundary file
pub fn read_feature_collection(path: &Path) -> anyhow::Result<FeatureCollection> {
    let text = fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
    serde_json::from_str(&text).with_context(|| format!("Failed to parse GeoJSON {:?}", path))
}
