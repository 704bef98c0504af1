//! Point-file readers and writers.
//!
//! Supported inputs are `.csv` (three numeric columns) and `.ply` (ASCII or
//! binary, parsed with ply-rs).

use crate::error::FitError;
use crate::geometry::PointSet;
use crate::Result;
use nalgebra::Point3;
use ply_rs::parser::Parser;
use ply_rs::ply::{
    Addable, DefaultElement, ElementDef, Encoding, Ply, Property, PropertyDef, PropertyType,
    ScalarType,
};
use ply_rs::writer::Writer;
use std::fs;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use tracing::{debug, warn};

/// Read a point set, dispatching on the file extension.
pub fn read_point_set<P: AsRef<Path>>(path: P) -> Result<PointSet> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(FitError::load(path, "file not found"));
    }

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    let points = match extension.as_str() {
        "csv" => read_csv(path)?,
        "ply" => read_ply(path)?,
        other => {
            return Err(FitError::load(
                path,
                format!("unsupported file extension '{}'; expected .csv or .ply", other),
            ))
        }
    };

    if points.is_empty() {
        return Err(FitError::load(path, "file contains no points"));
    }

    debug!(path = %path.display(), points = points.len(), "Point set loaded");
    Ok(points)
}

fn read_csv(path: &Path) -> Result<PointSet> {
    let content = fs::read_to_string(path).map_err(|e| FitError::load(path, e.to_string()))?;
    let mut points = Vec::new();
    let mut seen_data = false;

    for (line_no, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let fields: Vec<&str> = line
            .split(|c: char| c == ',' || c == ';' || c.is_whitespace())
            .filter(|s| !s.is_empty())
            .collect();
        let values: std::result::Result<Vec<f64>, _> =
            fields.iter().map(|f| f.parse::<f64>()).collect();

        match values {
            Ok(v) if v.len() == 3 => {
                points.push(Point3::new(v[0], v[1], v[2]));
                seen_data = true;
            }
            Ok(v) => {
                return Err(FitError::load(
                    path,
                    format!("line {}: expected 3 columns, found {}", line_no + 1, v.len()),
                ))
            }
            Err(_) if !seen_data && points.is_empty() => {
                debug!(line = line_no + 1, "Skipping CSV header");
                seen_data = true;
            }
            Err(e) => {
                return Err(FitError::load(path, format!("line {}: {}", line_no + 1, e)));
            }
        }
    }

    Ok(PointSet::new(points))
}

/// Smallest number of body bytes a single vertex can occupy.
fn min_vertex_bytes(encoding: &Encoding, element: &ElementDef) -> usize {
    element
        .properties
        .values()
        .map(|property| match (encoding, &property.data_type) {
            // One digit plus a separator.
            (Encoding::Ascii, _) => 2,
            (_, PropertyType::Scalar(scalar)) => scalar_size(scalar),
            (_, PropertyType::List(count, _)) => scalar_size(count),
        })
        .sum()
}

fn scalar_size(scalar: &ScalarType) -> usize {
    match scalar {
        ScalarType::Char | ScalarType::UChar => 1,
        ScalarType::Short | ScalarType::UShort => 2,
        ScalarType::Int | ScalarType::UInt | ScalarType::Float => 4,
        ScalarType::Double => 8,
    }
}

fn scalar_value(element: &DefaultElement, key: &str) -> Option<f64> {
    Some(match element.get(key)? {
        Property::Char(v) => f64::from(*v),
        Property::UChar(v) => f64::from(*v),
        Property::Short(v) => f64::from(*v),
        Property::UShort(v) => f64::from(*v),
        Property::Int(v) => f64::from(*v),
        Property::UInt(v) => f64::from(*v),
        Property::Float(v) => f64::from(*v),
        Property::Double(v) => *v,
        _ => return None,
    })
}

fn read_ply(path: &Path) -> Result<PointSet> {
    let file = fs::File::open(path).map_err(|e| FitError::load(path, e.to_string()))?;
    let file_len = file
        .metadata()
        .map_err(|e| FitError::load(path, e.to_string()))?
        .len();
    let mut reader = BufReader::new(file);

    let parser = Parser::<DefaultElement>::new();
    let header = parser
        .read_header(&mut reader)
        .map_err(|e| FitError::load(path, format!("failed to parse PLY header: {}", e)))?;

    let vertex = header
        .elements
        .get("vertex")
        .ok_or_else(|| FitError::load(path, "PLY has no vertex element"))?;
    for axis in ["x", "y", "z"] {
        match vertex.properties.get(axis).map(|p| &p.data_type) {
            Some(PropertyType::Scalar(_)) => {}
            _ => return Err(FitError::load(path, "vertex element lacks x, y and z properties")),
        }
    }

    // The declared count must fit in the file before any of it is read.
    let needed = vertex
        .count
        .checked_mul(min_vertex_bytes(&header.encoding, vertex).max(1))
        .and_then(|bytes| u64::try_from(bytes).ok());
    if needed.map_or(true, |bytes| bytes > file_len) {
        return Err(FitError::load(
            path,
            format!(
                "header declares {} vertices but the file holds only {} bytes",
                vertex.count, file_len
            ),
        ));
    }

    let payload = parser
        .read_payload(&mut reader, &header)
        .map_err(|e| FitError::load(path, format!("failed to read PLY payload: {}", e)))?;

    let elements = payload.get("vertex").map(Vec::as_slice).unwrap_or_default();
    let mut points = Vec::with_capacity(elements.len());
    for (i, element) in elements.iter().enumerate() {
        match (
            scalar_value(element, "x"),
            scalar_value(element, "y"),
            scalar_value(element, "z"),
        ) {
            (Some(x), Some(y), Some(z)) => points.push(Point3::new(x, y, z)),
            _ => return Err(FitError::load(path, format!("vertex {} has no scalar x, y and z", i))),
        }
    }

    Ok(PointSet::new(points))
}

/// Write an ASCII PLY file with double-precision coordinates.
pub fn write_ply<P: AsRef<Path>>(path: P, points: &PointSet) -> Result<()> {
    let path = path.as_ref();
    let mut ply = Ply::<DefaultElement>::new();
    ply.header.encoding = Encoding::Ascii;

    let mut vertex_def = ElementDef::new("vertex".to_string());
    for axis in ["x", "y", "z"] {
        vertex_def.properties.add(PropertyDef::new(
            axis.to_string(),
            PropertyType::Scalar(ScalarType::Double),
        ));
    }
    vertex_def.count = points.len();
    ply.header.elements.add(vertex_def);

    let vertices = points
        .iter()
        .map(|p| {
            let mut element = DefaultElement::new();
            element.insert("x".to_string(), Property::Double(p.x));
            element.insert("y".to_string(), Property::Double(p.y));
            element.insert("z".to_string(), Property::Double(p.z));
            element
        })
        .collect();
    ply.payload.insert("vertex".to_string(), vertices);

    let file = fs::File::create(path)?;
    let mut out = BufWriter::new(file);
    Writer::new()
        .write_ply(&mut out, &mut ply)
        .map_err(|e| FitError::load(path, format!("failed to write PLY: {}", e)))?;
    out.flush()?;
    Ok(())
}

/// Write one `x,y,z` row per point, without a header.
pub fn write_csv<P: AsRef<Path>>(path: P, points: &PointSet) -> Result<()> {
    let file = fs::File::create(path.as_ref())?;
    let mut out = BufWriter::new(file);
    for p in points.iter() {
        writeln!(out, "{},{},{}", p.x, p.y, p.z)?;
    }
    out.flush()?;
    Ok(())
}

/// Truncate both sets to the length of the shorter one.
pub fn align_cloud_sizes(source: &PointSet, target: &PointSet) -> (PointSet, PointSet) {
    let n = source.len().min(target.len());
    if source.len() != target.len() {
        warn!(
            source_points = source.len(),
            target_points = target.len(),
            kept = n,
            "Point set sizes differ; truncating both"
        );
    }
    (source.truncated(n), target.truncated(n))
}
