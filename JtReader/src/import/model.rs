//! Imported geometry, grouped by layer

use indexmap::IndexMap;
use serde::Serialize;

use crate::formats::jt::geometry::{PointBatch, Polyline, TriangleBatch};
use crate::formats::jt::header::JtVersion;

/// Axis-aligned bounds as `[min, max]`
pub type ExtremeValues = [[f64; 3]; 2];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExternalReference {
    /// File name as stored in the partition node
    pub file_name: String,
    pub resolved: bool,
}

#[derive(Debug, Clone, Default)]
pub struct JtModel {
    version: String,
    version_value: f64,
    comment: String,
    triangles: IndexMap<String, Vec<TriangleBatch>>,
    polylines: IndexMap<String, Vec<Polyline>>,
    points: IndexMap<String, Vec<PointBatch>>,
    layers: IndexMap<String, bool>,
    extreme_values: Option<ExtremeValues>,
    external_references: Vec<ExternalReference>,
}

impl JtModel {
    pub fn new(version: &JtVersion, comment: &str) -> Self {
        Self {
            version: version.as_str().to_string(),
            version_value: version.as_f64(),
            comment: comment.trim().to_string(),
            ..Self::default()
        }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn version_value(&self) -> f64 {
        self.version_value
    }

    pub fn comment(&self) -> &str {
        &self.comment
    }

    pub fn add_triangles(&mut self, batch: TriangleBatch, layer: &str) {
        self.extend_bounds(batch.vertices.chunks_exact(3).map(|v| [v[0], v[1], v[2]]));
        self.touch_layer(layer);
        self.triangles.entry(layer.to_string()).or_default().push(batch);
    }

    pub fn add_polyline(&mut self, polyline: Polyline, layer: &str) {
        self.extend_bounds(polyline.vertices.iter().copied());
        self.touch_layer(layer);
        self.polylines.entry(layer.to_string()).or_default().push(polyline);
    }

    pub fn add_points(&mut self, batch: PointBatch, layer: &str) {
        self.extend_bounds(batch.vertices.chunks_exact(3).map(|v| [v[0], v[1], v[2]]));
        self.touch_layer(layer);
        self.points.entry(layer.to_string()).or_default().push(batch);
    }

    pub fn add_external_reference(&mut self, file_name: impl Into<String>, resolved: bool) {
        self.external_references.push(ExternalReference {
            file_name: file_name.into(),
            resolved,
        });
    }

    pub fn triangles(&self) -> &IndexMap<String, Vec<TriangleBatch>> {
        &self.triangles
    }

    pub fn polylines(&self) -> &IndexMap<String, Vec<Polyline>> {
        &self.polylines
    }

    pub fn points(&self) -> &IndexMap<String, Vec<PointBatch>> {
        &self.points
    }

    /// Layer names with their visibility, in first-use order
    pub fn layers(&self) -> &IndexMap<String, bool> {
        &self.layers
    }

    /// Bounds over every vertex added so far, `None` for an empty model
    pub fn extreme_values(&self) -> Option<ExtremeValues> {
        self.extreme_values
    }

    pub fn external_references(&self) -> &[ExternalReference] {
        &self.external_references
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles
            .values()
            .flatten()
            .map(TriangleBatch::triangle_count)
            .sum()
    }

    pub fn vertex_count(&self) -> usize {
        self.triangles
            .values()
            .flatten()
            .map(TriangleBatch::vertex_count)
            .sum()
    }

    pub fn polyline_count(&self) -> usize {
        self.polylines.values().map(Vec::len).sum()
    }

    pub fn point_count(&self) -> usize {
        self.points.values().flatten().map(|p| p.vertices.len() / 3).sum()
    }

    /// Label/value pairs describing the file and its content
    pub fn model_information(&self) -> Vec<(String, String)> {
        let mut info = vec![
            ("JT version".to_string(), self.version.clone()),
            ("Comment".to_string(), self.comment.clone()),
            ("Layers".to_string(), self.layers.len().to_string()),
            ("Triangles".to_string(), self.triangle_count().to_string()),
            ("Polylines".to_string(), self.polyline_count().to_string()),
            ("Points".to_string(), self.point_count().to_string()),
        ];
        if !self.external_references.is_empty() {
            let resolved = self.external_references.iter().filter(|r| r.resolved).count();
            info.push((
                "External references".to_string(),
                format!("{resolved}/{}", self.external_references.len()),
            ));
        }
        info
    }

    pub fn summary(&self) -> ModelSummary {
        ModelSummary {
            version: self.version.clone(),
            comment: self.comment.clone(),
            layers: self.layers.keys().cloned().collect(),
            triangle_batches: self.triangles.values().map(Vec::len).sum(),
            triangles: self.triangle_count(),
            vertices: self.vertex_count(),
            polylines: self.polyline_count(),
            points: self.point_count(),
            extreme_values: self.extreme_values,
            external_references: self.external_references.clone(),
        }
    }

    fn touch_layer(&mut self, layer: &str) {
        if !self.layers.contains_key(layer) {
            self.layers.insert(layer.to_string(), true);
        }
    }

    fn extend_bounds(&mut self, vertices: impl Iterator<Item = [f64; 3]>) {
        for v in vertices {
            let bounds = self.extreme_values.get_or_insert([v, v]);
            for axis in 0..3 {
                bounds[0][axis] = bounds[0][axis].min(v[axis]);
                bounds[1][axis] = bounds[1][axis].max(v[axis]);
            }
        }
    }
}

/// Serializable overview of a [`JtModel`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelSummary {
    pub version: String,
    pub comment: String,
    pub layers: Vec<String>,
    pub triangle_batches: usize,
    pub triangles: usize,
    pub vertices: usize,
    pub polylines: usize,
    pub points: usize,
    pub extreme_values: Option<ExtremeValues>,
    pub external_references: Vec<ExternalReference>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> JtModel {
        JtModel::new(&JtVersion::parse("9.5").unwrap(), "  test comment ")
    }

    #[test]
    fn test_extreme_values_follow_every_add() {
        let mut model = model();
        assert_eq!(model.extreme_values(), None);

        model.add_triangles(
            TriangleBatch {
                vertices: vec![0.0, 0.0, 0.0, 1.0, 2.0, 0.0, 0.5, 1.0, 0.0],
                indices: vec![0, 1, 2],
                colors: vec![1.0, 1.0, 1.0],
                normals: Vec::new(),
            },
            "0",
        );
        assert_eq!(model.extreme_values(), Some([[0.0, 0.0, 0.0], [1.0, 2.0, 0.0]]));

        model.add_polyline(
            Polyline {
                vertices: vec![[-1.0, 0.0, 3.0], [0.0, 0.0, 0.0]],
                colors: vec![[1.0, 1.0, 1.0]; 2],
            },
            "wire",
        );
        assert_eq!(model.extreme_values(), Some([[-1.0, 0.0, 0.0], [1.0, 2.0, 3.0]]));
        assert_eq!(model.layers().keys().collect::<Vec<_>>(), vec!["0", "wire"]);
        assert!(model.layers()["wire"]);
    }

    #[test]
    fn test_model_information() {
        let mut model = model();
        model.add_external_reference("bolt.jt", true);
        model.add_external_reference("nut.jt", false);
        let info = model.model_information();
        assert_eq!(info[0], ("JT version".to_string(), "9.5".to_string()));
        assert_eq!(info[1].1, "test comment");
        assert_eq!(info.last().unwrap().1, "1/2");

        let summary = model.summary();
        assert_eq!(summary.external_references.len(), 2);
        assert_eq!(summary.triangles, 0);
    }
}
