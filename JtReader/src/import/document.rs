//! Result of one JT import

use serde::Serialize;

use crate::formats::jt::context::{LoadInformation, Severity};
use crate::formats::jt::header::JtVersion;
use crate::formats::jt::scene::SceneGraph;

use super::model::{JtModel, ModelSummary};

/// A loaded JT document: the assembled scene graph, the geometry collected
/// from it and everything that was reported along the way
#[derive(Debug, Clone)]
pub struct JtDocument {
    /// Location the document was loaded from
    pub source: String,
    pub version: JtVersion,
    pub comment: String,
    pub model: JtModel,
    pub scene: SceneGraph,
    /// Deduplicated messages in the order they were first raised
    pub load_information: Vec<LoadInformation>,
    /// Skipped element types, annotated with their known names
    pub unsupported_entities: Vec<String>,
}

impl JtDocument {
    /// Whether the collected geometry is flat along at least one axis
    pub fn is_2d(&self) -> bool {
        self.model
            .extreme_values()
            .is_some_and(|[min, max]| (0..3).any(|axis| min[axis] == max[axis]))
    }

    /// Whether the scene graph holds no partitions below its root
    pub fn is_monolithic(&self) -> bool {
        self.scene.is_monolithic()
    }

    /// Indented dump of the logical scene graph
    pub fn describe_lsg(&self) -> String {
        self.scene.describe(false, false)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &LoadInformation> {
        self.load_information
            .iter()
            .filter(|info| info.severity == Severity::Warning)
    }

    pub fn summary(&self) -> DocumentSummary {
        DocumentSummary {
            source: self.source.clone(),
            scene_nodes: self.scene.len(),
            monolithic: self.is_monolithic(),
            is_2d: self.is_2d(),
            model: self.model.summary(),
            load_information: self.load_information.clone(),
            unsupported_entities: self.unsupported_entities.clone(),
        }
    }
}

/// Serializable overview of a [`JtDocument`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentSummary {
    pub source: String,
    pub scene_nodes: usize,
    pub monolithic: bool,
    pub is_2d: bool,
    pub model: ModelSummary,
    pub load_information: Vec<LoadInformation>,
    pub unsupported_entities: Vec<String>,
}
