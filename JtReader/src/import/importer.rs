//! JT import pipeline
//!
//! Reads the header, scans the TOC into a flat element table, assembles the
//! scene graph and then walks it to collect geometry per layer. Partitions
//! below the root that name another file are loaded recursively and merged.

use std::collections::HashMap;
use std::path::Path;

use glam::DMat4;

use crate::error::{Error, Result};
use crate::formats::jt::context::{LoadContext, ProgressCallback};
use crate::formats::jt::cursor::ByteCursor;
use crate::formats::jt::geometry::{self, Color, LodData, mesh};
use crate::formats::jt::guid::Guid;
use crate::formats::jt::header::FileHeader;
use crate::formats::jt::lsg::{JtElement, PartitionNode, ShapeKind};
use crate::formats::jt::scene::{NodeId, SceneGraph};
use crate::formats::jt::toc::{LodLocation, TocReader, TocScan};

use super::document::JtDocument;
use super::model::JtModel;
use super::options::ImportOptions;
use super::resolver::{FileSystemResolver, ReferenceResolver, read_document, reference_path};

/// Layer used when no ancestor carries a name
pub const DEFAULT_LAYER: &str = "0";

/// Instance name suffixes dropped from layer names
const INSTANCE_SUFFIXES: [&str; 3] = ["_SOLIDS", "_FACETS", "_WF"];

/// Loads JT documents.
///
/// # Example
///
/// ```no_run
/// use jtreader::import::{ImportOptions, JtImporter};
///
/// let importer = JtImporter::new(ImportOptions::default());
/// let document = importer.import_file("assembly.jt")?;
/// println!("{} triangles", document.model.triangle_count());
/// # Ok::<(), jtreader::Error>(())
/// ```
pub struct JtImporter<'a> {
    options: ImportOptions,
    progress: Option<ProgressCallback<'a>>,
    resolver: Box<dyn ReferenceResolver>,
}

impl<'a> JtImporter<'a> {
    pub fn new(options: ImportOptions) -> Self {
        Self {
            options,
            progress: None,
            resolver: Box::new(FileSystemResolver),
        }
    }

    /// Report cumulative bytes of every load, nested ones included
    #[must_use]
    pub fn with_progress(mut self, progress: ProgressCallback<'a>) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Serve documents and external references from `resolver`
    #[must_use]
    pub fn with_resolver(mut self, resolver: impl ReferenceResolver + 'static) -> Self {
        self.resolver = Box::new(resolver);
        self
    }

    pub fn options(&self) -> &ImportOptions {
        &self.options
    }

    /// Load a JT file through the configured resolver
    ///
    /// # Errors
    /// [`Error::EmptyInput`] if the file is missing or empty, otherwise any
    /// fatal decoding error.
    pub fn import_file(&self, path: impl AsRef<Path>) -> Result<JtDocument> {
        let path = path.as_ref();
        let bytes = read_document(self.resolver.as_ref(), path)?;
        let location = path.to_string_lossy();
        self.load(bytes, &location, &location, 0)
    }

    /// Load a JT document from memory
    ///
    /// `location` names the document in messages and is the base for
    /// resolving external references.
    pub fn load_bytes(&self, bytes: Vec<u8>, location: &str) -> Result<JtDocument> {
        if bytes.is_empty() {
            return Err(Error::EmptyInput {
                path: location.into(),
            });
        }
        self.load(bytes, location, location, 0)
    }

    fn load(
        &self,
        bytes: Vec<u8>,
        source: &str,
        base_document: &str,
        depth: usize,
    ) -> Result<JtDocument> {
        let mut ctx = LoadContext::new(source, bytes.len()).with_progress(self.progress);
        let file = ByteCursor::new(bytes);

        let mut cursor = file.clone();
        let header = FileHeader::read(&mut cursor)?;
        tracing::debug!(
            "{}: JT {} ({:?} endian), TOC at {}",
            source,
            header.version,
            header.endian,
            header.toc_offset
        );

        let TocScan {
            elements,
            root_id,
            property_table,
            segment_objects,
            lod_locations,
        } = TocReader::new(&header).scan(&file, &mut ctx)?;
        let root_id = root_id.ok_or(Error::MissingRoot)?;
        tracing::debug!("{}: {} elements, root {}", source, elements.len(), root_id);

        let scene = SceneGraph::assemble(
            elements,
            &property_table,
            &segment_objects,
            root_id,
            &mut ctx,
            self.options.stop_after_clone,
        )?;

        let mut walk = Walk {
            importer: self,
            scene: &scene,
            lods: &lod_locations,
            version: header.version.as_f64(),
            base_document,
            depth,
            model: JtModel::new(&header.version, &header.comment),
            ctx: &mut ctx,
        };
        walk.node(scene.root());
        let model = walk.model;

        let (load_information, unsupported_entities) = ctx.finish();
        Ok(JtDocument {
            source: source.to_string(),
            version: header.version,
            comment: header.comment,
            model,
            scene,
            load_information,
            unsupported_entities,
        })
    }
}

impl Default for JtImporter<'_> {
    fn default() -> Self {
        Self::new(ImportOptions::default())
    }
}

/// State of one scene graph walk
struct Walk<'w, 'a, 'c> {
    importer: &'w JtImporter<'a>,
    scene: &'w SceneGraph,
    lods: &'w HashMap<Guid, LodLocation>,
    version: f64,
    base_document: &'w str,
    depth: usize,
    model: JtModel,
    ctx: &'c mut LoadContext<'a>,
}

impl Walk<'_, '_, '_> {
    fn node(&mut self, id: NodeId) {
        let (scene, importer) = (self.scene, self.importer);
        let options = &importer.options;
        let element = scene.element(id);

        if let Some(shape) = element.as_shape() {
            if !options.skip_geometry {
                self.shape(id, shape.kind);
            }
        } else if let Some(partition) = element.as_partition() {
            if !options.skip_sub_partitions && scene.parent(id).is_some() {
                self.external_reference(id, partition);
            }
        }

        let is_range_lod = matches!(element, JtElement::RangeLod(_));
        for &child in scene.children(id) {
            self.node(child);
            // Only the most detailed LOD
            if is_range_lod {
                break;
            }
        }
    }

    fn shape(&mut self, id: NodeId, kind: ShapeKind) {
        let scene = self.scene;
        let object_id = scene.node(id).object_id;
        let segments = scene.late_loaded_segments(id);
        let Some(first) = segments.first() else {
            return;
        };
        if segments.len() > 1 {
            self.ctx.warn(format!(
                "Object {object_id} has multiple LateLoadedPropertyAtomElement assignments!"
            ));
        }

        let layer = self.layer_name(id);
        let lods = self.lods;
        let Some(location) = lods.get(&first.segment_id) else {
            self.ctx
                .warn(Error::MissingLod(first.segment_id.to_string()).to_string());
            return;
        };
        if location.kind != kind {
            tracing::debug!(
                "Shape {} ({}) bound to a {} LOD",
                object_id,
                kind.type_name(),
                location.kind.type_name()
            );
        }

        let lod = match geometry::read_lod(location, self.version) {
            Ok(lod) => lod,
            Err(err @ Error::UnsupportedCodec(_)) => {
                self.ctx.warn(err.to_string());
                return;
            }
            Err(err) => {
                self.ctx
                    .warn(format!("Failed decoding node element: {layer} ({err})"));
                return;
            }
        };

        let color = self.color(id);
        let transform = self.transform(id);
        if let Err(err) = self.emit(lod, &transform, color, &layer) {
            self.ctx
                .warn(format!("Failed decoding node element: {layer} ({err})"));
        }
    }

    fn emit(&mut self, lod: LodData, transform: &DMat4, color: Color, layer: &str) -> Result<()> {
        match lod {
            LodData::VertexBased(ShapeKind::TriStripSet, rep) => {
                self.add_triangles(mesh::triangles_v8(&rep, transform, color)?, layer);
            }
            LodData::VertexBased(ShapeKind::PolylineSet, rep) => {
                for polyline in mesh::polylines_v8(&rep, transform, color)? {
                    self.model.add_polyline(polyline, layer);
                }
            }
            LodData::VertexBased(ShapeKind::PointSet, rep) => {
                let points = mesh::points(&rep.positions, &rep.colors, transform, color);
                self.model.add_points(points, layer);
            }
            LodData::TriStrip(lod) => {
                self.add_triangles(mesh::triangles_v9(&lod, transform, color)?, layer);
            }
            LodData::Polyline(lod) => {
                for polyline in mesh::polylines_v9(&lod, transform, color)? {
                    self.model.add_polyline(polyline, layer);
                }
            }
            LodData::PointSet(lod) => {
                self.model.add_points(mesh::points_v9(&lod, transform, color), layer);
            }
        }
        Ok(())
    }

    fn add_triangles(&mut self, batch: Option<geometry::TriangleBatch>, layer: &str) {
        match batch {
            Some(batch) => self.model.add_triangles(batch, layer),
            None => self.ctx.warn("Found empty element!"),
        }
    }

    fn external_reference(&mut self, id: NodeId, partition: &PartitionNode) {
        let file_name = partition.file_name.clone().unwrap_or_default();
        let path = reference_path(self.base_document, &file_name);
        let display = path.display().to_string();
        let importer = self.importer;

        if file_name.is_empty() || !importer.resolver.exists(&path) {
            self.model.add_external_reference(file_name, false);
            self.ctx
                .warn(format!("Found missing external reference: {display}"));
            return;
        }
        if self.depth >= importer.options.max_reference_depth {
            self.model.add_external_reference(file_name, false);
            self.ctx.warn(
                Error::ExternalReference(format!(
                    "{display} exceeds the nesting limit of {}",
                    importer.options.max_reference_depth
                ))
                .to_string(),
            );
            return;
        }

        let loaded = importer
            .resolver
            .read(&path)
            .and_then(|bytes| importer.load(bytes, &display, self.base_document, self.depth + 1));
        let document = match loaded {
            Ok(document) => document,
            Err(err) => {
                self.model.add_external_reference(file_name, false);
                self.ctx.warn(format!(
                    "Failed loading external reference: {display} ({err})"
                ));
                return;
            }
        };

        self.model.add_external_reference(file_name, true);
        self.ctx
            .absorb(&document.load_information, &document.unsupported_entities);

        if !importer.options.skip_geometry {
            let transform = self.transform(id);
            let JtDocument { model, .. } = document;
            for (layer, batches) in model.triangles() {
                for batch in batches {
                    let mut batch = batch.clone();
                    batch.transform(&transform);
                    self.model.add_triangles(batch, layer);
                }
            }
        }
    }

    /// Diffuse color of the first material on the node or its nearest ancestor
    fn color(&self, id: NodeId) -> Color {
        self.scene
            .ancestors(id)
            .find_map(|n| {
                self.scene.attributes(n).find_map(|attribute| match attribute {
                    JtElement::Material(material) => Some(material.color()),
                    _ => None,
                })
            })
            .unwrap_or(self.importer.options.default_color)
    }

    /// Product of all transforms from the node up to the root, parents applied last
    fn transform(&self, id: NodeId) -> DMat4 {
        let mut accumulated = DMat4::IDENTITY;
        for n in self.scene.ancestors(id) {
            for attribute in self.scene.attributes(n) {
                if let JtElement::GeometricTransform(transform) = attribute {
                    accumulated = transform.matrix * accumulated;
                }
            }
        }
        accumulated
    }

    fn layer_name(&self, id: NodeId) -> String {
        layer_name(self.scene, id)
    }
}

/// `#`-joined names of the naming ancestors of `id`, outermost first
pub fn layer_name(scene: &SceneGraph, id: NodeId) -> String {
    // Collected innermost first
    let mut names: Vec<String> = Vec::new();
    for n in scene.ancestors(id) {
        let element = scene.element(n);
        if !element.contributes_to_layer() {
            continue;
        }
        let Some(name) = scene.name(n) else {
            continue;
        };
        // Compared against the previously kept name, after its suffix strip
        if names.last() == Some(&name) {
            continue;
        }

        let name = if matches!(element, JtElement::Instance(_)) {
            strip_instance_suffix(&name).to_string()
        } else {
            name
        };
        names.push(name);
    }

    if names.is_empty() {
        return DEFAULT_LAYER.to_string();
    }
    names.reverse();
    names.join("#")
}

fn strip_instance_suffix(name: &str) -> &str {
    INSTANCE_SUFFIXES
        .iter()
        .find_map(|suffix| name.strip_suffix(suffix))
        .unwrap_or(name)
}
