//! Geometry decompression for shape LOD segments

pub mod codec;
pub mod lod;
pub mod mesh;

pub use codec::{PacketFormat, Predictor, read_int32_cdp, read_lossless_floats, unpack_residuals};
pub use lod::{LodData, PointSetLod, PolylineLod, TriStripLod, VertexBasedRep, read_lod};
pub use mesh::{Color, PointBatch, Polyline, TriangleBatch};
