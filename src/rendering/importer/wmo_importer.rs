use std::ops::Range;

use anyhow::{Error, bail};
use itertools::Itertools;
use log::trace;
use sargerust_files::wmo::types::{SMOBatch, WMOGroupAsset};

use crate::rendering::common::types::WmoVertex;

/// Groups without MOCV are rendered with a neutral vertex color
const NEUTRAL_VERTEX_COLOR: [u8; 4] = [0x7F, 0x7F, 0x7F, 0xFF];

pub struct WMOGroupImporter {}

impl WMOGroupImporter {
    // The batches are slices of one bigger index buffer, as such all batches share the vertex buffer of the group.
    pub fn create_vertices(asset: &WMOGroupAsset) -> Vec<WmoVertex> {
        asset
            .positions
            .iter()
            .enumerate()
            .map(|(i, pos)| WmoVertex {
                position: [pos.x, pos.y, pos.z],
                normal: asset
                    .normals
                    .get(i)
                    .map(|n| [n.x, n.y, n.z])
                    .unwrap_or([0.0, 0.0, 1.0]),
                tex_coord: asset.texCoords.get(i).map(|uv| [uv.x, uv.y]).unwrap_or_default(),
                color: asset
                    .vertexColors
                    .get(i)
                    .map(|c| [c.r, c.g, c.b, c.a])
                    .unwrap_or(NEUTRAL_VERTEX_COLOR),
            })
            .collect_vec()
    }

    /// The slice of the group index buffer that a batch draws.
    pub fn batch_range(asset: &WMOGroupAsset, batch: &SMOBatch) -> Result<Range<u32>, Error> {
        let start = batch.startIndex;
        let end = start + batch.count as u32;

        if end as usize > asset.indices.len() {
            bail!(
                "Batch {}..{} exceeds the index buffer ({} indices)",
                start,
                end,
                asset.indices.len()
            );
        }

        trace!("WMO Batch {}..{} uses material {}", start, end, batch.material_id);
        Ok(start..end)
    }
}

#[cfg(test)]
mod tests {
    use sargerust_files::common::types::{C3Vector, CAaBox, CImVector};
    use sargerust_files::wmo::types::{SMOBatch, WMOGroupAsset};

    use crate::rendering::importer::wmo_importer::WMOGroupImporter;

    fn group() -> WMOGroupAsset {
        WMOGroupAsset {
            flags: 0x8,
            bounding_box: CAaBox::default(),
            positions: vec![C3Vector::new(0.0, 0.0, 0.0), C3Vector::new(1.0, 0.0, 0.0)],
            normals: vec![],
            texCoords: vec![],
            vertexColors: vec![CImVector::from(0x80402010u32)],
            indices: vec![0, 1, 0],
            batches: vec![],
            doodadRefs: vec![],
        }
    }

    #[test]
    fn missing_attributes_fall_back_to_defaults() {
        let vertices = WMOGroupImporter::create_vertices(&group());
        assert_eq!(vertices.len(), 2);
        assert_eq!(vertices[0].normal, [0.0, 0.0, 1.0]);
        assert_eq!(vertices[1].color, [0x7F, 0x7F, 0x7F, 0xFF]);
    }

    #[test]
    fn batches_past_the_index_buffer_are_rejected() {
        let batch = SMOBatch {
            startIndex: 1,
            count: 3,
            ..SMOBatch::default()
        };

        assert!(WMOGroupImporter::batch_range(&group(), &batch).is_err());
        let batch = SMOBatch { count: 2, ..batch };
        assert_eq!(WMOGroupImporter::batch_range(&group(), &batch).expect("valid"), 1..3);
    }
}
