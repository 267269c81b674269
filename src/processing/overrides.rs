//! Per-run parameter overrides.
//!
//! Before a run, every node of the cascade tree is pointed at its own
//! texture directory (`<texture output>/LOD<n>`, `n` being the node's
//! pre-order index starting at 1), at the batch worker executable, and is
//! given a texture coordinate name for baked materials if it has none.

use crate::error::Result;
use crate::pipeline::SharedPipeline;
use crate::settings::SettingValue;
use std::path::Path;
use tracing::debug;

/// Texture coordinate set name given to nodes that bake materials
pub const DEFAULT_TEXCOORD_NAME: &str = "MaterialLOD";

/// Prefix of per-node texture directories and cascaded output names
pub const LOD_PREFIX: &str = "LOD";

/// Apply the overrides to the whole tree. Returns the number of nodes visited.
pub fn override_pipeline_parameters(
    pipeline: &SharedPipeline,
    texture_output_dir: &Path,
    batch_path: &Path,
) -> Result<usize> {
    let mut lod_index = 1;
    override_node(pipeline, texture_output_dir, batch_path, &mut lod_index)?;
    Ok(lod_index)
}

fn override_node(
    node: &SharedPipeline,
    texture_output_dir: &Path,
    batch_path: &Path,
    lod_index: &mut usize,
) -> Result<()> {
    let local_index = *lod_index;

    // Children first, each taking the next index.
    let children = node.borrow().cascaded_pipelines().to_vec();
    for child in &children {
        *lod_index += 1;
        override_node(child, texture_output_dir, batch_path, lod_index)?;
    }

    let mut config = node.borrow_mut();
    let texture_dir = texture_output_dir.join(format!("{}{}", LOD_PREFIX, local_index));
    config.set_texture_output_path(&texture_dir.to_string_lossy())?;
    config.set_batch_path(&batch_path.to_string_lossy())?;

    if let Some(path) = config.kind().texcoord_name_path() {
        let unset = config
            .get_setting(&path)
            .ok()
            .and_then(|value| value.as_str().map(str::is_empty))
            .unwrap_or(true);
        if unset {
            config.set_setting(&path, SettingValue::from(DEFAULT_TEXCOORD_NAME))?;
        }
    }

    debug!(
        "LOD{}: {} textures -> {:?}",
        local_index,
        config.kind(),
        texture_dir
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{add_cascaded, PipelineConfig, PipelineKind};
    use std::rc::Rc;

    fn node(kind: PipelineKind) -> SharedPipeline {
        PipelineConfig::new(kind).into_shared()
    }

    #[test]
    fn test_texture_paths_follow_preorder() {
        let root = node(PipelineKind::Reduction);
        let c1 = node(PipelineKind::Reduction);
        let c1_child = node(PipelineKind::Aggregation);
        let c2 = node(PipelineKind::Remeshing);
        add_cascaded(&root, Rc::clone(&c1)).unwrap();
        add_cascaded(&c1, Rc::clone(&c1_child)).unwrap();
        add_cascaded(&root, Rc::clone(&c2)).unwrap();

        let visited =
            override_pipeline_parameters(&root, Path::new("/tex"), Path::new("/bin/worker")).unwrap();
        assert_eq!(visited, 4);

        let expect = |n: &SharedPipeline, lod: usize| {
            let path = Path::new("/tex").join(format!("LOD{}", lod));
            assert_eq!(n.borrow().texture_output_path(), path.to_string_lossy());
            assert_eq!(n.borrow().batch_path(), "/bin/worker");
        };
        expect(&root, 1);
        expect(&c1, 2);
        expect(&c1_child, 3);
        expect(&c2, 4);
    }

    #[test]
    fn test_texcoord_name_defaulted_but_not_overwritten() {
        let root = node(PipelineKind::Reduction);
        let child = node(PipelineKind::BillboardCloud);
        add_cascaded(&root, Rc::clone(&child)).unwrap();
        child
            .borrow_mut()
            .set_setting("ImpostorProcessor/MappingImageSettings/TexCoordName", "Custom")
            .unwrap();

        override_pipeline_parameters(&root, Path::new("/tex"), Path::new("w")).unwrap();

        assert_eq!(
            root.borrow()
                .get_setting("ReductionProcessor/MappingImageSettings/TexCoordName")
                .unwrap(),
            SettingValue::from(DEFAULT_TEXCOORD_NAME)
        );
        assert_eq!(
            child
                .borrow()
                .get_setting("ImpostorProcessor/MappingImageSettings/TexCoordName")
                .unwrap(),
            SettingValue::from("Custom")
        );
    }

    #[test]
    fn test_kinds_without_mapping_image_untouched() {
        let root = node(PipelineKind::Passthrough);
        override_pipeline_parameters(&root, Path::new("/tex"), Path::new("w")).unwrap();
        assert!(root
            .borrow()
            .settings()
            .iter()
            .all(|(path, _)| !path.ends_with("TexCoordName")));
    }
}
