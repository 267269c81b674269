//! Handle-based pipeline registry.
//!
//! The registry maps opaque [`PipelineHandle`]s to shared pipeline
//! configurations so that scripting front-ends can build, inspect and
//! persist pipelines without holding the configuration objects themselves.
//!
//! # Handles
//!
//! Handles come from a counter starting at 0. The counter advances only
//! when an entry is actually registered, so a failed `create` or `load`
//! leaves no gap. `clear_all` empties the table and resets the counter.
//!
//! # Aliasing
//!
//! `cascaded_pipeline` registers an existing child under a new handle; the
//! new handle and the parent's child slot refer to the same configuration.
//! Removing any one handle never invalidates another.

use super::config::{self, MaterialCaster, PipelineConfig, SharedPipeline};
use super::id::PipelineHandle;
use super::kind::{strip_interface_prefix, MaterialCasterKind, PipelineKind};
use super::schema::OPACITY_CHANNEL;
use super::serializer::PipelineSerializer;
use crate::error::{Result, ResultExt, SgError};
use crate::settings::{SettingType, SettingValue};
use std::collections::BTreeMap;
use std::path::Path;
use std::rc::Rc;
use tracing::{debug, info};

const PIPELINE_NOT_FOUND: &str = "The pipeline id was not found.";

pub struct PipelineRegistry {
    pipelines: BTreeMap<PipelineHandle, SharedPipeline>,
    next_handle: u64,
    serializer: PipelineSerializer,
}

impl Default for PipelineRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineRegistry {
    pub fn new() -> Self {
        Self {
            pipelines: BTreeMap::new(),
            next_handle: 0,
            serializer: PipelineSerializer::new(),
        }
    }

    fn register(&mut self, pipeline: SharedPipeline) -> PipelineHandle {
        let handle = PipelineHandle(self.next_handle);
        self.next_handle += 1;
        self.pipelines.insert(handle, pipeline);
        handle
    }

    fn lookup(&self, handle: PipelineHandle, missing: &str) -> Result<SharedPipeline> {
        self.pipelines
            .get(&handle)
            .cloned()
            .ok_or_else(|| SgError::NotFound(missing.to_string()))
    }

    /// The configuration registered under `handle`.
    pub fn get(&self, handle: PipelineHandle) -> Result<SharedPipeline> {
        self.lookup(handle, PIPELINE_NOT_FOUND)
    }

    pub fn contains(&self, handle: PipelineHandle) -> bool {
        self.pipelines.contains_key(&handle)
    }

    pub fn len(&self) -> usize {
        self.pipelines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pipelines.is_empty()
    }

    /// All live handles in ascending order.
    pub fn pipelines(&self) -> Vec<PipelineHandle> {
        self.pipelines.keys().copied().collect()
    }

    // ==================== Lifecycle ====================

    /// Create a pipeline by type name (`"Reduction"` or `"ReductionPipeline"`).
    ///
    /// New pipelines validate parameter names on write.
    pub fn create(&mut self, type_name: &str) -> Result<PipelineHandle> {
        let kind = PipelineKind::parse_creatable(type_name)
            .with_context(|| format!("Failed to add pipeline ({})", type_name))?;

        let mut pipeline = PipelineConfig::new(kind);
        pipeline.set_validate_parameter_names(true);
        let handle = self.register(pipeline.into_shared());

        info!("Created {} pipeline as {}", kind, handle);
        Ok(handle)
    }

    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<PipelineHandle> {
        let path = path.as_ref();
        let mut pipeline = self
            .serializer
            .load(path)
            .with_context(|| format!("Failed to load pipeline ({})", path.display()))?;
        pipeline.set_validate_parameter_names(true);

        let kind = pipeline.kind();
        let handle = self.register(pipeline.into_shared());
        info!("Loaded {} pipeline from {:?} as {}", kind, path, handle);
        Ok(handle)
    }

    pub fn save(&self, handle: PipelineHandle, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let result = self
            .get(handle)
            .and_then(|pipeline| self.serializer.save(&pipeline.borrow(), path));
        result.with_context(|| format!("Failed to save pipeline {} ({})", handle, path.display()))?;

        info!("Saved pipeline {} to {:?}", handle, path);
        Ok(())
    }

    /// Register a deep copy of a pipeline under a new handle.
    pub fn clone_pipeline(&mut self, handle: PipelineHandle) -> Result<PipelineHandle> {
        let source = self
            .get(handle)
            .with_context(|| format!("Failed to clone pipeline {}", handle))?;

        let copy = source.borrow().deep_copy();
        let new_handle = self.register(copy.into_shared());
        debug!("Cloned pipeline {} as {}", handle, new_handle);
        Ok(new_handle)
    }

    pub fn remove(&mut self, handle: PipelineHandle) -> Result<()> {
        self.pipelines
            .remove(&handle)
            .map(|_| debug!("Removed pipeline {}", handle))
            .ok_or_else(|| SgError::NotFound(PIPELINE_NOT_FOUND.to_string()))
            .with_context(|| format!("Failed to remove pipeline {}", handle))
    }

    /// Drop every entry and restart handle numbering at 0.
    pub fn clear_all(&mut self) {
        self.pipelines.clear();
        self.next_handle = 0;
        debug!("Cleared all pipelines");
    }

    // ==================== Settings ====================

    /// Declared type of a setting; `Invalid` for a path that does not exist
    /// or a pipeline with parameter name validation off.
    pub fn setting_type(&self, handle: PipelineHandle, path: &str) -> Result<SettingType> {
        let pipeline = self
            .get(handle)
            .with_context(|| format!("Failed to get setting type ({})", path))?;
        let ty = pipeline.borrow().setting_type(path);
        Ok(ty)
    }

    pub fn get_setting(&self, handle: PipelineHandle, path: &str) -> Result<SettingValue> {
        self.get(handle)
            .and_then(|pipeline| pipeline.borrow().get_setting(path))
            .with_context(|| format!("Failed to get setting ({})", path))
    }

    pub fn set_setting(
        &self,
        handle: PipelineHandle,
        path: &str,
        value: impl Into<SettingValue>,
    ) -> Result<()> {
        let value = value.into();
        self.get(handle)
            .and_then(|pipeline| pipeline.borrow_mut().set_setting(path, value))
            .with_context(|| format!("Failed to set setting ({})", path))
    }

    /// Set a setting from its textual form, parsed by the path's declared type.
    pub fn set_setting_from_str(&self, handle: PipelineHandle, path: &str, text: &str) -> Result<()> {
        self.get(handle)
            .and_then(|pipeline| pipeline.borrow_mut().set_setting_from_str(path, text))
            .with_context(|| format!("Failed to set setting ({})", path))
    }

    // ==================== Material Casters ====================

    /// Append a material caster and return its index.
    ///
    /// `caster_type` may carry a `"Caster"` suffix. The new caster's
    /// opacity channel is set to `default_opacity_channel`.
    pub fn add_material_caster(
        &self,
        handle: PipelineHandle,
        caster_type: &str,
        default_opacity_channel: &str,
    ) -> Result<usize> {
        let result = (|| -> Result<usize> {
            let pipeline = self.get(handle)?;
            let kind = MaterialCasterKind::parse(caster_type)?;

            let mut caster = MaterialCaster::new(kind);
            caster
                .settings_mut()
                .set(OPACITY_CHANNEL, default_opacity_channel.into(), true)?;

            let index = pipeline.borrow_mut().add_material_caster(caster);
            Ok(index)
        })();

        result.with_context(|| format!("Failed to add material caster ({})", caster_type))
    }

    pub fn material_caster_count(&self, handle: PipelineHandle) -> Result<usize> {
        let pipeline = self
            .get(handle)
            .context("Failed to get material caster count")?;
        let count = pipeline.borrow().material_casters().len();
        Ok(count)
    }

    /// Class of a caster with the interface prefix removed (`"ColorCaster"`).
    pub fn material_caster_type(&self, handle: PipelineHandle, index: usize) -> Result<String> {
        let result = self.get(handle).and_then(|pipeline| {
            let class_name = pipeline
                .borrow()
                .material_caster(index)
                .map(MaterialCaster::class_name);
            class_name
                .map(|name| strip_interface_prefix(&name).to_string())
                .ok_or_else(|| {
                    SgError::NotFound("The material caster index was not found.".to_string())
                })
        });
        result.with_context(|| format!("Failed to get material caster type ({})", index))
    }

    /// Class of a pipeline with the interface prefix removed (`"ReductionPipeline"`).
    pub fn pipeline_type(&self, handle: PipelineHandle) -> Result<String> {
        let pipeline = self.get(handle).context("Failed to get pipeline type")?;
        let class_name = pipeline.borrow().class_name();
        Ok(strip_interface_prefix(&class_name).to_string())
    }

    // ==================== Cascade ====================

    /// Append `child` to `parent`'s cascade. The child is shared, not copied.
    pub fn add_cascaded_pipeline(&self, parent: PipelineHandle, child: PipelineHandle) -> Result<()> {
        let result = (|| -> Result<()> {
            let parent_pipeline = self.lookup(parent, "The first pipeline id was not found.")?;
            let child_pipeline = self.lookup(child, "The second pipeline id was not found.")?;
            config::add_cascaded(&parent_pipeline, child_pipeline)
        })();

        result.with_context(|| format!("Failed to add cascaded pipeline ({} -> {})", parent, child))?;
        debug!("Cascaded pipeline {} under {}", child, parent);
        Ok(())
    }

    /// Register `parent`'s child at `index` under a new handle.
    pub fn cascaded_pipeline(&mut self, parent: PipelineHandle, index: usize) -> Result<PipelineHandle> {
        let child = self
            .lookup(parent, "The parent pipeline id was not found.")
            .and_then(|pipeline| {
                pipeline
                    .borrow()
                    .cascaded_pipeline(index)
                    .ok_or_else(|| SgError::NotFound("The child index was not found.".to_string()))
            })
            .with_context(|| format!("Failed to get cascaded pipeline ({}[{}])", parent, index))?;

        Ok(self.register(child))
    }

    pub fn cascaded_pipeline_count(&self, handle: PipelineHandle) -> Result<usize> {
        let pipeline = self
            .get(handle)
            .context("Failed to get cascaded pipeline count")?;
        let count = pipeline.borrow().cascaded_pipeline_count();
        Ok(count)
    }

    /// Whether two handles refer to the same configuration object.
    pub fn is_same_pipeline(&self, a: PipelineHandle, b: PipelineHandle) -> Result<bool> {
        Ok(Rc::ptr_eq(&self.get(a)?, &self.get(b)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::settings::EnumKind;
    use proptest::prelude::*;

    const RATIO: &str = "ReductionProcessor/ReductionSettings/ReductionTargetTriangleRatio";

    #[test]
    fn test_handles_start_at_zero() {
        let mut registry = PipelineRegistry::new();
        assert_eq!(registry.create("Reduction").unwrap(), PipelineHandle(0));
        assert_eq!(registry.create("AggregationPipeline").unwrap(), PipelineHandle(1));
        assert_eq!(registry.pipelines(), vec![PipelineHandle(0), PipelineHandle(1)]);
    }

    #[test]
    fn test_failed_create_consumes_no_handle() {
        let mut registry = PipelineRegistry::new();
        let err = registry.create("FooPipeline").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(err.to_string().contains("The pipeline type is not supported - Foo"));
        assert!(registry.is_empty());

        assert_eq!(registry.create("Reduction").unwrap(), PipelineHandle(0));
    }

    #[test]
    fn test_clear_all_resets_counter() {
        let mut registry = PipelineRegistry::new();
        registry.create("Reduction").unwrap();
        registry.create("Reduction").unwrap();
        registry.clear_all();
        assert!(registry.pipelines().is_empty());
        assert_eq!(registry.create("Passthrough").unwrap(), PipelineHandle(0));
    }

    #[test]
    fn test_remove_keeps_other_handles() {
        let mut registry = PipelineRegistry::new();
        let a = registry.create("Reduction").unwrap();
        let b = registry.create("Reduction").unwrap();
        registry.remove(a).unwrap();
        assert!(registry.get(b).is_ok());
        assert_eq!(registry.remove(a).unwrap_err().kind(), ErrorKind::NotFound);

        let c = registry.create("Reduction").unwrap();
        assert_eq!(c, PipelineHandle(2));
    }

    #[test]
    fn test_typed_settings() {
        let mut registry = PipelineRegistry::new();
        let handle = registry.create("Reduction").unwrap();

        assert_eq!(registry.setting_type(handle, RATIO).unwrap(), SettingType::Double);
        registry.set_setting(handle, RATIO, 0.2).unwrap();
        assert_eq!(
            registry.get_setting(handle, RATIO).unwrap().as_double(),
            Some(0.2)
        );

        let err = registry.set_setting(handle, RATIO, true).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedType);

        assert_eq!(
            registry.setting_type(handle, "Does/Not/Exist").unwrap(),
            SettingType::Invalid
        );
        assert_eq!(
            registry.get_setting(handle, "Does/Not/Exist").unwrap_err().kind(),
            ErrorKind::NotFound
        );
    }

    #[test]
    fn test_set_setting_from_str() {
        let mut registry = PipelineRegistry::new();
        let handle = registry.create("Remeshing").unwrap();
        let path = "RemeshingProcessor/RemeshingSettings/HoleFilling";
        registry.set_setting_from_str(handle, path, "High").unwrap();
        assert_eq!(
            registry
                .get_setting(handle, path)
                .unwrap()
                .as_enum(EnumKind::HoleFilling),
            Some(3)
        );
    }

    #[test]
    fn test_material_casters() {
        let mut registry = PipelineRegistry::new();
        let handle = registry.create("Aggregation").unwrap();

        assert_eq!(registry.add_material_caster(handle, "ColorCaster", "Opacity").unwrap(), 0);
        assert_eq!(registry.add_material_caster(handle, "Normal", "Alpha").unwrap(), 1);
        assert_eq!(registry.material_caster_count(handle).unwrap(), 2);
        assert_eq!(registry.material_caster_type(handle, 1).unwrap(), "NormalCaster");
        assert_eq!(
            registry
                .get_setting(handle, "MaterialCaster/1/OpacityChannel")
                .unwrap(),
            SettingValue::from("Alpha")
        );

        let err = registry.add_material_caster(handle, "Glitter", "Opacity").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(registry.material_caster_count(handle).unwrap(), 2);
        assert!(registry.material_caster_type(handle, 9).is_err());
    }

    #[test]
    fn test_pipeline_type_strips_prefix() {
        let mut registry = PipelineRegistry::new();
        let handle = registry.create("Flipbook").unwrap();
        assert_eq!(registry.pipeline_type(handle).unwrap(), "FlipbookPipeline");
    }

    #[test]
    fn test_cascaded_pipeline_aliases_child() {
        let mut registry = PipelineRegistry::new();
        let parent = registry.create("Reduction").unwrap();
        let child = registry.create("Reduction").unwrap();
        registry.add_cascaded_pipeline(parent, child).unwrap();

        let alias = registry.cascaded_pipeline(parent, 0).unwrap();
        assert_ne!(alias, child);
        assert!(registry.is_same_pipeline(alias, child).unwrap());

        registry.set_setting(alias, RATIO, 0.1).unwrap();
        assert_eq!(registry.get_setting(child, RATIO).unwrap().as_double(), Some(0.1));

        registry.remove(child).unwrap();
        assert!(registry.get_setting(alias, RATIO).is_ok());
    }

    #[test]
    fn test_cascade_errors() {
        let mut registry = PipelineRegistry::new();
        let parent = registry.create("Reduction").unwrap();

        let err = registry.add_cascaded_pipeline(parent, PipelineHandle(77)).unwrap_err();
        assert!(err.to_string().contains("The second pipeline id was not found."));
        let err = registry.add_cascaded_pipeline(PipelineHandle(77), parent).unwrap_err();
        assert!(err.to_string().contains("The first pipeline id was not found."));

        let err = registry.cascaded_pipeline(parent, 0).unwrap_err();
        assert!(err.to_string().contains("The child index was not found."));
        assert_eq!(registry.len(), 1);

        let err = registry.add_cascaded_pipeline(parent, parent).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidConfiguration);
    }

    #[test]
    fn test_clone_is_deep() {
        let mut registry = PipelineRegistry::new();
        let original = registry.create("Reduction").unwrap();
        let child = registry.create("Aggregation").unwrap();
        registry.add_cascaded_pipeline(original, child).unwrap();

        let copy = registry.clone_pipeline(original).unwrap();
        registry.set_setting(original, RATIO, 0.9).unwrap();
        assert_eq!(registry.get_setting(copy, RATIO).unwrap().as_double(), Some(0.5));
        assert_eq!(registry.cascaded_pipeline_count(copy).unwrap(), 1);

        let copied_child = registry.cascaded_pipeline(copy, 0).unwrap();
        assert!(!registry.is_same_pipeline(copied_child, child).unwrap());
    }

    #[test]
    fn test_unknown_handle_everywhere() {
        let mut registry = PipelineRegistry::new();
        let missing = PipelineHandle(5);
        assert_eq!(registry.get_setting(missing, RATIO).unwrap_err().kind(), ErrorKind::NotFound);
        assert_eq!(registry.setting_type(missing, RATIO).unwrap_err().kind(), ErrorKind::NotFound);
        assert_eq!(registry.clone_pipeline(missing).unwrap_err().kind(), ErrorKind::NotFound);
        assert_eq!(registry.pipeline_type(missing).unwrap_err().kind(), ErrorKind::NotFound);
        assert_eq!(
            registry.save(missing, "unused.json").unwrap_err().kind(),
            ErrorKind::NotFound
        );
        assert!(registry.is_empty());
    }

    proptest! {
        #[test]
        fn prop_handles_unique_and_increasing(ops in proptest::collection::vec(any::<bool>(), 1..40)) {
            let mut registry = PipelineRegistry::new();
            let mut issued = Vec::new();
            for valid in ops {
                let name = if valid { "Reduction" } else { "NotAPipeline" };
                if let Ok(handle) = registry.create(name) {
                    issued.push(handle);
                }
            }
            for pair in issued.windows(2) {
                prop_assert!(pair[0] < pair[1]);
            }
            let expected: Vec<_> = (0..issued.len() as u64).map(PipelineHandle).collect();
            prop_assert_eq!(issued, expected);
        }
    }
}
