//! Pipeline configuration objects.
//!
//! A [`PipelineConfig`] owns its typed settings, its material casters and
//! its cascaded children. Configurations are shared through
//! [`SharedPipeline`] so that the same child can be referenced by several
//! registry handles and parents at once; it lives as long as any of them.
//!
//! Runtime state (the processed scene of the last run and the attached
//! progress observers) lives on the configuration but is never copied or
//! serialized.

use super::id::ObserverId;
use super::kind::{MaterialCasterKind, PipelineKind};
use super::observer::ProgressObserver;
use super::schema::{self, BATCH_PATH, INTERMEDIATE_STEP, TEXTURE_OUTPUT_PATH};
use crate::error::{Result, SgError};
use crate::scene::Scene;
use crate::settings::{normalize_path, SettingType, SettingValue, SettingsTree};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Reference-counted, interior-mutable pipeline configuration.
pub type SharedPipeline = Rc<RefCell<PipelineConfig>>;

const CASTER_PATH_ROOT: &str = "MaterialCaster";

// ==================== Material Caster ====================

/// A material caster attached to a pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialCaster {
    kind: MaterialCasterKind,
    settings: SettingsTree,
}

impl MaterialCaster {
    pub fn new(kind: MaterialCasterKind) -> Self {
        Self {
            kind,
            settings: schema::caster_defaults(kind),
        }
    }

    pub(crate) fn from_parts(kind: MaterialCasterKind, settings: SettingsTree) -> Self {
        Self { kind, settings }
    }

    pub fn kind(&self) -> MaterialCasterKind {
        self.kind
    }

    pub fn class_name(&self) -> String {
        self.kind.class_name()
    }

    pub fn settings(&self) -> &SettingsTree {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut SettingsTree {
        &mut self.settings
    }
}

// ==================== Pipeline Config ====================

pub struct PipelineConfig {
    kind: PipelineKind,
    settings: SettingsTree,
    validate_parameter_names: bool,
    material_casters: Vec<MaterialCaster>,
    cascaded: Vec<SharedPipeline>,
    processed_scene: Option<Scene>,
    observers: Vec<(ObserverId, Rc<dyn ProgressObserver>)>,
    next_observer_id: u32,
}

impl PipelineConfig {
    /// New configuration with the kind's default settings.
    pub fn new(kind: PipelineKind) -> Self {
        Self::from_parts(kind, schema::pipeline_defaults(kind))
    }

    pub(crate) fn from_parts(kind: PipelineKind, settings: SettingsTree) -> Self {
        Self {
            kind,
            settings,
            validate_parameter_names: false,
            material_casters: Vec::new(),
            cascaded: Vec::new(),
            processed_scene: None,
            observers: Vec::new(),
            next_observer_id: 0,
        }
    }

    pub fn into_shared(self) -> SharedPipeline {
        Rc::new(RefCell::new(self))
    }

    pub fn kind(&self) -> PipelineKind {
        self.kind
    }

    pub fn class_name(&self) -> String {
        self.kind.class_name()
    }

    pub fn validate_parameter_names(&self) -> bool {
        self.validate_parameter_names
    }

    /// When enabled, writes to unknown setting paths fail instead of
    /// creating the path.
    pub fn set_validate_parameter_names(&mut self, validate: bool) {
        self.validate_parameter_names = validate;
    }

    pub fn settings(&self) -> &SettingsTree {
        &self.settings
    }

    // ==================== Settings ====================

    /// Declared type of a setting path. `Invalid` when the path does not
    /// exist or parameter name validation is off.
    pub fn setting_type(&self, path: &str) -> SettingType {
        if !self.validate_parameter_names {
            return SettingType::Invalid;
        }
        match self.resolve_caster_path(path) {
            Ok(Some((index, rest))) => self.material_casters[index].settings.value_type(&rest),
            Ok(None) => self.settings.value_type(path),
            Err(_) => SettingType::Invalid,
        }
    }

    pub fn get_setting(&self, path: &str) -> Result<SettingValue> {
        let value = match self.resolve_caster_path(path)? {
            Some((index, rest)) => self.material_casters[index].settings.get(&rest),
            None => self.settings.get(path),
        };

        value.cloned().ok_or_else(|| {
            SgError::NotFound(format!(
                "The setting '{}' does not exist on {}.",
                normalize_path(path),
                self.class_name()
            ))
        })
    }

    pub fn set_setting(&mut self, path: &str, value: impl Into<SettingValue>) -> Result<()> {
        let strict = self.validate_parameter_names;
        match self.resolve_caster_path(path)? {
            Some((index, rest)) => {
                self.material_casters[index]
                    .settings
                    .set(&rest, value.into(), strict)
            }
            None => self.settings.set(path, value.into(), strict),
        }
    }

    /// Write a setting from text, parsed according to the path's type.
    pub fn set_setting_from_str(&mut self, path: &str, text: &str) -> Result<()> {
        let strict = self.validate_parameter_names;
        match self.resolve_caster_path(path)? {
            Some((index, rest)) => {
                self.material_casters[index]
                    .settings
                    .set_from_str(&rest, text, strict)
            }
            None => self.settings.set_from_str(path, text, strict),
        }
    }

    /// Split `MaterialCaster/<index>/<setting>` into the caster index and
    /// the caster-relative path. `None` for ordinary pipeline paths.
    fn resolve_caster_path(&self, path: &str) -> Result<Option<(usize, String)>> {
        let normalized = normalize_path(path);
        let mut parts = normalized.splitn(3, '/');
        if parts.next() != Some(CASTER_PATH_ROOT) {
            return Ok(None);
        }

        let index = parts
            .next()
            .and_then(|s| s.parse::<usize>().ok())
            .filter(|i| *i < self.material_casters.len())
            .ok_or_else(|| {
                SgError::NotFound(format!("The material caster in '{}' was not found.", normalized))
            })?;
        let rest = parts.next().unwrap_or_default().to_string();
        Ok(Some((index, rest)))
    }

    // ==================== Common Pipeline Settings ====================

    /// Whether this node only feeds its children and emits no output.
    pub fn is_intermediate_step(&self) -> bool {
        self.settings
            .get(INTERMEDIATE_STEP)
            .and_then(SettingValue::as_bool)
            .unwrap_or(false)
    }

    pub fn texture_output_path(&self) -> String {
        self.settings
            .get(TEXTURE_OUTPUT_PATH)
            .and_then(SettingValue::as_str)
            .unwrap_or_default()
            .to_string()
    }

    pub fn set_texture_output_path(&mut self, path: &str) -> Result<()> {
        self.settings.set(TEXTURE_OUTPUT_PATH, path.into(), false)
    }

    pub fn batch_path(&self) -> String {
        self.settings
            .get(BATCH_PATH)
            .and_then(SettingValue::as_str)
            .unwrap_or_default()
            .to_string()
    }

    pub fn set_batch_path(&mut self, path: &str) -> Result<()> {
        self.settings.set(BATCH_PATH, path.into(), false)
    }

    // ==================== Material Casters ====================

    /// Append a caster and return its index.
    pub fn add_material_caster(&mut self, caster: MaterialCaster) -> usize {
        self.material_casters.push(caster);
        self.material_casters.len() - 1
    }

    pub fn material_casters(&self) -> &[MaterialCaster] {
        &self.material_casters
    }

    pub fn material_caster(&self, index: usize) -> Option<&MaterialCaster> {
        self.material_casters.get(index)
    }

    pub fn material_caster_mut(&mut self, index: usize) -> Option<&mut MaterialCaster> {
        self.material_casters.get_mut(index)
    }

    // ==================== Cascade ====================

    pub fn cascaded_pipelines(&self) -> &[SharedPipeline] {
        &self.cascaded
    }

    pub fn cascaded_pipeline(&self, index: usize) -> Option<SharedPipeline> {
        self.cascaded.get(index).cloned()
    }

    /// Append a freshly built child that cannot alias this node.
    pub(crate) fn push_cascaded_unchecked(&mut self, child: SharedPipeline) {
        self.cascaded.push(child);
    }

    pub fn cascaded_pipeline_count(&self) -> usize {
        self.cascaded.len()
    }

    /// Number of nodes in the tree rooted here, this node included.
    pub fn total_pipeline_count(&self) -> usize {
        1 + self
            .cascaded
            .iter()
            .map(|child| child.borrow().total_pipeline_count())
            .sum::<usize>()
    }

    /// Deep copy of settings, casters and the whole cascade subtree.
    /// Runtime state is not copied.
    pub fn deep_copy(&self) -> PipelineConfig {
        let mut copy = PipelineConfig::from_parts(self.kind, self.settings.clone());
        copy.validate_parameter_names = self.validate_parameter_names;
        copy.material_casters = self.material_casters.clone();
        copy.cascaded = self
            .cascaded
            .iter()
            .map(|child| child.borrow().deep_copy().into_shared())
            .collect();
        copy
    }

    // ==================== Runtime State ====================

    pub fn processed_scene(&self) -> Option<&Scene> {
        self.processed_scene.as_ref()
    }

    pub fn set_processed_scene(&mut self, scene: Option<Scene>) {
        self.processed_scene = scene;
    }

    pub fn add_observer(&mut self, observer: Rc<dyn ProgressObserver>) -> ObserverId {
        let id = ObserverId(self.next_observer_id);
        self.next_observer_id += 1;
        self.observers.push((id, observer));
        id
    }

    /// Detach an observer. Returns `false` if it was not attached.
    pub fn remove_observer(&mut self, id: ObserverId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(existing, _)| *existing != id);
        self.observers.len() != before
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    /// Report progress to every attached observer. Returns `false` if any
    /// observer asked to stop.
    pub fn notify_progress(&self, percent: f64) -> bool {
        self.observers
            .iter()
            .fold(true, |keep_going, (_, observer)| {
                observer.on_progress(percent) && keep_going
            })
    }
}

impl fmt::Debug for PipelineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineConfig")
            .field("kind", &self.kind)
            .field("settings", &self.settings.len())
            .field("material_casters", &self.material_casters.len())
            .field("cascaded", &self.cascaded.len())
            .field("processed", &self.processed_scene.is_some())
            .field("observers", &self.observers.len())
            .finish()
    }
}

// ==================== Tree Helpers ====================

/// Whether `target` is `root` or appears anywhere beneath it.
pub fn subtree_contains(root: &SharedPipeline, target: &SharedPipeline) -> bool {
    if Rc::ptr_eq(root, target) {
        return true;
    }
    root.borrow()
        .cascaded
        .iter()
        .any(|child| subtree_contains(child, target))
}

/// Append `child` to `parent`'s cascade, rejecting cycles.
pub fn add_cascaded(parent: &SharedPipeline, child: SharedPipeline) -> Result<()> {
    if subtree_contains(&child, parent) {
        return Err(SgError::InvalidConfiguration(
            "The cascaded pipeline would create a cycle.".to_string(),
        ));
    }
    parent.borrow_mut().cascaded.push(child);
    Ok(())
}

/// Every node of the tree in pre-order, root first.
///
/// A node's LOD index is its position in this list plus one.
pub fn preorder(root: &SharedPipeline) -> Vec<SharedPipeline> {
    let mut nodes = Vec::new();
    collect_preorder(root, &mut nodes);
    nodes
}

fn collect_preorder(node: &SharedPipeline, out: &mut Vec<SharedPipeline>) {
    out.push(Rc::clone(node));
    let children = node.borrow().cascaded.clone();
    for child in &children {
        collect_preorder(child, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::pipeline::observer::MockProgressObserver;
    use crate::settings::EnumKind;

    fn shared(kind: PipelineKind) -> SharedPipeline {
        PipelineConfig::new(kind).into_shared()
    }

    #[test]
    fn test_validated_set_rejects_unknown_path() {
        let mut config = PipelineConfig::new(PipelineKind::Reduction);
        config.set_validate_parameter_names(true);
        let err = config.set_setting("No/Such/Path", 1.0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        config.set_validate_parameter_names(false);
        config.set_setting("No/Such/Path", 1.0).unwrap();
        assert_eq!(config.get_setting("No/Such/Path").unwrap(), SettingValue::Double(1.0));
    }

    #[test]
    fn test_setting_type_invalid_without_validation() {
        let mut config = PipelineConfig::new(PipelineKind::Reduction);
        assert_eq!(config.setting_type(INTERMEDIATE_STEP), SettingType::Invalid);
        config.set_setting("No/Such/Path", 1.0).unwrap();
        assert_eq!(config.setting_type("No/Such/Path"), SettingType::Invalid);

        config.set_validate_parameter_names(true);
        assert_eq!(config.setting_type(INTERMEDIATE_STEP), SettingType::Bool);
        assert_eq!(config.setting_type("No/Such/Path"), SettingType::Double);
    }

    #[test]
    fn test_get_unknown_path_is_not_found() {
        let config = PipelineConfig::new(PipelineKind::Passthrough);
        let err = config.get_setting("ReductionProcessor/ReductionSettings/ReductionTargetTriangleRatio");
        assert_eq!(err.unwrap_err().kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_caster_settings_through_pipeline_paths() {
        let mut config = PipelineConfig::new(PipelineKind::Aggregation);
        config.set_validate_parameter_names(true);
        let index = config.add_material_caster(MaterialCaster::new(MaterialCasterKind::Color));
        assert_eq!(index, 0);

        config
            .set_setting("MaterialCaster/0/OpacityChannel", "Transparency")
            .unwrap();
        assert_eq!(
            config.get_setting("MaterialCaster.0.OpacityChannel").unwrap(),
            SettingValue::from("Transparency")
        );
        assert_eq!(
            config.setting_type("MaterialCaster/0/OutputPixelFormat"),
            SettingType::Enum(EnumKind::PixelFormat)
        );
        assert_eq!(config.setting_type("MaterialCaster/3/Dilation"), SettingType::Invalid);
        assert_eq!(
            config.get_setting("MaterialCaster/3/Dilation").unwrap_err().kind(),
            ErrorKind::NotFound
        );
    }

    #[test]
    fn test_intermediate_step_and_paths() {
        let mut config = PipelineConfig::new(PipelineKind::Remeshing);
        assert!(!config.is_intermediate_step());
        config.set_setting(INTERMEDIATE_STEP, true).unwrap();
        assert!(config.is_intermediate_step());

        config.set_texture_output_path("/out/LOD1").unwrap();
        config.set_batch_path("/bin/worker").unwrap();
        assert_eq!(config.texture_output_path(), "/out/LOD1");
        assert_eq!(config.batch_path(), "/bin/worker");
    }

    #[test]
    fn test_cycle_rejected() {
        let parent = shared(PipelineKind::Reduction);
        let child = shared(PipelineKind::Reduction);
        add_cascaded(&parent, Rc::clone(&child)).unwrap();

        assert!(add_cascaded(&child, Rc::clone(&parent)).is_err());
        assert!(add_cascaded(&parent, Rc::clone(&parent)).is_err());
        assert_eq!(parent.borrow().cascaded_pipeline_count(), 1);
        assert_eq!(child.borrow().cascaded_pipeline_count(), 0);
    }

    #[test]
    fn test_aliased_child_allowed() {
        let a = shared(PipelineKind::Reduction);
        let b = shared(PipelineKind::Reduction);
        let shared_child = shared(PipelineKind::Passthrough);
        add_cascaded(&a, Rc::clone(&shared_child)).unwrap();
        add_cascaded(&b, Rc::clone(&shared_child)).unwrap();
        assert_eq!(Rc::strong_count(&shared_child), 3);
    }

    #[test]
    fn test_deep_copy_is_independent() {
        let root = shared(PipelineKind::Reduction);
        let child = shared(PipelineKind::Aggregation);
        add_cascaded(&root, Rc::clone(&child)).unwrap();
        root.borrow_mut()
            .add_material_caster(MaterialCaster::new(MaterialCasterKind::Normal));

        let copy = root.borrow().deep_copy().into_shared();
        child.borrow_mut().set_setting(INTERMEDIATE_STEP, true).unwrap();

        let copied_child = copy.borrow().cascaded_pipeline(0).unwrap();
        assert!(!Rc::ptr_eq(&copied_child, &child));
        assert!(!copied_child.borrow().is_intermediate_step());
        assert_eq!(copy.borrow().material_casters().len(), 1);
        assert_eq!(copy.borrow().total_pipeline_count(), 2);
    }

    #[test]
    fn test_preorder_numbering() {
        let root = shared(PipelineKind::Passthrough);
        let c1 = shared(PipelineKind::Reduction);
        let c2 = shared(PipelineKind::Reduction);
        let grandchild = shared(PipelineKind::Reduction);
        add_cascaded(&root, Rc::clone(&c1)).unwrap();
        add_cascaded(&c1, Rc::clone(&grandchild)).unwrap();
        add_cascaded(&root, Rc::clone(&c2)).unwrap();

        let order = preorder(&root);
        assert_eq!(order.len(), 4);
        assert!(Rc::ptr_eq(&order[0], &root));
        assert!(Rc::ptr_eq(&order[1], &c1));
        assert!(Rc::ptr_eq(&order[2], &grandchild));
        assert!(Rc::ptr_eq(&order[3], &c2));
    }

    #[test]
    fn test_observers_notified_until_removed() {
        let mut observer = MockProgressObserver::new();
        observer.expect_on_progress().times(2).return_const(true);

        let mut config = PipelineConfig::new(PipelineKind::Reduction);
        let id = config.add_observer(Rc::new(observer));
        assert!(config.notify_progress(10.0));
        assert!(config.notify_progress(20.0));
        assert!(config.remove_observer(id));
        assert!(!config.remove_observer(id));
        assert!(config.notify_progress(30.0));
    }

    #[test]
    fn test_observer_can_request_stop() {
        let mut observer = MockProgressObserver::new();
        observer.expect_on_progress().return_const(false);

        let mut config = PipelineConfig::new(PipelineKind::Reduction);
        config.add_observer(Rc::new(observer));
        assert!(!config.notify_progress(50.0));
    }
}
