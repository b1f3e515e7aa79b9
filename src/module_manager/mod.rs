use crate::config::{self, ModuleConfig, ModuleDescriptor};
use crate::modules::{ModuleError, ModuleInstance, Segment};
use log::{debug, error, info};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

pub mod factory;

pub use factory::ModuleFactory;

/// Maps module type names to factories and turns descriptors into instances.
pub struct ModuleRegistry {
    factories: HashMap<String, Box<dyn ModuleFactory>>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register `factory` under `type_name`, replacing any earlier one.
    pub fn register<F: ModuleFactory + 'static>(&mut self, type_name: &str, factory: F) {
        self.factories
            .insert(type_name.to_string(), Box::new(factory));
    }

    #[cfg(test)]
    pub fn contains(&self, type_name: &str) -> bool {
        self.factories.contains_key(type_name)
    }

    /// Build the instance for one descriptor. Failures are logged and yield `None`.
    pub fn construct(&self, descriptor: &ModuleDescriptor) -> Option<Box<dyn ModuleInstance>> {
        let Some(factory) = self.factories.get(&descriptor.module_type) else {
            error!("Couldn't find module: {}", descriptor.module_type);
            return None;
        };

        let built = factory
            .create_instance(&descriptor.instance_name, &descriptor.config)
            .and_then(|instance| with_overrides(instance, &descriptor.config));

        match built {
            Ok(instance) => {
                debug!("Created instance: {}", instance.describe());
                Some(instance)
            }
            Err(e) => {
                error!(
                    "Failed to create {} instance {:?}: {}",
                    descriptor.module_type, descriptor.instance_name, e
                );
                None
            }
        }
    }

    /// Build every descriptor that can be built, keeping configured order.
    pub fn construct_all(&self, descriptors: &[ModuleDescriptor]) -> Vec<Box<dyn ModuleInstance>> {
        let instances: Vec<_> = descriptors
            .iter()
            .filter_map(|descriptor| self.construct(descriptor))
            .collect();
        info!(
            "Constructed {} of {} configured modules",
            instances.len(),
            descriptors.len()
        );
        instances
    }
}

impl Default for ModuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Descriptor keys every module type understands.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
struct Presentation {
    #[serde(default, deserialize_with = "config::positive_secs")]
    interval: Option<Duration>,
    color: Option<String>,
    separator_block_width: Option<u32>,
}

impl Presentation {
    fn is_empty(&self) -> bool {
        self == &Presentation::default()
    }
}

/// Instance wrapper applying descriptor-level presentation keys.
struct Overridden {
    inner: Box<dyn ModuleInstance>,
    presentation: Presentation,
}

impl ModuleInstance for Overridden {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn refresh_interval(&self) -> Duration {
        self.presentation
            .interval
            .unwrap_or_else(|| self.inner.refresh_interval())
    }

    fn render(&mut self) -> Result<Option<Segment>, ModuleError> {
        let segment = self.inner.render()?.map(|mut segment| {
            if let Some(color) = &self.presentation.color {
                segment = segment.with_color(color.as_str());
            }
            if let Some(width) = self.presentation.separator_block_width {
                segment = segment.with_separator_block_width(width);
            }
            segment
        });
        Ok(segment)
    }

    fn describe(&self) -> String {
        format!("{} {:?}", self.inner.describe(), self.presentation)
    }
}

fn with_overrides(
    instance: Box<dyn ModuleInstance>,
    config: &ModuleConfig,
) -> Result<Box<dyn ModuleInstance>, ModuleError> {
    let presentation: Presentation = config.settings()?;
    if presentation.is_empty() {
        return Ok(instance);
    }
    Ok(Box::new(Overridden {
        inner: instance,
        presentation,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::testing::ScriptedModule;

    fn scripted(name: &str, _config: &ModuleConfig) -> Result<Box<dyn ModuleInstance>, ModuleError> {
        Ok(Box::new(ScriptedModule::new(name, Duration::from_secs(3))))
    }

    #[derive(Deserialize)]
    struct PickySettings {
        player: String,
    }

    fn picky(_name: &str, config: &ModuleConfig) -> Result<Box<dyn ModuleInstance>, ModuleError> {
        let settings: PickySettings = config.settings()?;
        Ok(Box::new(ScriptedModule::new(&settings.player, Duration::from_secs(1))))
    }

    fn registry() -> ModuleRegistry {
        let mut registry = ModuleRegistry::new();
        registry.register("scripted", scripted);
        registry.register("picky", picky);
        registry
    }

    #[test]
    fn test_unknown_type_does_not_affect_others() {
        let config = config::parse(
            r#"[{"name": "a", "module": "scripted"},
                {"name": "b", "module": "nonexistent"},
                {"name": "c", "module": "scripted"}]"#,
        )
        .unwrap();

        let instances = registry().construct_all(&config.modules);
        let names: Vec<&str> = instances.iter().map(|i| i.name()).collect();
        assert_eq!(names, vec!["a", "c"]);
    }

    #[test]
    fn test_construction_error_yields_none() {
        let config = config::parse(r#"[{"name": "p", "module": "picky"}]"#).unwrap();
        assert!(registry().construct(&config.modules[0]).is_none());

        let config = config::parse(r#"[{"name": "p", "module": "picky", "player": "andi-"}]"#).unwrap();
        assert!(registry().construct(&config.modules[0]).is_some());
    }

    #[test]
    fn test_closures_can_be_registered() {
        let mut registry = ModuleRegistry::new();
        registry.register(
            "inline",
            |name: &str, _: &ModuleConfig| -> Result<Box<dyn ModuleInstance>, ModuleError> {
                Ok(Box::new(ScriptedModule::new(name, Duration::from_secs(1))))
            },
        );
        assert!(registry.contains("inline"));
    }

    #[test]
    fn test_presentation_overrides_apply_to_segments() {
        let config = config::parse(
            r##"[{"name": "a", "module": "scripted", "interval": 30,
                  "color": "#AAAAAA", "separator_block_width": 0}]"##,
        )
        .unwrap();

        let mut instance = registry().construct(&config.modules[0]).unwrap();
        assert_eq!(instance.refresh_interval(), Duration::from_secs(30));

        let segment = instance.render().unwrap().unwrap();
        assert_eq!(segment.color.as_deref(), Some("#AAAAAA"));
        assert_eq!(segment.separator_block_width, Some(0));
    }

    #[test]
    fn test_no_overrides_keeps_module_interval() {
        let config = config::parse(r#"[{"name": "a", "module": "scripted"}]"#).unwrap();
        let instance = registry().construct(&config.modules[0]).unwrap();
        assert_eq!(instance.refresh_interval(), Duration::from_secs(3));
    }

    #[test]
    fn test_invalid_override_rejects_descriptor() {
        for bad in [r#""interval": "soon""#, r#""interval": 0"#, r#""separator_block_width": -1"#] {
            let text = format!(r#"[{{"name": "a", "module": "scripted", {bad}}}]"#);
            let config = config::parse(&text).unwrap();
            assert!(registry().construct(&config.modules[0]).is_none(), "{bad}");
        }
    }
}
