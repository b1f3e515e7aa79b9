use crate::config::ModuleConfig;
use crate::modules::{ModuleError, ModuleInstance};

/// Trait that defines a factory for one module type (e.g. `time`, `battery`).
pub trait ModuleFactory {
    /// Builds an instance from its descriptor name and module-specific config.
    /// Missing keys and malformed templates are reported as errors here, once,
    /// rather than on every render.
    fn create_instance(
        &self,
        instance_name: &str,
        config: &ModuleConfig,
    ) -> Result<Box<dyn ModuleInstance>, ModuleError>;
}

impl<F> ModuleFactory for F
where
    F: Fn(&str, &ModuleConfig) -> Result<Box<dyn ModuleInstance>, ModuleError>,
{
    fn create_instance(
        &self,
        instance_name: &str,
        config: &ModuleConfig,
    ) -> Result<Box<dyn ModuleInstance>, ModuleError> {
        self(instance_name, config)
    }
}
