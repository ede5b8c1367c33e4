//! In-memory host runtime
//!
//! A [`RuntimeTypeSystem`] backed by an explicit registry of modules. Useful
//! for embedding the cache in tools that already know their module set, and
//! as the host in tests.

use std::collections::HashMap;
use std::path::PathBuf;

use crate::error::HostError;
use crate::runtime::{ModuleHandle, RuntimeTypeSystem, TypeDescriptor};

#[derive(Debug, Clone)]
struct RegisteredModule {
    handle: ModuleHandle,
    types: Vec<TypeDescriptor>,
}

/// Registry-backed runtime. Modules are keyed by simple name.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRuntime {
    modules: HashMap<String, RegisteredModule>,
    /// full name -> simple name
    by_full_name: HashMap<String, String>,
    current: Option<String>,
}

impl InMemoryRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a module and the qualified names of the types it defines.
    ///
    /// Registering a second module with the same simple name replaces the first.
    pub fn with_module<I, S>(mut self, full_name: &str, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.register(full_name, None, types);
        self
    }

    /// Like [`Self::with_module`], recording where the module came from.
    pub fn with_module_at<I, S>(mut self, full_name: &str, location: PathBuf, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.register(full_name, Some(location), types);
        self
    }

    /// Mark the module with this simple name as the caller's own module.
    pub fn with_current(mut self, simple_name: &str) -> Self {
        self.current = Some(simple_name.to_string());
        self
    }

    pub fn register<I, S>(&mut self, full_name: &str, location: Option<PathBuf>, types: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let handle = ModuleHandle::new(full_name, location);
        let simple = handle.simple_name().to_string();
        let types = types
            .into_iter()
            .map(|name| TypeDescriptor::new(name, full_name))
            .collect();

        if let Some(previous) = self.modules.get(&simple) {
            self.by_full_name.remove(previous.handle.full_name());
        }
        self.by_full_name
            .insert(full_name.to_string(), simple.clone());
        self.modules.insert(simple, RegisteredModule { handle, types });
    }

    /// Look up a type by exact name inside a registered module.
    pub fn type_in(&self, simple_name: &str, type_name: &str) -> Option<TypeDescriptor> {
        self.modules
            .get(simple_name)?
            .types
            .iter()
            .find(|ty| ty.full_name() == type_name)
            .cloned()
    }

    fn by_full(&self, full_name: &str) -> Option<&RegisteredModule> {
        self.by_full_name
            .get(full_name)
            .and_then(|simple| self.modules.get(simple))
    }
}

const INVALID_NAME_CHARS: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

fn validate_name(name: &str) -> Result<(), HostError> {
    if name.trim().is_empty() || name.contains(INVALID_NAME_CHARS) {
        return Err(HostError::Argument(format!("invalid module name '{}'", name)));
    }
    Ok(())
}

impl RuntimeTypeSystem for InMemoryRuntime {
    fn module_owning(&self, ty: &TypeDescriptor) -> Result<ModuleHandle, HostError> {
        self.by_full(ty.module_name())
            .map(|module| module.handle.clone())
            .ok_or_else(|| HostError::TypeLoad(ty.full_name().to_string()))
    }

    fn load_module(&self, name: &str) -> Result<ModuleHandle, HostError> {
        validate_name(name)?;
        self.modules
            .get(name)
            .map(|module| module.handle.clone())
            .ok_or_else(|| HostError::FileNotFound(name.to_string()))
    }

    fn current_module(&self) -> Result<ModuleHandle, HostError> {
        let name = self.current.as_deref().ok_or_else(|| {
            HostError::InvalidOperation("no current module registered".to_string())
        })?;
        self.load_module(name)
    }

    fn types_of(&self, module: &ModuleHandle) -> Result<Vec<TypeDescriptor>, HostError> {
        self.by_full(module.full_name())
            .map(|module| module.types.clone())
            .ok_or_else(|| HostError::FileNotFound(module.full_name().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn runtime() -> InMemoryRuntime {
        InMemoryRuntime::new()
            .with_module("A, Version=1.0.0.0", ["A.Widget", "A.Gadget"])
            .with_module("B", ["B.Widget"])
            .with_current("A")
    }

    #[test]
    fn test_load_by_simple_name() {
        let rt = runtime();
        let a = rt.load_module("A").unwrap();
        assert_eq!(a.full_name(), "A, Version=1.0.0.0");
        assert!(a.ptr_eq(&rt.load_module("A").unwrap()));
    }

    #[test]
    fn test_unknown_and_malformed_names() {
        let rt = runtime();
        assert!(matches!(rt.load_module("Z"), Err(HostError::FileNotFound(_))));
        assert!(matches!(rt.load_module("a/b"), Err(HostError::Argument(_))));
        assert!(matches!(rt.load_module("  "), Err(HostError::Argument(_))));
    }

    #[test]
    fn test_types_follow_registration_order() {
        let rt = runtime();
        let a = rt.load_module("A").unwrap();
        let names: Vec<_> = rt
            .types_of(&a)
            .unwrap()
            .iter()
            .map(|t| t.full_name().to_string())
            .collect();
        assert_eq!(names, vec!["A.Widget", "A.Gadget"]);
    }

    #[test]
    fn test_module_owning_type() {
        let rt = runtime();
        let widget = rt.type_in("B", "B.Widget").unwrap();
        assert_eq!(rt.module_owning(&widget).unwrap().simple_name(), "B");

        let stray = TypeDescriptor::new("C.Thing", "C");
        assert!(matches!(rt.module_owning(&stray), Err(HostError::TypeLoad(_))));
    }

    #[test]
    fn test_current_module_requires_registration() {
        assert_eq!(runtime().current_module().unwrap().simple_name(), "A");
        assert!(matches!(
            InMemoryRuntime::new().current_module(),
            Err(HostError::InvalidOperation(_))
        ));
    }

    #[test]
    fn test_reregistering_replaces_module() {
        let mut rt = runtime();
        rt.register("A, Version=2.0.0.0", None, ["A.Next"]);
        let a = rt.load_module("A").unwrap();
        assert_eq!(a.full_name(), "A, Version=2.0.0.0");
        let stale = ModuleHandle::new("A, Version=1.0.0.0", None);
        assert!(rt.types_of(&stale).is_err());
    }
}
