//! Host runtime seam: module handles, type descriptors and the reflection
//! facility that produces them.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::HostError;
use crate::naming::simple_name;

#[derive(Debug)]
struct ModuleData {
    full_name: String,
    location: Option<PathBuf>,
}

/// Shared, read-only reference to a loaded program module.
///
/// Clones are cheap and point at the same underlying module. Equality and
/// hashing use the full qualified name; use [`ModuleHandle::ptr_eq`] for
/// identity.
#[derive(Clone)]
pub struct ModuleHandle {
    inner: Arc<ModuleData>,
}

impl ModuleHandle {
    pub fn new(full_name: impl Into<String>, location: Option<PathBuf>) -> Self {
        Self {
            inner: Arc::new(ModuleData {
                full_name: full_name.into(),
                location,
            }),
        }
    }

    /// Qualified name, e.g. `Billing, Version=1.0.0.0, Culture=neutral`
    pub fn full_name(&self) -> &str {
        &self.inner.full_name
    }

    /// The name without version or culture qualifiers, e.g. `Billing`
    pub fn simple_name(&self) -> &str {
        simple_name(&self.inner.full_name)
    }

    /// Where the module was loaded from, if the host knows it.
    pub fn location(&self) -> Option<&Path> {
        self.inner.location.as_deref()
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl PartialEq for ModuleHandle {
    fn eq(&self, other: &Self) -> bool {
        self.inner.full_name == other.inner.full_name
    }
}

impl Eq for ModuleHandle {}

impl Hash for ModuleHandle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.full_name.hash(state);
    }
}

impl fmt::Debug for ModuleHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleHandle")
            .field("full_name", &self.inner.full_name)
            .field("location", &self.inner.location)
            .finish()
    }
}

impl fmt::Display for ModuleHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.inner.full_name)
    }
}

/// Reference to one type definition within a module.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeDescriptor {
    inner: Arc<TypeData>,
}

#[derive(Debug, PartialEq, Eq, Hash)]
struct TypeData {
    full_name: String,
    module: String,
}

impl TypeDescriptor {
    /// `module` is the full name of the owning module.
    pub fn new(full_name: impl Into<String>, module: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(TypeData {
                full_name: full_name.into(),
                module: module.into(),
            }),
        }
    }

    /// Namespace-qualified type name, e.g. `Billing.Invoice`
    pub fn full_name(&self) -> &str {
        &self.inner.full_name
    }

    /// Full name of the owning module
    pub fn module_name(&self) -> &str {
        &self.inner.module
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.inner.full_name)
    }
}

/// Anything able to report its own runtime type.
pub trait Instance {
    fn runtime_type(&self) -> TypeDescriptor;
}

impl Instance for TypeDescriptor {
    fn runtime_type(&self) -> TypeDescriptor {
        self.clone()
    }
}

/// The host reflection facility.
///
/// Implementations perform the actual loading; the cache only remembers what
/// they return.
pub trait RuntimeTypeSystem: Send + Sync {
    /// The module that defines `ty`
    fn module_owning(&self, ty: &TypeDescriptor) -> Result<ModuleHandle, HostError>;

    /// Load a module by simple name
    fn load_module(&self, name: &str) -> Result<ModuleHandle, HostError>;

    /// The module the calling code belongs to
    fn current_module(&self) -> Result<ModuleHandle, HostError>;

    /// Every type defined by `module`, in native enumeration order
    fn types_of(&self, module: &ModuleHandle) -> Result<Vec<TypeDescriptor>, HostError>;
}

impl<T: RuntimeTypeSystem + ?Sized> RuntimeTypeSystem for Arc<T> {
    fn module_owning(&self, ty: &TypeDescriptor) -> Result<ModuleHandle, HostError> {
        (**self).module_owning(ty)
    }

    fn load_module(&self, name: &str) -> Result<ModuleHandle, HostError> {
        (**self).load_module(name)
    }

    fn current_module(&self) -> Result<ModuleHandle, HostError> {
        (**self).current_module()
    }

    fn types_of(&self, module: &ModuleHandle) -> Result<Vec<TypeDescriptor>, HostError> {
        (**self).types_of(module)
    }
}
