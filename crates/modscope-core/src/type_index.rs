//! Type lookup across the solution
//!
//! [`TypeIndex`] answers substring and exact-name queries over every type in
//! the solution snapshot. The index is built once, on first use, from the
//! same snapshot [`ModuleCache::all_modules`] returns.

use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use tracing::debug;

use crate::cache::ModuleCache;
use crate::error::ResolveError;
use crate::runtime::{ModuleHandle, TypeDescriptor};

/// Which definition an exact-name lookup returns when several modules define
/// a type with the same qualified name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicatePolicy {
    FirstWins,
    LastWins,
}

/// The later module in discovery order shadows earlier ones.
pub const DUPLICATE_TYPE_POLICY: DuplicatePolicy = DuplicatePolicy::LastWins;

#[derive(Debug, Default)]
struct IndexedTypes {
    /// discovery order, then each module's native order
    ordered: Vec<TypeDescriptor>,
    by_name: HashMap<String, TypeDescriptor>,
}

impl IndexedTypes {
    fn build(cache: &ModuleCache, modules: &[ModuleHandle]) -> Result<Self, ResolveError> {
        let mut index = Self::default();
        for module in modules {
            for ty in cache.types_of(module)? {
                match DUPLICATE_TYPE_POLICY {
                    DuplicatePolicy::LastWins => {
                        index.by_name.insert(ty.full_name().to_string(), ty.clone());
                    }
                    DuplicatePolicy::FirstWins => {
                        index
                            .by_name
                            .entry(ty.full_name().to_string())
                            .or_insert_with(|| ty.clone());
                    }
                }
                index.ordered.push(ty);
            }
        }
        debug!(
            "Indexed {} types from {} modules",
            index.ordered.len(),
            modules.len()
        );
        Ok(index)
    }
}

/// Query surface over the types of every module in the solution.
pub struct TypeIndex {
    cache: Arc<ModuleCache>,
    index: OnceCell<IndexedTypes>,
}

impl TypeIndex {
    pub fn new(cache: Arc<ModuleCache>) -> Self {
        Self {
            cache,
            index: OnceCell::new(),
        }
    }

    pub fn cache(&self) -> &Arc<ModuleCache> {
        &self.cache
    }

    fn index(&self) -> Result<&IndexedTypes, ResolveError> {
        self.index.get_or_try_init(|| {
            let modules = self.cache.all_modules()?;
            IndexedTypes::build(&self.cache, &modules)
        })
    }

    /// Every type in the solution, in discovery order.
    pub fn all_types(&self) -> Result<Vec<TypeDescriptor>, ResolveError> {
        Ok(self.index()?.ordered.clone())
    }

    /// Types whose qualified name contains `substring`.
    ///
    /// With `module` set only that module is scanned; otherwise every module
    /// in the solution is. No match yields an empty list.
    pub fn types_containing(
        &self,
        substring: &str,
        module: Option<&ModuleHandle>,
    ) -> Result<Vec<TypeDescriptor>, ResolveError> {
        let wanted = |ty: &TypeDescriptor| ty.full_name().contains(substring);

        match module {
            Some(module) => Ok(self
                .cache
                .types_of(module)?
                .into_iter()
                .filter(|ty| wanted(ty))
                .collect()),
            None => Ok(self
                .index()?
                .ordered
                .iter()
                .filter(|ty| wanted(*ty))
                .cloned()
                .collect()),
        }
    }

    /// The type with qualified name `name`; see [`DUPLICATE_TYPE_POLICY`].
    pub fn type_named(&self, name: &str) -> Result<TypeDescriptor, ResolveError> {
        self.index()?
            .by_name
            .get(name)
            .cloned()
            .ok_or_else(|| ResolveError::not_found(format!("no module defines type '{}'", name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ResolverConfig;
    use crate::error::ErrorKind;
    use crate::memory::InMemoryRuntime;

    const SOLUTION: &str = "Microsoft Visual Studio Solution File, Format Version 12.00
Project(\"{FAE04EC0-301F-11D3-BF4B-00C04F79EFBC}\") = \"Core\", \"Core\\Core.csproj\", \"{00000000-0000-0000-0000-000000000001}\"
EndProject
Project(\"{FAE04EC0-301F-11D3-BF4B-00C04F79EFBC}\") = \"Plugins\", \"Plugins\\Plugins.csproj\", \"{00000000-0000-0000-0000-000000000002}\"
EndProject
";

    #[test]
    fn test_shadowed_type_resolves_to_later_module() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Suite.sln"), SOLUTION).unwrap();

        let runtime = InMemoryRuntime::new()
            .with_module("Core", ["Shared.Options", "Core.Engine"])
            .with_module("Plugins", ["Shared.Options"]);
        let cache = ModuleCache::builder(runtime)
            .config(ResolverConfig::default().with_search_root(dir.path()))
            .build();
        let index = TypeIndex::new(Arc::new(cache));

        assert_eq!(DUPLICATE_TYPE_POLICY, DuplicatePolicy::LastWins);
        let options = index.type_named("Shared.Options").unwrap();
        assert_eq!(options.module_name(), "Plugins");
        assert_eq!(index.all_types().unwrap().len(), 3);

        let err = index.type_named("Shared").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
