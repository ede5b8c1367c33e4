//! Multi-keyed module resolution cache
//!
//! [`ModuleCache`] resolves module handles by type, by name, by instance, or
//! for the caller's own module, and remembers every successful resolution
//! for the lifetime of the cache. It also builds, once, the snapshot of every
//! module listed in the enclosing solution's manifest.
//!
//! Each map resolves a given key at most once even under concurrent callers;
//! see [`crate::singleflight`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::ResolverConfig;
use crate::discovery::SolutionDiscovery;
use crate::error::ResolveError;
use crate::manifest::{ManifestParser, SolutionFileParser};
use crate::naming::name_length;
use crate::runtime::{Instance, ModuleHandle, RuntimeTypeSystem, TypeDescriptor};
use crate::singleflight::{Lookup, SingleFlight};

/// Ordered handles of every module in the solution, built once.
pub type SolutionSnapshot = Arc<[ModuleHandle]>;

/// Counters describing cache effectiveness.
///
/// A name or instance lookup counts once, not once per map it touches.
/// Building the solution snapshot also counts each project it resolves.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Lookups served from a populated entry
    pub hits: u64,
    /// Lookups that ran a resolution
    pub misses: u64,
    /// Lookups that waited on another caller's resolution
    pub joined: u64,
    /// Calls made into the host runtime
    pub host_calls: u64,
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    joined: AtomicU64,
    host_calls: AtomicU64,
}

impl Counters {
    fn record(&self, lookup: Lookup) {
        let counter = match lookup {
            Lookup::Hit => &self.hits,
            Lookup::Resolved => &self.misses,
            Lookup::Joined => &self.joined,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn host_call(&self) {
        self.host_calls.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            joined: self.joined.load(Ordering::Relaxed),
            host_calls: self.host_calls.load(Ordering::Relaxed),
        }
    }
}

/// Builder for [`ModuleCache`]
pub struct ModuleCacheBuilder {
    runtime: Arc<dyn RuntimeTypeSystem>,
    parser: Arc<dyn ManifestParser>,
    config: ResolverConfig,
}

impl ModuleCacheBuilder {
    pub fn parser(mut self, parser: impl ManifestParser + 'static) -> Self {
        self.parser = Arc::new(parser);
        self
    }

    pub fn config(mut self, config: ResolverConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> ModuleCache {
        ModuleCache {
            runtime: self.runtime,
            parser: self.parser,
            config: self.config,
            by_type: SingleFlight::new(),
            by_name: SingleFlight::new(),
            name_by_type: SingleFlight::new(),
            solution: SingleFlight::new(),
            counters: Counters::default(),
        }
    }
}

/// Memoizing resolver over a host runtime.
///
/// Construct one per process (or per host runtime) and share it behind an
/// [`Arc`]. Entries are never evicted.
pub struct ModuleCache {
    runtime: Arc<dyn RuntimeTypeSystem>,
    parser: Arc<dyn ManifestParser>,
    config: ResolverConfig,
    by_type: SingleFlight<TypeDescriptor, ModuleHandle>,
    by_name: SingleFlight<String, ModuleHandle>,
    name_by_type: SingleFlight<TypeDescriptor, String>,
    solution: SingleFlight<(), SolutionSnapshot>,
    counters: Counters,
}

impl ModuleCache {
    /// Cache over `runtime` with the `.sln` parser and default config.
    pub fn new(runtime: impl RuntimeTypeSystem + 'static) -> Self {
        Self::builder(runtime).build()
    }

    pub fn builder(runtime: impl RuntimeTypeSystem + 'static) -> ModuleCacheBuilder {
        ModuleCacheBuilder {
            runtime: Arc::new(runtime),
            parser: Arc::new(SolutionFileParser::new()),
            config: ResolverConfig::default(),
        }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub fn stats(&self) -> CacheStats {
        self.counters.snapshot()
    }

    /// The caller's own module. Not cached; the host answers directly.
    pub fn current_module(&self) -> Result<ModuleHandle, ResolveError> {
        self.counters.host_call();
        Ok(self.runtime.current_module()?)
    }

    /// Module defining `ty`, or the caller's own module when `ty` is `None`.
    pub fn resolve_by_type(&self, ty: Option<&TypeDescriptor>) -> Result<ModuleHandle, ResolveError> {
        let Some(ty) = ty else {
            return self.current_module();
        };

        let (outcome, lookup) = self.owning_module(ty);
        self.counters.record(lookup);
        outcome
    }

    fn owning_module(&self, ty: &TypeDescriptor) -> (Result<ModuleHandle, ResolveError>, Lookup) {
        self.by_type.get_or_resolve(ty, || {
            debug!("Resolving module owning {}", ty);
            self.counters.host_call();
            Ok(self.runtime.module_owning(ty)?)
        })
    }

    /// Module with simple name `name`, or the caller's own module when `name`
    /// is `None` or empty.
    ///
    /// Modules already resolved by type are reused before the by-name map is
    /// consulted.
    pub fn resolve_by_name(&self, name: Option<&str>) -> Result<ModuleHandle, ResolveError> {
        let name = match name {
            Some(name) if !name.is_empty() => name,
            _ => return self.current_module(),
        };

        if let Some(handle) = self.by_type.find(|handle| handle.simple_name() == name) {
            self.counters.record(Lookup::Hit);
            return Ok(handle);
        }

        let (outcome, lookup) = self.by_name.get_or_resolve(&name.to_string(), || {
            debug!("Loading module {}", name);
            self.counters.host_call();
            Ok(self.runtime.load_module(name)?)
        });
        self.counters.record(lookup);
        outcome
    }

    /// Module defining the runtime type of `instance`, or the caller's own
    /// module when `instance` is `None`.
    pub fn resolve_by_instance(
        &self,
        instance: Option<&dyn Instance>,
    ) -> Result<ModuleHandle, ResolveError> {
        match instance {
            Some(instance) => self.resolve_by_type(Some(&instance.runtime_type())),
            None => self.current_module(),
        }
    }

    pub fn current_module_name(&self) -> Result<String, ResolveError> {
        Ok(self.current_module()?.simple_name().to_string())
    }

    /// Simple name of the module defining `ty`, cached per type.
    pub fn name_of_type(&self, ty: Option<&TypeDescriptor>) -> Result<String, ResolveError> {
        let Some(ty) = ty else {
            return self.current_module_name();
        };

        let (outcome, lookup) = self.name_by_type.get_or_resolve(ty, || {
            let (outcome, _) = self.owning_module(ty);
            outcome.map(|handle| handle.simple_name().to_string())
        });
        self.counters.record(lookup);
        outcome
    }

    pub fn name_of_module(&self, handle: Option<&ModuleHandle>) -> Result<String, ResolveError> {
        match handle {
            Some(handle) => Ok(handle.simple_name().to_string()),
            None => self.current_module_name(),
        }
    }

    pub fn name_of_instance(&self, instance: Option<&dyn Instance>) -> Result<String, ResolveError> {
        match instance {
            Some(instance) => self.name_of_type(Some(&instance.runtime_type())),
            None => self.current_module_name(),
        }
    }

    /// See [`crate::naming::name_length`].
    pub fn name_length_of_type(&self, ty: Option<&TypeDescriptor>) -> Result<usize, ResolveError> {
        Ok(name_length(&self.name_of_type(ty)?))
    }

    pub fn name_length_of_module(
        &self,
        handle: Option<&ModuleHandle>,
    ) -> Result<usize, ResolveError> {
        Ok(name_length(&self.name_of_module(handle)?))
    }

    pub fn name_length_of_instance(
        &self,
        instance: Option<&dyn Instance>,
    ) -> Result<usize, ResolveError> {
        Ok(name_length(&self.name_of_instance(instance)?))
    }

    /// Every module of the enclosing solution, in manifest order.
    ///
    /// The first call discovers the manifest and resolves each project by
    /// name; later calls return the same snapshot even if the manifest has
    /// since changed.
    pub fn all_modules(&self) -> Result<SolutionSnapshot, ResolveError> {
        let (outcome, lookup) = self
            .solution
            .get_or_resolve(&(), || self.build_solution_snapshot());
        self.counters.record(lookup);
        outcome
    }

    /// Simple names of every module in the solution snapshot.
    pub fn module_names(&self) -> Result<Vec<String>, ResolveError> {
        Ok(self
            .all_modules()?
            .iter()
            .map(|handle| handle.simple_name().to_string())
            .collect())
    }

    /// Every type defined by `module`, in the host's enumeration order.
    pub fn types_of(&self, module: &ModuleHandle) -> Result<Vec<TypeDescriptor>, ResolveError> {
        self.counters.host_call();
        Ok(self.runtime.types_of(module)?)
    }

    fn build_solution_snapshot(&self) -> Result<SolutionSnapshot, ResolveError> {
        let mut discovery = SolutionDiscovery::new(self.config.manifest_extension.as_str());
        if let Some(root) = &self.config.search_root {
            discovery = discovery.starting_at(root.clone());
        }

        let manifest = discovery.find_manifest()?;
        let projects = self.parser.parse(&manifest).map_err(ResolveError::classify)?;
        debug!("Manifest {:?} lists {} projects", manifest, projects.len());

        let modules = projects
            .iter()
            .filter(|name| self.config.accepts_module(name))
            .map(|name| self.resolve_by_name(Some(name.as_str())))
            .collect::<Result<Vec<_>, _>>()?;

        info!(
            "Built solution snapshot from {:?} with {} modules",
            manifest,
            modules.len()
        );
        Ok(modules.into())
    }
}
