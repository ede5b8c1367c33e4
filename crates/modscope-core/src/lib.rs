//! Memoizing resolution of program modules and the types they define
//!
//! Modules are resolved by type, by name, by object instance, or as the
//! caller's own module, through a host [`RuntimeTypeSystem`]. Every
//! successful resolution is remembered for the lifetime of the
//! [`ModuleCache`], and each key is resolved at most once even under
//! concurrent callers. The modules of the enclosing solution are discovered
//! by walking up from the working directory to the nearest manifest.

pub mod cache;
pub mod config;
pub mod discovery;
pub mod error;
pub mod manifest;
pub mod memory;
pub mod naming;
pub mod runtime;
pub mod singleflight;
pub mod type_index;

pub use cache::{CacheStats, ModuleCache, ModuleCacheBuilder, SolutionSnapshot};
pub use config::ResolverConfig;
pub use discovery::SolutionDiscovery;
pub use error::{ConfigError, ErrorKind, HostError, ResolveError};
pub use manifest::{ManifestParser, SolutionFileParser, SolutionProject};
pub use memory::InMemoryRuntime;
pub use runtime::{Instance, ModuleHandle, RuntimeTypeSystem, TypeDescriptor};
pub use type_index::{DuplicatePolicy, TypeIndex, DUPLICATE_TYPE_POLICY};
