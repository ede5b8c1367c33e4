//! Test fixtures for modscope
//!
//! Provides temporary solution trees on disk and a host runtime that counts
//! how often it is asked to load something.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use modscope_core::{HostError, InMemoryRuntime, ModuleHandle, RuntimeTypeSystem, TypeDescriptor};
use parking_lot::Mutex;

const CSHARP_PROJECT: &str = "FAE04EC0-301F-11D3-BF4B-00C04F79EFBC";

/// Render a solution file listing `projects` in order.
pub fn solution_content(projects: &[&str]) -> String {
    let mut content = String::from(
        "Microsoft Visual Studio Solution File, Format Version 12.00\n# Visual Studio Version 17\n",
    );
    for (i, project) in projects.iter().enumerate() {
        content.push_str(&format!(
            "Project(\"{{{kind}}}\") = \"{name}\", \"src\\{name}\\{name}.csproj\", \"{{00000000-0000-0000-0000-{id:012}}}\"\nEndProject\n",
            kind = CSHARP_PROJECT,
            name = project,
            id = i + 1,
        ));
    }
    content.push_str("Global\nEndGlobal\n");
    content
}

/// A temporary directory tree holding a solution.
pub struct SolutionTree {
    dir: tempfile::TempDir,
}

impl Default for SolutionTree {
    fn default() -> Self {
        Self::new()
    }
}

impl SolutionTree {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    /// Tree with `Solution.sln` at its root listing `projects`.
    pub fn with_projects(projects: &[&str]) -> Self {
        let tree = Self::new();
        tree.write_solution("", "Solution.sln", projects);
        tree
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Create `relative` (and parents) under the root.
    pub fn dir(&self, relative: &str) -> PathBuf {
        let path = self.root().join(relative);
        fs::create_dir_all(&path).unwrap();
        path
    }

    /// Write a solution file into `relative_dir`, replacing any existing one.
    pub fn write_solution(&self, relative_dir: &str, file_name: &str, projects: &[&str]) -> PathBuf {
        let path = self.dir(relative_dir).join(file_name);
        fs::write(&path, solution_content(projects)).unwrap();
        path
    }
}

/// Host runtime that counts calls and can be slowed down or made to fail.
pub struct CountingRuntime {
    inner: InMemoryRuntime,
    delay: Option<Duration>,
    failures: HashMap<String, fn() -> HostError>,
    module_owning: AtomicUsize,
    load_module: AtomicUsize,
    current_module: AtomicUsize,
    types_of: AtomicUsize,
    loads_by_name: Mutex<HashMap<String, usize>>,
}

impl CountingRuntime {
    pub fn new(inner: InMemoryRuntime) -> Self {
        Self {
            inner,
            delay: None,
            failures: HashMap::new(),
            module_owning: AtomicUsize::new(0),
            load_module: AtomicUsize::new(0),
            current_module: AtomicUsize::new(0),
            types_of: AtomicUsize::new(0),
            loads_by_name: Mutex::new(HashMap::new()),
        }
    }

    /// Sleep this long inside every load, to widen race windows.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Loading `name` fails with the error `failure` builds.
    pub fn failing(mut self, name: &str, failure: fn() -> HostError) -> Self {
        self.failures.insert(name.to_string(), failure);
        self
    }

    pub fn module_owning_calls(&self) -> usize {
        self.module_owning.load(Ordering::SeqCst)
    }

    pub fn load_module_calls(&self) -> usize {
        self.load_module.load(Ordering::SeqCst)
    }

    pub fn current_module_calls(&self) -> usize {
        self.current_module.load(Ordering::SeqCst)
    }

    pub fn types_of_calls(&self) -> usize {
        self.types_of.load(Ordering::SeqCst)
    }

    pub fn loads_of(&self, name: &str) -> usize {
        self.loads_by_name.lock().get(name).copied().unwrap_or(0)
    }

    fn pause(&self) {
        if let Some(delay) = self.delay {
            thread::sleep(delay);
        }
    }
}

impl RuntimeTypeSystem for CountingRuntime {
    fn module_owning(&self, ty: &TypeDescriptor) -> Result<ModuleHandle, HostError> {
        self.module_owning.fetch_add(1, Ordering::SeqCst);
        self.pause();
        self.inner.module_owning(ty)
    }

    fn load_module(&self, name: &str) -> Result<ModuleHandle, HostError> {
        self.load_module.fetch_add(1, Ordering::SeqCst);
        *self.loads_by_name.lock().entry(name.to_string()).or_default() += 1;
        self.pause();
        if let Some(failure) = self.failures.get(name) {
            return Err(failure());
        }
        self.inner.load_module(name)
    }

    fn current_module(&self) -> Result<ModuleHandle, HostError> {
        self.current_module.fetch_add(1, Ordering::SeqCst);
        self.inner.current_module()
    }

    fn types_of(&self, module: &ModuleHandle) -> Result<Vec<TypeDescriptor>, HostError> {
        self.types_of.fetch_add(1, Ordering::SeqCst);
        self.inner.types_of(module)
    }
}
