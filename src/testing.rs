//! Call-counting and handle-tracking test doubles for the OS collaborators

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::platform::{
    CommandOutput, CommandRunner, DirEntryInfo, FileSystem, OsError, ProcessControl,
    RegistryLocation, RegistryReader, RegistryValue, ServiceControl, ServiceRunState, TrimHandle,
};
use crate::telemetry::{MemoryStats, ProcessEntry, TelemetryError, TelemetryProvider};

pub const GB: u64 = 1024 * 1024 * 1024;

// ============================================================================
// Telemetry
// ============================================================================

pub struct FakeProvider {
    pub cpu: Result<f32, TelemetryError>,
    pub memory: Result<MemoryStats, TelemetryError>,
    pub disk: Result<u64, TelemetryError>,
    pub temperature: Option<f32>,
    pub processes: Result<Vec<ProcessEntry>, TelemetryError>,
    memory_reads: AtomicUsize,
    temperature_reads: AtomicUsize,
    disk_paths: Mutex<Vec<PathBuf>>,
}

impl FakeProvider {
    pub fn healthy() -> Self {
        Self {
            cpu: Ok(25.0),
            memory: Ok(MemoryStats {
                total_bytes: 16 * GB,
                available_bytes: 4 * GB,
            }),
            disk: Ok(100 * GB),
            temperature: Some(48.5),
            processes: Ok(Vec::new()),
            memory_reads: AtomicUsize::new(0),
            temperature_reads: AtomicUsize::new(0),
            disk_paths: Mutex::new(Vec::new()),
        }
    }

    pub fn with_processes(pids: &[u32]) -> Self {
        Self {
            processes: Ok(pids
                .iter()
                .map(|&pid| ProcessEntry {
                    pid,
                    name: format!("proc{}.exe", pid),
                })
                .collect()),
            ..Self::healthy()
        }
    }

    pub fn memory_reads(&self) -> usize {
        self.memory_reads.load(Ordering::SeqCst)
    }

    pub fn temperature_reads(&self) -> usize {
        self.temperature_reads.load(Ordering::SeqCst)
    }

    pub fn disk_paths(&self) -> Vec<PathBuf> {
        self.disk_paths.lock().unwrap().clone()
    }
}

impl TelemetryProvider for FakeProvider {
    fn cpu_percent(&self) -> Result<f32, TelemetryError> {
        self.cpu.clone()
    }

    fn memory_stats(&self) -> Result<MemoryStats, TelemetryError> {
        self.memory_reads.fetch_add(1, Ordering::SeqCst);
        self.memory.clone()
    }

    fn disk_free(&self, path: &Path) -> Result<u64, TelemetryError> {
        self.disk_paths.lock().unwrap().push(path.to_path_buf());
        self.disk.clone()
    }

    fn temperature(&self) -> Option<f32> {
        self.temperature_reads.fetch_add(1, Ordering::SeqCst);
        self.temperature
    }

    fn list_processes(&self) -> Result<Vec<ProcessEntry>, TelemetryError> {
        self.processes.clone()
    }
}

// ============================================================================
// Processes
// ============================================================================

/// Counts every handle opened and released.
#[derive(Default)]
pub struct TrackingProcessControl {
    pub fail_open: HashSet<u32>,
    pub fail_trim: HashSet<u32>,
    opened: AtomicUsize,
    released: AtomicUsize,
    trimmed: Mutex<Vec<u32>>,
    open_attempts: Mutex<Vec<u32>>,
}

impl TrackingProcessControl {
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    pub fn trimmed(&self) -> Vec<u32> {
        self.trimmed.lock().unwrap().clone()
    }

    pub fn open_attempts(&self) -> Vec<u32> {
        self.open_attempts.lock().unwrap().clone()
    }
}

struct TrackedHandle<'a> {
    pid: u32,
    owner: &'a TrackingProcessControl,
}

impl TrimHandle for TrackedHandle<'_> {
    fn trim(&self) -> Result<(), OsError> {
        if self.owner.fail_trim.contains(&self.pid) {
            return Err(OsError::System {
                code: 5,
                message: format!("trim refused for {}", self.pid),
            });
        }
        self.owner.trimmed.lock().unwrap().push(self.pid);
        Ok(())
    }
}

impl Drop for TrackedHandle<'_> {
    fn drop(&mut self) {
        self.owner.released.fetch_add(1, Ordering::SeqCst);
    }
}

impl ProcessControl for TrackingProcessControl {
    fn open_for_trim(&self, pid: u32) -> Result<Box<dyn TrimHandle + '_>, OsError> {
        self.open_attempts.lock().unwrap().push(pid);
        if self.fail_open.contains(&pid) {
            return Err(OsError::AccessDenied(format!("protected process {}", pid)));
        }
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(TrackedHandle { pid, owner: self }))
    }
}

// ============================================================================
// Services
// ============================================================================

#[derive(Default)]
pub struct FakeServices {
    pub states: HashMap<String, Result<ServiceRunState, OsError>>,
    pub fail_stop: HashSet<String>,
    queries: AtomicUsize,
    stops: Mutex<Vec<String>>,
}

impl FakeServices {
    pub fn with_states(states: &[(&str, ServiceRunState)]) -> Self {
        Self {
            states: states
                .iter()
                .map(|(name, state)| (name.to_string(), Ok(*state)))
                .collect(),
            ..Default::default()
        }
    }

    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    pub fn stops(&self) -> Vec<String> {
        self.stops.lock().unwrap().clone()
    }
}

impl ServiceControl for FakeServices {
    fn query_state(&self, name: &str) -> Result<ServiceRunState, OsError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        self.states
            .get(name)
            .cloned()
            .unwrap_or_else(|| Err(OsError::NotFound(format!("service {}", name))))
    }

    fn stop(&self, name: &str) -> Result<(), OsError> {
        self.stops.lock().unwrap().push(name.to_string());
        if self.fail_stop.contains(name) {
            return Err(OsError::System {
                code: 1051,
                message: "dependent services are running".into(),
            });
        }
        Ok(())
    }
}

// ============================================================================
// Registry
// ============================================================================

#[derive(Default)]
pub struct FakeRegistry {
    pub keys: HashMap<RegistryLocation, Result<Vec<RegistryValue>, OsError>>,
    reads: Mutex<Vec<RegistryLocation>>,
}

impl FakeRegistry {
    pub fn insert(&mut self, location: RegistryLocation, values: &[(&str, &str)]) {
        let values = values
            .iter()
            .map(|(name, data)| RegistryValue {
                name: name.to_string(),
                data: data.to_string(),
            })
            .collect();
        self.keys.insert(location, Ok(values));
    }

    pub fn reads(&self) -> Vec<RegistryLocation> {
        self.reads.lock().unwrap().clone()
    }
}

impl RegistryReader for FakeRegistry {
    fn read_values(&self, location: &RegistryLocation) -> Result<Vec<RegistryValue>, OsError> {
        self.reads.lock().unwrap().push(location.clone());
        self.keys
            .get(location)
            .cloned()
            .unwrap_or_else(|| Err(OsError::NotFound(location.to_string())))
    }
}

// ============================================================================
// Filesystem
// ============================================================================

/// In-memory directory tree where selected entries refuse deletion.
#[derive(Default)]
pub struct FakeFileSystem {
    pub dirs: HashMap<PathBuf, Vec<DirEntryInfo>>,
    pub unreadable: HashSet<PathBuf>,
    pub locked: HashSet<PathBuf>,
    pub files: HashSet<PathBuf>,
    removed: Mutex<Vec<PathBuf>>,
}

impl FakeFileSystem {
    pub fn add_root(&mut self, root: &str, files: &[&str], dirs: &[&str]) {
        let root = PathBuf::from(root);
        let mut entries: Vec<DirEntryInfo> = files
            .iter()
            .map(|name| DirEntryInfo {
                path: root.join(name),
                is_dir: false,
            })
            .collect();
        entries.extend(dirs.iter().map(|name| DirEntryInfo {
            path: root.join(name),
            is_dir: true,
        }));
        self.dirs.insert(root, entries);
    }

    pub fn lock(&mut self, path: &str) {
        self.locked.insert(PathBuf::from(path));
    }

    pub fn removed(&self) -> Vec<PathBuf> {
        self.removed.lock().unwrap().clone()
    }

    fn remove(&self, path: &Path) -> Result<(), OsError> {
        if self.locked.contains(path) {
            return Err(OsError::AccessDenied(format!(
                "{} is in use by another process",
                path.display()
            )));
        }
        self.removed.lock().unwrap().push(path.to_path_buf());
        Ok(())
    }
}

impl FileSystem for FakeFileSystem {
    fn exists(&self, path: &Path) -> bool {
        self.dirs.contains_key(path) || self.unreadable.contains(path) || self.files.contains(path)
    }

    fn list_dir(&self, path: &Path) -> Result<Vec<DirEntryInfo>, OsError> {
        if self.unreadable.contains(path) {
            return Err(OsError::AccessDenied(path.display().to_string()));
        }
        self.dirs
            .get(path)
            .cloned()
            .ok_or_else(|| OsError::NotFound(path.display().to_string()))
    }

    fn remove_file(&self, path: &Path) -> Result<(), OsError> {
        self.remove(path)
    }

    fn remove_dir_all(&self, path: &Path) -> Result<(), OsError> {
        self.remove(path)
    }
}

// ============================================================================
// Commands
// ============================================================================

pub struct FakeRunner {
    pub output: Result<CommandOutput, OsError>,
    pub delay: Duration,
    calls: Mutex<Vec<Vec<String>>>,
}

impl FakeRunner {
    pub fn succeeding() -> Self {
        Self::returning(Ok(CommandOutput {
            success: true,
            code: Some(0),
            stdout: "Successfully flushed the DNS Resolver Cache.".into(),
            stderr: String::new(),
        }))
    }

    pub fn failing(stderr: &str) -> Self {
        Self::returning(Ok(CommandOutput {
            success: false,
            code: Some(1),
            stdout: String::new(),
            stderr: stderr.into(),
        }))
    }

    pub fn returning(output: Result<CommandOutput, OsError>) -> Self {
        Self {
            output,
            delay: Duration::ZERO,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }
}

impl CommandRunner for FakeRunner {
    fn run(&self, program: &Path, args: &[&str]) -> Result<CommandOutput, OsError> {
        let mut call = vec![program.display().to_string()];
        call.extend(args.iter().map(|a| a.to_string()));
        self.calls.lock().unwrap().push(call);
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        self.output.clone()
    }
}
