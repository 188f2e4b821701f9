use sysinfo::{Pid, System};

/// Samples the resident set size of the current process.
pub struct MemoryProbe {
    pid: Option<Pid>,
    system: parking_lot::Mutex<System>,
}

impl MemoryProbe {
    pub fn new() -> Self {
        Self {
            pid: sysinfo::get_current_pid().ok(),
            system: parking_lot::Mutex::new(System::new()),
        }
    }

    /// Current RSS in bytes, `None` where the platform cannot report it.
    pub fn rss_bytes(&self) -> Option<u64> {
        let pid = self.pid?;
        let mut system = self.system.lock();
        if !system.refresh_process(pid) {
            return None;
        }
        system.process(pid).map(|process| process.memory())
    }
}

impl Default for MemoryProbe {
    fn default() -> Self {
        Self::new()
    }
}

/// Bytes to GiB for log fields.
pub fn as_gib(bytes: u64) -> f64 {
    bytes as f64 / (1024.0 * 1024.0 * 1024.0)
}
