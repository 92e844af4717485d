//! Process resource gauges.
//!
//! - `process_cpu_seconds_total`: user plus system CPU time (Unix)
//! - `process_resident_memory_bytes`, `process_virtual_memory_bytes`:
//!   `VmRSS`/`VmSize` from `/proc/self/status` (Linux)
//! - `process_open_fds`: entries of `/proc/self/fd` (Linux)
//!
//! A gauge that cannot be read on the current platform is left out of the
//! output.

use std::fmt::Write as _;

const CPU_METRIC: &str = "process_cpu_seconds_total";
const RESIDENT_MEMORY_METRIC: &str = "process_resident_memory_bytes";
const VIRTUAL_MEMORY_METRIC: &str = "process_virtual_memory_bytes";
const OPEN_FDS_METRIC: &str = "process_open_fds";

/// One sample of the process gauges.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ProcessStats {
    /// User plus system CPU time in seconds.
    pub cpu_seconds: Option<f64>,
    /// Resident set size in bytes.
    pub resident_memory_bytes: Option<u64>,
    /// Virtual memory size in bytes.
    pub virtual_memory_bytes: Option<u64>,
    /// Number of open file descriptors.
    pub open_fds: Option<u64>,
}

impl ProcessStats {
    /// Samples the current process.
    #[must_use]
    pub fn collect() -> Self {
        let status = read_proc_status();
        Self {
            cpu_seconds: cpu_seconds(),
            resident_memory_bytes: status
                .as_deref()
                .and_then(|status| status_bytes(status, "VmRSS:")),
            virtual_memory_bytes: status
                .as_deref()
                .and_then(|status| status_bytes(status, "VmSize:")),
            open_fds: open_fds(),
        }
    }

    /// Appends the available gauges in Prometheus text format.
    pub fn render_into(&self, output: &mut String) {
        if let Some(seconds) = self.cpu_seconds {
            write_sample(
                output,
                CPU_METRIC,
                "Total user and system CPU time spent in seconds.",
                "counter",
                seconds,
            );
        }
        if let Some(bytes) = self.resident_memory_bytes {
            write_sample(
                output,
                RESIDENT_MEMORY_METRIC,
                "Resident memory size in bytes.",
                "gauge",
                bytes,
            );
        }
        if let Some(bytes) = self.virtual_memory_bytes {
            write_sample(
                output,
                VIRTUAL_MEMORY_METRIC,
                "Virtual memory size in bytes.",
                "gauge",
                bytes,
            );
        }
        if let Some(count) = self.open_fds {
            write_sample(
                output,
                OPEN_FDS_METRIC,
                "Number of open file descriptors.",
                "gauge",
                count,
            );
        }
    }
}

fn write_sample(
    output: &mut String,
    name: &str,
    help: &str,
    kind: &str,
    value: impl std::fmt::Display,
) {
    // Writing to a String cannot fail.
    let _ = writeln!(output, "# HELP {name} {help}");
    let _ = writeln!(output, "# TYPE {name} {kind}");
    let _ = writeln!(output, "{name} {value}");
}

/// Reads a `kB` field of `/proc/self/status` and converts it to bytes.
///
/// Format: `VmRSS:     12345 kB`
fn status_bytes(status: &str, key: &str) -> Option<u64> {
    let line = status.lines().find(|line| line.starts_with(key))?;
    let kilobytes: u64 = line.split_whitespace().nth(1)?.parse().ok()?;
    kilobytes.checked_mul(1024)
}

#[cfg(target_os = "linux")]
fn read_proc_status() -> Option<String> {
    std::fs::read_to_string("/proc/self/status").ok()
}

#[cfg(not(target_os = "linux"))]
const fn read_proc_status() -> Option<String> {
    None
}

#[cfg(target_os = "linux")]
fn open_fds() -> Option<u64> {
    let entries = std::fs::read_dir("/proc/self/fd").ok()?;
    u64::try_from(entries.count()).ok()
}

#[cfg(not(target_os = "linux"))]
const fn open_fds() -> Option<u64> {
    None
}

#[cfg(unix)]
#[allow(unsafe_code)]
#[allow(clippy::cast_precision_loss)]
fn cpu_seconds() -> Option<f64> {
    use std::mem::MaybeUninit;

    let mut usage = MaybeUninit::<libc::rusage>::uninit();

    // SAFETY: getrusage only writes into the provided rusage struct, and the
    // struct is read only after the call reports success.
    let usage = unsafe {
        if libc::getrusage(libc::RUSAGE_SELF, usage.as_mut_ptr()) != 0 {
            return None;
        }
        usage.assume_init()
    };

    let seconds = |time: libc::timeval| time.tv_sec as f64 + time.tv_usec as f64 / 1_000_000.0;
    Some(seconds(usage.ru_utime) + seconds(usage.ru_stime))
}

#[cfg(not(unix))]
const fn cpu_seconds() -> Option<f64> {
    None
}
