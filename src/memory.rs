//! Memory sampling and heap reclamation hooks.
//!
//! The adaptive manager never reads memory statistics itself. It asks a
//! [`MemorySampler`] for a [`MemoryUsage`] snapshot each poll and, under
//! critical pressure, asks a [`HeapReclaimer`] to hand freed memory back.
//!
//! | Type | Purpose |
//! |------|---------|
//! | [`SystemMemorySampler`] | system-wide usage from `/proc/meminfo` (Linux) |
//! | [`FixedMemorySampler`] | settable usage for tests and simulations |
//! | [`NoopReclaimer`] | reclaim hint that does nothing |
//!
//! Any `Fn() + Send + Sync` closure is also a [`HeapReclaimer`], which is the
//! usual way to plug in an allocator-specific purge.

use crate::error::SampleError;
use core::fmt;
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

/// A point-in-time view of memory consumption.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryUsage {
    /// Bytes in use.
    pub used_bytes: u64,
    /// Bytes available in total.
    pub total_bytes: u64,
}

const PERCENT_SCALE: u64 = 1_000_000;

impl MemoryUsage {
    /// Creates a snapshot from byte counts.
    pub fn new(used_bytes: u64, total_bytes: u64) -> Self {
        Self {
            used_bytes,
            total_bytes,
        }
    }

    /// Creates a synthetic snapshot at the given usage percentage.
    ///
    /// Values outside `[0, 100]` are clamped.
    pub fn from_percent(percent: f64) -> Self {
        let percent = if percent.is_nan() {
            0.0
        } else {
            percent.clamp(0.0, 100.0)
        };
        Self {
            used_bytes: (percent * (PERCENT_SCALE / 100) as f64).round() as u64,
            total_bytes: PERCENT_SCALE,
        }
    }

    /// Usage as a percentage in `[0, 100]`; 0 when the total is unknown.
    pub fn percent(&self) -> f64 {
        if self.total_bytes == 0 {
            return 0.0;
        }
        let used = self.used_bytes.min(self.total_bytes);
        used as f64 * 100.0 / self.total_bytes as f64
    }
}

/// Source of memory usage snapshots.
pub trait MemorySampler: Send + Sync {
    /// Takes one sample.
    fn sample(&self) -> Result<MemoryUsage, SampleError>;
}

/// Hook invoked after a critical-pressure sweep to return freed memory to
/// the operating system.
pub trait HeapReclaimer: Send + Sync {
    /// Requests reclamation. Best effort; must not panic.
    fn reclaim(&self);
}

/// A reclaimer that does nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopReclaimer;

impl HeapReclaimer for NoopReclaimer {
    fn reclaim(&self) {}
}

impl<F> HeapReclaimer for F
where
    F: Fn() + Send + Sync,
{
    fn reclaim(&self) {
        (self)()
    }
}

/// Samples system-wide memory usage.
///
/// Reads `MemTotal` and `MemAvailable` from `/proc/meminfo`; kernels that
/// predate `MemAvailable` fall back to `MemFree + Buffers + Cached`. Other
/// platforms report [`SampleError::Unsupported`].
#[derive(Debug, Clone)]
pub struct SystemMemorySampler {
    path: PathBuf,
}

impl SystemMemorySampler {
    /// Samples `/proc/meminfo`.
    pub fn new() -> Self {
        Self {
            path: PathBuf::from("/proc/meminfo"),
        }
    }

    /// Samples a meminfo-formatted file at `path`.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Default for SystemMemorySampler {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySampler for SystemMemorySampler {
    #[cfg(target_os = "linux")]
    fn sample(&self) -> Result<MemoryUsage, SampleError> {
        let contents = std::fs::read_to_string(&self.path)?;
        parse_meminfo(&contents)
    }

    #[cfg(not(target_os = "linux"))]
    fn sample(&self) -> Result<MemoryUsage, SampleError> {
        Err(SampleError::Unsupported)
    }
}

/// Parses the `/proc/meminfo` format (values in kB).
pub(crate) fn parse_meminfo(contents: &str) -> Result<MemoryUsage, SampleError> {
    let mut total = None;
    let mut available = None;
    let mut free = None;
    let mut buffers = None;
    let mut cached = None;

    for line in contents.lines() {
        let mut fields = line.split_whitespace();
        let (Some(label), Some(value)) = (fields.next(), fields.next()) else {
            continue;
        };
        let slot = match label {
            "MemTotal:" => &mut total,
            "MemAvailable:" => &mut available,
            "MemFree:" => &mut free,
            "Buffers:" => &mut buffers,
            "Cached:" => &mut cached,
            _ => continue,
        };
        let kb = value
            .parse::<u64>()
            .map_err(|_| SampleError::Malformed(format!("bad value in line {line:?}")))?;
        *slot = Some(kb.saturating_mul(1024));
    }

    let total = total.ok_or_else(|| SampleError::Malformed("missing MemTotal".to_string()))?;
    let available = match (available, free) {
        (Some(available), _) => available,
        (None, Some(free)) => free
            .saturating_add(buffers.unwrap_or(0))
            .saturating_add(cached.unwrap_or(0)),
        (None, None) => {
            return Err(SampleError::Malformed(
                "missing MemAvailable and MemFree".to_string(),
            ))
        }
    };
    if total == 0 {
        return Err(SampleError::Malformed("MemTotal is zero".to_string()));
    }

    Ok(MemoryUsage::new(
        total.saturating_sub(available.min(total)),
        total,
    ))
}

/// A sampler that reports whatever it was last told.
///
/// ```
/// use adaptive_cache::memory::{FixedMemorySampler, MemorySampler};
///
/// let sampler = FixedMemorySampler::new(40.0);
/// assert_eq!(sampler.sample().unwrap().percent(), 40.0);
/// sampler.set_percent(90.0);
/// assert_eq!(sampler.sample().unwrap().percent(), 90.0);
/// ```
pub struct FixedMemorySampler {
    usage: Mutex<Option<MemoryUsage>>,
    samples: AtomicU64,
}

impl FixedMemorySampler {
    /// Creates a sampler reporting `percent` usage.
    pub fn new(percent: f64) -> Self {
        Self {
            usage: Mutex::new(Some(MemoryUsage::from_percent(percent))),
            samples: AtomicU64::new(0),
        }
    }

    /// Changes the reported usage.
    pub fn set_percent(&self, percent: f64) {
        *self.usage.lock() = Some(MemoryUsage::from_percent(percent));
    }

    /// Changes the reported usage to an exact snapshot.
    pub fn set_usage(&self, usage: MemoryUsage) {
        *self.usage.lock() = Some(usage);
    }

    /// Makes every following sample fail until a usage is set again.
    pub fn set_unavailable(&self) {
        *self.usage.lock() = None;
    }

    /// Number of samples taken so far.
    pub fn samples_taken(&self) -> u64 {
        self.samples.load(Ordering::Relaxed)
    }
}

impl MemorySampler for FixedMemorySampler {
    fn sample(&self) -> Result<MemoryUsage, SampleError> {
        self.samples.fetch_add(1, Ordering::Relaxed);
        (*self.usage.lock()).ok_or(SampleError::Unsupported)
    }
}

impl fmt::Debug for FixedMemorySampler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FixedMemorySampler")
            .field("usage", &*self.usage.lock())
            .field("samples", &self.samples_taken())
            .finish()
    }
}
