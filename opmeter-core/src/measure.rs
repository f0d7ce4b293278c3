//! Timing and Measurement Hygiene
//!
//! A stopwatch around one engine call, the best-effort quiescence point taken
//! before each measured repetition, and optional CPU pinning of the measuring
//! thread. Timestamps are `std::time::Instant` throughout; the collector reads
//! the same clock on every step.

use std::io;
use std::time::{Duration, Instant};

/// Stopwatch around a single engine call
pub struct Timer {
    start: Instant,
}

impl Timer {
    /// Start a new timer
    #[inline(always)]
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Wall time since [`Timer::start`]
    #[inline(always)]
    pub fn stop(&self) -> Duration {
        self.start.elapsed()
    }
}

/// Best-effort quiescence point before a measured repetition.
///
/// Returns freed heap pages to the allocator's backing store (glibc only) and
/// yields the time slice. Rust has no collector to force, so this narrows but
/// does not remove timing noise from prior allocation pressure.
pub fn quiesce() {
    #[cfg(all(target_os = "linux", target_env = "gnu"))]
    {
        // SAFETY: malloc_trim only walks the allocator's free lists.
        unsafe {
            libc::malloc_trim(0);
        }
    }
    std::thread::yield_now();
}

/// Pin the calling thread to core `cpu`.
///
/// Core indices at or past `CPU_SETSIZE` are rejected as invalid input.
#[cfg(target_os = "linux")]
pub fn pin_to_cpu(cpu: usize) -> io::Result<()> {
    if cpu >= libc::CPU_SETSIZE as usize {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("cpu index {cpu} out of range (max {})", libc::CPU_SETSIZE - 1),
        ));
    }

    // SAFETY: cpu_set_t is plain bit storage and all-zero is the empty set;
    // `cpu` is in range, and pid 0 targets the calling thread.
    let rc = unsafe {
        let mut set: libc::cpu_set_t = std::mem::zeroed();
        libc::CPU_SET(cpu, &mut set);
        libc::sched_setaffinity(0, std::mem::size_of_val(&set), &set)
    };
    if rc == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

/// Pin the current thread to a specific core (unsupported here, always succeeds)
#[cfg(not(target_os = "linux"))]
pub fn pin_to_cpu(_cpu: usize) -> io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timer() {
        let timer = Timer::start();
        std::thread::sleep(Duration::from_millis(10));
        let elapsed = timer.stop();

        assert!(elapsed >= Duration::from_millis(5));
        assert!(elapsed < Duration::from_secs(5));
    }

    #[test]
    fn test_timer_is_monotonic() {
        let timer = Timer::start();
        let first = timer.stop();
        let second = timer.stop();
        assert!(second >= first);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_pin_rejects_out_of_range_cpu() {
        let err = pin_to_cpu(usize::MAX).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }

    #[test]
    fn test_quiesce_returns() {
        let garbage: Vec<Vec<u8>> = (0..64).map(|i| vec![0u8; 1024 * i]).collect();
        drop(garbage);
        quiesce();
    }
}
