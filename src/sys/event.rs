//! # Shutdown Signal
//!
//! `EventFd` owns a kernel `eventfd(2)` descriptor. It is the wake primitive
//! that breaks the handler thread out of its blocking `poll(2)` at teardown:
//! settable from any thread, pollable like any other descriptor, drained at
//! most once during shutdown.

use std::io;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};

use eyre::{ensure, Result};

/// A cross-thread wake primitive backed by an eventfd.
///
/// `put` is semantically idempotent for waking purposes: one or more puts
/// yield at least one readable event on the descriptor.
#[derive(Debug)]
pub struct EventFd {
    fd: OwnedFd,
}

impl EventFd {
    /// Creates a non-blocking, close-on-exec eventfd with a zero counter.
    pub fn new() -> Result<Self> {
        let fd = unsafe { libc::eventfd(0, libc::EFD_NONBLOCK | libc::EFD_CLOEXEC) };
        ensure!(
            fd >= 0,
            "eventfd creation failed: {}",
            io::Error::last_os_error()
        );

        // SAFETY: fd was just returned by eventfd() and checked valid; this
        // OwnedFd is its sole owner and will close it on drop.
        Ok(Self {
            fd: unsafe { OwnedFd::from_raw_fd(fd) },
        })
    }

    /// Adds 1 to the counter, making the descriptor poll readable.
    ///
    /// Safe to call from any thread. Errors are ignored: the only caller is
    /// shutdown, where a failed write is indistinguishable from a wake that
    /// raced with one already pending.
    pub fn put(&self) {
        let increment: u64 = 1;
        let ret = unsafe {
            libc::write(
                self.fd.as_raw_fd(),
                &increment as *const u64 as *const libc::c_void,
                std::mem::size_of::<u64>(),
            )
        };
        if ret < 0 {
            log::warn!(
                "eventfd wake write failed: {}",
                io::Error::last_os_error()
            );
        }
    }

    /// Drains the counter, returning its value, or 0 if nothing was pending.
    pub fn get(&self) -> u64 {
        let mut value: u64 = 0;
        let ret = unsafe {
            libc::read(
                self.fd.as_raw_fd(),
                &mut value as *mut u64 as *mut libc::c_void,
                std::mem::size_of::<u64>(),
            )
        };
        if ret < 0 {
            return 0;
        }
        value
    }
}

impl AsRawFd for EventFd {
    fn as_raw_fd(&self) -> RawFd {
        self.fd.as_raw_fd()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sys::poll::{wait_readable, WaitOutcome};

    #[test]
    fn test_put_makes_fd_readable() {
        let shutdown = EventFd::new().unwrap();
        let other = EventFd::new().unwrap();

        shutdown.put();

        // The shutdown slot is checked first, so a pending put is observed
        // even when the other descriptor is silent.
        let outcome = wait_readable(other.as_raw_fd(), shutdown.as_raw_fd());
        assert_eq!(outcome, WaitOutcome::Shutdown);
    }

    #[test]
    fn test_get_drains_counter() {
        let event = EventFd::new().unwrap();

        event.put();
        event.put();
        assert_eq!(event.get(), 2);

        // Counter is empty now; non-blocking read reports nothing pending.
        assert_eq!(event.get(), 0);
    }

    #[test]
    fn test_put_from_another_thread() {
        let event = std::sync::Arc::new(EventFd::new().unwrap());

        let remote = std::sync::Arc::clone(&event);
        std::thread::spawn(move || remote.put()).join().unwrap();

        let spare = EventFd::new().unwrap();
        let outcome = wait_readable(spare.as_raw_fd(), event.as_raw_fd());
        assert_eq!(outcome, WaitOutcome::Shutdown);
    }
}
