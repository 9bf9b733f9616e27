//! # Two-Descriptor Wait
//!
//! The handler thread blocks in exactly one place: a `poll(2)` over the
//! fault channel and the shutdown signal, with an infinite timeout. This
//! module owns that wait and the classification of its result, so the
//! handler loop itself stays a straight-line disposition on [`WaitOutcome`].

use std::os::fd::RawFd;

/// Classification of one return from the blocking wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The fault channel has a notification queued.
    Fault,
    /// The shutdown signal was raised; the handler must exit.
    Shutdown,
    /// The fault channel reported an error condition; the handler must exit.
    ChannelError,
    /// Spurious wake or signal interrupt; restart the wait.
    Retry,
}

/// Blocks until the fault channel or the shutdown signal becomes readable.
///
/// Shutdown is checked before the fault channel: when both fire in the same
/// wake, teardown wins and any queued faults are abandoned (their callers
/// are required to have quiesced by then).
pub fn wait_readable(fault_fd: RawFd, shutdown_fd: RawFd) -> WaitOutcome {
    let mut fds = [
        libc::pollfd {
            fd: fault_fd,
            events: libc::POLLIN,
            revents: 0,
        },
        libc::pollfd {
            fd: shutdown_fd,
            events: libc::POLLIN,
            revents: 0,
        },
    ];

    let nready = unsafe { libc::poll(fds.as_mut_ptr(), fds.len() as libc::nfds_t, -1) };
    if nready < 0 {
        // EINTR and friends: not an error for an infinite wait.
        return WaitOutcome::Retry;
    }

    if fds[1].revents != 0 {
        return WaitOutcome::Shutdown;
    }

    let fault_revents = fds[0].revents;
    if fault_revents & (libc::POLLERR | libc::POLLHUP | libc::POLLNVAL) != 0 {
        return WaitOutcome::ChannelError;
    }
    if fault_revents & libc::POLLIN != 0 {
        return WaitOutcome::Fault;
    }

    WaitOutcome::Retry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sys::EventFd;
    use std::os::fd::AsRawFd;

    #[test]
    fn test_fault_fd_readable_reports_fault() {
        let fault = EventFd::new().unwrap();
        let shutdown = EventFd::new().unwrap();

        fault.put();

        let outcome = wait_readable(fault.as_raw_fd(), shutdown.as_raw_fd());
        assert_eq!(outcome, WaitOutcome::Fault);
    }

    #[test]
    fn test_shutdown_wins_over_pending_fault() {
        let fault = EventFd::new().unwrap();
        let shutdown = EventFd::new().unwrap();

        fault.put();
        shutdown.put();

        let outcome = wait_readable(fault.as_raw_fd(), shutdown.as_raw_fd());
        assert_eq!(outcome, WaitOutcome::Shutdown);
    }

    #[test]
    fn test_broken_fault_fd_reports_channel_error() {
        let shutdown = EventFd::new().unwrap();

        // The write end of a pipe whose read end is gone polls back POLLERR.
        let mut pipe_fds = [0 as RawFd; 2];
        let ret = unsafe { libc::pipe(pipe_fds.as_mut_ptr()) };
        assert_eq!(ret, 0);
        unsafe { libc::close(pipe_fds[0]) };

        let outcome = wait_readable(pipe_fds[1], shutdown.as_raw_fd());
        assert_eq!(outcome, WaitOutcome::ChannelError);

        unsafe { libc::close(pipe_fds[1]) };
    }
}
