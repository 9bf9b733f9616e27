//! # Handler Thread Loop
//!
//! The single dedicated worker behind the frontend. Each iteration blocks
//! on the fault channel and the shutdown signal, then either services one
//! fault to completion or exits. Serializing all faults through one thread
//! is what makes the tag table and the frontend mappings race-free without
//! locks.

use std::os::fd::AsRawFd;

use log::{debug, error, warn};
use userfaultfd::{Event, Uffd};

use super::engine::CacheEngine;
use crate::sys::{wait_readable, EventFd, WaitOutcome};

/// Runs the fault-service loop until shutdown is signalled or the fault
/// channel fails.
pub(crate) fn run(channel: &Uffd, shutdown: &EventFd, engine: &mut CacheEngine) {
    debug!("fault handler running");

    loop {
        match wait_readable(channel.as_raw_fd(), shutdown.as_raw_fd()) {
            WaitOutcome::Retry => continue,
            WaitOutcome::Shutdown => {
                shutdown.get();
                debug!("shutdown signal observed; fault handler exiting");
                break;
            }
            WaitOutcome::ChannelError => {
                warn!("fault channel error condition; fault handler exiting");
                break;
            }
            WaitOutcome::Fault => {}
        }

        let event = match channel.read_event() {
            Ok(Some(event)) => event,
            // Raced with a wake that carried no message.
            Ok(None) => continue,
            Err(err) => {
                warn!("fault channel read failed: {err}");
                continue;
            }
        };

        let Event::Pagefault { addr, .. } = event else {
            // Only missing-page faults are subscribed; anything else
            // (fork, remap, remove notifications) is not ours to act on.
            continue;
        };

        if let Err(err) = engine.service(channel, addr as usize) {
            // The faulting access stays blocked; nothing more can be done
            // for it from here.
            error!("fault at {:#x} not serviced: {err:#}", addr as usize);
        }
    }
}
