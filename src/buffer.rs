//! # Transmit buffer redirection
//!
//! The adapter owns one shared transmit buffer of `TX_SIZE` bytes, which holds either the current
//! command or the payload prepared by the caller. Commands whose arguments may not fit, or which
//! must not overwrite a prepared payload, are encoded into a small scratch region instead.
//!
//! Retargeting is done exclusively by [ScratchLease], which restores the previous target when
//! dropped. So the target is restored exactly once on every exit path.
use crate::adapter::Adapter;
use crate::commands::{
    ConnectCommand, MultiConnectCommand, MultiTransmissionPrepareCommand, PingCommand, TransmissionPrepareCommand,
};
use crate::fmt::trace;
use crate::transport::Transport;
use atat::AtatCmd;
use core::ops::{Deref, DerefMut};
use fugit_timer::Timer;

pub(crate) const fn max(a: usize, b: usize) -> usize {
    if a > b {
        a
    } else {
        b
    }
}

/// Scratch capacity for commands carrying a host name
pub(crate) const HOST_SCRATCH_SIZE: usize = max(
    max(ConnectCommand::MAX_LEN, MultiConnectCommand::MAX_LEN),
    PingCommand::MAX_LEN,
);

/// Scratch capacity for payload length announcements
pub(crate) const SEND_SCRATCH_SIZE: usize = max(
    TransmissionPrepareCommand::MAX_LEN,
    MultiTransmissionPrepareCommand::MAX_LEN,
);

/// Total size of the scratch region
pub(crate) const SCRATCH_SIZE: usize = max(HOST_SCRATCH_SIZE, SEND_SCRATCH_SIZE);

/// Memory region commands are currently encoded to
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TxRegion {
    /// Shared transmit buffer, also holding the request payload
    Shared,
    /// Scratch region for short lived commands
    Scratch,
}

/// Current transmit buffer: region + usable capacity
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TxTarget {
    pub region: TxRegion,
    pub capacity: usize,
}

impl TxTarget {
    pub(crate) fn shared(capacity: usize) -> Self {
        Self {
            region: TxRegion::Shared,
            capacity,
        }
    }
}

/// Scoped redirection of the transmit buffer to the scratch region
pub(crate) struct ScratchLease<'a, T: Transport, C: Timer<TIMER_HZ>, const TIMER_HZ: u32, const TX_SIZE: usize> {
    adapter: &'a mut Adapter<T, C, TIMER_HZ, TX_SIZE>,

    /// Target before the lease was acquired
    saved: TxTarget,
}

impl<'a, T: Transport, C: Timer<TIMER_HZ>, const TIMER_HZ: u32, const TX_SIZE: usize>
    ScratchLease<'a, T, C, TIMER_HZ, TX_SIZE>
{
    pub(crate) fn acquire(adapter: &'a mut Adapter<T, C, TIMER_HZ, TX_SIZE>, capacity: usize) -> Self {
        let saved = adapter.session.request.target;
        adapter.session.request.target = TxTarget {
            region: TxRegion::Scratch,
            capacity: capacity.min(SCRATCH_SIZE),
        };

        trace!("Transmit buffer redirected to scratch region ({} bytes)", capacity.min(SCRATCH_SIZE));
        Self { adapter, saved }
    }
}

impl<T: Transport, C: Timer<TIMER_HZ>, const TIMER_HZ: u32, const TX_SIZE: usize> Drop
    for ScratchLease<'_, T, C, TIMER_HZ, TX_SIZE>
{
    fn drop(&mut self) {
        self.adapter.session.request.target = self.saved;
        trace!("Transmit buffer restored");
    }
}

impl<T: Transport, C: Timer<TIMER_HZ>, const TIMER_HZ: u32, const TX_SIZE: usize> Deref
    for ScratchLease<'_, T, C, TIMER_HZ, TX_SIZE>
{
    type Target = Adapter<T, C, TIMER_HZ, TX_SIZE>;

    fn deref(&self) -> &Self::Target {
        self.adapter
    }
}

impl<T: Transport, C: Timer<TIMER_HZ>, const TIMER_HZ: u32, const TX_SIZE: usize> DerefMut
    for ScratchLease<'_, T, C, TIMER_HZ, TX_SIZE>
{
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.adapter
    }
}

/// Writer filling the shared transmit buffer with the payload of the next
/// [send_request_body()](Adapter::send_request_body) call.
///
/// Two bytes are always kept free for the line terminator appended on transmission.
pub struct RequestBody<'a> {
    buffer: &'a mut [u8],
    length: &'a mut usize,
}

impl<'a> RequestBody<'a> {
    /// Clears the given buffer and starts writing at its beginning
    pub(crate) fn new(buffer: &'a mut [u8], length: &'a mut usize) -> Self {
        buffer.fill(0);
        *length = 0;
        Self { buffer, length }
    }

    /// Remaining space in bytes
    pub fn remaining(&self) -> usize {
        self.buffer.len().saturating_sub(2).saturating_sub(*self.length)
    }

    /// Number of bytes written so far
    pub fn len(&self) -> usize {
        *self.length
    }

    pub fn is_empty(&self) -> bool {
        *self.length == 0
    }

    /// Appends as many bytes as fit and returns the count
    fn append(&mut self, data: &[u8]) -> usize {
        let count = data.len().min(self.remaining());
        let start = *self.length;

        self.buffer[start..start + count].copy_from_slice(&data[..count]);
        *self.length += count;
        count
    }
}

impl embedded_io::ErrorType for RequestBody<'_> {
    type Error = embedded_io::ErrorKind;
}

impl embedded_io::Write for RequestBody<'_> {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        if buf.is_empty() {
            return Ok(0);
        }

        match self.append(buf) {
            0 => Err(embedded_io::ErrorKind::OutOfMemory),
            count => Ok(count),
        }
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl core::fmt::Write for RequestBody<'_> {
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        if s.len() > self.remaining() {
            return Err(core::fmt::Error);
        }

        self.append(s.as_bytes());
        Ok(())
    }
}
