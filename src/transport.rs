//! # Byte transport
//!
//! The engine never touches UART or DMA registers. It relies only on this capability, which is
//! typically implemented by a DMA driven serial port: transmit a block, arm a receive transfer
//! into a fixed receive region and report when the transfer completed (e.g. on line idle).
use core::fmt::Debug;

/// Serial transport used by [Adapter](crate::Adapter)
pub trait Transport {
    /// Error when bringing up the transport
    type Error: Debug;

    /// Brings up the transport (peripheral clocks, DMA streams, ...)
    fn start(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Releases the transport. Called once on teardown or on failed initialization.
    fn stop(&mut self) {}

    /// Starts transmission of the given bytes
    fn transmit(&mut self, data: &[u8]);

    /// (Re)arms the receive transfer. Received bytes get appended to the receive buffer.
    fn arm_receive(&mut self);

    /// Returns true if the armed receive transfer completed
    fn is_receive_complete(&mut self) -> bool;

    /// Content received since the receive buffer was cleared the last time
    fn receive_buffer(&self) -> &[u8];

    /// Discards the receive buffer content
    fn clear_receive_buffer(&mut self);
}
