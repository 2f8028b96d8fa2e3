//! # Response classification
//!
//! Markers are matched against the whole accumulated receive buffer, as the transport delivers
//! data in bursts with unpredictable boundaries.
use crate::parser::contains;
use atat::atat_derive::AtatResp;

/// Commands which gets just responded by OK
#[derive(Clone, AtatResp)]
pub struct NoResponse;

pub(crate) const OK_MARKER: &[u8] = b"\r\nOK\r\n";
pub(crate) const SEND_OK_MARKER: &[u8] = b"\r\nSEND OK\r\n";
pub(crate) const DATA_RECEIVED_MARKER: &[u8] = b"+IPD,";
pub(crate) const CLOSED_MARKER: &[u8] = b"CLOSED\r\n";
pub(crate) const ERROR_MARKER: &[u8] = b"\r\nERROR\r\n";
pub(crate) const FAIL_MARKER: &[u8] = b"\r\nFAIL\r\n";
pub(crate) const PROMPT_MARKER: &[u8] = b">";
pub(crate) const ALREADY_CONNECTED_MARKER: &[u8] = b"ALREADY CONNECTED";
pub(crate) const LINE_END: &[u8] = b"\r\n";

/// Classification of the current command exchange
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ResponseStatus {
    /// Command was confirmed by the module (OK, SEND OK, prompt or server data)
    Success,

    /// No classifiable content received yet
    Waiting,

    /// Module responded with ERROR or FAIL
    Error,

    /// Response deadline passed
    Timeout,
}

impl ResponseStatus {
    pub fn is_success(&self) -> bool {
        *self == Self::Success
    }

    pub fn is_waiting(&self) -> bool {
        *self == Self::Waiting
    }

    pub fn is_error(&self) -> bool {
        *self == Self::Error
    }

    pub fn is_timeout(&self) -> bool {
        *self == Self::Timeout
    }

    /// True for every state except [ResponseStatus::Waiting]
    pub fn is_terminal(&self) -> bool {
        !self.is_waiting()
    }
}

/// Classifies a completed receive transfer. Returns None if the buffer contains no known marker.
///
/// Server responses (after a payload transmission) are never classified as error.
pub(crate) fn classify(body: &[u8], server_response: bool) -> Option<ResponseStatus> {
    if server_response {
        if contains(body, CLOSED_MARKER) || contains(body, DATA_RECEIVED_MARKER) {
            return Some(ResponseStatus::Success);
        }

        return None;
    }

    if contains(body, OK_MARKER) || contains(body, SEND_OK_MARKER) || contains(body, PROMPT_MARKER) {
        return Some(ResponseStatus::Success);
    }

    if contains(body, ERROR_MARKER) || contains(body, FAIL_MARKER) {
        return Some(ResponseStatus::Error);
    }

    None
}
