//! # TCP/UDP connections
//!
//! Sockets are addressed without ID in single connection mode and by [LinkId] in multiple
//! connections mode, s. [set_connection_mode()](Adapter::set_connection_mode).
//!
//! Sending is split in two phases: the payload length gets announced and confirmed by a prompt,
//! then the payload is transmitted. The send methods return [ResponseStatus::Waiting] after the
//! payload was transmitted, the server response (data or connection closed) is then awaited by
//! [poll()](Adapter::poll), [wait()](Adapter::wait) or [check_connection()](Adapter::check_connection).
//!
//! ## Example
//!
//! ````
//! # use esp_at_engine::example::{ExampleTimer, ExampleTransport};
//! # use esp_at_engine::config::Config;
//! # use esp_at_engine::stack::Protocol;
//! # use esp_at_engine::{Adapter, ResponseStatus};
//! # use embedded_io::Write;
//! #
//! let mut adapter: Adapter<_, _, 1_000_000, 512> =
//!     Adapter::initialize(ExampleTransport::default(), ExampleTimer::default(), Config::default()).unwrap();
//!
//! // Creating a TCP connection
//! let status = adapter.connect(Protocol::Tcp, "10.0.0.1", 80).unwrap();
//! assert_eq!(ResponseStatus::Success, status);
//!
//! // Preparing and sending a request
//! let mut body = adapter.request_body();
//! body.write_all(b"GET / HTTP/1.1\r\n").unwrap();
//! assert_eq!(ResponseStatus::Waiting, adapter.send_request_body().unwrap());
//!
//! // Awaiting the server response
//! assert_eq!(ResponseStatus::Success, adapter.wait());
//!
//! // Closing the connection
//! assert_eq!(ResponseStatus::Success, adapter.close());
//! ````
use crate::adapter::{Adapter, ConnectionMode, MAX_CONNECTIONS};
use crate::buffer::{RequestBody, HOST_SCRATCH_SIZE, SEND_SCRATCH_SIZE};
use crate::commands::{
    CloseByIdCommand, CloseCommand, ConnectCommand, MultiConnectCommand, MultiTransmissionPrepareCommand,
    TransmissionPrepareCommand, MAX_HOST_LENGTH,
};
use crate::fmt::{debug, warn};
use crate::parser::contains;
use crate::responses::{ResponseStatus, ALREADY_CONNECTED_MARKER, LINE_END};
use crate::transport::Transport;
use atat::heapless::String;
use fugit_timer::Timer;

/// Transport protocol of a connection. Protocol semantics are handled by the module.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Protocol {
    Tcp,
    Udp,
}

impl Protocol {
    fn as_str(&self) -> &'static str {
        match self {
            Protocol::Tcp => "TCP",
            Protocol::Udp => "UDP",
        }
    }
}

/// ID of a connection in multiple connections mode. Valid by construction: 0 - 4
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LinkId(u8);

impl LinkId {
    /// Returns None if the ID is not in range 0 - 4
    pub fn new(id: u8) -> Option<Self> {
        if usize::from(id) >= MAX_CONNECTIONS {
            return None;
        }

        Some(Self(id))
    }

    pub fn id(&self) -> u8 {
        self.0
    }
}

/// Connection(s) closed by [close_by_id()](Adapter::close_by_id)
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CloseTarget {
    Link(LinkId),
    /// All connections, encoded as ID 5
    All,
}

impl CloseTarget {
    fn id(&self) -> u8 {
        match self {
            CloseTarget::Link(link) => link.id(),
            CloseTarget::All => MAX_CONNECTIONS as u8,
        }
    }
}

/// Local state of a connection
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SocketState {
    #[default]
    Closed,
    /// Connect command issued, no result yet
    Opening,
    Open,
}

/// Errors rejected before transmission
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Remote host exceeds 128 bytes
    HostTooLong,

    /// Payload + line terminator does not fit in the transmit buffer
    PayloadTooLong,
}

impl<T: Transport, C: Timer<TIMER_HZ>, const TIMER_HZ: u32, const TX_SIZE: usize> Adapter<T, C, TIMER_HZ, TX_SIZE> {
    /// Opens a connection in single connection mode and waits for the result.
    /// A connection which is already open is reported as [ResponseStatus::Success].
    pub fn connect(&mut self, protocol: Protocol, host: &str, port: u16) -> Result<ResponseStatus, Error> {
        let host = String::<MAX_HOST_LENGTH>::try_from(host).map_err(|_| Error::HostTooLong)?;
        let command = ConnectCommand::new(protocol.as_str(), host, port);

        self.begin_open(0);
        let status = self.with_scratch_buffer(HOST_SCRATCH_SIZE, |adapter| adapter.execute(&command));
        Ok(self.finish_open(status))
    }

    /// Opens a connection with the given ID in multiple connections mode and waits for the result.
    /// A connection which is already open is reported as [ResponseStatus::Success].
    pub fn connect_by_id(
        &mut self,
        link: LinkId,
        protocol: Protocol,
        host: &str,
        port: u16,
    ) -> Result<ResponseStatus, Error> {
        let host = String::<MAX_HOST_LENGTH>::try_from(host).map_err(|_| Error::HostTooLong)?;
        let command = MultiConnectCommand::new(link.id(), protocol.as_str(), host, port);

        self.begin_open(link.id());
        let status = self.with_scratch_buffer(HOST_SCRATCH_SIZE, |adapter| adapter.execute(&command));
        Ok(self.finish_open(status))
    }

    /// Non-blocking check of the current exchange. An already open connection is reported as
    /// [ResponseStatus::Success].
    pub fn check_connection(&mut self) -> ResponseStatus {
        let status = self.poll();
        self.finish_open(status)
    }

    fn begin_open(&mut self, link_id: u8) {
        self.session.request.link_id = link_id;
        self.session.sockets[usize::from(link_id)] = SocketState::Opening;
    }

    /// Applies the already connected rule and updates the state of an opening socket
    fn finish_open(&mut self, status: ResponseStatus) -> ResponseStatus {
        let status = if status.is_error() && contains(self.response_body(), ALREADY_CONNECTED_MARKER) {
            debug!("Connection already established");
            ResponseStatus::Success
        } else {
            status
        };

        let link_id = usize::from(self.session.request.link_id);
        if self.session.sockets[link_id] == SocketState::Opening {
            match status {
                ResponseStatus::Success => self.session.sockets[link_id] = SocketState::Open,
                ResponseStatus::Error | ResponseStatus::Timeout => self.session.sockets[link_id] = SocketState::Closed,
                ResponseStatus::Waiting => {}
            }
        }

        status
    }

    /// Closes the connection in single connection mode. Returns [ResponseStatus::Error] without
    /// transmitting in multiple connections mode.
    pub fn close(&mut self) -> ResponseStatus {
        if self.session.connection_mode != ConnectionMode::Single {
            warn!("close() requires single connection mode");
            return ResponseStatus::Error;
        }

        let status = self.execute(&CloseCommand);
        if status.is_success() {
            self.session.sockets[0] = SocketState::Closed;
        }

        status
    }

    /// Closes the given connection(s) in multiple connections mode. Returns [ResponseStatus::Error]
    /// without transmitting in single connection mode.
    pub fn close_by_id(&mut self, target: CloseTarget) -> ResponseStatus {
        if self.session.connection_mode != ConnectionMode::Multiple {
            warn!("close_by_id() requires multiple connections mode");
            return ResponseStatus::Error;
        }

        let status = self.execute(&CloseByIdCommand::new(target.id()));
        if status.is_success() {
            match target {
                CloseTarget::Link(link) => self.session.sockets[usize::from(link.id())] = SocketState::Closed,
                CloseTarget::All => self.session.sockets = [SocketState::Closed; MAX_CONNECTIONS],
            }
        }

        status
    }

    /// Local state of the given connection. Single connection mode uses ID 0.
    pub fn socket_state(&self, link: LinkId) -> SocketState {
        self.session.sockets[usize::from(link.id())]
    }

    /// Sends the given message in single connection mode. The line terminator gets appended.
    pub fn send(&mut self, data: &[u8]) -> Result<ResponseStatus, Error> {
        let length = self.message_length(data)?;
        self.session.request.link_id = 0;

        let status = self.execute(&TransmissionPrepareCommand::new(length));
        self.send_message(status, data)
    }

    /// Sends the given message on the given connection in multiple connections mode. The line terminator gets appended.
    pub fn send_by_id(&mut self, link: LinkId, data: &[u8]) -> Result<ResponseStatus, Error> {
        let length = self.message_length(data)?;
        self.session.request.link_id = link.id();

        let status = self.execute(&MultiTransmissionPrepareCommand::new(link.id(), length));
        self.send_message(status, data)
    }

    fn message_length(&mut self, data: &[u8]) -> Result<usize, Error> {
        self.session.request.data_length = 0;

        let length = data.len() + LINE_END.len();
        if length > TX_SIZE {
            warn!("Message of {} bytes exceeds transmit buffer", data.len());
            return Err(Error::PayloadTooLong);
        }

        Ok(length)
    }

    /// Writes message + terminator to the shared buffer and transmits it once the prompt was received
    fn send_message(&mut self, status: ResponseStatus, data: &[u8]) -> Result<ResponseStatus, Error> {
        if !status.is_success() {
            return Ok(status);
        }

        let length = data.len() + LINE_END.len();
        self.tx_buffer.fill(0);
        self.tx_buffer[..data.len()].copy_from_slice(data);
        self.tx_buffer[data.len()..length].copy_from_slice(LINE_END);
        self.tx_length = length;

        Ok(self.transmit_payload(length))
    }

    /// Returns a writer for the payload of the next [send_request_body()](Self::send_request_body) call.
    /// The shared transmit buffer gets cleared.
    pub fn request_body(&mut self) -> RequestBody<'_> {
        RequestBody::new(&mut self.tx_buffer, &mut self.tx_length)
    }

    /// Overrides the payload length of the next body transmission. 0 => length of the written content
    pub fn set_request_length(&mut self, length: usize) {
        self.session.request.data_length = length;
    }

    /// Transmits the prepared request body in single connection mode
    pub fn send_request_body(&mut self) -> Result<ResponseStatus, Error> {
        self.session.request.link_id = 0;
        self.send_prepared(None)
    }

    /// Transmits the prepared request body on the given connection in multiple connections mode
    pub fn send_request_body_by_id(&mut self, link: LinkId) -> Result<ResponseStatus, Error> {
        self.session.request.link_id = link.id();
        self.send_prepared(Some(link))
    }

    fn send_prepared(&mut self, link: Option<LinkId>) -> Result<ResponseStatus, Error> {
        let content = match self.session.request.data_length {
            0 => self.tx_length,
            length => length,
        };

        let length = content + LINE_END.len();
        if length > TX_SIZE {
            self.session.request.data_length = 0;
            warn!("Request body of {} bytes exceeds transmit buffer", content);
            return Err(Error::PayloadTooLong);
        }

        let status = self.with_scratch_buffer(SEND_SCRATCH_SIZE, |adapter| {
            adapter.session.request.data_length = 0;

            match link {
                Some(link) => adapter.execute(&MultiTransmissionPrepareCommand::new(link.id(), length)),
                None => adapter.execute(&TransmissionPrepareCommand::new(length)),
            }
        });

        if !status.is_success() {
            return Ok(status);
        }

        self.tx_buffer[content..length].copy_from_slice(LINE_END);
        self.tx_length = length;
        Ok(self.transmit_payload(length))
    }

    /// Transmits the first `length` bytes of the shared buffer and awaits the server response
    fn transmit_payload(&mut self, length: usize) -> ResponseStatus {
        if let Err(status) = self.start_deadline() {
            return status;
        }

        self.transport.clear_receive_buffer();
        self.session.response.server_response_awaited = true;
        self.transport.arm_receive();

        debug!("Transmitting payload of {} bytes", length);
        self.transport.transmit(&self.tx_buffer[..length]);
        ResponseStatus::Waiting
    }
}
