//! # WIFI station and soft AP
//!
//! Joining a network, scanning, address information, soft AP hosting and ping.
//!
//! Note: Joining is non-blocking. [join()](Adapter::join) just issues the command, the result gets
//! observed by polling [join_status()](Adapter::join_status) until it leaves
//! [JoinStatus::WaitingForConnection].
//!
//! ## Example
//!
//! ````
//! # use esp_at_engine::example::{ExampleTimer, ExampleTransport};
//! # use esp_at_engine::config::Config;
//! # use esp_at_engine::wifi::JoinStatus;
//! # use esp_at_engine::Adapter;
//! #
//! let mut adapter: Adapter<_, _, 1_000_000, 512> =
//!     Adapter::initialize(ExampleTransport::default(), ExampleTimer::default(), Config::default()).unwrap();
//!
//! // Setting target WIFI access point
//! let mut status = adapter.join("test_wifi", "secret").unwrap();
//!
//! // Waiting until the access point accepted the credentials
//! while status == JoinStatus::WaitingForConnection {
//!     status = adapter.join_status();
//! }
//! assert_eq!(JoinStatus::Connected, status);
//!
//! let info = adapter.local_info().unwrap();
//! assert_eq!("10.0.0.181", info.station_ip.unwrap().to_string());
//! assert_eq!("10:fe:ed:05:ba:50", info.station_mac.unwrap().to_string());
//! ````
use crate::adapter::Adapter;
use crate::buffer::HOST_SCRATCH_SIZE;
use crate::commands::{
    AccessPointConnectCommand, ConnectionStatusCommand, DisconnectCommand, ListAccessPointsCommand,
    ListClientsCommand, ObtainLocalAddressCommand, PingCommand, SoftApAddressCommand, SoftApConfigCommand,
    SoftApQueryCommand, StoredAccessPointConnectCommand, StoredSoftApConfigCommand, MAX_HOST_LENGTH,
};
use crate::fmt::{debug, warn};
use crate::parser::{
    contains, parse_ping_time, AccessPointList, Encryption, LocalInfo, Roster, SoftApClient, PING_TIMEOUT,
};
use crate::responses::{classify, ResponseStatus};
use crate::transport::Transport;
use atat::heapless::String;
use core::fmt::Write;
use embedded_nal::Ipv4Addr;
use fugit_timer::Timer;

/// SSIDs need to be shorter than this
pub const MAX_SSID_LENGTH: usize = 32;

/// Passwords need to be shorter than this
pub const MAX_PASSWORD_LENGTH: usize = 64;

/// State of joining an access point
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum JoinStatus {
    /// Joined to the access point
    Connected,

    /// Join command issued, no result yet
    WaitingForConnection,

    /// Access point did not respond in time (or the response deadline passed)
    Timeout,

    WrongPassword,

    /// No access point with the given SSID found
    ApNotFound,

    ConnectionFailed,

    /// Error without known reason code
    UnknownError,
}

/// Connection status reported by the module
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConnectionStatus {
    /// Station is connected to an access point and obtained an IP
    ConnectedToAp,

    /// TCP or UDP transmission was created
    CreatedTransmission,

    /// TCP or UDP transmission was disconnected
    TransmissionDisconnected,

    NotConnectedToAp,

    /// Status command failed or status code is unknown
    UnknownError,
}

/// Invalid credentials, nothing got transmitted
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CredentialsError {
    /// SSID is not shorter than [MAX_SSID_LENGTH]
    InvalidSsidLength,

    /// Password is not shorter than [MAX_PASSWORD_LENGTH]
    InvalidPasswordLength,
}

/// Errors when receiving local address information
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AddressError {
    /// CIFSR command failed
    Command(ResponseStatus),

    /// Response does not contain all four addresses
    AddressParseError,
}

/// Validates and converts the given credentials
fn credentials(ssid: &str, password: &str) -> Result<(String<32>, String<64>), CredentialsError> {
    if ssid.len() >= MAX_SSID_LENGTH {
        return Err(CredentialsError::InvalidSsidLength);
    }

    if password.len() >= MAX_PASSWORD_LENGTH {
        return Err(CredentialsError::InvalidPasswordLength);
    }

    let ssid = String::try_from(ssid).map_err(|_| CredentialsError::InvalidSsidLength)?;
    let password = String::try_from(password).map_err(|_| CredentialsError::InvalidPasswordLength)?;
    Ok((ssid, password))
}

impl<T: Transport, C: Timer<TIMER_HZ>, const TIMER_HZ: u32, const TX_SIZE: usize> Adapter<T, C, TIMER_HZ, TX_SIZE> {
    /// Issues the join command and returns immediately, s. [join_status()](Self::join_status).
    ///
    /// Credentials are stored in flash if enabled, s. [set_persist_credentials()](Self::set_persist_credentials).
    pub fn join(&mut self, ssid: &str, password: &str) -> Result<JoinStatus, CredentialsError> {
        let (ssid, password) = credentials(ssid, password)?;

        let status = if self.session.persist_credentials {
            self.issue_command(&StoredAccessPointConnectCommand::new(ssid, password))
        } else {
            self.issue_command(&AccessPointConnectCommand::new(ssid, password))
        };

        Ok(match status {
            ResponseStatus::Waiting => JoinStatus::WaitingForConnection,
            _ => JoinStatus::UnknownError,
        })
    }

    /// Non-blocking check of the pending join. Error responses are decoded by their reason code.
    pub fn join_status(&mut self) -> JoinStatus {
        match self.poll() {
            ResponseStatus::Success => JoinStatus::Connected,
            ResponseStatus::Waiting => JoinStatus::WaitingForConnection,
            ResponseStatus::Timeout => JoinStatus::Timeout,
            ResponseStatus::Error => self.join_error(),
        }
    }

    fn join_error(&self) -> JoinStatus {
        let body = self.response_body();

        let status = if contains(body, b"+CWJAP:1") {
            JoinStatus::Timeout
        } else if contains(body, b"+CWJAP:2") {
            JoinStatus::WrongPassword
        } else if contains(body, b"+CWJAP:3") {
            JoinStatus::ApNotFound
        } else if contains(body, b"+CWJAP:4") {
            JoinStatus::ConnectionFailed
        } else {
            JoinStatus::UnknownError
        };

        warn!("Joining access point failed: {:?}", status);
        status
    }

    /// Joins the given access point unless already connected.
    ///
    /// Returns [JoinStatus::Connected] if a connection to an access point exists,
    /// [JoinStatus::WaitingForConnection] if the join command was issued.
    pub fn begin(&mut self, ssid: &str, password: &str) -> Result<JoinStatus, CredentialsError> {
        credentials(ssid, password)?;

        match self.connection_status() {
            ConnectionStatus::NotConnectedToAp | ConnectionStatus::TransmissionDisconnected => {
                self.join(ssid, password)
            }
            ConnectionStatus::ConnectedToAp => Ok(JoinStatus::Connected),
            _ => Ok(JoinStatus::UnknownError),
        }
    }

    /// Leaves the current access point
    pub fn disconnect(&mut self) -> ResponseStatus {
        self.execute(&DisconnectCommand)
    }

    /// Queries the connection status (blocking)
    pub fn connection_status(&mut self) -> ConnectionStatus {
        if !self.execute(&ConnectionStatusCommand).is_success() {
            return ConnectionStatus::UnknownError;
        }

        let body = self.response_body();
        let status = if contains(body, b"STATUS:2") {
            ConnectionStatus::ConnectedToAp
        } else if contains(body, b"STATUS:3") {
            ConnectionStatus::CreatedTransmission
        } else if contains(body, b"STATUS:4") {
            ConnectionStatus::TransmissionDisconnected
        } else if contains(body, b"STATUS:5") {
            ConnectionStatus::NotConnectedToAp
        } else {
            ConnectionStatus::UnknownError
        };

        debug!("Connection status: {:?}", status);
        status
    }

    /// Returns IP and MAC addresses of station and soft AP interface. Addresses of interfaces
    /// disabled by the current WIFI mode are None.
    pub fn local_info(&mut self) -> Result<LocalInfo, AddressError> {
        let status = self.execute(&ObtainLocalAddressCommand);
        if !status.is_success() {
            return Err(AddressError::Command(status));
        }

        LocalInfo::parse(self.response_body()).ok_or(AddressError::AddressParseError)
    }

    /// Issues the scan command without waiting, s. [access_points()](Self::access_points)
    pub fn request_access_points(&mut self) -> ResponseStatus {
        self.issue_command(&ListAccessPointsCommand)
    }

    /// Parses the response of the last scan. Empty list unless the receive buffer holds a
    /// successful response, i.e. while the scan is pending or after it failed.
    pub fn access_points(&self) -> AccessPointList<'_> {
        let body = self.response_body();
        if classify(body, false) != Some(ResponseStatus::Success) {
            return AccessPointList::default();
        }

        AccessPointList::parse(body)
    }

    /// Scans for access points (blocking). Entries borrow the receive buffer, so the list must be
    /// dropped before issuing the next command.
    pub fn scan(&mut self) -> AccessPointList<'_> {
        if !self.execute(&ListAccessPointsCommand).is_success() {
            return AccessPointList::default();
        }

        let list = self.access_points();
        debug!("Scan found {} access points", list.size());
        list
    }

    /// Queries the current soft AP configuration. The raw response is available by [response_body()](Self::response_body).
    pub fn soft_ap_query(&mut self) -> ResponseStatus {
        self.execute(&SoftApQueryCommand)
    }

    /// Configures and enables the soft AP. Stored in flash if enabled, s. [set_persist_credentials()](Self::set_persist_credentials).
    pub fn enable_soft_ap(
        &mut self,
        ssid: &str,
        password: &str,
        channel: u8,
        encryption: Encryption,
    ) -> Result<ResponseStatus, CredentialsError> {
        let (ssid, password) = credentials(ssid, password)?;
        let encryption = u8::from(encryption);

        Ok(if self.session.persist_credentials {
            self.execute(&StoredSoftApConfigCommand::new(ssid, password, channel, encryption))
        } else {
            self.execute(&SoftApConfigCommand::new(ssid, password, channel, encryption))
        })
    }

    /// Enables a soft AP without password
    pub fn enable_open_soft_ap(&mut self, ssid: &str, channel: u8) -> Result<ResponseStatus, CredentialsError> {
        self.enable_soft_ap(ssid, "", channel, Encryption::Open)
    }

    /// Sets the IP address of the soft AP
    pub fn set_soft_ap_address(&mut self, ip: Ipv4Addr) -> ResponseStatus {
        let mut address = String::<15>::new();
        if write!(address, "{}", ip).is_err() {
            return ResponseStatus::Error;
        }

        self.execute(&SoftApAddressCommand::new(address))
    }

    /// Queries the stations connected to the soft AP and returns their number.
    ///
    /// Individual stations are read from the same response by [connected_client()](Self::connected_client),
    /// so no other command may be issued in between. [soft_ap_clients()](Self::soft_ap_clients)
    /// ties the roster to the response instead.
    pub fn connected_client_count(&mut self) -> usize {
        if !self.execute(&ListClientsCommand).is_success() {
            return 0;
        }

        Roster::new(self.response_body()).count()
    }

    /// Returns the station at the given position of the last roster response
    pub fn connected_client(&self, index: usize) -> Option<SoftApClient> {
        Roster::new(self.response_body()).get(index)
    }

    /// Queries the stations connected to the soft AP. The roster borrows the response, which
    /// prevents issuing further commands while it's in use.
    pub fn soft_ap_clients(&mut self) -> Result<Roster<'_>, ResponseStatus> {
        let status = self.execute(&ListClientsCommand);
        if !status.is_success() {
            return Err(status);
        }

        Ok(Roster::new(self.response_body()))
    }

    /// Issues a ping to the given host without waiting, s. [ping_time()](Self::ping_time)
    pub fn request_ping(&mut self, host: &str) -> ResponseStatus {
        let Ok(host) = String::<MAX_HOST_LENGTH>::try_from(host) else {
            warn!("Ping host exceeds max. length");
            return ResponseStatus::Error;
        };

        self.with_scratch_buffer(HOST_SCRATCH_SIZE, |adapter| adapter.issue_command(&PingCommand::new(host)))
    }

    /// Round trip time in ms of the last ping response, [PING_TIMEOUT] if none was received
    pub fn ping_time(&self) -> i32 {
        parse_ping_time(self.response_body())
    }

    /// Pings the given host (blocking) and returns the round trip time in ms or [PING_TIMEOUT]
    pub fn ping(&mut self, host: &str) -> i32 {
        if !self.request_ping(host).is_waiting() {
            return PING_TIMEOUT;
        }

        match self.wait() {
            ResponseStatus::Success => self.ping_time(),
            _ => PING_TIMEOUT,
        }
    }
}
