//! Typed AT commands. Each struct serializes into exactly one CRLF terminated command line.
use crate::responses::NoResponse;
use atat::atat_derive::AtatCmd;
use atat::heapless::String;

/// Max. length of a remote host name or address
pub(crate) const MAX_HOST_LENGTH: usize = 128;

/// Liveness probe
#[derive(Clone, AtatCmd)]
#[at_cmd("", NoResponse)]
pub struct HealthCheckCommand;

/// Disables the echo of received commands
#[derive(Clone, AtatCmd)]
#[at_cmd("E0", NoResponse)]
pub struct DisableEchoCommand;

/// Restarts the module
#[derive(Clone, AtatCmd)]
#[at_cmd("+RST", NoResponse)]
pub struct RestartCommand;

/// Restores the factory default configuration, also clears stored credentials
#[derive(Clone, AtatCmd)]
#[at_cmd("+RESTORE", NoResponse)]
pub struct RestoreCommand;

/// Sets the WIFI mode
#[derive(Clone, AtatCmd)]
#[at_cmd("+CWMODE", NoResponse)]
pub struct WifiModeCommand {
    /// WIFI mode:
    ///     1: Station mode.
    ///     2: SoftAP mode.
    ///     3: SoftAP+Station mode.
    mode: u8,
}

impl WifiModeCommand {
    pub fn new(mode: u8) -> Self {
        Self { mode }
    }
}

/// Enables/Disables multiple connections
#[derive(Clone, AtatCmd)]
#[at_cmd("+CIPMUX", NoResponse)]
pub struct SetMultipleConnectionsCommand {
    /// 0: single connection, 1: multiple connections
    mode: u8,
}

impl SetMultipleConnectionsCommand {
    pub fn new(mode: u8) -> Self {
        Self { mode }
    }
}

/// Sets the transfer mode
#[derive(Clone, AtatCmd)]
#[at_cmd("+CIPMODE", NoResponse)]
pub struct TransferModeCommand {
    /// 0: normal mode, 1: transparent (UART-WiFi passthrough) mode
    mode: u8,
}

impl TransferModeCommand {
    pub fn new(mode: u8) -> Self {
        Self { mode }
    }
}

/// Enters deep sleep. Wake up requires the reset pin to be connected to the wake up output.
#[derive(Clone, AtatCmd)]
#[at_cmd("+GSLP", NoResponse)]
pub struct DeepSleepCommand {
    /// Sleep time in ms
    time: u32,
}

impl DeepSleepCommand {
    pub fn new(time: u32) -> Self {
        Self { time }
    }
}

/// Lists the available access points
#[derive(Clone, AtatCmd)]
#[at_cmd("+CWLAP", NoResponse)]
pub struct ListAccessPointsCommand;

/// Joins an access point and stores the credentials in flash
#[derive(Clone, AtatCmd)]
#[at_cmd("+CWJAP_DEF", NoResponse)]
pub struct StoredAccessPointConnectCommand {
    /// The SSID of the target access point
    ssid: String<32>,

    /// The password/key of the target access point
    password: String<64>,
}

impl StoredAccessPointConnectCommand {
    pub fn new(ssid: String<32>, password: String<64>) -> Self {
        Self { ssid, password }
    }
}

/// Joins an access point without storing the credentials
#[derive(Clone, AtatCmd)]
#[at_cmd("+CWJAP_CUR", NoResponse)]
pub struct AccessPointConnectCommand {
    /// The SSID of the target access point
    ssid: String<32>,

    /// The password/key of the target access point
    password: String<64>,
}

impl AccessPointConnectCommand {
    pub fn new(ssid: String<32>, password: String<64>) -> Self {
        Self { ssid, password }
    }
}

/// Leaves the current access point
#[derive(Clone, AtatCmd)]
#[at_cmd("+CWQAP", NoResponse)]
pub struct DisconnectCommand;

/// Queries the connection status
#[derive(Clone, AtatCmd)]
#[at_cmd("+CIPSTATUS", NoResponse)]
pub struct ConnectionStatusCommand;

/// Establishes a TCP connection or UDP transmission in single connection mode
#[derive(Clone, AtatCmd)]
#[at_cmd("+CIPSTART", NoResponse)]
pub struct ConnectCommand {
    /// Connection type, TCP or UDP
    connection_type: String<3>,

    /// Remote host name or IP address
    remote_host: String<MAX_HOST_LENGTH>,

    /// Remote port
    port: u16,
}

impl ConnectCommand {
    pub fn new(connection_type: &str, remote_host: String<MAX_HOST_LENGTH>, port: u16) -> Self {
        Self {
            connection_type: String::try_from(connection_type).unwrap_or_default(),
            remote_host,
            port,
        }
    }
}

/// Establishes a TCP connection or UDP transmission in multiple connections mode
#[derive(Clone, AtatCmd)]
#[at_cmd("+CIPSTART", NoResponse)]
pub struct MultiConnectCommand {
    /// Socket ID
    link_id: u8,

    /// Connection type, TCP or UDP
    connection_type: String<3>,

    /// Remote host name or IP address
    remote_host: String<MAX_HOST_LENGTH>,

    /// Remote port
    port: u16,
}

impl MultiConnectCommand {
    pub fn new(link_id: u8, connection_type: &str, remote_host: String<MAX_HOST_LENGTH>, port: u16) -> Self {
        Self {
            link_id,
            connection_type: String::try_from(connection_type).unwrap_or_default(),
            remote_host,
            port,
        }
    }
}

/// Closes the connection in single connection mode
#[derive(Clone, AtatCmd)]
#[at_cmd("+CIPCLOSE", NoResponse)]
pub struct CloseCommand;

/// Closes the given connection in multiple connections mode. ID 5 closes all connections.
#[derive(Clone, AtatCmd)]
#[at_cmd("+CIPCLOSE", NoResponse)]
pub struct CloseByIdCommand {
    link_id: u8,
}

impl CloseByIdCommand {
    pub fn new(link_id: u8) -> Self {
        Self { link_id }
    }
}

/// Announces the length of the following payload in single connection mode. Gets responded by a prompt.
#[derive(Clone, AtatCmd)]
#[at_cmd("+CIPSEND", NoResponse)]
pub struct TransmissionPrepareCommand {
    length: u32,
}

impl TransmissionPrepareCommand {
    pub fn new(length: usize) -> Self {
        Self { length: length as u32 }
    }
}

/// Announces the length of the following payload of the given connection
#[derive(Clone, AtatCmd)]
#[at_cmd("+CIPSEND", NoResponse)]
pub struct MultiTransmissionPrepareCommand {
    link_id: u8,
    length: u32,
}

impl MultiTransmissionPrepareCommand {
    pub fn new(link_id: u8, length: usize) -> Self {
        Self {
            link_id,
            length: length as u32,
        }
    }
}

/// Requests local IP and MAC addresses of station and soft AP
#[derive(Clone, AtatCmd)]
#[at_cmd("+CIFSR", NoResponse)]
pub struct ObtainLocalAddressCommand;

/// Queries the current soft AP configuration
#[derive(Clone, AtatCmd)]
#[at_cmd("+CWSAP?", NoResponse)]
pub struct SoftApQueryCommand;

/// Configures the soft AP and stores the configuration in flash
#[derive(Clone, AtatCmd)]
#[at_cmd("+CWSAP_DEF", NoResponse)]
pub struct StoredSoftApConfigCommand {
    ssid: String<32>,
    password: String<64>,
    channel: u8,
    encryption: u8,
}

impl StoredSoftApConfigCommand {
    pub fn new(ssid: String<32>, password: String<64>, channel: u8, encryption: u8) -> Self {
        Self {
            ssid,
            password,
            channel,
            encryption,
        }
    }
}

/// Configures the soft AP without storing the configuration
#[derive(Clone, AtatCmd)]
#[at_cmd("+CWSAP_CUR", NoResponse)]
pub struct SoftApConfigCommand {
    ssid: String<32>,
    password: String<64>,
    channel: u8,
    encryption: u8,
}

impl SoftApConfigCommand {
    pub fn new(ssid: String<32>, password: String<64>, channel: u8, encryption: u8) -> Self {
        Self {
            ssid,
            password,
            channel,
            encryption,
        }
    }
}

/// Lists the stations connected to the soft AP
#[derive(Clone, AtatCmd)]
#[at_cmd("+CWLIF", NoResponse)]
pub struct ListClientsCommand;

/// Sets the IP address of the soft AP
#[derive(Clone, AtatCmd)]
#[at_cmd("+CIPAP", NoResponse)]
pub struct SoftApAddressCommand {
    ip: String<15>,
}

impl SoftApAddressCommand {
    pub fn new(ip: String<15>) -> Self {
        Self { ip }
    }
}

/// Pings the given remote host
#[derive(Clone, AtatCmd)]
#[at_cmd("+PING", NoResponse)]
pub struct PingCommand {
    host: String<MAX_HOST_LENGTH>,
}

impl PingCommand {
    pub fn new(host: String<MAX_HOST_LENGTH>) -> Self {
        Self { host }
    }
}
