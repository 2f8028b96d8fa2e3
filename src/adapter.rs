//! # Central client
//!
//! [Adapter] owns the transport, the timer and all buffers. Every command passes through
//! [Adapter::issue_command], every response gets classified by [Adapter::poll].
//!
//! Exactly one exchange may be in flight at a time. Issuing a new command while the previous
//! response is still awaited discards the previous response.
//!
//! ## Example
//!
//! ````
//! # use esp_at_engine::example::{ExampleTimer, ExampleTransport};
//! # use esp_at_engine::config::Config;
//! # use esp_at_engine::{Adapter, ResponseStatus};
//! #
//! let mut adapter: Adapter<_, _, 1_000_000, 512> =
//!     Adapter::initialize(ExampleTransport::default(), ExampleTimer::default(), Config::default()).unwrap();
//!
//! assert_eq!(ResponseStatus::Success, adapter.health_check());
//! ````
use crate::buffer::{max, ScratchLease, TxRegion, TxTarget, SCRATCH_SIZE};
use crate::commands::{
    AccessPointConnectCommand, DeepSleepCommand, DisableEchoCommand, HealthCheckCommand, RestartCommand,
    RestoreCommand, SetMultipleConnectionsCommand, SoftApConfigCommand, StoredAccessPointConnectCommand,
    StoredSoftApConfigCommand, TransferModeCommand, WifiModeCommand,
};
use crate::config::Config;
use crate::fmt::{debug, trace, warn};
use crate::parser::contains;
use crate::responses::{classify, ResponseStatus, CLOSED_MARKER};
use crate::stack::SocketState;
use crate::transport::Transport;
use atat::AtatCmd;
use fugit::TimerDurationU32;
use fugit_timer::Timer;

/// Smallest shared transmit buffer which fits every command encoded to it
pub const MIN_TX_SIZE: usize = max(
    max(StoredAccessPointConnectCommand::MAX_LEN, AccessPointConnectCommand::MAX_LEN),
    max(StoredSoftApConfigCommand::MAX_LEN, SoftApConfigCommand::MAX_LEN),
);

/// Number of addressable connections in multiple connections mode
pub(crate) const MAX_CONNECTIONS: usize = 5;

/// Converts milliseconds to timer ticks, saturating at the longest duration the u32 tick counter holds
pub(crate) fn duration_ms<const TIMER_HZ: u32>(ms: u32) -> TimerDurationU32<TIMER_HZ> {
    let max_ms = (u64::from(u32::MAX) * 1_000 / u64::from(TIMER_HZ)).min(u64::from(u32::MAX));
    let ticks = u64::from(ms).min(max_ms) * u64::from(TIMER_HZ) / 1_000;
    TimerDurationU32::from_ticks(ticks as u32)
}

/// Central client for network communication
///
/// TIMER_HZ: Tick rate of the timer used for timeout measurement
///
/// TX_SIZE: Size of the shared transmit buffer in bytes. Limits the payload size of a single
/// send call (minus two bytes for the line terminator). Min. value: [MIN_TX_SIZE]
pub struct Adapter<T: Transport, C: Timer<TIMER_HZ>, const TIMER_HZ: u32, const TX_SIZE: usize> {
    /// Serial transport
    pub(crate) transport: T,

    /// Timer used for timeout measurement
    pub(crate) timer: C,

    /// Protocol state
    pub(crate) session: Session<TIMER_HZ>,

    /// Shared transmit buffer
    pub(crate) tx_buffer: [u8; TX_SIZE],

    /// Length of the content of the shared transmit buffer
    pub(crate) tx_length: usize,

    /// Scratch region for redirected commands
    pub(crate) scratch: [u8; SCRATCH_SIZE],
}

/// Protocol state of one adapter
#[derive(Clone, Debug)]
pub struct Session<const TIMER_HZ: u32> {
    /// Single or multiple connections
    pub(crate) connection_mode: ConnectionMode,

    /// True => credentials are stored in flash of the module
    pub(crate) persist_credentials: bool,

    /// Current request
    pub(crate) request: RequestDescriptor,

    /// Current response
    pub(crate) response: ResponseDescriptor<TIMER_HZ>,

    /// Current socket states, array index = link_id. Single connection mode uses index 0.
    pub(crate) sockets: [SocketState; MAX_CONNECTIONS],
}

/// State of the outgoing request
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RequestDescriptor {
    /// Connection of the current request, just relevant in multiple connections mode
    pub link_id: u8,

    /// Payload length of the next body transmission. 0 => length of the buffer content is used.
    /// Gets reset to 0 as soon as consumed.
    pub data_length: usize,

    /// Current transmit buffer
    pub target: TxTarget,
}

/// State of the awaited response
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ResponseDescriptor<const TIMER_HZ: u32> {
    /// True => a server response (data or connection closed) is awaited instead of OK
    pub server_response_awaited: bool,

    /// Max. duration of a exchange. The timer gets restarted with it for every exchange.
    pub timeout: TimerDurationU32<TIMER_HZ>,
}

/// WIFI mode
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WifiMode {
    Station = 1,
    AccessPoint = 2,
    StationAndAccessPoint = 3,
}

/// Connection mode
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConnectionMode {
    /// One connection, addressed without link ID
    Single = 0,
    /// Up to five connections, addressed by link ID
    Multiple = 1,
}

/// Transfer mode
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransferMode {
    Normal = 0,
    /// UART-WiFi passthrough, just supported in single connection mode
    Transparent = 1,
}

/// Initialization step which failed
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InitStage {
    /// Transport bring-up failed
    Transport,
    /// Startup delay failed due to a timer error
    Startup,
    /// Module did not respond to any AT probe
    Probe,
    /// Disabling echo failed
    Echo,
    /// Setting station + soft AP mode failed
    WifiMode,
    /// Setting single connection mode failed
    ConnectionMode,
    /// Setting normal transfer mode failed
    TransferMode,
}

/// Initialization failed. The transport has been released, no adapter is returned.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InitError {
    /// Failed step
    pub stage: InitStage,

    /// Last response status of the failed step, None if no command was involved
    pub status: Option<ResponseStatus>,
}

impl InitError {
    fn new(stage: InitStage, status: Option<ResponseStatus>) -> Self {
        Self { stage, status }
    }

    /// Maps a non successful status of the given step to an error
    fn check(stage: InitStage, status: ResponseStatus) -> Result<(), Self> {
        if status.is_success() {
            return Ok(());
        }

        Err(Self::new(stage, Some(status)))
    }
}

impl<const TIMER_HZ: u32> Session<TIMER_HZ> {
    fn new<const TX_SIZE: usize>(config: &Config) -> Self {
        Self {
            connection_mode: ConnectionMode::Single,
            persist_credentials: config.persist_credentials,
            request: RequestDescriptor {
                link_id: 0,
                data_length: 0,
                target: TxTarget::shared(TX_SIZE),
            },
            response: ResponseDescriptor {
                server_response_awaited: false,
                timeout: duration_ms(config.response_timeout_ms),
            },
            sockets: [SocketState::Closed; MAX_CONNECTIONS],
        }
    }

    pub fn connection_mode(&self) -> ConnectionMode {
        self.connection_mode
    }

    pub fn persist_credentials(&self) -> bool {
        self.persist_credentials
    }

    pub fn request(&self) -> &RequestDescriptor {
        &self.request
    }

    pub fn response(&self) -> &ResponseDescriptor<TIMER_HZ> {
        &self.response
    }
}

impl<T: Transport, C: Timer<TIMER_HZ>, const TIMER_HZ: u32, const TX_SIZE: usize> Adapter<T, C, TIMER_HZ, TX_SIZE> {
    const TX_SIZE_CHECK: () = assert!(TX_SIZE >= MIN_TX_SIZE, "TX_SIZE is smaller than MIN_TX_SIZE");

    /// Creates the adapter without talking to the module
    pub(crate) fn new(transport: T, timer: C, config: &Config) -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::TX_SIZE_CHECK;

        Self {
            transport,
            timer,
            session: Session::new::<TX_SIZE>(config),
            tx_buffer: [0x0; TX_SIZE],
            tx_length: 0,
            scratch: [0x0; SCRATCH_SIZE],
        }
    }

    /// Brings up the transport and the module.
    ///
    /// After a startup delay the module is probed until it responds (max. `config.probe_attempts`).
    /// Then echo is disabled and the module is configured for station + soft AP mode, single
    /// connection mode and normal transfer mode.
    pub fn initialize(transport: T, timer: C, config: Config) -> Result<Self, InitError> {
        let mut adapter = Self::new(transport, timer, &config);

        if let Err(error) = adapter.bring_up(&config) {
            warn!("Initialization failed: {:?}", error);
            adapter.transport.stop();
            return Err(error);
        }

        debug!("Module initialized");
        Ok(adapter)
    }

    fn bring_up(&mut self, config: &Config) -> Result<(), InitError> {
        self.transport
            .start()
            .map_err(|_| InitError::new(InitStage::Transport, None))?;

        if config.startup_delay_ms > 0 {
            self.timer
                .start(duration_ms(config.startup_delay_ms))
                .map_err(|_| InitError::new(InitStage::Startup, None))?;
            nb::block!(self.timer.wait()).map_err(|_| InitError::new(InitStage::Startup, None))?;
        }

        self.probe(config.probe_attempts)?;

        InitError::check(InitStage::Echo, self.execute(&DisableEchoCommand))?;
        InitError::check(InitStage::WifiMode, self.set_wifi_mode(WifiMode::StationAndAccessPoint))?;
        InitError::check(
            InitStage::ConnectionMode,
            self.set_connection_mode(ConnectionMode::Single),
        )?;
        InitError::check(InitStage::TransferMode, self.set_transfer_mode(TransferMode::Normal))
    }

    /// Probes the module until it responds or the given attempts are exhausted
    fn probe(&mut self, attempts: u8) -> Result<(), InitError> {
        let mut status = ResponseStatus::Timeout;

        for attempt in 0..attempts {
            status = self.health_check();
            if status.is_success() {
                return Ok(());
            }

            debug!("Probe {} failed: {:?}", attempt + 1, status);
        }

        Err(InitError::new(InitStage::Probe, Some(status)))
    }

    /// Releases the transport and returns transport and timer
    pub fn release(mut self) -> (T, C) {
        self.transport.stop();
        debug!("Adapter released");
        (self.transport, self.timer)
    }

    /// Encodes the given command into the current transmit buffer, arms the receive transfer and
    /// starts transmission. Does not wait for the response, s. [poll()](Self::poll) and [wait()](Self::wait).
    ///
    /// Returns [ResponseStatus::Waiting] if the command was issued or [ResponseStatus::Error] if it
    /// does not fit in the current transmit buffer. Nothing is transmitted in the latter case.
    pub fn issue_command<Cmd: AtatCmd>(&mut self, command: &Cmd) -> ResponseStatus {
        let target = self.session.request.target;
        if Cmd::MAX_LEN > target.capacity {
            warn!(
                "Command with max. length {} exceeds transmit buffer of {} bytes",
                Cmd::MAX_LEN,
                target.capacity
            );
            return ResponseStatus::Error;
        }

        if let Err(status) = self.start_deadline() {
            return status;
        }

        let buffer = match target.region {
            TxRegion::Shared => &mut self.tx_buffer[..target.capacity],
            TxRegion::Scratch => &mut self.scratch[..target.capacity],
        };
        buffer.fill(0);
        let length = command.write(buffer);

        if target.region == TxRegion::Shared {
            self.tx_length = length;
        }

        self.transport.clear_receive_buffer();
        self.session.response.server_response_awaited = false;
        self.transport.arm_receive();

        trace!(
            "Sending command: {}",
            core::str::from_utf8(&buffer[..length]).unwrap_or("<binary>")
        );
        self.transport.transmit(&buffer[..length]);
        ResponseStatus::Waiting
    }

    /// Issues the command and blocks until the response is classified
    pub(crate) fn execute<Cmd: AtatCmd>(&mut self, command: &Cmd) -> ResponseStatus {
        let status = self.issue_command(command);
        if status.is_terminal() {
            return status;
        }

        self.wait()
    }

    /// Non-blocking classification of the current exchange.
    ///
    /// Timeout is checked first, so a response completed after the deadline is reported as
    /// [ResponseStatus::Timeout]. If the completed receive transfer contains no known marker, the
    /// transfer is re-armed and [ResponseStatus::Waiting] is returned.
    ///
    /// A server response announcing `CLOSED` marks the connection of the current request as closed.
    pub fn poll(&mut self) -> ResponseStatus {
        if self.is_timed_out() {
            return ResponseStatus::Timeout;
        }

        if !self.transport.is_receive_complete() {
            return ResponseStatus::Waiting;
        }

        let body = self.transport.receive_buffer();
        let server = self.session.response.server_response_awaited;

        match classify(body, server) {
            Some(status) => {
                if server && contains(body, CLOSED_MARKER) {
                    let link_id = self.session.request.link_id;
                    debug!("Connection {} closed by remote", link_id);
                    self.session.sockets[usize::from(link_id)] = SocketState::Closed;
                }

                status
            }
            None => {
                // Idle line without classifiable content
                self.transport.arm_receive();
                ResponseStatus::Waiting
            }
        }
    }

    /// Polls until the current exchange reaches a terminal state. Busy-loops, s. [crate::asynch] for
    /// a cooperative alternative.
    pub fn wait(&mut self) -> ResponseStatus {
        loop {
            let status = self.poll();
            if status.is_terminal() {
                return status;
            }
        }
    }

    /// Restarts the timer with the response timeout. A zero timeout does not use the timer at all.
    pub(crate) fn start_deadline(&mut self) -> Result<(), ResponseStatus> {
        let timeout = self.session.response.timeout;
        if timeout.ticks() == 0 {
            return Ok(());
        }

        self.timer.start(timeout).map_err(|_| {
            warn!("Starting response timer failed");
            ResponseStatus::Error
        })
    }

    fn is_timed_out(&mut self) -> bool {
        if self.session.response.timeout.ticks() == 0 {
            return true;
        }

        match self.timer.wait() {
            Ok(()) => true,
            Err(nb::Error::WouldBlock) => false,
            Err(nb::Error::Other(_)) => {
                // Deadline can not be observed anymore
                warn!("Response timer failed");
                true
            }
        }
    }

    /// Sets the timeout of a single command exchange in ms. Values exceeding the range of the
    /// timer's u32 tick counter are capped to the max. representable duration.
    pub fn set_response_timeout(&mut self, timeout: u32) {
        self.session.response.timeout = duration_ms(timeout);
    }

    /// True => WIFI and soft AP credentials get stored in flash of the module
    pub fn set_persist_credentials(&mut self, persist: bool) {
        self.session.persist_credentials = persist;
    }

    /// Redirects the transmit buffer to the scratch region (max. `capacity` bytes) for the
    /// duration of `body`. The previous transmit buffer is restored on every exit path.
    pub fn with_scratch_buffer<R>(&mut self, capacity: usize, body: impl FnOnce(&mut Self) -> R) -> R {
        let mut lease = ScratchLease::acquire(self, capacity);
        body(&mut *lease)
    }

    /// Current transmit buffer
    pub fn transmit_target(&self) -> TxTarget {
        self.session.request.target
    }

    /// Protocol state
    pub fn session(&self) -> &Session<TIMER_HZ> {
        &self.session
    }

    /// Content of the receive buffer, i.e. the raw response of the last command
    pub fn response_body(&self) -> &[u8] {
        self.transport.receive_buffer()
    }

    /// Sends AT and waits for OK
    pub fn health_check(&mut self) -> ResponseStatus {
        self.execute(&HealthCheckCommand)
    }

    /// Restarts the module
    pub fn restart(&mut self) -> ResponseStatus {
        self.execute(&RestartCommand)
    }

    /// Restores the factory configuration, which also disables auto connect to stored access points
    pub fn restore(&mut self) -> ResponseStatus {
        self.execute(&RestoreCommand)
    }

    pub fn set_wifi_mode(&mut self, mode: WifiMode) -> ResponseStatus {
        self.execute(&WifiModeCommand::new(mode as u8))
    }

    /// Switches between single and multiple connections mode. The session mode is just updated on success.
    pub fn set_connection_mode(&mut self, mode: ConnectionMode) -> ResponseStatus {
        let status = self.execute(&SetMultipleConnectionsCommand::new(mode as u8));

        if status.is_success() {
            debug!("Connection mode changed to {:?}", mode);
            self.session.connection_mode = mode;
        }

        status
    }

    pub fn set_transfer_mode(&mut self, mode: TransferMode) -> ResponseStatus {
        self.execute(&TransferModeCommand::new(mode as u8))
    }

    /// Enters deep sleep for the given time. Wake up requires a hardware connection of the reset pin.
    pub fn deep_sleep(&mut self, time_ms: u32) -> ResponseStatus {
        self.execute(&DeepSleepCommand::new(time_ms))
    }
}
