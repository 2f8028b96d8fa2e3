//! # Cooperative integration
//!
//! Async counterparts of the blocking operations. Instead of spinning, the executor gets control
//! back between two polls. No waker is registered, so the task is just rescheduled.
//!
//! ## Example
//!
//! ````
//! # use esp_at_engine::example::{ExampleTimer, ExampleTransport};
//! # use esp_at_engine::config::Config;
//! # use esp_at_engine::wifi::JoinStatus;
//! # use esp_at_engine::{asynch, Adapter};
//! # use embassy_futures::block_on;
//! #
//! let mut adapter: Adapter<_, _, 1_000_000, 512> =
//!     Adapter::initialize(ExampleTransport::default(), ExampleTimer::default(), Config::default()).unwrap();
//!
//! adapter.join("test_wifi", "secret").unwrap();
//! assert_eq!(JoinStatus::Connected, block_on(asynch::join_async(&mut adapter)));
//! ````
use crate::adapter::Adapter;
use crate::responses::ResponseStatus;
use crate::transport::Transport;
use crate::wifi::JoinStatus;
use embassy_futures::yield_now;
use fugit_timer::Timer;

/// Polls the current exchange until it reaches a terminal state, yielding between polls
pub async fn wait_async<T: Transport, C: Timer<TIMER_HZ>, const TIMER_HZ: u32, const TX_SIZE: usize>(
    adapter: &mut Adapter<T, C, TIMER_HZ, TX_SIZE>,
) -> ResponseStatus {
    loop {
        let status = adapter.poll();
        if status.is_terminal() {
            return status;
        }

        yield_now().await;
    }
}

/// Polls the pending join until it leaves [JoinStatus::WaitingForConnection], yielding between polls
pub async fn join_async<T: Transport, C: Timer<TIMER_HZ>, const TIMER_HZ: u32, const TX_SIZE: usize>(
    adapter: &mut Adapter<T, C, TIMER_HZ, TX_SIZE>,
) -> JoinStatus {
    loop {
        let status = adapter.join_status();
        if status != JoinStatus::WaitingForConnection {
            return status;
        }

        yield_now().await;
    }
}
