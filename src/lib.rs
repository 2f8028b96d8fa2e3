#![cfg_attr(not(test), no_std)]
#![cfg_attr(feature = "strict", deny(warnings))]

pub mod adapter;
pub mod asynch;
pub(crate) mod buffer;
pub(crate) mod commands;
pub mod config;
#[cfg(feature = "examples")]
pub mod example;
pub(crate) mod fmt;
pub mod parser;
pub mod responses;
pub mod stack;
pub mod transport;
pub mod wifi;

pub use adapter::{Adapter, ConnectionMode, InitError, InitStage};
pub use buffer::{RequestBody, TxRegion, TxTarget};
pub use responses::ResponseStatus;
pub use transport::Transport;

#[cfg(test)]
mod tests;
