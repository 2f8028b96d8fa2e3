//! Logging macros. Routed to defmt if the `defmt` feature is enabled, otherwise to the log facade.
#![allow(unused_imports)]

#[cfg(feature = "defmt")]
pub(crate) use defmt::{debug, trace, warn};

#[cfg(not(feature = "defmt"))]
pub(crate) use log::{debug, trace, warn};
