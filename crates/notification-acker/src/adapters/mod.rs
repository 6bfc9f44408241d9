//! # Adapters Layer (Hexagonal Architecture)
//!
//! Implements the outbound port traits on top of the in-process delta bus.

mod bus;

pub use bus::DeltaBusAdapter;
