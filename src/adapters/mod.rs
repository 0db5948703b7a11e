//! Live adapters backing the port traits with real time and real network.

pub mod live;
