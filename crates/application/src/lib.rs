//! Ferrous LB Application Layer
//!
//! Ports implemented by the infrastructure crate and the use cases built on them.
pub mod ports;
pub mod use_cases;
