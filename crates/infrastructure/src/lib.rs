//! Ferrous LB Infrastructure Layer
pub mod dns;
pub mod upstream;
pub mod worker;
