//! Utilities shared by the Kaiwa server binary and its tests.

pub mod logger;
pub mod time;
