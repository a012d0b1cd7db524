//! gridplate_engine - template text parsing + Rhai integration.

pub mod engine;
