//! Outer surfaces that drive the engine.

pub mod csv;
