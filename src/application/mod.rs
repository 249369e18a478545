//! Application layer - the worker that drives backends from queued commands.

pub mod worker;
