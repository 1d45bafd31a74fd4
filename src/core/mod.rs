pub mod config;
pub mod distribution;
pub mod lifecycle;
pub mod runtime;
pub mod store;
pub mod sync;
pub mod terminal;
pub mod vault;
