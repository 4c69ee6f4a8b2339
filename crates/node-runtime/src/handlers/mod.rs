//! Protocol-logic implementations plugged into the dispatch core.

pub mod echo;

pub use echo::EchoHandler;
