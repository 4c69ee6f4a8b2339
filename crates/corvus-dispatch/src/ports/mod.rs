//! Ports of the dispatch core.
//!
//! Driving side: [`DispatchApi`] is how callers submit requests. Driven
//! side: [`PeerTransport`] and [`RequestHandler`] are the collaborators the
//! event loop depends on (implemented by adapters in the runtime crate).

pub mod inbound;
pub mod outbound;

pub use inbound::DispatchApi;
pub use outbound::{PeerTransport, RequestHandler, TransportError};
