//! Realtime interview transport
//!
//! A `SessionSocket` keeps a WebSocket open to `/ws/interview/{session_id}`,
//! recovers from drops with a bounded number of reconnects and probes liveness
//! with periodic pings. Inbound messages, errors and lifecycle changes are
//! delivered on a single typed event stream.

pub mod channel;
pub mod messages;
mod socket;
mod state;

pub use channel::{RealtimeChannel, RealtimeConnector, WsConnector};
pub use messages::{
    CompletePayload, GradingPayload, Message, MessageType, QuestionPayload, StatusPayload,
};
pub use socket::{SessionSocket, SocketConfig, SocketEvent};
pub use state::{SocketAction, SocketInput, SocketState};
