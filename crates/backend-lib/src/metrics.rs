// ==============
// chat-backend-lib/src/metrics.rs

//! Central place for metric keys
pub const WS_CONNECTION: &str = "ws.connection";
pub const WS_ACTIVE: &str = "ws.active";
pub const WS_AUTH_REJECTED: &str = "ws.auth_rejected";
pub const MESSAGE_APPENDED: &str = "message.appended";
pub const MESSAGE_BROADCAST: &str = "message.broadcast";
pub const SESSION_ISSUED: &str = "session.issued";
pub const SESSION_ACTIVE: &str = "session.active";
pub const SESSION_EXPIRED: &str = "session.expired";
