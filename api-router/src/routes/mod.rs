pub mod attachments;
pub mod chat;
pub mod liveness;
pub mod readiness;
pub mod sections;
pub mod submissions;
