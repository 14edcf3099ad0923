//! SurrealDB repository implementations.

mod audit;
mod delegate;
mod session;
mod user;

pub use audit::SurrealAuditLogRepository;
pub use delegate::SurrealDelegateRepository;
pub use session::SurrealSessionRepository;
pub use user::SurrealUserRepository;
