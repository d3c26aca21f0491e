pub mod driver;
pub mod health;
pub mod readiness;

pub use driver::Driver;
pub use health::{HealthCheck, StaticHealthCheck, TcpHealthCheck};
pub use readiness::{NotReadyReason, Readiness, ReadinessDecision};
