//! Least-connections HTTP load balancer library.

pub mod config;
pub mod dispatch;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod load_balancer;
pub mod observability;
pub mod resilience;
pub mod security;

pub use config::BalancerConfig;
pub use dispatch::Dispatcher;
pub use http::BalancerServer;
pub use lifecycle::Shutdown;
pub use load_balancer::ConnPool;
