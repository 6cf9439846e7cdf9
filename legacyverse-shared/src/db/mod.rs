//! Database layer
//!
//! - `pool`: PostgreSQL connection pool with a startup health check
//! - `migrations`: embedded schema migrations
//!
//! Row types and their SQL live in [`crate::models`]; the transactional
//! operations the services rely on live in [`crate::store::postgres`].

pub mod migrations;
pub mod pool;
