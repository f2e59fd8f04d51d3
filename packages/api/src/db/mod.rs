//! # Database module — PostgreSQL connection pool
//!
//! The pool is a process-wide singleton backed by a [`tokio::sync::OnceCell`].
//! The first call to [`get_pool`] opens it with the given URL and size; later
//! calls return the cached pool and ignore their arguments.
//!
//! [`run_migrations`] applies the embedded `migrations/` directory (the
//! `provider_accounts` table).

mod pool;

pub use pool::{get_pool, run_migrations};
