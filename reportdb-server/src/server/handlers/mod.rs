//! JSON handlers, one per RPC method. Each takes the resolved actor and a
//! camelCase request body and forwards to the matching `AppContext`
//! operation.

pub mod components;
pub mod health;
pub mod reports;
pub mod review;
pub mod runs;
pub mod store;
