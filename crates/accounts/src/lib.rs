//! Accounts domain module: identity documents and roles.

pub mod account;
pub mod roles;

pub use account::{Account, NewAccount};
pub use roles::Role;
