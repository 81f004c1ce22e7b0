//! Route handlers organized by domain.

pub mod extensions;
pub mod health;
