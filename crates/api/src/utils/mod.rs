//! Request helpers shared by the handlers

pub mod client;
pub mod cookies;
pub mod health;
