//! Request middleware applied by the engine to every registered route.

pub mod auth;
