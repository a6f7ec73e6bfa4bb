//! Tower/axum middleware applied to every route.

pub mod firewall;
