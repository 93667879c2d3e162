pub mod api;
pub mod auth;
pub mod billing;
pub mod channels;
pub mod combo;
pub mod config;
pub mod scheduling;
pub mod shared;
pub mod store;
