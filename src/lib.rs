pub mod app;
pub mod arith;
pub mod config;
pub mod logging;
pub mod rpc;
pub mod web;
