pub mod app;
pub mod auth_proxy;
pub mod cache;
pub mod db;
pub mod env;
