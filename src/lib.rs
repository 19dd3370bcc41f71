pub mod api;
pub mod board;
pub mod client;
pub mod config;
pub mod db;
pub mod models;
