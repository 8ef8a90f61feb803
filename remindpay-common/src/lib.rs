pub mod messenger;
pub mod models;
pub mod schema;
pub mod service;
pub mod store;
