pub mod dispatcher;
pub mod error;
pub mod feed;
pub mod logging;
pub mod model;
pub mod ranking;
pub mod registry;
pub mod seed;
pub mod service;
pub mod store;
pub mod web;
