pub mod config;
pub mod constants;
pub mod control;
pub mod extractors;
pub mod game;
pub mod logging;
pub mod middleware;
pub mod pose;
pub mod response;
pub mod routes;
pub mod state;
pub mod store;
pub mod validation;
