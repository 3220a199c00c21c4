pub mod api;
pub mod cache;
pub mod cli;
pub mod database_ops;
pub mod normalization;
pub mod refresh;
pub mod tracing;

pub mod util {
    pub mod env;
    pub mod retry;
    pub mod season;
}
