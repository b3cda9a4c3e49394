pub mod app;
pub mod cli_args;
pub mod error;
pub mod rate_limit;
