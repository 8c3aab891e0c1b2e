pub mod cli_args;
mod error;
mod extractor;
mod middleware;
mod rate_limit;
mod route;
pub mod server;
mod state;
mod store;
mod utils;

#[cfg(test)]
mod test;
