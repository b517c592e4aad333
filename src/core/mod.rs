pub mod db;
pub mod errors;
pub mod form;
pub mod helpers;
pub mod query_params;
pub mod static_server;
pub mod store;
pub mod token;

#[cfg(test)]
pub mod test_support;
