pub mod config;
pub mod http;
pub mod install;
pub mod ledger;
pub mod model;
pub mod resolver;
pub mod source;
