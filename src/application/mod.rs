pub mod admin;
pub mod catalog;
pub mod error;
pub mod ledger;
pub mod mirror;
pub mod payload;
pub mod remote;
pub mod repos;
pub mod votes;
