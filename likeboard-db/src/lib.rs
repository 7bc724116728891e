pub mod client;
mod record;

pub use client::{DbClient, DbError};
