pub mod config;
pub mod contracts;
pub mod db;
pub mod repository;

pub use config::ServiceConfig;
pub use contracts::{HealthResponse, ListProposalsQuery, SubmitProposalRequest};
pub use db::{apply_schema, connect_database};
pub use repository::SqliteProposalRepository;
