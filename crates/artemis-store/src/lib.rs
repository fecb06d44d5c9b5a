pub mod demo;
pub mod drafts;
pub mod memory;

pub use demo::{DEMO_PROPOSAL_ID, demo_proposal};
pub use drafts::{DraftStore, DraftStoreError};
pub use memory::InMemoryProposalRepository;
