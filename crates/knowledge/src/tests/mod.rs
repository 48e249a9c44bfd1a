//! Crate-level tests spanning ingestion, retrieval and answering.

mod support;
