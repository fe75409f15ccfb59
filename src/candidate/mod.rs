//! Candidate labels and fusion policies.

pub(crate) mod vote;
