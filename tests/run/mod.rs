//! BDD harness for the run workflow.

pub mod bdd_steps;
pub mod scenarios;
pub mod test_helpers;
