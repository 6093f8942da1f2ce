//! Behavioural scenarios for the run workflow.

mod run;
