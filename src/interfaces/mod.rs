//! Boundary adapters turning external input into orchestrator calls and
//! results back into output.

pub mod csv;
