//! Application layer containing the transaction orchestration logic.
//!
//! `TransactionOrchestrator` is the entry point for money-movement operations.
//! Calls to the ledger service go through a named `CircuitBreaker` handed
//! out by a `CircuitBreakerRegistry` built once at startup.

pub mod circuit_breaker;
pub mod orchestrator;
