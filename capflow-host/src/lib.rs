//! capflow-host: host-side machinery for the capflow permission-request flow
//!
//! This crate provides the request orchestrator and the trait surface a host
//! implements to connect it to a real platform.

pub mod flow;

pub use capflow_api::{
    CapabilityRequest, CapabilityStatus, ContractError, GrantResults, Outcome,
};
pub use flow::{
    CapabilityOracle, DialogChoice, DialogHandler, FlowHost, FlowHostBuilder, FlowState,
    FlowStep, OutcomeReceiver, PermissionFlow, SettingsGateway,
};
