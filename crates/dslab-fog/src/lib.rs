//! A library for simulating health sensor processing on edge, fog and cloud tiers.
//!
//! Sensors are placed on tiers by their criticality, their workloads run on time-shared VMs of per-tier
//! datacenters, and the results are summarized into latency, energy and cost metrics.
//!
//! ## Examples
//!
//! - [health-fog](../../demos/health-fog): runs the five-sensor health scenario from a YAML config and emits
//! all reports.

pub mod context;
pub mod core;
pub mod log;
pub mod reporting;
pub mod scenario;
pub mod simulation;

pub use colored;
