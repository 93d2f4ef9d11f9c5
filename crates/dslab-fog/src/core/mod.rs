pub mod broker;
pub mod common;
pub mod config;
pub mod datacenter;
pub mod engine;
pub mod error;
pub mod events;
pub mod fair_share;
pub mod metrics;
pub mod placement;
pub mod resource;
pub mod resource_pool;
pub mod sensor;
pub mod tier;
pub mod utilization_model;
pub mod vm;
pub mod vm_placement_algorithm;
pub mod workload;
