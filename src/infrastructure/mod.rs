//! Infrastructure layer - stores, action adapters and the execution engine

pub mod action;
pub mod execution;
pub mod logging;
pub mod observability;
pub mod services;
pub mod storage;
pub mod workflow;
