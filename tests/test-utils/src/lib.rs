//! Test utilities and fixtures for peer-reporter testing
//! 
//! This module provides testing utilities including:
//! - Mock metric source, notifier and registry builders
//! - rstest fixtures for samples and watchlists
//! - Temporary snapshot environments and logging helpers

pub mod fixtures;
pub mod mocks;
pub mod helpers;

pub use fixtures::*;
pub use mocks::*;
pub use helpers::*;
