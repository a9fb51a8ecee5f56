//! Common test utilities for workflow tests.
//!
//! This module provides test infrastructure including:
//!
//! - [`mock_service`] - an in-process json-server style REST service
//! - [`fixtures`] - seed data for the mock service

#![allow(dead_code)]

pub mod fixtures;
pub mod mock_service;
