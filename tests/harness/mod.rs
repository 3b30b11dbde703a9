// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: Apache-2.0

//! Test harness for paste service abuse simulation.
//!
//! This module provides utilities for replaying abusive traffic patterns
//! against the admission tiers on a simulated clock.

pub mod attacks;
pub mod generators;
pub mod metrics;
