// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Paste identifiers: eight characters from `[A-Za-z0-9]`.

use rand::{distributions::Alphanumeric, Rng};

/// Length of a paste id.
pub const ID_LEN: usize = 8;

/// Generate a random paste id.
pub fn generate() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(ID_LEN)
        .map(char::from)
        .collect()
}

/// Whether `id` has the shape of a paste id.
pub fn is_valid(id: &str) -> bool {
    id.len() == ID_LEN && id.bytes().all(|b| b.is_ascii_alphanumeric())
}
