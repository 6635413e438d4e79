//! Admission policy facades.

pub mod admission;
