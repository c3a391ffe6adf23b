//! Small helpers shared across the domain.

pub mod string;
