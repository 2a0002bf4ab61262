//! Arithmetic, promotion and comparison tests - JAX compatible
