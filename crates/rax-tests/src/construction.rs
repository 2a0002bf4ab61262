//! Construction tests: factories, default dtypes and weak typing
//!
//! Arrays only come from backend factories; direct construction is always rejected.
