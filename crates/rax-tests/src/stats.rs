//! Reduction and sorting tests - NumPy compatible
