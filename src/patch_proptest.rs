//! Property-based tests for the key-path patcher.
