//! Device placement and shard layout tests
