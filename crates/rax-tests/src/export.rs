//! Host export tests: scalars, nested lists, raw bytes, buffer and DLPack views
