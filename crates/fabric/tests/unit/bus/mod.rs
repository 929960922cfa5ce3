//! Unit tests for the bus fabric shapes.
