//! Property tests for the exporters.

mod serializer_tests;
mod skill_cap_tests;
