pub mod dependency_tests;
pub mod support;
