#![cfg(test)]

pub mod common;
pub mod resume_tests;
pub mod config_tests;
