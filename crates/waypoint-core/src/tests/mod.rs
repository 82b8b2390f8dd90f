// Cross-module scenarios
mod integration;
