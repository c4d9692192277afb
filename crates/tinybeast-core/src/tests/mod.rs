mod mocks;
mod orchestrator_tests;
