//! Workspace root: integration-test harness only; no library code.
