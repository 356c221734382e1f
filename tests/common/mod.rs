#![allow(dead_code, unused_imports)]

pub use sitepipe_test_utils::{builders, fake_executor, init_tracing, orchestrator, project, with_timeout};
