#![allow(unused_imports)]

pub use projectstep_test_utils::builders;
pub use projectstep_test_utils::fake_channel;
pub use projectstep_test_utils::{init_tracing, with_timeout};
