#![allow(unused_imports)]

pub use stepdag_test_utils::builders;
pub use stepdag_test_utils::recording;
pub use stepdag_test_utils::{init_tracing, with_timeout, within_deadline};
