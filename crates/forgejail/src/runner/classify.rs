//! Outcome classification
//!
//! Precedence is fixed: a timeout wins over any exit code, then a non-zero
//! exit code, then a missing exit code.

use crate::types::{ExecutionResult, Outcome};

/// Classify a populated result
pub fn classify(result: &ExecutionResult) -> Outcome {
    if result.timed_out {
        return Outcome::TimeLimitExceeded;
    }
    match result.exit_code {
        Some(0) => Outcome::Success,
        Some(_) => Outcome::RuntimeError,
        None => Outcome::ServerError,
    }
}

/// Fill in the message unless a failure path already set one
pub fn finalize(result: &mut ExecutionResult) {
    if result.message.is_empty() {
        result.message = classify(result).message().to_owned();
    }
}


#[cfg(test)]
mod proptests {
    use proptest::prelude::*;

    use super::*;

    proptest! {
        #[test]
        fn timeout_always_wins(code in proptest::option::of(any::<i32>())) {
            let r = ExecutionResult { exit_code: code, timed_out: true, ..Default::default() };
            prop_assert_eq!(classify(&r), Outcome::TimeLimitExceeded);
        }

        #[test]
        fn non_zero_exit_is_runtime_error(code in any::<i32>().prop_filter("non-zero", |c| *c != 0)) {
            let r = ExecutionResult { exit_code: Some(code), ..Default::default() };
            prop_assert_eq!(classify(&r), Outcome::RuntimeError);
        }
    }
}
