//! Single retry for transient storage failures.

use crate::ResolutionError;

/// Run `op`, and run it once more if it failed with a transient storage error.
///
/// A failed write transaction has already been rolled back, so the second
/// attempt starts from the same state as the first. Domain errors are returned
/// as-is.
pub fn retry_once<T>(
    mut op: impl FnMut() -> Result<T, ResolutionError>,
) -> Result<T, ResolutionError> {
    match op() {
        Err(e) if e.is_transient() => {
            tracing::warn!(error = %e, "transient storage failure, retrying once");
            op()
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tsl_store::StoreError;

    #[test]
    fn transient_failure_is_retried_once() {
        let mut calls = 0;
        let result = retry_once(|| {
            calls += 1;
            if calls == 1 {
                Err(ResolutionError::Store(StoreError::Backend("busy".into())))
            } else {
                Ok(calls)
            }
        });
        assert_eq!(result.unwrap(), 2);
    }

    #[test]
    fn second_transient_failure_is_surfaced() {
        let mut calls = 0;
        let result: Result<(), _> = retry_once(|| {
            calls += 1;
            Err(ResolutionError::Store(StoreError::Backend("busy".into())))
        });
        assert!(result.is_err());
        assert_eq!(calls, 2);
    }

    #[test]
    fn domain_errors_are_not_retried() {
        let mut calls = 0;
        let result: Result<(), _> = retry_once(|| {
            calls += 1;
            Err(ResolutionError::Conflict("duplicate vote".into()))
        });
        assert!(matches!(result, Err(ResolutionError::Conflict(_))));
        assert_eq!(calls, 1);
    }
}
