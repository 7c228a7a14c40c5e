//! Validation helpers for DTOs.

use validator::ValidationError;

/// Lowest inning a session can reference.
pub const MIN_INNING: u32 = 1;
/// Highest inning a session can reference, extra innings included.
pub const MAX_INNING: u32 = 99;

/// Most runs a side can be credited with in one half-inning.
pub const MAX_RUNS: u32 = 999;

/// Whether `inning` lies within [`MIN_INNING`]..=[`MAX_INNING`].
pub fn is_valid_inning(inning: u32) -> bool {
    (MIN_INNING..=MAX_INNING).contains(&inning)
}

/// Validates that an inning number lies within the accepted range.
///
/// # Examples
///
/// ```ignore
/// validate_inning_number(&1)   // Ok
/// validate_inning_number(&99)  // Ok
/// validate_inning_number(&0)   // Err
/// ```
pub fn validate_inning_number(inning: &u32) -> Result<(), ValidationError> {
    if is_valid_inning(*inning) {
        return Ok(());
    }

    let mut err = ValidationError::new("inning_number_range");
    err.message = Some(
        format!("Inning number must be between {MIN_INNING} and {MAX_INNING} (got {inning})")
            .into(),
    );
    Err(err)
}

/// Validates that a half-inning run count does not exceed [`MAX_RUNS`].
pub fn validate_runs(runs: &u32) -> Result<(), ValidationError> {
    if *runs <= MAX_RUNS {
        return Ok(());
    }

    let mut err = ValidationError::new("runs_range");
    err.message = Some(format!("Runs must be at most {MAX_RUNS} (got {runs})").into());
    Err(err)
}
