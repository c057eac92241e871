pub mod admin;
pub mod auth;
pub mod email;
pub mod user;

use obmin_core::error::CoreError;
use validator::Validate;

use crate::error::{AppError, AppResult};

/// Run `validator` rules on a request body, mapping failures to 400.
pub(crate) fn validate_input<T: Validate>(input: &T) -> AppResult<()> {
    input
        .validate()
        .map_err(|e| AppError::Core(CoreError::Validation(e.to_string())))
}
