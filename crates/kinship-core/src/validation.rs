//! Basic shape checks on incoming survey responses.
//!
//! Only the checks the pipeline depends on live here: a plausible email when
//! one is given, a plausible age, and Likert ratings inside the scale.
//! Missing contact fields are not errors; they lower `completeness` instead.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::defaults::{LIKERT_MAX, LIKERT_MIN};
use crate::error::{Error, Result};
use crate::models::{Dimension, SurveyResponse};

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern is a valid regex")
});

/// Oldest accepted age.
pub const MAX_AGE: u32 = 120;

/// Check the shape of a response before anything is persisted or scored.
///
/// Every problem found is reported at once, joined with `; `.
pub fn validate_response(response: &SurveyResponse) -> Result<()> {
    let mut problems = Vec::new();

    let email = response.email.trim();
    if !email.is_empty() && !EMAIL_RE.is_match(email) {
        problems.push(format!("malformed email: {}", email));
    }

    if let Some(age) = response.age {
        if age == 0 || age > MAX_AGE {
            problems.push(format!("age must be between 1 and {}, got {}", MAX_AGE, age));
        }
    }

    for dim in Dimension::ALL {
        match response.ratings.get(&dim) {
            None => problems.push(format!("missing rating: {}", dim)),
            Some(v) if !(LIKERT_MIN..=LIKERT_MAX).contains(v) => problems.push(format!(
                "{} must be between {} and {}, got {}",
                dim, LIKERT_MIN, LIKERT_MAX, v
            )),
            Some(_) => {}
        }
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(Error::Validation(problems.join("; ")))
    }
}

/// Whether a string looks like an email address.
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email.trim())
}
