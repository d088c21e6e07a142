//! Profile vectorization: survey response → attribute vector.

use tracing::debug;

use crate::error::Result;
use crate::models::{AttributeVector, SurveyResponse};

/// Map a response's Likert ratings onto the fixed 18-dimension schema.
///
/// Ratings are copied verbatim (1-10 is the internal scale) and the two
/// derived scalars are computed as plain means. Fails with
/// [`Error::Validation`](crate::Error::Validation) if any rating is missing
/// or outside [1, 10].
pub fn vectorize(response: &SurveyResponse) -> Result<AttributeVector> {
    let vector = AttributeVector::from_ratings(&response.ratings)?;
    debug!(
        subsystem = "core",
        component = "vectorizer",
        readiness_score = vector.readiness_score(),
        community_interest_avg = vector.community_interest_avg(),
        "Response vectorized"
    );
    Ok(vector)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Dimension;
    use crate::Error;

    fn response_with(f: impl Fn(Dimension) -> i32) -> SurveyResponse {
        SurveyResponse {
            ratings: Dimension::ALL.iter().map(|d| (*d, f(*d))).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_copies_ratings_verbatim() {
        let response = response_with(|d| (d as i32 % 10) + 1);
        let v = vectorize(&response).unwrap();
        for (dim, value) in v.iter() {
            assert_eq!(value, f64::from(response.ratings[&dim]));
        }
    }

    #[test]
    fn test_readiness_score_is_mean_of_three() {
        let response = response_with(|d| match d {
            Dimension::Agency => 10,
            Dimension::Preparedness => 5,
            Dimension::LocationFreedom => 3,
            _ => 1,
        });
        let v = vectorize(&response).unwrap();
        assert!((v.readiness_score() - 6.0).abs() < 1e-12);
    }

    #[test]
    fn test_community_interest_avg_unrounded() {
        let response = response_with(|d| if d == Dimension::InterestArts { 2 } else { 1 });
        let v = vectorize(&response).unwrap();
        // 8 / 7 is not representable exactly; no rounding is applied
        assert_eq!(v.community_interest_avg(), 8.0 / 7.0);
    }

    #[test]
    fn test_idempotent() {
        let response = response_with(|d| (d as i32 * 3 % 10) + 1);
        assert_eq!(vectorize(&response).unwrap(), vectorize(&response).unwrap());
    }

    #[test]
    fn test_missing_rating_fails() {
        let mut response = response_with(|_| 5);
        response.ratings.remove(&Dimension::FinancialReadiness);
        assert!(matches!(vectorize(&response), Err(Error::Validation(_))));
    }
}
