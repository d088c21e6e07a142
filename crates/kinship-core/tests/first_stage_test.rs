//! End-to-end checks of the first pipeline stage on a realistic response.
//!
//! Validation, vectorization and quality assessment are run in the order the
//! intake performs them, against a JSON payload shaped like a real submission.

use kinship_core::{assess, validate_response, vectorize, Dimension, Error, SurveyResponse};

const SUBMISSION: &str = r#"{
    "email": "marisol@example.org",
    "first_name": "Marisol",
    "last_name": "Vega",
    "age": 41,
    "phone": "+1 555 0100",
    "social_links": "https://example.org/marisol",
    "contact_times": ["morning", "weekend"],
    "narrative": {
        "motivation": "I want to raise my kids near land we steward together.",
        "skills": "Carpentry, grant writing",
        "vision": "A small cooperative village",
        "contribution": "Build the first common house",
        "concerns": "",
        "ideal_day": "Garden, build, shared dinner",
        "dealbreakers": "Top-down decision making"
    },
    "ratings": {
        "agency": 8, "preparedness": 6, "location_freedom": 4,
        "settlement_desire": 9, "family_orientation": 9, "risk_tolerance": 5,
        "self_sufficiency": 7, "collaboration": 8, "spirituality": 3,
        "ecological_commitment": 9, "financial_readiness": 5,
        "interest_intentional_community": 10, "interest_permaculture": 8,
        "interest_homesteading": 6, "interest_governance": 4,
        "interest_education": 7, "interest_arts": 5, "interest_technology": 2
    }
}"#;

fn submission() -> SurveyResponse {
    serde_json::from_str(SUBMISSION).expect("fixture deserializes")
}

#[test]
fn test_realistic_submission_flows_through_first_stage() {
    let response = submission();
    validate_response(&response).expect("fixture is valid");

    let vector = vectorize(&response).expect("fixture vectorizes");
    assert_eq!(vector.get(Dimension::SettlementDesire), 9.0);
    assert_eq!(vector.readiness_score(), 6.0);
    assert_eq!(vector.community_interest_avg(), 42.0 / 7.0);

    let quality = assess(&response);
    // concerns is blank and anything_else is absent: 9 of 11
    assert!((quality.completeness - 900.0 / 11.0).abs() < 1e-9);
    // collaboration 8 vs governance 4 is the only failing check
    assert_eq!(quality.consistency_score, 75.0);
    assert!(quality.response_length_avg > 0.0);
}

#[test]
fn test_out_of_range_rating_fails_before_vectorizing() {
    let mut response = submission();
    response.ratings.insert(Dimension::RiskTolerance, 15);

    assert!(matches!(validate_response(&response), Err(Error::Validation(_))));
    assert!(matches!(vectorize(&response), Err(Error::Validation(_))));
}

#[test]
fn test_stored_vector_round_trips() {
    let vector = vectorize(&submission()).unwrap();
    let json = serde_json::to_string(&vector).unwrap();
    let back: kinship_core::AttributeVector = serde_json::from_str(&json).unwrap();
    assert_eq!(back, vector);
}
