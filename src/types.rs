use serde::{Deserialize, Serialize};

/// One patient's clinical and demographic attributes, as posted to `/predict`.
///
/// Every field is required. Unknown keys in the request body are ignored.
#[allow(non_snake_case)]
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct PatientRecord {
    pub gender: i64,                 // encoded category
    pub age: f64,
    pub hypertension: i64,           // 0/1
    pub heart_disease: i64,          // 0/1
    pub bmi: f64,
    pub HbA1c_level: f64,
    pub blood_glucose_level: f64,
    // one-hot smoking history
    pub smoking_history_current: i64,
    pub smoking_history_ever: i64,
    pub smoking_history_former: i64,
    pub smoking_history_never: i64,
    pub smoking_history_not_current: i64,
}

impl PatientRecord {
    /// Named numeric view of the record, in declaration order.
    pub fn features(&self) -> Vec<(&'static str, f64)> {
        vec![
            ("gender", self.gender as f64),
            ("age", self.age),
            ("hypertension", self.hypertension as f64),
            ("heart_disease", self.heart_disease as f64),
            ("bmi", self.bmi),
            ("HbA1c_level", self.HbA1c_level),
            ("blood_glucose_level", self.blood_glucose_level),
            ("smoking_history_current", self.smoking_history_current as f64),
            ("smoking_history_ever", self.smoking_history_ever as f64),
            ("smoking_history_former", self.smoking_history_former as f64),
            ("smoking_history_never", self.smoking_history_never as f64),
            ("smoking_history_not_current", self.smoking_history_not_current as f64),
        ]
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PredictionOut {
    pub prediction: i64,
    pub probability: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct HealthOut {
    pub status: String,
    pub model: String,
    pub n_features: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn record_ignores_unknown_fields() {
        let body = json!({
            "gender": 1, "age": 45.0, "hypertension": 0, "heart_disease": 0,
            "bmi": 27.3, "HbA1c_level": 5.8, "blood_glucose_level": 120.0,
            "smoking_history_current": 0, "smoking_history_ever": 1,
            "smoking_history_former": 0, "smoking_history_never": 0,
            "smoking_history_not_current": 0,
            "favourite_colour": "blue"
        });
        let rec: PatientRecord = serde_json::from_value(body).unwrap();
        assert_eq!(rec.smoking_history_ever, 1);
        assert_eq!(rec.features().len(), 12);
    }

    #[test]
    fn record_rejects_missing_field() {
        let body = json!({ "gender": 1, "age": 45.0 });
        let err = serde_json::from_value::<PatientRecord>(body).unwrap_err();
        assert!(err.to_string().contains("missing field"));
    }

    #[test]
    fn record_rejects_non_numeric() {
        let body = json!({
            "gender": "male", "age": 45.0, "hypertension": 0, "heart_disease": 0,
            "bmi": 27.3, "HbA1c_level": 5.8, "blood_glucose_level": 120.0,
            "smoking_history_current": 0, "smoking_history_ever": 1,
            "smoking_history_former": 0, "smoking_history_never": 0,
            "smoking_history_not_current": 0
        });
        assert!(serde_json::from_value::<PatientRecord>(body).is_err());
    }

    #[test]
    fn integer_literals_accepted_for_float_fields() {
        let body = json!({
            "gender": 0, "age": 60, "hypertension": 1, "heart_disease": 0,
            "bmi": 31, "HbA1c_level": 7, "blood_glucose_level": 200,
            "smoking_history_current": 0, "smoking_history_ever": 0,
            "smoking_history_former": 1, "smoking_history_never": 0,
            "smoking_history_not_current": 0
        });
        let rec: PatientRecord = serde_json::from_value(body).unwrap();
        assert_eq!(rec.age, 60.0);
        assert_eq!(rec.blood_glucose_level, 200.0);
    }
}
