use rain_core::{ClientError, Prediction, ServiceStatus};

pub fn prediction(p: &Prediction) -> String {
    if p.will_rain() {
        format!(
            "YES: Rain expected tomorrow\n\
             Rain probability: {:.2}%\n\
             Recommendation: Best to pack an umbrella!",
            p.probability * 100.0
        )
    } else {
        format!(
            "NO: No rain expected tomorrow\n\
             Clear sky confidence: {:.2}%\n\
             Recommendation: Enjoy the good weather!",
            (1.0 - p.probability) * 100.0
        )
    }
}

pub fn status(s: &ServiceStatus) -> String {
    match s {
        ServiceStatus::Ready => "API Connected\nModel Loaded".to_string(),
        ServiceStatus::ModelNotLoaded => "API Connected\nModel Not Loaded (check the service logs)".to_string(),
        ServiceStatus::Unavailable(ClientError::Api { status, .. }) => {
            format!("API Error (status {status})\nModel check failed")
        }
        ServiceStatus::Unavailable(_) => "Cannot connect to API\nModel check failed".to_string(),
    }
}

/// Message for a failed prediction; transport problems are worded apart
/// from errors the service reported.
pub fn failure(e: &ClientError, api_url: &str) -> String {
    match e {
        ClientError::Timeout => e.to_string(),
        ClientError::Unreachable(_) => {
            format!("Cannot reach the prediction service at {api_url}. Is rain-server running?")
        }
        ClientError::Api { .. } | ClientError::Decode(_) => e.to_string(),
    }
}
