use serde_json::Value;

pub fn record_verification(outcome: &'static str, seconds: f64) {
    metrics::counter!("society_ai_verifications_total", "outcome" => outcome).increment(1);
    metrics::histogram!("society_ai_verification_duration_seconds", "outcome" => outcome)
        .record(seconds);
}

pub fn increment_verification_errors(stage: &'static str) {
    metrics::counter!("society_ai_verification_errors_total", "stage" => stage).increment(1);
}

pub fn increment_gemini_api_errors(call: &'static str) {
    metrics::counter!("society_ai_gemini_api_errors_total", "call" => call).increment(1);
}

/// Records token usage from a generateContent `usageMetadata` block.
pub fn record_gemini_token_usage(usage: &Value) {
    if let Some(input_tokens) = usage["promptTokenCount"].as_i64() {
        metrics::counter!("society_ai_gemini_tokens_total", "type" => "input")
            .increment(input_tokens as u64);
    }
    if let Some(output_tokens) = usage["candidatesTokenCount"].as_i64() {
        metrics::counter!("society_ai_gemini_tokens_total", "type" => "output")
            .increment(output_tokens as u64);
    }
}
