use colored::Colorize;
use tokencheck_core::{DecodedToken, VerificationResult};

fn pretty<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| format!("<unprintable: {e}>"))
}

/// Decoded header and payload, printed before verification in verbose mode.
pub fn render_decoded(token: &DecodedToken) -> String {
    format!(
        "\nDecoded token header: {}\n\nDecoded token payload: {}\n",
        pretty(token.header()),
        pretty(token.payload()),
    )
}

/// Human-readable report of a validation result.
pub fn render_result(result: &VerificationResult) -> String {
    match result {
        VerificationResult::Valid { claims } => format!(
            "\n{}\n\nValidated payload: {}\n",
            "✅ Token is valid!".green().bold(),
            pretty(claims),
        ),
        VerificationResult::Invalid { reason, detail } => format!(
            "\n{}\n\nReason: {} ({})\nError: {}\n",
            "❌ Token is invalid!".red().bold(),
            reason,
            reason.as_str().yellow(),
            detail,
        ),
    }
}

/// Machine-readable report of a validation result.
pub fn render_json(result: &VerificationResult) -> String {
    pretty(result)
}
