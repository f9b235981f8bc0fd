//! Field validators for inbound intake answers
//!
//! Each check looks only at the inbound message, never at the stored record.
//! A successful check hands back the normalized value that gets persisted.

/// Token whose presence in a message means "yes, start the questions".
pub const AFFIRMATIVE_TOKEN: &str = "ja";

/// Words that withdraw consent (DSGVO opt-out). Matched as whole words so
/// that answers like "ich verwende Strom" do not unsubscribe anyone.
pub const OPT_OUT_KEYWORDS: [&str; 6] = [
    "stop",
    "stopp",
    "abmelden",
    "abbestellen",
    "ende",
    "unsubscribe",
];

/// Length of a German postal code (PLZ).
const POSTAL_CODE_LEN: usize = 5;

/// Whether the message opts in to the intake conversation.
///
/// Substring match after trimming and lower-casing, so "JA bitte!", "ja."
/// and "Ja" all count.
pub fn is_affirmative(text: &str) -> bool {
    text.trim().to_lowercase().contains(AFFIRMATIVE_TOKEN)
}

/// Whether the message asks to stop all further messages.
///
/// Checked before any state-specific validation.
pub fn is_opt_out(text: &str) -> bool {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .any(|word| {
            let word = word.to_lowercase();
            OPT_OUT_KEYWORDS.contains(&word.as_str())
        })
}

/// Validate a postal code: exactly five ASCII digits once trimmed.
pub fn postal_code(text: &str) -> Option<String> {
    let trimmed = text.trim();
    let valid = trimmed.len() == POSTAL_CODE_LEN && trimmed.bytes().all(|b| b.is_ascii_digit());
    valid.then(|| trimmed.to_string())
}

/// Validate an annual consumption figure in kWh.
///
/// Accepts any finite number strictly greater than zero. A trailing "kWh"
/// unit and a single decimal comma ("3500,5") are tolerated.
pub fn consumption(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    let lowered = trimmed.to_ascii_lowercase();
    let number = lowered
        .strip_suffix("kwh")
        .map_or(lowered.as_str(), str::trim_end);

    let normalized = if number.matches(',').count() == 1 && !number.contains('.') {
        number.replace(',', ".")
    } else {
        number.to_string()
    };

    let value: f64 = normalized.parse().ok()?;
    (value.is_finite() && value > 0.0).then_some(value)
}

/// Validate that the message carried at least one attachment.
pub fn has_photo(attachment_count: u32) -> bool {
    attachment_count > 0
}
