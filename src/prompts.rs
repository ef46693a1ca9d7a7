//! Classifier instruction text.
//!
//! Centralising the prompt here keeps the classifier client focused on
//! transport and parsing: changing what the service is asked for requires
//! editing exactly one place, and unit tests can inspect the instruction
//! without calling a real service.

/// Instruction sent with every image.
///
/// Asks for a bare JSON object so the reply parses directly; the client
/// still strips code fences because vision models routinely wrap JSON in
/// them regardless of instructions.
pub const CLASSIFY_PROMPT: &str = r#"Analyze this interior design image and reply with a JSON object only.

Fields:
1. "title": a creative short title (e.g. "Minimalist Wood Cafe")
2. "space": the space type (e.g. Hotel, Home, Office, Cafe, Retail)
3. "vibe": the style or atmosphere (e.g. Minimalist, Industrial, Warm Nordic)
4. "detail": the key material or colour tone (e.g. Wood & White, Dark Grey, Marble)

Example output:
{"title": "Cozy Nordic Living Room", "space": "Home", "vibe": "Warm Nordic", "detail": "Wood & Beige"}

Reply with the JSON object and nothing else. Do not wrap it in code fences."#;
