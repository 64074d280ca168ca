use rand::RngExt;

/// Keep only ASCII alphanumerics from a company name, uppercased.
fn compact(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

/// Generate a tenant code from a company name: the compacted name truncated
/// to at most 8 characters, followed by a 4-digit numeric suffix.
/// Format: `[A-Z0-9]{0,8}[0-9]{4}`, total length ≤ 12. A name with no
/// alphanumeric characters yields a suffix-only code.
///
/// Deliberately not idempotent — each call draws a fresh suffix; collisions
/// are handled by the preflight catalog check, not by regeneration.
pub fn generate_code(name: &str) -> String {
    generate_code_with(name, &mut rand::rng())
}

/// Same as [`generate_code`] but with a caller-supplied RNG, so the suffix
/// is deterministic under a seeded generator.
pub fn generate_code_with<R: RngExt>(name: &str, rng: &mut R) -> String {
    let base = compact(name);
    let prefix = if base.len() > 8 { &base[..8] } else { &base };
    let suffix = rng.random_range(0u32..10_000);
    format!("{}{:04}", prefix, suffix)
}

/// Validate an operator-supplied tenant code override: 4 to 12 characters,
/// uppercase alphanumerics only.
pub fn is_valid_code(code: &str) -> bool {
    (4..=12).contains(&code.len())
        && code
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
}
