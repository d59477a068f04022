//! Profile registry: loads all load profiles from embedded TOML configs.
//!
//! Each `.toml` file in `packages/ingest/profiles/` is baked into the
//! binary at compile time via [`include_str!`]. Adding a new profile is as
//! simple as creating a new TOML file and adding it to the list below.

use road_safety_ingest_models::LoadProfile;

/// TOML configs embedded at compile time.
const PROFILE_TOMLS: &[(&str, &str)] = &[
    ("quick_look", include_str!("../profiles/quick_look.toml")),
    (
        "full_dashboard",
        include_str!("../profiles/full_dashboard.toml"),
    ),
];

/// Profile used when the caller does not pick one.
pub const DEFAULT_PROFILE_ID: &str = "full_dashboard";

/// Parses a single load profile from TOML.
///
/// # Errors
///
/// Returns the TOML deserialization message if the config is malformed.
pub fn parse_profile_toml(toml_str: &str) -> Result<LoadProfile, String> {
    toml::de::from_str(toml_str).map_err(|e| e.to_string())
}

/// Returns all configured load profiles, parsed from embedded TOML.
///
/// # Panics
///
/// Panics if any TOML config is malformed (this is a compile-time guarantee
/// since the configs are embedded).
#[must_use]
pub fn all_profiles() -> Vec<LoadProfile> {
    PROFILE_TOMLS
        .iter()
        .map(|(name, toml)| {
            parse_profile_toml(toml).unwrap_or_else(|e| panic!("Failed to parse {name}.toml: {e}"))
        })
        .collect()
}

/// Looks up a profile by its `id`.
#[must_use]
pub fn profile_by_id(id: &str) -> Option<LoadProfile> {
    all_profiles().into_iter().find(|p| p.id == id)
}
