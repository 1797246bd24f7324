use serde::Deserialize;

/// `[whitelist]`: domains seeded into the Whitelist set at startup.
///
/// Operator convenience only — does not replace the runtime `SAdd`/`SRem`
/// contract the admin collaborators use to manage the set afterward.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WhitelistConfig {
    pub domains: Vec<String>,
}
