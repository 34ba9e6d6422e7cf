//! Build metadata embedded by `build.rs`.

/// Package version from Cargo.toml.
pub const PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Git branch at build time.
pub const GIT_BRANCH: &str = or_unknown(option_env!("VERGEN_GIT_BRANCH"));

/// Full git commit SHA at build time.
pub const GIT_SHA: &str = or_unknown(option_env!("VERGEN_GIT_SHA"));

/// RFC 3339 build timestamp.
pub const BUILD_TIMESTAMP: &str = or_unknown(option_env!("VERGEN_BUILD_TIMESTAMP"));

const fn or_unknown(value: Option<&'static str>) -> &'static str {
    match value {
        Some(value) => value,
        None => "unknown",
    }
}

/// Whether the working tree was dirty at build time.
pub fn git_dirty() -> bool {
    option_env!("VERGEN_GIT_DIRTY") == Some("true")
}

/// First seven characters of [`GIT_SHA`].
pub fn short_sha() -> &'static str {
    GIT_SHA.get(..7).unwrap_or(GIT_SHA)
}

/// `{version}+{branch}.{sha}`, suffixed `.dirty` for modified trees.
pub fn version_string() -> String {
    let dirty = if git_dirty() { ".dirty" } else { "" };
    format!("{PKG_VERSION}+{GIT_BRANCH}.{}{dirty}", short_sha())
}

/// `User-Agent` sent by [`HttpTransport`](crate::HttpTransport).
pub fn user_agent() -> String {
    format!("huginn/{PKG_VERSION} ({})", short_sha())
}
