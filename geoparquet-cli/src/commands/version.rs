//! `geoparquet version` (§6.2): the crate's own package version plus, when
//! the build embedded them, the commit and date.
//!
//! Grounded in `stac-cli`'s own version plumbing: the package version
//! always comes from `CARGO_PKG_VERSION`;
//! commit/date are optional `option_env!` hooks a packager can set via
//! `GEOPARQUET_BUILD_COMMIT`/`GEOPARQUET_BUILD_DATE` at compile time,
//! rather than a `build.rs` that shells out to `git` (which would make an
//! offline or vendored build fail).

pub fn run() {
    let mut line = format!("geoparquet {}", env!("CARGO_PKG_VERSION"));
    if let Some(commit) = option_env!("GEOPARQUET_BUILD_COMMIT") {
        line.push_str(&format!(" ({commit}"));
        if let Some(date) = option_env!("GEOPARQUET_BUILD_DATE") {
            line.push_str(&format!(", {date}"));
        }
        line.push(')');
    }
    println!("{line}");
}
