//! `geoparquet validate` (§6.2): run the rule engine and render the report
//! as text or JSON. Exits 1 if any check that ran did not pass.

use crate::driver::Source;
use crate::error::CliResult;
use geoparquet_core::validator::{validate, Check, ValidateOptions};
use serde::Serialize;
use std::io::Write;

pub struct ValidateArgs {
    pub input: Option<String>,
    pub metadata_only: bool,
    pub format: String,
    pub unpretty: bool,
}

#[derive(Serialize)]
struct CheckJson<'a> {
    title: &'a str,
    run: bool,
    passed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: &'a Option<String>,
}

#[derive(Serialize)]
struct ReportJson<'a> {
    metadata_only: bool,
    passed: bool,
    checks: Vec<CheckJson<'a>>,
}

/// Runs the validator and returns whether the report passed, so `main` can
/// map a failed-but-error-free run to exit code 1 (§6.3).
pub fn run(args: ValidateArgs) -> CliResult<bool> {
    let source = Source::from_arg(args.input.as_deref());
    let bytes = source.read_to_bytes()?;
    let opts = ValidateOptions { metadata_only: args.metadata_only };
    let report = validate(bytes, opts)?;
    let passed = !report.failed();

    let mut stdout = std::io::stdout();
    if args.format == "json" {
        let json = ReportJson {
            metadata_only: args.metadata_only,
            passed,
            checks: report.checks.iter().map(to_json).collect(),
        };
        if args.unpretty {
            writeln!(stdout, "{}", serde_json::to_string(&json)?)?;
        } else {
            writeln!(stdout, "{}", serde_json::to_string_pretty(&json)?)?;
        }
    } else {
        for check in &report.checks {
            let marker = if !check.run {
                "SKIP"
            } else if check.passed {
                "PASS"
            } else {
                "FAIL"
            };
            match &check.message {
                Some(msg) => writeln!(stdout, "[{marker}] {}: {msg}", check.title)?,
                None => writeln!(stdout, "[{marker}] {}", check.title)?,
            }
        }
        writeln!(stdout, "{}", if passed { "VALID" } else { "INVALID" })?;
    }
    Ok(passed)
}

fn to_json(check: &Check) -> CheckJson<'_> {
    CheckJson { title: check.title, run: check.run, passed: check.passed, message: &check.message }
}
