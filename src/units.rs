//! Free-form quantity parsing: `"2GB"`, `"1 Core"`, `"500"`.
//!
//! A missing unit means the value is already in the canonical unit
//! (GiB for memory and disks, cores for CPU). No rounding happens here.

use std::fmt;

use bytesize::ByteSize;

const GIB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Why a quantity string could not be turned into a number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotANumber {
    pub input: String,
}

impl fmt::Display for NotANumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}' is not a number", self.input)
    }
}

impl std::error::Error for NotANumber {}

/// Lowercase, strip the first matching suffix, then parse what is left.
fn parse_with_suffix(input: &str, suffixes: &[&str]) -> Result<f64, NotANumber> {
    let lowered = input.trim().to_ascii_lowercase();
    let number = suffixes
        .iter()
        .find_map(|suffix| lowered.strip_suffix(suffix))
        .unwrap_or(&lowered)
        .trim();

    match number.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(NotANumber {
            input: input.to_string(),
        }),
    }
}

/// Disk size in GiB. Accepts `"15GB"`, `"15 gb"`, `"15"`.
pub fn parse_disk_gib(input: &str) -> Result<f64, NotANumber> {
    parse_with_suffix(input, &["gb"])
}

/// Memory size in GiB. Accepts `"2GB"`, `"0.5gb"`, `"2"`.
pub fn parse_memory_gib(input: &str) -> Result<f64, NotANumber> {
    parse_with_suffix(input, &["gb"])
}

/// CPU core count. Accepts `"1 Core"`, `"2 cores"`, `"3"`.
///
/// Fractional counts are returned as-is; the validator rejects them.
pub fn parse_cpu_cores(input: &str) -> Result<f64, NotANumber> {
    // "cores" before "core", otherwise "2 cores" leaves a dangling "s".
    parse_with_suffix(input, &["cores", "core"])
}

/// Convert GiB to bytes, the unit the grid reports capacity in.
pub fn gib_to_bytes(gib: f64) -> u64 {
    (gib * GIB).round() as u64
}

/// Render a byte count with binary units, e.g. `7.5 GiB`.
pub fn format_size(bytes: u64) -> String {
    ByteSize(bytes).to_string_as(true)
}
