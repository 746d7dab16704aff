//! `mkdist version-bin`: print the packed version literal

use crate::core::context::Checkout;
use crate::core::error::DistResult;
use crate::core::version;
use std::path::Path;

/// Print `0xMMmmpp` for the version a run would use, or `default`
pub fn run_version_bin(root: &Path, test_version: Option<&str>, default: &str) -> DistResult<()> {
  let checkout = Checkout::open(root)?;
  let resolved = version::derive_version(&checkout.repo, &checkout.changelog_path(), test_version)?;
  println!("{}", version::version_bin(&resolved.version, default));
  Ok(())
}
