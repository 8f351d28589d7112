//! The package-metadata collaborator.
//!
//! Hover and inlay hints can be enriched with nixpkgs package information
//! from an external evaluator. The core only knows this trait; without a
//! wired provider (or when the deadline passes) the features degrade
//! silently.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Metadata for one attribute path, as far as the provider knows it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageDescription {
    pub name: Option<String>,
    pub version: Option<String>,
    pub description: Option<String>,
    pub long_description: Option<String>,
    pub homepage: Option<String>,
}

/// Per-request deadline for provider calls.
pub const PROVIDER_DEADLINE: Duration = Duration::from_millis(300);

/// A request/response client for package metadata.
///
/// Implementations must respect `deadline`; the server never blocks
/// indefinitely on a provider.
pub trait PackageInfoProvider: Send + Sync {
    fn attrpath_info(&self, path: &[String], deadline: Duration) -> Option<PackageDescription>;
}

/// Render the short hover markdown for a package, section by section.
pub fn markdown(package: &PackageDescription) -> String {
    let mut out = String::new();
    if let Some(name) = &package.name {
        out.push_str(&format!("`{name}`\n"));
    }
    if let Some(homepage) = &package.homepage {
        out.push_str(&format!("[homepage]({homepage})\n"));
    }
    if let Some(description) = &package.description {
        out.push_str("## Description\n\n");
        out.push_str(description);
        out.push_str("\n\n");
        if let Some(long) = &package.long_description {
            out.push_str(long);
            out.push_str("\n\n");
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn markdown_sections() {
        let md = markdown(&PackageDescription {
            name: Some("hello-2.12".into()),
            version: Some("2.12".into()),
            description: Some("A program that produces a familiar greeting".into()),
            long_description: None,
            homepage: Some("https://www.gnu.org/software/hello".into()),
        });
        assert!(md.contains("`hello-2.12`"));
        assert!(md.contains("[homepage]("));
        assert!(md.contains("## Description"));
    }
}
