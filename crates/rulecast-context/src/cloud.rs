//! Cloud provider detection.
//!
//! Providers are recognized from provider-specific configuration files at
//! the project root, Terraform `provider` blocks, and SDK dependencies.
//! Any single signal is enough to report a provider; the number of signal
//! kinds that agree feeds detection confidence.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::dependencies::DependencyScan;
use crate::languages::marker_matches;
use crate::snapshot::ProjectSnapshot;

/// Static description of a detectable cloud provider.
#[derive(Clone, Copy, Debug)]
pub struct CloudSpec {
    /// Catalog name of the provider.
    pub name: &'static str,
    /// Root-level configuration files or directories (globs allowed).
    pub config_files: &'static [&'static str],
    /// Terraform provider names.
    pub terraform_providers: &'static [&'static str],
    /// SDK dependencies in any ecosystem (trailing `*` = prefix).
    pub sdk_packages: &'static [&'static str],
}

/// Detectable cloud providers.
pub const CLOUD_PROVIDERS: &[CloudSpec] = &[
    CloudSpec {
        name: "aws",
        config_files: &["cdk.json", "samconfig.toml", "serverless.yml", "serverless.yaml", "amplify.yml", "buildspec.yml"],
        terraform_providers: &["aws"],
        sdk_packages: &["boto3", "botocore", "aws-cdk-lib", "@aws-sdk/*", "aws-sdk", "github.com/aws/aws-sdk-go*", "aws-sdk-*", "aws-config"],
    },
    CloudSpec {
        name: "gcp",
        config_files: &["app.yaml", "cloudbuild.yaml", "cloudbuild.yml", ".gcloudignore", "firebase.json"],
        terraform_providers: &["google", "google-beta"],
        sdk_packages: &["google-cloud-*", "@google-cloud/*", "cloud.google.com/go*", "firebase-admin"],
    },
    CloudSpec {
        name: "azure",
        config_files: &["azure-pipelines.yml", "azure.yaml", ".azure"],
        terraform_providers: &["azurerm", "azuread"],
        sdk_packages: &["azure-*", "@azure/*", "github.com/azure/azure-sdk-for-go*"],
    },
    CloudSpec {
        name: "vercel",
        config_files: &["vercel.json", ".vercel"],
        terraform_providers: &["vercel"],
        sdk_packages: &["@vercel/*"],
    },
    CloudSpec {
        name: "netlify",
        config_files: &["netlify.toml"],
        terraform_providers: &["netlify"],
        sdk_packages: &["@netlify/*"],
    },
    CloudSpec {
        name: "cloudflare",
        config_files: &["wrangler.toml", "wrangler.json", "wrangler.jsonc"],
        terraform_providers: &["cloudflare"],
        sdk_packages: &["@cloudflare/*", "wrangler"],
    },
    CloudSpec {
        name: "fly",
        config_files: &["fly.toml"],
        terraform_providers: &[],
        sdk_packages: &[],
    },
    CloudSpec {
        name: "heroku",
        config_files: &["Procfile"],
        terraform_providers: &["heroku"],
        sdk_packages: &[],
    },
];

static PROVIDER_BLOCK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"provider\s+"([A-Za-z0-9_-]+)""#).unwrap());

static PROVIDER_SOURCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"source\s*=\s*"(?:[A-Za-z0-9_.-]+/)?[A-Za-z0-9_-]+/([A-Za-z0-9_-]+)""#).unwrap());

/// Terraform providers referenced anywhere in the snapshot.
#[must_use]
pub fn terraform_providers(snapshot: &ProjectSnapshot) -> BTreeSet<String> {
    let mut providers = BTreeSet::new();
    for source in snapshot.terraform_sources() {
        for re in [&*PROVIDER_BLOCK_RE, &*PROVIDER_SOURCE_RE] {
            providers.extend(re.captures_iter(source).map(|c| c[1].to_lowercase()));
        }
    }
    providers
}

/// A detected provider and how many signal kinds point at it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CloudEvidence {
    /// Catalog name of the provider.
    pub name: &'static str,
    /// Distinct signal kinds (config file, Terraform, SDK) found, 1 to 3.
    pub signals: usize,
}

/// Detected providers with their signal counts, in table order.
#[must_use]
pub fn detect_cloud_evidence(snapshot: &ProjectSnapshot, scan: &DependencyScan) -> Vec<CloudEvidence> {
    let tf = terraform_providers(snapshot);
    CLOUD_PROVIDERS
        .iter()
        .filter_map(|spec| {
            let by_file = spec
                .config_files
                .iter()
                .any(|f| snapshot.root_entries().any(|entry| marker_matches(f, entry)));
            let by_terraform = spec.terraform_providers.iter().any(|p| tf.contains(*p));
            let by_sdk = spec.sdk_packages.iter().any(|p| scan.declares_anywhere(p));
            let signals = [by_file, by_terraform, by_sdk].into_iter().filter(|s| *s).count();
            (signals > 0).then_some(CloudEvidence {
                name: spec.name,
                signals,
            })
        })
        .collect()
}

/// Detected cloud provider names, in table order.
#[must_use]
pub fn detect_cloud_providers(snapshot: &ProjectSnapshot, scan: &DependencyScan) -> Vec<&'static str> {
    detect_cloud_evidence(snapshot, scan)
        .into_iter()
        .map(|e| e.name)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::WalkLimits;
    use std::fs;
    use std::path::Path;

    fn detect(files: &[(&str, &str)]) -> Vec<&'static str> {
        let tmp = tempfile::tempdir().unwrap();
        for (name, content) in files {
            let path = tmp.path().join(name);
            fs::create_dir_all(path.parent().unwrap_or(Path::new("."))).unwrap();
            fs::write(path, content).unwrap();
        }
        let snap = ProjectSnapshot::capture(tmp.path(), &WalkLimits::default());
        let scan = DependencyScan::from_snapshot(&snap);
        detect_cloud_providers(&snap, &scan)
    }

    #[test]
    fn config_file_signal() {
        assert_eq!(detect(&[("vercel.json", "{}")]), vec!["vercel"]);
        assert_eq!(detect(&[("wrangler.toml", "name = 'x'")]), vec!["cloudflare"]);
    }

    #[test]
    fn terraform_provider_block() {
        let found = detect(&[("infra/main.tf", "provider \"google\" {\n  project = \"p\"\n}\n")]);
        assert_eq!(found, vec!["gcp"]);
    }

    #[test]
    fn terraform_required_providers_source() {
        let tf = "terraform {\n  required_providers {\n    aws = { source = \"hashicorp/aws\" }\n  }\n}\n";
        assert_eq!(detect(&[("main.tf", tf)]), vec!["aws"]);
    }

    #[test]
    fn sdk_dependency_signal() {
        assert_eq!(detect(&[("requirements.txt", "boto3==1.34\n")]), vec!["aws"]);
        assert_eq!(
            detect(&[("package.json", r#"{"dependencies": {"@azure/storage-blob": "12"}}"#)]),
            vec!["azure"]
        );
    }

    #[test]
    fn agreeing_signals_are_counted() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("cdk.json"), "{}").unwrap();
        fs::write(tmp.path().join("requirements.txt"), "boto3\n").unwrap();
        fs::write(tmp.path().join("netlify.toml"), "[build]\n").unwrap();
        let snap = ProjectSnapshot::capture(tmp.path(), &WalkLimits::default());
        let scan = DependencyScan::from_snapshot(&snap);

        let evidence = detect_cloud_evidence(&snap, &scan);
        assert_eq!(
            evidence,
            vec![
                CloudEvidence { name: "aws", signals: 2 },
                CloudEvidence { name: "netlify", signals: 1 },
            ]
        );
    }

    #[test]
    fn no_signals_no_providers() {
        assert!(detect(&[("README.md", "# hello aws")]).is_empty());
    }
}
