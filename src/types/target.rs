//! Fan-out targets for package deployments.

use serde::{Deserialize, Serialize};

use super::ids::CheckRunId;

/// Packages that need a separate `aarch64` build next to the i686/x86_64 one.
const SEPARATE_ARM64_PACKAGES: &[&str] = &[
    "mingw-w64-cv2pdb",
    "mingw-w64-git-credential-manager",
    "mingw-w64-git-lfs",
    "mingw-w64-git-sizer",
    "mingw-w64-wintoast",
];

/// How a package is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PackageKind {
    /// Built in the MSYS2 runtime environment (`MSYS2-packages`, most of `build-extra`).
    Msys,
    /// A `mingw-w64-` package built for the native toolchains.
    Mingw,
}

impl PackageKind {
    pub fn classify(package: &str) -> Self {
        if package.starts_with("mingw-w64-") {
            PackageKind::Mingw
        } else {
            PackageKind::Msys
        }
    }
}

/// Whether a MINGW package needs its own ARM64 leg.
pub fn needs_separate_arm64_build(package: &str) -> bool {
    SEPARATE_ARM64_PACKAGES.contains(&package)
}

/// One architecture-specific leg of a fan-out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchitectureTarget {
    /// Passed as the `architecture` workflow input. `None` builds every
    /// architecture the workflow knows about in one run.
    pub architecture: Option<String>,
    /// Shown in progress reports.
    pub label: String,
    /// The placeholder check run, once queued.
    pub check_run_id: Option<CheckRunId>,
}

impl ArchitectureTarget {
    pub fn new(architecture: &str) -> Self {
        ArchitectureTarget {
            architecture: Some(architecture.to_string()),
            label: architecture.to_string(),
            check_run_id: None,
        }
    }

    pub fn labelled(architecture: Option<&str>, label: &str) -> Self {
        ArchitectureTarget {
            architecture: architecture.map(str::to_string),
            label: label.to_string(),
            check_run_id: None,
        }
    }

    /// Computes the deploy legs for a package.
    ///
    /// `issue_title` matters for MSYS packages only: an `i686:`-prefixed title
    /// asks for the 32-bit build alone.
    pub fn for_deploy(package: &str, issue_title: &str) -> Vec<ArchitectureTarget> {
        let mut targets = Vec::new();
        match PackageKind::classify(package) {
            PackageKind::Msys => {
                if package != "msys2-runtime-3.3" && !issue_title.starts_with("i686:") {
                    targets.push(ArchitectureTarget::new("x86_64"));
                }
                if package != "msys2-runtime" {
                    targets.push(ArchitectureTarget::new("i686"));
                }
            }
            PackageKind::Mingw => {
                if package != "mingw-w64-clang" {
                    targets.push(ArchitectureTarget::labelled(None, "i686/x86_64"));
                }
                if needs_separate_arm64_build(package) {
                    targets.push(ArchitectureTarget::labelled(Some("aarch64"), "arm64"));
                }
            }
        }
        targets
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn architectures(targets: &[ArchitectureTarget]) -> Vec<Option<&str>> {
        targets.iter().map(|t| t.architecture.as_deref()).collect()
    }

    #[test]
    fn msys_package_deploys_both_architectures_in_order() {
        let targets = ArchitectureTarget::for_deploy("gnutls", "gnutls: update to 3.8.0");
        assert_eq!(architectures(&targets), vec![Some("x86_64"), Some("i686")]);
    }

    #[test]
    fn msys_runtime_variants_skip_one_architecture() {
        assert_eq!(
            architectures(&ArchitectureTarget::for_deploy("msys2-runtime", "")),
            vec![Some("x86_64")]
        );
        assert_eq!(
            architectures(&ArchitectureTarget::for_deploy("msys2-runtime-3.3", "")),
            vec![Some("i686")]
        );
        assert_eq!(
            architectures(&ArchitectureTarget::for_deploy("bash", "i686: rebuild bash")),
            vec![Some("i686")]
        );
    }

    #[test]
    fn mingw_package_deploys_combined_leg() {
        let targets = ArchitectureTarget::for_deploy("mingw-w64-curl", "");
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].architecture, None);
        assert_eq!(targets[0].label, "i686/x86_64");
    }

    #[test]
    fn arm64_packages_get_extra_leg() {
        let targets = ArchitectureTarget::for_deploy("mingw-w64-git-lfs", "");
        assert_eq!(architectures(&targets), vec![None, Some("aarch64")]);
        assert_eq!(targets[1].label, "arm64");
    }

    #[test]
    fn clang_has_no_combined_leg() {
        assert!(ArchitectureTarget::for_deploy("mingw-w64-clang", "").is_empty());
    }

    proptest! {
        #[test]
        fn targets_depend_only_on_package_and_title(package in "[a-z0-9-]{1,30}", title in ".{0,40}") {
            prop_assert_eq!(
                ArchitectureTarget::for_deploy(&package, &title),
                ArchitectureTarget::for_deploy(&package, &title)
            );
        }

        #[test]
        fn classification_follows_prefix(name in "[a-z0-9-]{1,30}") {
            let prefixed = format!("mingw-w64-{}", name);
            prop_assert_eq!(PackageKind::classify(&prefixed), PackageKind::Mingw);
            prop_assume!(!name.starts_with("mingw-w64-"));
            prop_assert_eq!(PackageKind::classify(&name), PackageKind::Msys);
        }
    }
}
