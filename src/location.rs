/// Deterministic mapping from remote repository addresses to local paths
///
/// Organization and repository directory names are prefixed with a short
/// stable hash, which keeps effective path length down on constrained
/// filesystems while remaining collision-resistant across distinct
/// repositories.
use crate::error::AddressError;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use url::Url;

/// Resolved location of a remote repository on the local filesystem
///
/// `local_path` is derived, never user-supplied; it is stable across repeated
/// resolutions of the same address.
#[derive(Debug, Clone, PartialEq)]
pub struct RepositoryLocation {
    /// The remote address the location was resolved from
    pub remote_address: String,
    /// Organization segment of the address
    pub organization: String,
    /// Repository name segment, `.git` suffix stripped
    pub repository_name: String,
    /// `{root}/{orgHash}_{organization}/{repoHash}_{repositoryName}`
    pub local_path: PathBuf,
}

/// Resolve a remote repository address to its local filesystem location
///
/// The address must carry at least organization and repository path
/// segments; anything less is an [`AddressError`]. Pure function over its
/// inputs.
pub fn resolve(remote_address: &str, root: &Path) -> Result<RepositoryLocation, AddressError> {
    let url = Url::parse(remote_address)
        .map_err(|_| AddressError::Unparsable(remote_address.to_string()))?;

    let segments: Vec<&str> = url
        .path_segments()
        .map(|s| s.filter(|p| !p.is_empty()).collect())
        .unwrap_or_default();

    if segments.len() < 2 {
        return Err(AddressError::MissingSegments(remote_address.to_string()));
    }

    let organization = segments[0].to_string();
    let repository_name = segments[1]
        .strip_suffix(".git")
        .unwrap_or(segments[1])
        .to_string();

    let org_hash = short_hash(&organization);
    let repo_hash = short_hash(&repository_name);

    let local_path = root
        .join(format!("{org_hash}_{organization}"))
        .join(format!("{repo_hash}_{repository_name}"));

    Ok(RepositoryLocation {
        remote_address: remote_address.to_string(),
        organization,
        repository_name,
        local_path,
    })
}

/// Short fixed-width hash of a path segment
///
/// Four decimal digits derived from a sha256 digest. sha256 rather than the
/// standard hasher because the mapping must be stable across processes: the
/// directory layout persists on disk between runs.
fn short_hash(segment: &str) -> String {
    let digest = Sha256::digest(segment.as_bytes());
    let word = u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]);
    format!("{:04}", word % 10_000)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_resolve_basic() {
        let location = resolve("https://github.com/acme/widgets", Path::new("/repos")).unwrap();
        assert_eq!(location.organization, "acme");
        assert_eq!(location.repository_name, "widgets");
        assert!(location.local_path.starts_with("/repos"));

        let dir = location.local_path.to_string_lossy().to_string();
        assert!(dir.contains("_acme"));
        assert!(dir.contains("_widgets"));
    }

    #[test]
    fn test_resolve_strips_git_suffix() {
        let location = resolve("https://github.com/acme/widgets.git", Path::new("/repos")).unwrap();
        assert_eq!(location.repository_name, "widgets");
    }

    #[test]
    fn test_resolve_is_deterministic() {
        let a = resolve("https://github.com/acme/widgets", Path::new("/repos")).unwrap();
        let b = resolve("https://github.com/acme/widgets", Path::new("/repos")).unwrap();
        assert_eq!(a.local_path, b.local_path);
    }

    #[test]
    fn test_git_suffix_maps_to_same_path() {
        let plain = resolve("https://github.com/acme/widgets", Path::new("/repos")).unwrap();
        let suffixed =
            resolve("https://github.com/acme/widgets.git", Path::new("/repos")).unwrap();
        assert_eq!(plain.local_path, suffixed.local_path);
    }

    #[test]
    fn test_resolve_rejects_short_paths() {
        let err = resolve("https://github.com/acme", Path::new("/repos")).unwrap_err();
        assert!(matches!(err, AddressError::MissingSegments(_)));

        let err = resolve("https://github.com/", Path::new("/repos")).unwrap_err();
        assert!(matches!(err, AddressError::MissingSegments(_)));
    }

    #[test]
    fn test_resolve_rejects_malformed_url() {
        let err = resolve("not a url at all", Path::new("/repos")).unwrap_err();
        assert!(matches!(err, AddressError::Unparsable(_)));
    }

    #[test]
    fn test_hash_is_four_digits() {
        for segment in ["acme", "widgets", "a", "x".repeat(200).as_str()] {
            let hash = short_hash(segment);
            assert_eq!(hash.len(), 4);
            assert!(hash.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn test_collision_rate_is_negligible() {
        // Hash truncation makes collisions probabilistic; distinct (org, repo)
        // pairs still get distinct local paths because the readable segment is
        // part of the directory name. Assert that directly over a large sample.
        let mut paths = HashSet::new();
        for org in 0..40 {
            for repo in 0..40 {
                let address = format!("https://host.example/org-{org}/repo-{repo}");
                let location = resolve(&address, Path::new("/repos")).unwrap();
                assert!(
                    paths.insert(location.local_path.clone()),
                    "collision for {address}"
                );
            }
        }
        assert_eq!(paths.len(), 1600);
    }

    #[test]
    fn test_extra_segments_ignored() {
        let location =
            resolve("https://host.example/acme/widgets/tree/main", Path::new("/r")).unwrap();
        assert_eq!(location.organization, "acme");
        assert_eq!(location.repository_name, "widgets");
    }
}
