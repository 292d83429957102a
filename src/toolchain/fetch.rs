//! Installer script download and verification
//!
//! The installer is the only thing bundlecheck fetches from the network.
//! Transport must be https end to end (redirects included), and the body is
//! checked against a pinned SHA-256 before it is ever executed.

use std::io::Read;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::redirect::Policy;
use sha2::{Digest, Sha256};
use url::Url;

use crate::error::{Result, toolchain as toolchain_error};

/// Upper bound on the installer script size
pub const MAX_INSTALLER_BYTES: u64 = 8 * 1024 * 1024;

/// Where the installer script comes from
pub trait InstallerSource {
    fn fetch(&self, url: &Url) -> Result<Vec<u8>>;
}

/// Parse `url` and require an authenticated transport
pub fn ensure_trusted_url(url: &str) -> Result<Url> {
    let parsed = Url::parse(url).map_err(|e| toolchain_error::download_failed(url, e.to_string()))?;
    if parsed.scheme() != "https" {
        return Err(toolchain_error::insecure_transport(url));
    }
    Ok(parsed)
}

/// Lowercase hex SHA-256 of `bytes`
pub fn sha256_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

/// Compare the body's SHA-256 against the pinned value (case-insensitive)
pub fn verify_checksum(url: &Url, bytes: &[u8], expected: &str) -> Result<()> {
    let actual = sha256_hex(bytes);
    if actual.eq_ignore_ascii_case(expected.trim()) {
        Ok(())
    } else {
        Err(toolchain_error::checksum_mismatch(
            url.as_str(),
            expected.to_ascii_lowercase(),
            actual,
        ))
    }
}

/// Fetches installers over verified TLS only
#[derive(Debug, Clone)]
pub struct HttpsSource {
    client: Client,
}

impl HttpsSource {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .https_only(true)
            .redirect(Policy::limited(5))
            .timeout(Duration::from_secs(60))
            .user_agent(concat!("bundlecheck/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| toolchain_error::download_failed("<client>", e.to_string()))?;
        Ok(Self { client })
    }
}

impl InstallerSource for HttpsSource {
    fn fetch(&self, url: &Url) -> Result<Vec<u8>> {
        tracing::info!(url = %url, "downloading toolchain installer");
        let response = self
            .client
            .get(url.clone())
            .send()
            .map_err(|e| toolchain_error::download_failed(url.as_str(), e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(toolchain_error::download_failed(
                url.as_str(),
                format!("HTTP {status}"),
            ));
        }
        // Redirects are followed, but the final hop must still be https
        if response.url().scheme() != "https" {
            return Err(toolchain_error::insecure_transport(response.url().as_str()));
        }

        let mut bytes = Vec::new();
        response
            .take(MAX_INSTALLER_BYTES + 1)
            .read_to_end(&mut bytes)
            .map_err(|e| toolchain_error::download_failed(url.as_str(), e.to_string()))?;
        if bytes.len() as u64 > MAX_INSTALLER_BYTES {
            return Err(toolchain_error::download_failed(
                url.as_str(),
                format!("installer exceeds {MAX_INSTALLER_BYTES} bytes"),
            ));
        }
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProvisionError;

    #[test]
    fn test_https_url_is_trusted() {
        let url = ensure_trusted_url("https://sh.rustup.rs").unwrap();
        assert_eq!(url.host_str(), Some("sh.rustup.rs"));
    }

    #[test]
    fn test_plain_http_is_rejected() {
        let err = ensure_trusted_url("http://sh.rustup.rs").unwrap_err();
        assert!(matches!(err, ProvisionError::InsecureTransport { .. }));
    }

    #[test]
    fn test_other_schemes_are_rejected() {
        for url in ["ftp://example.com/rustup.sh", "file:///tmp/rustup.sh"] {
            let err = ensure_trusted_url(url).unwrap_err();
            assert!(matches!(err, ProvisionError::InsecureTransport { .. }), "{url}");
        }
    }

    #[test]
    fn test_unparseable_url() {
        let err = ensure_trusted_url("sh.rustup.rs").unwrap_err();
        assert!(matches!(err, ProvisionError::InstallerDownloadFailed { .. }));
    }

    #[test]
    fn test_sha256_known_value() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_verify_checksum() {
        let url = Url::parse("https://sh.rustup.rs").unwrap();
        let expected = "BA7816BF8F01CFEA414140DE5DAE2223B00361A396177A9CB410FF61F20015AD";
        assert!(verify_checksum(&url, b"abc", expected).is_ok());

        let err = verify_checksum(&url, b"abd", expected).unwrap_err();
        assert!(matches!(err, ProvisionError::InstallerChecksumMismatch { .. }));
    }

    #[test]
    fn test_https_source_builds() {
        assert!(HttpsSource::new().is_ok());
    }
}
