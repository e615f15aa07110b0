//! Package source URLs

use nasemu_errors::{AcquisitionError, Error};
use std::fmt;
use std::path::PathBuf;
use url::Url;

/// Where the `.spk` archive is read from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackageSource {
    /// Local archive, from a `file://` URL
    File(PathBuf),
    /// Remote archive, from an `http://` or `https://` URL
    Http(String),
}

impl PackageSource {
    /// Parse a package URL
    ///
    /// The scheme is matched case-insensitively.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedScheme` for anything but `file`, `http` and
    /// `https` (including scheme-less paths) and `InvalidUrl` when the URL
    /// cannot be parsed or a `file` URL has no usable path.
    pub fn parse(raw: &str) -> Result<Self, Error> {
        let url = match Url::parse(raw.trim()) {
            Ok(url) => url,
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                return Err(AcquisitionError::UnsupportedScheme {
                    url: raw.to_string(),
                }
                .into())
            }
            Err(e) => return Err(AcquisitionError::InvalidUrl(format!("{raw}: {e}")).into()),
        };

        match url.scheme() {
            "file" => url
                .to_file_path()
                .map(Self::File)
                .map_err(|()| AcquisitionError::InvalidUrl(raw.to_string()).into()),
            "http" | "https" => Ok(Self::Http(url.to_string())),
            _ => Err(AcquisitionError::UnsupportedScheme {
                url: raw.to_string(),
            }
            .into()),
        }
    }
}

impl fmt::Display for PackageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(path) => write!(f, "file://{}", path.display()),
            Self::Http(url) => write!(f, "{url}"),
        }
    }
}
