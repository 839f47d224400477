//! Swift-style request paths: `/{version}/{account}/{container}/{object}`.

/// An object path split into its four components.
///
/// Components are kept exactly as they appear in the request URI (still
/// percent-encoded), so paths rebuilt from them address the same resource.
/// The object component is the opaque remainder of the path and may itself
/// contain `/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectPath {
    pub version: String,
    pub account: String,
    pub container: String,
    pub object: String,
}

impl ObjectPath {
    /// Split `path` into an object path.
    ///
    /// Returns `None` for anything that is not an object path: paths that do
    /// not start with `/`, account or container paths, and paths with an
    /// empty version, account, container or object segment.
    pub fn parse(path: &str) -> Option<Self> {
        let rest = path.strip_prefix('/')?;
        let mut segments = rest.splitn(4, '/');

        let version = segments.next().filter(|s| !s.is_empty())?;
        let account = segments.next().filter(|s| !s.is_empty())?;
        let container = segments.next().filter(|s| !s.is_empty())?;
        let object = segments.next().filter(|s| !s.is_empty())?;

        Some(Self {
            version: version.to_string(),
            account: account.to_string(),
            container: container.to_string(),
            object: object.to_string(),
        })
    }

    /// `/{version}/{account}`
    pub fn account_path(&self) -> String {
        format!("/{}/{}", self.version, self.account)
    }

    /// `/{version}/{account}/{container}` for an arbitrary container in the
    /// same account.
    pub fn container_path(&self, container: &str) -> String {
        format!("{}/{}", self.account_path(), container)
    }

    /// `/{version}/{account}/{container}/{object}`
    pub fn object_path(&self) -> String {
        format!("{}/{}", self.container_path(&self.container), self.object)
    }
}
