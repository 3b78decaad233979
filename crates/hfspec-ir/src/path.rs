//! Locations inside an instance document

use std::fmt;

/// One step from a container to one of its children
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    /// Object property
    Key(String),
    /// Array element
    Index(usize),
}

/// Path from the document root to a value.
///
/// Displays as `channels[0].samples`; the root path displays as an empty
/// string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct InstancePath {
    segments: Vec<PathSegment>,
}

impl InstancePath {
    /// The document root
    pub fn root() -> Self {
        Self::default()
    }

    /// Path to a property of the value at this path
    #[must_use]
    pub fn key(&self, key: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(PathSegment::Key(key.into()));
        Self { segments }
    }

    /// Path to an element of the array at this path
    #[must_use]
    pub fn index(&self, index: usize) -> Self {
        let mut segments = self.segments.clone();
        segments.push(PathSegment::Index(index));
        Self { segments }
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Number of segments; the root has depth zero.
    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }
}

impl fmt::Display for InstancePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                PathSegment::Key(k) if i == 0 => f.write_str(k)?,
                PathSegment::Key(k) => write!(f, ".{k}")?,
                PathSegment::Index(idx) => write!(f, "[{idx}]")?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_path() {
        let root = InstancePath::root();
        assert!(root.is_root());
        assert_eq!(root.depth(), 0);
        assert_eq!(root.to_string(), "");
    }

    #[test]
    fn test_display_nested() {
        let path = InstancePath::root().key("channels").index(0).key("samples");
        assert_eq!(path.to_string(), "channels[0].samples");
        assert_eq!(path.depth(), 3);
    }

    #[test]
    fn test_display_leading_index() {
        let path = InstancePath::root().index(2).key("op");
        assert_eq!(path.to_string(), "[2].op");
    }

    #[test]
    fn test_segments_multi_index() {
        let path = InstancePath::root().key("data").index(0).index(1);
        assert_eq!(path.to_string(), "data[0][1]");
        assert_eq!(
            path.segments(),
            &[
                PathSegment::Key("data".to_string()),
                PathSegment::Index(0),
                PathSegment::Index(1)
            ]
        );
    }

    #[test]
    fn test_paths_are_independent() {
        let parent = InstancePath::root().key("channels");
        let first = parent.index(0);
        let second = parent.index(1);
        assert_eq!(parent.depth(), 1);
        assert_ne!(first, second);
    }
}
