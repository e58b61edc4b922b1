use crate::object::ObjId;

/// Domain-separated BLAKE3 content hasher.
///
/// Each hasher carries a domain tag (e.g. `"catena-commit-v1"`) that is
/// prepended to every hash computation. This prevents cross-kind hash
/// collisions: a commit and an index segment with identical bytes produce
/// different object IDs.
pub struct ContentHasher {
    domain: &'static str,
}

impl ContentHasher {
    /// Hasher for commit objects.
    pub const COMMIT: Self = Self {
        domain: "catena-commit-v1",
    };
    /// Hasher for index root objects.
    pub const INDEX: Self = Self {
        domain: "catena-index-v1",
    };
    /// Hasher for index segment objects.
    pub const SEGMENT: Self = Self {
        domain: "catena-segment-v1",
    };
    /// Hasher for content value payloads.
    pub const VALUE: Self = Self {
        domain: "catena-value-v1",
    };

    /// Create a hasher with a custom domain tag.
    pub const fn new(domain: &'static str) -> Self {
        Self { domain }
    }

    /// Hash raw bytes with domain separation.
    pub fn hash(&self, data: &[u8]) -> ObjId {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.domain.as_bytes());
        hasher.update(b":");
        hasher.update(data);
        ObjId::from_hash(*hasher.finalize().as_bytes())
    }

    /// Verify that data produces the expected object ID.
    pub fn verify(&self, data: &[u8], expected: &ObjId) -> bool {
        self.hash(data) == *expected
    }

    /// The domain tag used by this hasher.
    pub fn domain(&self) -> &str {
        self.domain
    }
}
