use catena_types::CommitHeaders;

/// Caller-supplied rewriting of commit metadata during history rewrites.
///
/// Transplant calls [`rewrite_single`] once per re-applied commit;
/// merge and squash call [`squash`] with the ordered (oldest to newest)
/// metadata of every source commit.
///
/// [`rewrite_single`]: MetadataRewriter::rewrite_single
/// [`squash`]: MetadataRewriter::squash
pub trait MetadataRewriter: Send + Sync {
    /// Rewrite the metadata of one commit being re-applied.
    ///
    /// The default preserves the original metadata unchanged.
    fn rewrite_single(&self, headers: &CommitHeaders) -> CommitHeaders {
        headers.clone()
    }

    /// Collapse the ordered metadata of all source commits into the
    /// metadata of the single resulting commit.
    fn squash(&self, headers: &[CommitHeaders]) -> CommitHeaders;
}

/// The identity rewriter: transplanted commits keep their metadata, and a
/// squash keeps the newest commit's author and timestamp with all
/// messages joined oldest-first.
#[derive(Clone, Copy, Debug, Default)]
pub struct KeepOriginal;

impl MetadataRewriter for KeepOriginal {
    fn squash(&self, headers: &[CommitHeaders]) -> CommitHeaders {
        match headers {
            [] => CommitHeaders::default(),
            [single] => single.clone(),
            [.., newest] => {
                let mut combined = newest.clone();
                combined.message = headers
                    .iter()
                    .map(|h| h.message.as_str())
                    .collect::<Vec<_>>()
                    .join("\n");
                combined
            }
        }
    }
}
