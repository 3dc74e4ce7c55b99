//! Format and RTP header-extension intersection
//!
//! The offerer's preference order governs tie-break: intersections iterate
//! the remote list and keep remote ordering and payload type numbers, so the
//! answer echoes the numbering the offerer chose.

use rjabber_jingle_core::{PayloadType, RtpHeaderExtension};

/// Intersects a remote payload list with local support, preserving the
/// remote order and payload type numbers.
pub fn intersect_formats(remote: &[PayloadType], local: &[PayloadType]) -> Vec<PayloadType> {
    remote
        .iter()
        .filter(|r| local.iter().any(|l| l.matches(r)))
        .cloned()
        .collect()
}

/// Finds the local counterpart of a remote format, if supported.
pub fn find_matching_format<'a>(local: &'a [PayloadType], remote: &PayloadType) -> Option<&'a PayloadType> {
    local.iter().find(|l| l.matches(remote))
}

/// Intersects RTP header-extension lists by URI, keeping the remote order
/// and the remote's negotiated ids.
pub fn intersect_extensions(
    remote: &[RtpHeaderExtension],
    local: &[RtpHeaderExtension],
) -> Vec<RtpHeaderExtension> {
    remote
        .iter()
        .filter(|r| local.iter().any(|l| l.uri == r.uri))
        .cloned()
        .collect()
}
