//! Conference member SSRC bookkeeping
//!
//! Tracks which synchronization source belongs to which conference member,
//! fed by ownership-tagged source-add/source-remove advertisements. Audio
//! only: multi-SSRC video mapping is out of scope and the video sources are
//! ignored here. Accessors are called from UI-facing code concurrently with
//! the dispatch-side writers, so the map is a `DashMap`.

use dashmap::DashMap;
use rjabber_jingle_core::{JingleContent, MediaType};
use tracing::debug;

/// One remote conference participant as seen through source signaling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConferenceMember {
    /// Owner address exactly as advertised
    pub address: String,
    pub audio_ssrc: Option<u32>,
}

/// Owner-address keyed SSRC table for one session.
#[derive(Debug, Default)]
pub struct SsrcTracker {
    members: DashMap<String, ConferenceMember>,
}

impl SsrcTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the audio SSRCs advertised in a content list, creating or
    /// updating the member record per owner address.
    pub fn on_source_add(&self, contents: &[JingleContent]) {
        for content in contents {
            if content.media_type() != Some(MediaType::Audio) {
                continue;
            }
            let Some(description) = content.description.as_ref() else { continue };
            for source in &description.sources {
                let Some(owner) = source.owner.as_deref() else { continue };
                debug!("Member {} audio SSRC {}", owner, source.ssrc);
                self.members
                    .entry(owner.to_string())
                    .and_modify(|member| member.audio_ssrc = Some(source.ssrc))
                    .or_insert_with(|| ConferenceMember {
                        address: owner.to_string(),
                        audio_ssrc: Some(source.ssrc),
                    });
            }
        }
    }

    /// Drops the SSRC entries advertised as removed; a member without any
    /// remaining source leaves the table.
    pub fn on_source_remove(&self, contents: &[JingleContent]) {
        for content in contents {
            if content.media_type() != Some(MediaType::Audio) {
                continue;
            }
            let Some(description) = content.description.as_ref() else { continue };
            for source in &description.sources {
                let Some(owner) = source.owner.as_deref() else { continue };
                let empty = self
                    .members
                    .get_mut(owner)
                    .map(|mut member| {
                        if member.audio_ssrc == Some(source.ssrc) {
                            member.audio_ssrc = None;
                        }
                        member.audio_ssrc.is_none()
                    })
                    .unwrap_or(false);
                if empty {
                    self.members.remove(owner);
                }
            }
        }
    }

    /// Removes a departed member regardless of remaining sources.
    pub fn member_left(&self, address: &str) {
        self.members.remove(address);
    }

    /// Exact-address lookup.
    pub fn member(&self, address: &str) -> Option<ConferenceMember> {
        self.members.get(address).map(|m| m.clone())
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}
