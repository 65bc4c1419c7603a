//! The list of open seeks as announced by the server.
//!
//! This module handles:
//! - Translating decoded seek records into [`Seek`] values
//! - Id reuse, where the server announces a new seek under a live id
//! - Bulk removal when the server stops reporting individual removals
//!
//! Iteration always follows registry order, the order in which the seeks
//! currently tracked were added.

use crate::error::SyncError;
use crate::events::Event;
use crate::variant::Variant;
use log::debug;
use shared::{titles, Color, SeekInfo, MAX_SEEK_RATING};
use std::collections::HashMap;

/// A posted offer to play, awaiting acceptance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Seek {
    pub id: u32,
    pub handle: String,
    /// Display form of the seeker's titles, e.g. `(C)(GM)`.
    pub titles: String,
    pub rating: u32,
    pub provisional: bool,
    pub registered: bool,
    pub seeker_rated: bool,
    pub computer: bool,
    pub variant: Variant,
    pub match_type: String,
    pub time_ms: u64,
    pub increment_ms: u64,
    pub rated: bool,
    pub color: Option<Color>,
    pub rating_limited: bool,
    pub min_rating: u32,
    pub max_rating: u32,
    pub manual_accept: bool,
    pub formula: bool,
}

impl Seek {
    /// Builds a seek from its record. Fails for match types the client
    /// cannot play.
    pub fn from_info(info: SeekInfo) -> Result<Self, SyncError> {
        let variant = Variant::resolve(&info.match_type)?;

        Ok(Self {
            id: info.seek_id,
            titles: titles::display(info.titles),
            rating: info.rating,
            provisional: info.provisional,
            registered: info.titles & titles::UNREGISTERED == 0,
            seeker_rated: info.rating != 0,
            computer: info.titles & titles::COMPUTER != 0,
            variant,
            time_ms: u64::from(info.time_minutes) * 60 * 1000,
            increment_ms: u64::from(info.increment_secs) * 1000,
            rated: info.rated,
            color: info.desired_color,
            rating_limited: info.min_rating > 0 || info.max_rating < MAX_SEEK_RATING,
            min_rating: info.min_rating,
            max_rating: info.max_rating,
            manual_accept: info.manual_accept,
            formula: info.formula,
            handle: info.handle,
            match_type: info.match_type,
        })
    }
}

/// Seeks currently tracked for one connection, keyed by seek id.
#[derive(Debug, Default)]
pub struct SeekRegistry {
    order: Vec<u32>,
    seeks: HashMap<u32, Seek>,
}

impl SeekRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a seek and reports it as added.
    ///
    /// If the id is already tracked, the old seek is reported as removed
    /// first and the new one takes the last place in registry order.
    pub fn add(&mut self, seek: Seek, out: &mut Vec<Event>) {
        let id = seek.id;
        if let Some(old) = self.take(id) {
            debug!("Seek id {} reused", id);
            out.push(Event::SeekRemoved(old));
        }

        self.order.push(id);
        self.seeks.insert(id, seek.clone());
        out.push(Event::SeekAdded(seek));
    }

    /// Removes each listed seek, reporting every one that was tracked.
    /// Unknown ids are skipped without notice.
    pub fn remove(&mut self, ids: &[u32], out: &mut Vec<Event>) {
        for id in ids {
            if let Some(seek) = self.take(*id) {
                out.push(Event::SeekRemoved(seek));
            }
        }
    }

    /// Removes every seek, reporting each in registry order.
    ///
    /// The id list is copied before anything is removed, since removal
    /// mutates the structure being walked. This relies on records being
    /// processed strictly one at a time.
    pub fn clear(&mut self, out: &mut Vec<Event>) {
        let ids: Vec<u32> = self.order.clone();

        for id in ids {
            if let Some(seek) = self.take(id) {
                out.push(Event::SeekRemoved(seek));
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn get(&self, id: u32) -> Option<&Seek> {
        self.seeks.get(&id)
    }

    #[cfg(test)]
    pub(crate) fn contains(&self, id: u32) -> bool {
        self.seeks.contains_key(&id)
    }

    /// Tracked seeks in registry order.
    pub fn iter(&self) -> impl Iterator<Item = &Seek> {
        self.order.iter().filter_map(|id| self.seeks.get(id))
    }

    pub fn len(&self) -> usize {
        self.seeks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seeks.is_empty()
    }

    fn take(&mut self, id: u32) -> Option<Seek> {
        let seek = self.seeks.remove(&id)?;
        self.order.retain(|tracked| *tracked != id);
        Some(seek)
    }
}
