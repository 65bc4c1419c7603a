//! Per-game offer bookkeeping.
//!
//! Draw, abort and adjourn offers are booleans per side. Takeback offers are
//! a ply count per side, where zero means no offer is pending.

use crate::events::{Event, OfferKind};
use shared::Color;
use std::collections::HashSet;

#[derive(Debug, Clone)]
pub struct OfferTracker {
    game_id: u32,
    offers: HashSet<(Color, OfferKind)>,
    white_takeback: u32,
    black_takeback: u32,
}

impl OfferTracker {
    pub fn new(game_id: u32) -> Self {
        Self {
            game_id,
            offers: HashSet::new(),
            white_takeback: 0,
            black_takeback: 0,
        }
    }

    #[cfg(test)]
    pub(crate) fn is_offered(&self, color: Color, kind: OfferKind) -> bool {
        match kind {
            OfferKind::Takeback => self.takeback(color) != 0,
            _ => self.offers.contains(&(color, kind)),
        }
    }

    pub fn takeback(&self, color: Color) -> u32 {
        match color {
            Color::White => self.white_takeback,
            Color::Black => self.black_takeback,
        }
    }

    fn set_takeback(&mut self, color: Color, plies: u32) {
        match color {
            Color::White => self.white_takeback = plies,
            Color::Black => self.black_takeback = plies,
        }
    }

    /// Switches an offer of `color` on or off.
    ///
    /// Boolean offers always notify, even when the tracked state does not
    /// change: a game joined mid-way may carry offers we never saw made.
    /// Takebacks go through [`OfferTracker::offer_takeback`]; switching one
    /// off with no known count assumes a single ply since the server never
    /// repeats the withdrawn amount.
    pub fn toggle(
        &mut self,
        color: Color,
        kind: OfferKind,
        made: bool,
        plies: Option<u32>,
        out: &mut Vec<Event>,
    ) {
        if kind == OfferKind::Takeback {
            if !made && self.takeback(color) == 0 {
                self.set_takeback(color, 1);
            }
            let plies = if made { plies.unwrap_or(1) } else { 0 };
            self.offer_takeback(color, plies, out);
            return;
        }

        if made {
            self.offers.insert((color, kind));
        } else {
            self.offers.remove(&(color, kind));
        }

        out.push(Event::Offer {
            game_id: self.game_id,
            color,
            kind,
            made,
            plies: None,
        });
    }

    /// A takeback request (or counter-request) by `color`. Any request still
    /// pending from the opponent is cleared first.
    pub fn offer_takeback(&mut self, color: Color, plies: u32, out: &mut Vec<Event>) {
        self.update_takeback(color.opponent(), 0, out);
        self.update_takeback(color, plies, out);
    }

    /// Replaces the pending takeback count of `color`, reporting the old
    /// count as withdrawn and the new one as offered. Either step is skipped
    /// when its count is zero.
    pub fn update_takeback(&mut self, color: Color, plies: u32, out: &mut Vec<Event>) {
        let previous = self.takeback(color);
        if previous != 0 {
            out.push(self.takeback_event(color, false, previous));
        }

        self.set_takeback(color, plies);

        if plies != 0 {
            out.push(self.takeback_event(color, true, plies));
        }
    }

    /// The side whose takeback request is currently pending, white first.
    pub fn takeback_offerer(&self) -> Color {
        if self.white_takeback != 0 {
            Color::White
        } else {
            Color::Black
        }
    }

    fn takeback_event(&self, color: Color, made: bool, plies: u32) -> Event {
        Event::Offer {
            game_id: self.game_id,
            color,
            kind: OfferKind::Takeback,
            made,
            plies: Some(plies),
        }
    }
}
