//! Read-only card catalog
//!
//! The deck is either the built-in one or a JSON file named by `CARD_DECK_PATH`:
//! `{"prompts": [{"id": "...", "text": "..."}], "responses": [...]}`.

use crate::error::CatalogError;
use crate::types::{Card, HAND_SIZE};
use rand::seq::{index, IndexedRandom};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::path::Path;

const BUILTIN_PROMPTS: &[&str] = &[
    "What's my secret power?",
    "The new office policy bans ____.",
    "What ruined the family reunion?",
    "I never leave the house without ____.",
    "What's the real reason the wifi is slow?",
    "Scientists have finally explained ____.",
    "My therapist says I need to stop ____.",
    "What's hiding in the back of the fridge?",
    "The only thing worse than Mondays: ____.",
    "Coming soon to a theater near you: ____, the musical.",
    "What did the group chat argue about for three hours?",
    "Nobody expected the wedding toast to mention ____.",
];

const BUILTIN_RESPONSES: &[&str] = &[
    "A suspiciously confident pigeon.",
    "Reply-all.",
    "Forty unread voicemails.",
    "A haunted spreadsheet.",
    "Interpretive dance.",
    "My uncle's crypto portfolio.",
    "Emotional support cheese.",
    "A sentient Roomba with opinions.",
    "Loudly chewing ice.",
    "The printer, again.",
    "An unsolicited podcast recommendation.",
    "Three raccoons in a trench coat.",
    "Passive-aggressive sticky notes.",
    "A motivational poster about failure.",
    "Microwaving fish in the break room.",
    "An extremely long voice memo.",
    "Pretending to understand wine.",
    "A tragically small backpack.",
    "Aggressive Tupperware ownership.",
    "Too many browser tabs.",
    "An awkward high-five that became a handshake.",
    "Mildly cursed lasagna.",
    "The audacity.",
    "A karaoke rendition nobody asked for.",
    "Socks with sandals, unapologetically.",
    "A smart fridge that judges you.",
    "Accidentally liking a photo from 2014.",
    "A goose with a grudge.",
    "Unresolved beef with a barista.",
    "Napping with intent.",
    "A conspiracy board made of yarn.",
    "The neighbor's leaf blower at 7am.",
    "Vibes, exclusively.",
    "An inspirational TED talk about naps.",
    "Overthinking a two-word text.",
    "Gluten-free regret.",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardCatalog {
    pub prompts: Vec<Card>,
    pub responses: Vec<Card>,
}

impl CardCatalog {
    pub fn new(prompts: Vec<Card>, responses: Vec<Card>) -> Result<Self, CatalogError> {
        let catalog = Self { prompts, responses };
        catalog.validate()?;
        Ok(catalog)
    }

    /// The deck shipped with the server
    pub fn builtin() -> Self {
        let cards = |prefix: &str, texts: &[&str]| -> Vec<Card> {
            texts
                .iter()
                .enumerate()
                .map(|(i, text)| Card {
                    id: format!("{}-{}", prefix, i + 1),
                    text: text.to_string(),
                })
                .collect()
        };

        Self {
            prompts: cards("b", BUILTIN_PROMPTS),
            responses: cards("w", BUILTIN_RESPONSES),
        }
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let raw = std::fs::read_to_string(path)?;
        let catalog: CardCatalog = serde_json::from_str(&raw)?;
        catalog.validate()?;
        Ok(catalog)
    }

    fn validate(&self) -> Result<(), CatalogError> {
        if self.prompts.is_empty() {
            return Err(CatalogError::NoPrompts);
        }
        if self.responses.len() < HAND_SIZE {
            return Err(CatalogError::TooFewResponses {
                needed: HAND_SIZE,
                found: self.responses.len(),
            });
        }
        Ok(())
    }

    pub fn draw_prompt<R: Rng + ?Sized>(&self, rng: &mut R) -> Card {
        self.prompts
            .choose(rng)
            .cloned()
            .unwrap_or_else(|| Card {
                id: "b-empty".to_string(),
                text: "____".to_string(),
            })
    }

    /// Deal `size` distinct response cards (fewer only if the deck is smaller)
    pub fn deal_hand<R: Rng + ?Sized>(&self, rng: &mut R, size: usize) -> Vec<Card> {
        let amount = size.min(self.responses.len());
        index::sample(rng, self.responses.len(), amount)
            .into_iter()
            .map(|i| self.responses[i].clone())
            .collect()
    }
}

impl Default for CardCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}
