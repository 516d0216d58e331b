//! Deck generation: image selection, pairing, shuffling and grid placement.

use std::{collections::HashSet, fmt, path::Path};

use rand::Rng;
use serde::Serialize;
use thiserror::Error;

/// Configuration errors raised when the requested deck cannot be dealt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeckError {
    /// More distinct pairs requested than images exist to draw from.
    #[error("cannot pick {pairs} distinct images out of {images}")]
    NotEnoughImages {
        /// Requested number of pairs.
        pairs: usize,
        /// Number of available images.
        images: usize,
    },
    /// The produced card count does not fill the grid exactly.
    #[error("deck of {cards} cards does not fit a {rows}x{cols} grid")]
    GridMismatch {
        /// Number of cards produced (two per pair).
        cards: usize,
        /// Grid rows.
        rows: usize,
        /// Grid columns.
        cols: usize,
    },
}

/// Identifier of a card, unique within one deck.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct CardId(pub u32);

impl fmt::Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "card-{}", self.0)
    }
}

/// Grid placement assigned at deal time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Position {
    /// Zero-based row.
    pub row: usize,
    /// Zero-based column.
    pub col: usize,
    /// Row-major index, `row * cols + col`.
    pub index: usize,
}

/// A single card on the board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Card {
    /// Unique within the deck.
    pub id: CardId,
    /// Pairing key shared by exactly two cards of the deck.
    pub image_id: u32,
    /// Face up.
    pub is_flipped: bool,
    /// Part of a found pair; implies face up.
    pub is_matched: bool,
    /// Where the card sits on the grid.
    pub position: Position,
}

/// What a card shows once it is face up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CardFace {
    /// Image asset file found on disk.
    Image(String),
    /// Asset missing; the image id is drawn as text instead.
    Placeholder(String),
}

/// Ordered, positioned set of cards for one round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deck {
    cards: Vec<Card>,
    rows: usize,
    cols: usize,
}

impl Deck {
    /// Deal a fresh deck.
    ///
    /// Picks `total_pairs` distinct images out of `1..=total_images`, creates two cards for each,
    /// shuffles them and lays them out row by row on a `rows` x `cols` grid.
    pub fn generate<R>(
        total_images: usize,
        total_pairs: usize,
        rows: usize,
        cols: usize,
        rng: &mut R,
    ) -> Result<Self, DeckError>
    where
        R: Rng + ?Sized,
    {
        if total_pairs > total_images {
            return Err(DeckError::NotEnoughImages {
                pairs: total_pairs,
                images: total_images,
            });
        }

        let card_count = total_pairs * 2;
        if card_count != rows * cols {
            return Err(DeckError::GridMismatch {
                cards: card_count,
                rows,
                cols,
            });
        }

        let images = select_images(total_images, total_pairs, rng);
        let mut faces = Vec::with_capacity(card_count);
        for (pair, image_id) in images.into_iter().enumerate() {
            let base = (pair * 2) as u32;
            faces.push((CardId(base), image_id));
            faces.push((CardId(base + 1), image_id));
        }

        shuffle(&mut faces, rng);

        let cards = faces
            .into_iter()
            .enumerate()
            .map(|(index, (id, image_id))| Card {
                id,
                image_id,
                is_flipped: false,
                is_matched: false,
                position: Position {
                    row: index / cols,
                    col: index % cols,
                    index,
                },
            })
            .collect();

        Ok(Self { cards, rows, cols })
    }

    /// Cards in grid order.
    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    /// Grid rows.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Grid columns.
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Number of cards.
    pub fn len(&self) -> usize {
        self.cards.len()
    }

    /// Whether the deck has no cards.
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Hand the cards over to the match engine.
    pub fn into_cards(self) -> Vec<Card> {
        self.cards
    }
}

/// Draw `count` distinct ids from `1..=total` by rejection sampling.
///
/// Callers guarantee `count <= total`.
fn select_images<R>(total: usize, count: usize, rng: &mut R) -> Vec<u32>
where
    R: Rng + ?Sized,
{
    let mut used = HashSet::with_capacity(count);
    let mut images = Vec::with_capacity(count);
    while images.len() < count {
        let image_id = rng.random_range(1..=total as u32);
        if used.insert(image_id) {
            images.push(image_id);
        }
    }
    images
}

/// Fisher–Yates shuffle: walk down from the last slot swapping with a uniform index in `0..=i`.
pub fn shuffle<T, R>(items: &mut [T], rng: &mut R)
where
    R: Rng + ?Sized,
{
    for i in (1..items.len()).rev() {
        let j = rng.random_range(0..=i);
        items.swap(i, j);
    }
}

/// File name of the asset backing an image id (`7` → `07.png`).
pub fn asset_file_name(image_id: u32) -> String {
    format!("{image_id:02}.png")
}

/// Resolve the face of a card against an asset directory, degrading to a placeholder glyph.
pub fn card_face(image_id: u32, asset_root: &Path) -> CardFace {
    let path = asset_root.join(asset_file_name(image_id));
    if path.is_file() {
        CardFace::Image(path.to_string_lossy().into_owned())
    } else {
        CardFace::Placeholder(image_id.to_string())
    }
}
