use rand::RngCore;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(into = "SymbolFace", try_from = "SymbolFace")]
pub enum SymbolKind {
    Cherry,
    Lemon,
    Orange,
    Watermelon,
}

impl SymbolKind {
    pub const ALL: [SymbolKind; 4] = [
        SymbolKind::Cherry,
        SymbolKind::Lemon,
        SymbolKind::Orange,
        SymbolKind::Watermelon,
    ];

    pub fn icon(self) -> &'static str {
        match self {
            SymbolKind::Cherry => "🍒",
            SymbolKind::Lemon => "🍋",
            SymbolKind::Orange => "🍊",
            SymbolKind::Watermelon => "🍉",
        }
    }

    pub fn letter(self) -> char {
        match self {
            SymbolKind::Cherry => 'C',
            SymbolKind::Lemon => 'L',
            SymbolKind::Orange => 'O',
            SymbolKind::Watermelon => 'W',
        }
    }

    /// Credits paid for three of this kind.
    pub fn reward(self) -> u64 {
        match self {
            SymbolKind::Cherry => 10,
            SymbolKind::Lemon => 20,
            SymbolKind::Orange => 30,
            SymbolKind::Watermelon => 40,
        }
    }

    pub fn from_letter(letter: char) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.letter() == letter)
    }

    pub fn face(self) -> SymbolFace {
        SymbolFace {
            icon: self.icon().to_string(),
            letter: self.letter(),
        }
    }
}

/// Uniform draw over the four kinds. The top two bits of one word select the
/// kind, so each kind has probability exactly 1/4.
pub fn draw_one<R: RngCore + ?Sized>(rng: &mut R) -> SymbolKind {
    SymbolKind::ALL[(rng.next_u32() >> 30) as usize]
}

/// Wire form of a symbol: `{ "icon": "🍒", "letter": "C" }`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SymbolFace {
    pub icon: String,
    pub letter: char,
}

impl From<SymbolKind> for SymbolFace {
    fn from(kind: SymbolKind) -> Self {
        kind.face()
    }
}

impl TryFrom<SymbolFace> for SymbolKind {
    type Error = String;

    // The letter is authoritative; the icon must agree with it.
    fn try_from(face: SymbolFace) -> Result<Self, Self::Error> {
        let kind = SymbolKind::from_letter(face.letter)
            .ok_or_else(|| format!("unknown symbol letter {:?}", face.letter))?;
        if kind.icon() != face.icon {
            return Err(format!(
                "icon {:?} does not match letter {:?}",
                face.icon, face.letter
            ));
        }
        Ok(kind)
    }
}
