use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    White,
    Black,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Pawn,
    Rook,
    Bishop,
    Knight,
    King,
    Queen,
}

/// One of the twelve piece kinds a detector can report.
///
/// Each kind has a fixed integer id used in the occupancy matrix wire
/// format (`-1` is the empty square). The enumeration is shared with the
/// detector's label set, which is why black knight is 11 rather than 9.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Piece {
    WhitePawn,
    WhiteRook,
    WhiteBishop,
    WhiteKnight,
    WhiteKing,
    WhiteQueen,
    BlackPawn,
    BlackRook,
    BlackBishop,
    BlackKing,
    BlackQueen,
    BlackKnight,
}

impl Piece {
    pub const ALL: [Piece; 12] = [
        Piece::WhitePawn,
        Piece::WhiteRook,
        Piece::WhiteBishop,
        Piece::WhiteKnight,
        Piece::WhiteKing,
        Piece::WhiteQueen,
        Piece::BlackPawn,
        Piece::BlackRook,
        Piece::BlackBishop,
        Piece::BlackKing,
        Piece::BlackQueen,
        Piece::BlackKnight,
    ];

    /// Wire id, `0..=11`.
    pub fn id(self) -> i8 {
        match self {
            Piece::WhitePawn => 0,
            Piece::WhiteRook => 1,
            Piece::WhiteBishop => 2,
            Piece::WhiteKnight => 3,
            Piece::WhiteKing => 4,
            Piece::WhiteQueen => 5,
            Piece::BlackPawn => 6,
            Piece::BlackRook => 7,
            Piece::BlackBishop => 8,
            Piece::BlackKing => 9,
            Piece::BlackQueen => 10,
            Piece::BlackKnight => 11,
        }
    }

    pub fn from_id(id: i8) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.id() == id)
    }

    /// Detector label, e.g. `"white-pawn"`.
    pub fn class_name(self) -> &'static str {
        match self {
            Piece::WhitePawn => "white-pawn",
            Piece::WhiteRook => "white-rook",
            Piece::WhiteBishop => "white-bishop",
            Piece::WhiteKnight => "white-knight",
            Piece::WhiteKing => "white-king",
            Piece::WhiteQueen => "white-queen",
            Piece::BlackPawn => "black-pawn",
            Piece::BlackRook => "black-rook",
            Piece::BlackBishop => "black-bishop",
            Piece::BlackKing => "black-king",
            Piece::BlackQueen => "black-queen",
            Piece::BlackKnight => "black-knight",
        }
    }

    /// Parse a detector label. Unknown labels yield `None`.
    pub fn from_class_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.class_name() == name)
    }

    pub fn side(self) -> Side {
        if self.id() < 6 {
            Side::White
        } else {
            Side::Black
        }
    }

    pub fn role(self) -> Role {
        match self {
            Piece::WhitePawn | Piece::BlackPawn => Role::Pawn,
            Piece::WhiteRook | Piece::BlackRook => Role::Rook,
            Piece::WhiteBishop | Piece::BlackBishop => Role::Bishop,
            Piece::WhiteKnight | Piece::BlackKnight => Role::Knight,
            Piece::WhiteKing | Piece::BlackKing => Role::King,
            Piece::WhiteQueen | Piece::BlackQueen => Role::Queen,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_and_labels_are_bijective() {
        for piece in Piece::ALL {
            assert_eq!(Piece::from_id(piece.id()), Some(piece));
            assert_eq!(Piece::from_class_name(piece.class_name()), Some(piece));
        }
        assert_eq!(Piece::from_id(-1), None);
        assert_eq!(Piece::from_id(12), None);
        assert_eq!(Piece::from_class_name("hand"), None);
    }

    #[test]
    fn black_knight_keeps_its_detector_id() {
        assert_eq!(Piece::BlackKnight.id(), 11);
        assert_eq!(Piece::BlackKing.id(), 9);
        assert_eq!(Piece::BlackKnight.side(), Side::Black);
        assert_eq!(Piece::BlackKnight.role(), Role::Knight);
    }
}
