use crate::Piece;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Squares per board side.
pub const BOARD_SIZE: usize = 8;

/// Wire value for an empty square.
pub const EMPTY_ID: i8 = -1;

/// Which piece, if any, sits on each square in one frame.
///
/// Row 0 is the top row of the rectified image (rank 8), column 0 the left
/// column (file a). Serialized as an 8x8 integer matrix with `-1` for empty
/// squares.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(into = "[[i8; BOARD_SIZE]; BOARD_SIZE]", try_from = "[[i8; BOARD_SIZE]; BOARD_SIZE]")]
pub struct Occupancy {
    cells: [[Option<Piece>; BOARD_SIZE]; BOARD_SIZE],
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
#[error("invalid piece id {id} at row {row}, col {col}")]
pub struct InvalidPieceId {
    pub row: usize,
    pub col: usize,
    pub id: i8,
}

impl Occupancy {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Standard opening layout, black on row 0.
    pub fn starting_position() -> Self {
        use Piece::*;
        let back_white = [
            WhiteRook,
            WhiteKnight,
            WhiteBishop,
            WhiteQueen,
            WhiteKing,
            WhiteBishop,
            WhiteKnight,
            WhiteRook,
        ];
        let back_black = [
            BlackRook,
            BlackKnight,
            BlackBishop,
            BlackQueen,
            BlackKing,
            BlackBishop,
            BlackKnight,
            BlackRook,
        ];
        let mut occ = Self::empty();
        for col in 0..BOARD_SIZE {
            occ.cells[0][col] = Some(back_black[col]);
            occ.cells[1][col] = Some(BlackPawn);
            occ.cells[6][col] = Some(WhitePawn);
            occ.cells[7][col] = Some(back_white[col]);
        }
        occ
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> Option<Piece> {
        self.cells[row][col]
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, piece: Option<Piece>) {
        self.cells[row][col] = piece;
    }

    pub fn is_empty_at(&self, row: usize, col: usize) -> bool {
        self.cells[row][col].is_none()
    }

    pub fn occupied_count(&self) -> usize {
        self.cells.iter().flatten().filter(|c| c.is_some()).count()
    }

    /// Cells whose contents differ from `other`, in row-major order.
    pub fn changed_cells(&self, other: &Occupancy) -> Vec<(usize, usize)> {
        let mut out = Vec::new();
        for row in 0..BOARD_SIZE {
            for col in 0..BOARD_SIZE {
                if self.cells[row][col] != other.cells[row][col] {
                    out.push((row, col));
                }
            }
        }
        out
    }

    pub fn to_ids(&self) -> [[i8; BOARD_SIZE]; BOARD_SIZE] {
        self.cells
            .map(|row| row.map(|c| c.map_or(EMPTY_ID, Piece::id)))
    }

    pub fn from_ids(ids: &[[i8; BOARD_SIZE]; BOARD_SIZE]) -> Result<Self, InvalidPieceId> {
        let mut occ = Self::empty();
        for (row, line) in ids.iter().enumerate() {
            for (col, &id) in line.iter().enumerate() {
                if id == EMPTY_ID {
                    continue;
                }
                let piece = Piece::from_id(id).ok_or(InvalidPieceId { row, col, id })?;
                occ.cells[row][col] = Some(piece);
            }
        }
        Ok(occ)
    }
}

impl From<Occupancy> for [[i8; BOARD_SIZE]; BOARD_SIZE] {
    fn from(occ: Occupancy) -> Self {
        occ.to_ids()
    }
}

impl TryFrom<[[i8; BOARD_SIZE]; BOARD_SIZE]> for Occupancy {
    type Error = InvalidPieceId;

    fn try_from(ids: [[i8; BOARD_SIZE]; BOARD_SIZE]) -> Result<Self, Self::Error> {
        Self::from_ids(&ids)
    }
}

/// Algebraic square on a standard-orientation board.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct BoardSquare {
    /// 0 = file a, 7 = file h.
    pub file: u8,
    /// 0 = rank 1, 7 = rank 8.
    pub rank: u8,
}

impl BoardSquare {
    /// Square shown at matrix cell `(row, col)`: files a..h left to right,
    /// ranks 8..1 top to bottom.
    pub fn from_cell(row: usize, col: usize) -> Option<Self> {
        if row >= BOARD_SIZE || col >= BOARD_SIZE {
            return None;
        }
        Some(Self {
            file: col as u8,
            rank: (BOARD_SIZE - 1 - row) as u8,
        })
    }

    pub fn to_cell(self) -> (usize, usize) {
        (BOARD_SIZE - 1 - self.rank as usize, self.file as usize)
    }

    pub fn parse(name: &str) -> Option<Self> {
        let bytes = name.as_bytes();
        if bytes.len() != 2 {
            return None;
        }
        let file = bytes[0].checked_sub(b'a').filter(|f| *f < 8)?;
        let rank = bytes[1].checked_sub(b'1').filter(|r| *r < 8)?;
        Some(Self { file, rank })
    }
}

impl fmt::Display for BoardSquare {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", (b'a' + self.file) as char, self.rank + 1)
    }
}
