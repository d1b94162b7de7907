//! Chess rules seam and its `chess`-crate implementation.

use boardsight_core::{BoardSquare, Role};
use chess::{Board, BoardStatus, ChessMove, File, MoveGen, Piece, Rank, Square};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A from/to square pair with an optional promotion role.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoardMove {
    pub from: BoardSquare,
    pub to: BoardSquare,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub promotion: Option<Role>,
}

impl BoardMove {
    pub fn new(from: BoardSquare, to: BoardSquare) -> Self {
        Self {
            from,
            to,
            promotion: None,
        }
    }

    pub fn promoting(self, role: Role) -> Self {
        Self {
            promotion: Some(role),
            ..self
        }
    }
}

/// UCI long algebraic form, e.g. `e2e4` or `e7e8q`.
impl fmt::Display for BoardMove {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.from, self.to)?;
        if let Some(role) = self.promotion {
            write!(f, "{}", role_letter(role).to_ascii_lowercase())?;
        }
        Ok(())
    }
}

/// Legal-move oracle and position owner used by move inference.
pub trait RulesEngine {
    fn is_legal(&self, mv: &BoardMove) -> bool;

    /// Standard algebraic notation in the current position, `None` for an
    /// illegal move.
    fn san(&self, mv: &BoardMove) -> Option<String>;

    fn uci(&self, mv: &BoardMove) -> String {
        mv.to_string()
    }

    /// Play a legal move. Returns `false` and leaves the position unchanged
    /// otherwise.
    fn apply(&mut self, mv: &BoardMove) -> bool;
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid FEN: {0}")]
pub struct InvalidFen(pub String);

/// [`RulesEngine`] backed by [`chess::Board`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChessRules {
    board: Board,
}

impl ChessRules {
    /// Standard starting position.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_fen(fen: &str) -> Result<Self, InvalidFen> {
        Board::from_str(fen)
            .map(|board| Self { board })
            .map_err(|e| InvalidFen(format!("{fen}: {e}")))
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn fen(&self) -> String {
        self.board.to_string()
    }

    fn to_chess(&self, mv: &BoardMove) -> ChessMove {
        ChessMove::new(
            to_square(mv.from),
            to_square(mv.to),
            mv.promotion.map(to_piece),
        )
    }
}

impl RulesEngine for ChessRules {
    fn is_legal(&self, mv: &BoardMove) -> bool {
        self.board.legal(self.to_chess(mv))
    }

    fn san(&self, mv: &BoardMove) -> Option<String> {
        let mv = self.to_chess(mv);
        self.board.legal(mv).then(|| san(&self.board, mv))
    }

    fn apply(&mut self, mv: &BoardMove) -> bool {
        let mv = self.to_chess(mv);
        if !self.board.legal(mv) {
            return false;
        }
        self.board = self.board.make_move_new(mv);
        true
    }
}

fn to_square(sq: BoardSquare) -> Square {
    Square::make_square(
        Rank::from_index(sq.rank as usize),
        File::from_index(sq.file as usize),
    )
}

fn to_piece(role: Role) -> Piece {
    match role {
        Role::Pawn => Piece::Pawn,
        Role::Knight => Piece::Knight,
        Role::Bishop => Piece::Bishop,
        Role::Rook => Piece::Rook,
        Role::Queen => Piece::Queen,
        Role::King => Piece::King,
    }
}

fn role_letter(role: Role) -> char {
    match role {
        Role::Pawn => 'P',
        Role::Knight => 'N',
        Role::Bishop => 'B',
        Role::Rook => 'R',
        Role::Queen => 'Q',
        Role::King => 'K',
    }
}

fn piece_letter(piece: Piece) -> char {
    match piece {
        Piece::Pawn => 'P',
        Piece::Knight => 'N',
        Piece::Bishop => 'B',
        Piece::Rook => 'R',
        Piece::Queen => 'Q',
        Piece::King => 'K',
    }
}

fn file_char(sq: Square) -> char {
    (b'a' + sq.get_file().to_index() as u8) as char
}

fn rank_char(sq: Square) -> char {
    (b'1' + sq.get_rank().to_index() as u8) as char
}

/// SAN for a move already known to be legal on `board`.
fn san(board: &Board, mv: ChessMove) -> String {
    let (src, dst) = (mv.get_source(), mv.get_dest());
    let Some(piece) = board.piece_on(src) else {
        return mv.to_string();
    };

    let mut out = String::new();
    let file_delta = dst.get_file().to_index() as i32 - src.get_file().to_index() as i32;
    if piece == Piece::King && file_delta.abs() == 2 {
        out.push_str(if file_delta > 0 { "O-O" } else { "O-O-O" });
    } else if piece == Piece::Pawn {
        // Diagonal pawn steps capture, en passant included.
        if file_delta != 0 {
            out.push(file_char(src));
            out.push('x');
        }
        out.push_str(&dst.to_string());
        if let Some(promo) = mv.get_promotion() {
            out.push('=');
            out.push(piece_letter(promo));
        }
    } else {
        out.push(piece_letter(piece));
        out.push_str(&disambiguation(board, mv, piece));
        if board.piece_on(dst).is_some() {
            out.push('x');
        }
        out.push_str(&dst.to_string());
    }

    let after = board.make_move_new(mv);
    if after.status() == BoardStatus::Checkmate {
        out.push('#');
    } else if after.checkers().popcnt() > 0 {
        out.push('+');
    }
    out
}

/// File, rank or both of the source square when another piece of the same
/// kind can reach the destination.
fn disambiguation(board: &Board, mv: ChessMove, piece: Piece) -> String {
    let (src, dst) = (mv.get_source(), mv.get_dest());
    let rivals: Vec<Square> = MoveGen::new_legal(board)
        .filter(|m| m.get_dest() == dst && m.get_source() != src)
        .filter(|m| board.piece_on(m.get_source()) == Some(piece))
        .map(|m| m.get_source())
        .collect();
    if rivals.is_empty() {
        return String::new();
    }
    if rivals.iter().all(|r| r.get_file() != src.get_file()) {
        file_char(src).to_string()
    } else if rivals.iter().all(|r| r.get_rank() != src.get_rank()) {
        rank_char(src).to_string()
    } else {
        src.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mv(from: &str, to: &str) -> BoardMove {
        BoardMove::new(
            BoardSquare::parse(from).expect("square"),
            BoardSquare::parse(to).expect("square"),
        )
    }

    fn play(rules: &mut ChessRules, moves: &[(&str, &str)]) {
        for (from, to) in moves {
            assert!(rules.apply(&mv(from, to)), "{from}{to}");
        }
    }

    #[test]
    fn opening_moves_have_plain_san() {
        let rules = ChessRules::new();
        assert_eq!(rules.san(&mv("e2", "e4")).as_deref(), Some("e4"));
        assert_eq!(rules.san(&mv("g1", "f3")).as_deref(), Some("Nf3"));
        assert_eq!(rules.san(&mv("e2", "e5")), None);
        assert_eq!(rules.uci(&mv("e2", "e4")), "e2e4");
    }

    #[test]
    fn captures_checks_and_mate_are_marked() {
        let mut rules = ChessRules::new();
        play(&mut rules, &[("e2", "e4"), ("d7", "d5")]);
        assert_eq!(rules.san(&mv("e4", "d5")).as_deref(), Some("exd5"));

        let mut rules = ChessRules::new();
        play(&mut rules, &[("f2", "f3"), ("e7", "e5"), ("g2", "g4")]);
        assert_eq!(rules.san(&mv("d8", "h4")).as_deref(), Some("Qh4#"));

        let mut rules = ChessRules::new();
        play(&mut rules, &[("e2", "e4"), ("f7", "f6")]);
        assert_eq!(rules.san(&mv("d1", "h5")).as_deref(), Some("Qh5+"));
    }

    #[test]
    fn castling_uses_o_notation() {
        let rules =
            ChessRules::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1").expect("fen");
        assert_eq!(rules.san(&mv("e1", "g1")).as_deref(), Some("O-O"));
        assert_eq!(rules.san(&mv("e1", "c1")).as_deref(), Some("O-O-O"));
    }

    #[test]
    fn rival_pieces_are_disambiguated() {
        let rules = ChessRules::from_fen("4k3/8/8/8/8/8/4K3/R6R w - - 0 1").expect("fen");
        assert_eq!(rules.san(&mv("a1", "d1")).as_deref(), Some("Rad1"));
        let rules = ChessRules::from_fen("4k3/8/8/R7/8/8/8/R3K3 w - - 0 1").expect("fen");
        assert_eq!(rules.san(&mv("a1", "a3")).as_deref(), Some("R1a3"));
    }

    #[test]
    fn promotion_needs_a_role() {
        let mut rules = ChessRules::from_fen("8/4P3/8/8/8/8/k7/4K3 w - - 0 1").expect("fen");
        let push = mv("e7", "e8");
        assert!(!rules.is_legal(&push));
        let queen = push.promoting(Role::Queen);
        assert_eq!(queen.to_string(), "e7e8q");
        assert_eq!(rules.san(&queen).as_deref(), Some("e8=Q"));
        assert!(rules.apply(&queen));
        assert!(!rules.apply(&queen));
    }

    #[test]
    fn bad_fen_is_rejected() {
        assert!(ChessRules::from_fen("not a position").is_err());
    }
}
