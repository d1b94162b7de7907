//! Single-move inference from two occupancy snapshots.

use crate::rules::{BoardMove, RulesEngine};
use boardsight_core::{BoardSquare, Occupancy, Role};
use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// A legal move explaining the difference between two snapshots.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InferredMove {
    pub from: BoardSquare,
    pub to: BoardSquare,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub promotion: Option<Role>,
    pub uci: String,
    pub san: String,
}

impl InferredMove {
    pub fn board_move(&self) -> BoardMove {
        BoardMove {
            from: self.from,
            to: self.to,
            promotion: self.promotion,
        }
    }
}

/// Why a pair of snapshots did not yield a move. Not an error for a running
/// game: most frames simply show no move.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AmbiguousMove {
    #[error("{count} squares changed, a move changes exactly 2")]
    ChangedCells { count: usize },
    #[error("neither {first}-{second} nor {second}-{first} is legal")]
    NoLegalOrdering {
        first: BoardSquare,
        second: BoardSquare,
    },
}

/// Find the legal move that turns `previous` into `current`.
///
/// Exactly two cells must differ. The move is tried from the first changed
/// cell (row-major) to the second, then the other way round. When the plain
/// move is illegal and the destination now shows a piece other than a pawn
/// or king, it is retried as a promotion to that piece.
///
/// Notation is computed against the position before the move; the caller
/// applies the move.
#[cfg_attr(feature = "tracing", instrument(level = "debug", skip_all))]
pub fn infer_move<R>(
    previous: &Occupancy,
    current: &Occupancy,
    rules: &R,
) -> Result<InferredMove, AmbiguousMove>
where
    R: RulesEngine + ?Sized,
{
    let changed = previous.changed_cells(current);
    let [c1, c2] = changed.as_slice() else {
        return Err(AmbiguousMove::ChangedCells {
            count: changed.len(),
        });
    };
    let (Some(first), Some(second)) = (
        BoardSquare::from_cell(c1.0, c1.1),
        BoardSquare::from_cell(c2.0, c2.1),
    ) else {
        return Err(AmbiguousMove::ChangedCells {
            count: changed.len(),
        });
    };

    for (from, to) in [(first, second), (second, first)] {
        if let Some(mv) = legal_candidate(from, to, current, rules) {
            let inferred = InferredMove {
                from,
                to,
                promotion: mv.promotion,
                uci: rules.uci(&mv),
                san: rules.san(&mv).unwrap_or_else(|| rules.uci(&mv)),
            };
            debug!("inferred {} ({})", inferred.uci, inferred.san);
            return Ok(inferred);
        }
    }
    Err(AmbiguousMove::NoLegalOrdering { first, second })
}

fn legal_candidate<R>(
    from: BoardSquare,
    to: BoardSquare,
    current: &Occupancy,
    rules: &R,
) -> Option<BoardMove>
where
    R: RulesEngine + ?Sized,
{
    let plain = BoardMove::new(from, to);
    if rules.is_legal(&plain) {
        return Some(plain);
    }
    let (row, col) = to.to_cell();
    let role = current.get(row, col)?.role();
    if matches!(role, Role::Pawn | Role::King) {
        return None;
    }
    let promoted = plain.promoting(role);
    rules.is_legal(&promoted).then_some(promoted)
}
