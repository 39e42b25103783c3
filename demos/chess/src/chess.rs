//! A casual-rules chess oracle.
//!
//! Enforces piece geometry, path clearance, captures, double pushes,
//! en passant and promotion, and keeps full FEN bookkeeping (castling
//! rights, en passant square, move clocks). It does NOT verify check
//! or allow castling moves — this is the "kitchen table" ruleset for
//! the demo server. A tournament-strength oracle slots in behind the
//! same trait without touching the server.

use gambit::prelude::{MoveOutcome, MoveRequest, RulesOracle, Seat};

// ---------------------------------------------------------------------------
// Pieces and squares
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    White,
    Black,
}

impl Color {
    fn other(self) -> Color {
        match self {
            Color::White => Color::Black,
            Color::Black => Color::White,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PieceKind {
    Pawn,
    Knight,
    Bishop,
    Rook,
    Queen,
    King,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Piece {
    pub color: Color,
    pub kind: PieceKind,
}

impl Piece {
    /// FEN letter: uppercase white, lowercase black.
    fn fen_char(self) -> char {
        let c = match self.kind {
            PieceKind::Pawn => 'p',
            PieceKind::Knight => 'n',
            PieceKind::Bishop => 'b',
            PieceKind::Rook => 'r',
            PieceKind::Queen => 'q',
            PieceKind::King => 'k',
        };
        match self.color {
            Color::White => c.to_ascii_uppercase(),
            Color::Black => c,
        }
    }

    fn from_fen_char(c: char) -> Option<Piece> {
        let kind = match c.to_ascii_lowercase() {
            'p' => PieceKind::Pawn,
            'n' => PieceKind::Knight,
            'b' => PieceKind::Bishop,
            'r' => PieceKind::Rook,
            'q' => PieceKind::Queen,
            'k' => PieceKind::King,
            _ => return None,
        };
        let color = if c.is_ascii_uppercase() {
            Color::White
        } else {
            Color::Black
        };
        Some(Piece { color, kind })
    }
}

/// A board square. `file` 0–7 = a–h, `rank` 0–7 = 1–8.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Square {
    pub file: i8,
    pub rank: i8,
}

impl Square {
    /// Parses algebraic notation (`"e4"`). Anything else is `None`.
    pub fn parse(s: &str) -> Option<Square> {
        let bytes = s.as_bytes();
        if bytes.len() != 2 {
            return None;
        }
        let file = bytes[0].wrapping_sub(b'a');
        let rank = bytes[1].wrapping_sub(b'1');
        if file > 7 || rank > 7 {
            return None;
        }
        Some(Square {
            file: file as i8,
            rank: rank as i8,
        })
    }

    fn name(self) -> String {
        format!(
            "{}{}",
            (b'a' + self.file as u8) as char,
            (b'1' + self.rank as u8) as char
        )
    }
}

// ---------------------------------------------------------------------------
// Board
// ---------------------------------------------------------------------------

/// Which castling moves are still nominally available.
///
/// Castling itself is not a legal move under the casual ruleset, but
/// the rights are tracked so the FEN stays faithful to the game so far
/// and a stricter oracle can pick the position up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CastlingRights {
    white_king: bool,
    white_queen: bool,
    black_king: bool,
    black_queen: bool,
}

impl CastlingRights {
    fn all() -> Self {
        Self {
            white_king: true,
            white_queen: true,
            black_king: true,
            black_queen: true,
        }
    }
}

/// A full chess position: placement, side to move, and the FEN
/// bookkeeping fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    /// `squares[rank][file]`, rank 0 = rank 1 (White's back rank).
    squares: [[Option<Piece>; 8]; 8],
    to_move: Color,
    castling: CastlingRights,
    en_passant: Option<Square>,
    halfmove: u32,
    fullmove: u32,
}

impl Board {
    /// The standard starting position.
    pub fn initial() -> Board {
        let back = [
            PieceKind::Rook,
            PieceKind::Knight,
            PieceKind::Bishop,
            PieceKind::Queen,
            PieceKind::King,
            PieceKind::Bishop,
            PieceKind::Knight,
            PieceKind::Rook,
        ];
        let mut squares = [[None; 8]; 8];
        for file in 0..8 {
            squares[0][file] = Some(Piece {
                color: Color::White,
                kind: back[file],
            });
            squares[1][file] = Some(Piece {
                color: Color::White,
                kind: PieceKind::Pawn,
            });
            squares[6][file] = Some(Piece {
                color: Color::Black,
                kind: PieceKind::Pawn,
            });
            squares[7][file] = Some(Piece {
                color: Color::Black,
                kind: back[file],
            });
        }
        Board {
            squares,
            to_move: Color::White,
            castling: CastlingRights::all(),
            en_passant: None,
            halfmove: 0,
            fullmove: 1,
        }
    }

    pub fn to_move(&self) -> Color {
        self.to_move
    }

    fn at(&self, sq: Square) -> Option<Piece> {
        self.squares[sq.rank as usize][sq.file as usize]
    }

    fn set(&mut self, sq: Square, piece: Option<Piece>) {
        self.squares[sq.rank as usize][sq.file as usize] = piece;
    }

    /// Serializes the position as a six-field FEN string.
    pub fn fen(&self) -> String {
        let mut out = String::new();
        for rank in (0..8).rev() {
            let mut empty = 0u8;
            for file in 0..8 {
                match self.squares[rank][file] {
                    Some(piece) => {
                        if empty > 0 {
                            out.push((b'0' + empty) as char);
                            empty = 0;
                        }
                        out.push(piece.fen_char());
                    }
                    None => empty += 1,
                }
            }
            if empty > 0 {
                out.push((b'0' + empty) as char);
            }
            if rank > 0 {
                out.push('/');
            }
        }

        out.push(' ');
        out.push(match self.to_move {
            Color::White => 'w',
            Color::Black => 'b',
        });

        out.push(' ');
        let c = self.castling;
        if !(c.white_king || c.white_queen || c.black_king || c.black_queen) {
            out.push('-');
        } else {
            if c.white_king {
                out.push('K');
            }
            if c.white_queen {
                out.push('Q');
            }
            if c.black_king {
                out.push('k');
            }
            if c.black_queen {
                out.push('q');
            }
        }

        out.push(' ');
        match self.en_passant {
            Some(sq) => out.push_str(&sq.name()),
            None => out.push('-'),
        }

        out.push_str(&format!(" {} {}", self.halfmove, self.fullmove));
        out
    }

    /// Parses a six-field FEN string.
    pub fn from_fen(fen: &str) -> Result<Board, String> {
        let fields: Vec<&str> = fen.split_whitespace().collect();
        let &[placement, active, castling, en_passant, halfmove, fullmove] =
            fields.as_slice()
        else {
            return Err(format!("expected 6 FEN fields, got {}", fields.len()));
        };

        let mut squares = [[None; 8]; 8];
        let ranks: Vec<&str> = placement.split('/').collect();
        if ranks.len() != 8 {
            return Err("expected 8 ranks".into());
        }
        for (i, rank_str) in ranks.iter().enumerate() {
            let rank = 7 - i;
            let mut file = 0usize;
            for c in rank_str.chars() {
                if let Some(n) = c.to_digit(10) {
                    file += n as usize;
                } else {
                    let piece = Piece::from_fen_char(c)
                        .ok_or_else(|| format!("bad piece char {c:?}"))?;
                    if file > 7 {
                        return Err("rank overflows 8 files".into());
                    }
                    squares[rank][file] = Some(piece);
                    file += 1;
                }
            }
            if file != 8 {
                return Err("rank does not cover 8 files".into());
            }
        }

        let to_move = match active {
            "w" => Color::White,
            "b" => Color::Black,
            other => return Err(format!("bad active color {other:?}")),
        };

        let castling = CastlingRights {
            white_king: castling.contains('K'),
            white_queen: castling.contains('Q'),
            black_king: castling.contains('k'),
            black_queen: castling.contains('q'),
        };

        let en_passant = match en_passant {
            "-" => None,
            sq => Some(
                Square::parse(sq)
                    .ok_or_else(|| format!("bad en passant square {sq:?}"))?,
            ),
        };

        Ok(Board {
            squares,
            to_move,
            castling,
            en_passant,
            halfmove: halfmove
                .parse()
                .map_err(|_| "bad halfmove clock".to_string())?,
            fullmove: fullmove
                .parse()
                .map_err(|_| "bad fullmove number".to_string())?,
        })
    }
}

// ---------------------------------------------------------------------------
// Move application
// ---------------------------------------------------------------------------

/// How a geometrically valid move affects the board beyond the piece
/// relocation itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MoveShape {
    Plain,
    DoublePush,
    EnPassantCapture,
}

/// Checks piece geometry and path clearance. Capture-of-own-piece has
/// already been excluded by the caller.
fn validate_shape(
    board: &Board,
    piece: Piece,
    from: Square,
    to: Square,
) -> Result<MoveShape, String> {
    let df = to.file - from.file;
    let dr = to.rank - from.rank;

    match piece.kind {
        PieceKind::Knight => {
            if (df.abs() == 1 && dr.abs() == 2) || (df.abs() == 2 && dr.abs() == 1)
            {
                Ok(MoveShape::Plain)
            } else {
                Err("knights move in an L".into())
            }
        }
        PieceKind::King => {
            if df.abs() <= 1 && dr.abs() <= 1 {
                Ok(MoveShape::Plain)
            } else {
                Err("king moves one square".into())
            }
        }
        PieceKind::Rook => {
            if df == 0 || dr == 0 {
                path_clear(board, from, to)?;
                Ok(MoveShape::Plain)
            } else {
                Err("rooks move on ranks and files".into())
            }
        }
        PieceKind::Bishop => {
            if df.abs() == dr.abs() {
                path_clear(board, from, to)?;
                Ok(MoveShape::Plain)
            } else {
                Err("bishops move on diagonals".into())
            }
        }
        PieceKind::Queen => {
            if df == 0 || dr == 0 || df.abs() == dr.abs() {
                path_clear(board, from, to)?;
                Ok(MoveShape::Plain)
            } else {
                Err("queens move on lines and diagonals".into())
            }
        }
        PieceKind::Pawn => {
            let dir: i8 = match piece.color {
                Color::White => 1,
                Color::Black => -1,
            };
            let start_rank = match piece.color {
                Color::White => 1,
                Color::Black => 6,
            };

            if df == 0 && dr == dir && board.at(to).is_none() {
                Ok(MoveShape::Plain)
            } else if df == 0
                && dr == 2 * dir
                && from.rank == start_rank
                && board
                    .at(Square {
                        file: from.file,
                        rank: from.rank + dir,
                    })
                    .is_none()
                && board.at(to).is_none()
            {
                Ok(MoveShape::DoublePush)
            } else if df.abs() == 1 && dr == dir {
                if board.at(to).is_some() {
                    Ok(MoveShape::Plain)
                } else if board.en_passant == Some(to) {
                    Ok(MoveShape::EnPassantCapture)
                } else {
                    Err("pawn captures diagonally onto a piece".into())
                }
            } else {
                Err("illegal pawn move".into())
            }
        }
    }
}

/// Verifies every square strictly between `from` and `to` is empty.
fn path_clear(board: &Board, from: Square, to: Square) -> Result<(), String> {
    let step_f = (to.file - from.file).signum();
    let step_r = (to.rank - from.rank).signum();
    let mut sq = Square {
        file: from.file + step_f,
        rank: from.rank + step_r,
    };
    while sq != to {
        if board.at(sq).is_some() {
            return Err(format!("path blocked at {}", sq.name()));
        }
        sq = Square {
            file: sq.file + step_f,
            rank: sq.rank + step_r,
        };
    }
    Ok(())
}

/// Applies a move request to a board, casual-rules legality only.
pub fn apply(board: &Board, request: &MoveRequest) -> MoveOutcome<Board> {
    let illegal = |why: String| MoveOutcome::Illegal(why);

    let Some(from) = Square::parse(&request.from) else {
        return illegal(format!("malformed square {:?}", request.from));
    };
    let Some(to) = Square::parse(&request.to) else {
        return illegal(format!("malformed square {:?}", request.to));
    };
    if from == to {
        return illegal("null move".into());
    }

    let Some(piece) = board.at(from) else {
        return illegal(format!("no piece on {}", from.name()));
    };
    if piece.color != board.to_move {
        return illegal("that piece is not yours to move".into());
    }
    if let Some(target) = board.at(to) {
        if target.color == piece.color {
            return illegal("own piece on the target square".into());
        }
    }

    let shape = match validate_shape(board, piece, from, to) {
        Ok(shape) => shape,
        Err(why) => return illegal(why),
    };

    let mut next = board.clone();
    let mut captured = next.at(to).is_some();
    next.set(from, None);

    let mut placed = piece;
    let last_rank = match piece.color {
        Color::White => 7,
        Color::Black => 0,
    };
    if piece.kind == PieceKind::Pawn && to.rank == last_rank {
        placed.kind = match request
            .promotion
            .as_deref()
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            // chess.js clients habitually send "q"; absent means queen.
            None | Some("q") => PieceKind::Queen,
            Some("r") => PieceKind::Rook,
            Some("b") => PieceKind::Bishop,
            Some("n") => PieceKind::Knight,
            Some(other) => {
                return illegal(format!("unknown promotion piece {other:?}"));
            }
        };
    }
    next.set(to, Some(placed));

    if shape == MoveShape::EnPassantCapture {
        next.set(
            Square {
                file: to.file,
                rank: from.rank,
            },
            None,
        );
        captured = true;
    }

    next.en_passant = if shape == MoveShape::DoublePush {
        let dir = if piece.color == Color::White { 1 } else { -1 };
        Some(Square {
            file: from.file,
            rank: from.rank + dir,
        })
    } else {
        None
    };

    update_castling_rights(&mut next.castling, piece, from, to);

    next.halfmove = if captured || piece.kind == PieceKind::Pawn {
        0
    } else {
        board.halfmove + 1
    };
    if board.to_move == Color::Black {
        next.fullmove += 1;
    }
    next.to_move = board.to_move.other();

    MoveOutcome::Legal(next)
}

/// A king move drops both rights for its color; touching a corner
/// square (moving the rook away, or capturing it) drops that corner's
/// right.
fn update_castling_rights(
    rights: &mut CastlingRights,
    piece: Piece,
    from: Square,
    to: Square,
) {
    match (piece.kind, piece.color) {
        (PieceKind::King, Color::White) => {
            rights.white_king = false;
            rights.white_queen = false;
        }
        (PieceKind::King, Color::Black) => {
            rights.black_king = false;
            rights.black_queen = false;
        }
        _ => {}
    }
    for sq in [from, to] {
        match (sq.file, sq.rank) {
            (0, 0) => rights.white_queen = false,
            (7, 0) => rights.white_king = false,
            (0, 7) => rights.black_queen = false,
            (7, 7) => rights.black_king = false,
            _ => {}
        }
    }
}

// ---------------------------------------------------------------------------
// Oracle
// ---------------------------------------------------------------------------

/// The demo's [`RulesOracle`]: casual chess over [`Board`].
///
/// First seat plays White — the side that moves first.
pub struct CasualChess;

impl RulesOracle for CasualChess {
    type Position = Board;

    fn initial_position(&self) -> Board {
        Board::initial()
    }

    fn to_move(&self, position: &Board) -> Seat {
        match position.to_move() {
            Color::White => Seat::First,
            Color::Black => Seat::Second,
        }
    }

    fn apply_move(&self, position: &Board, request: &MoveRequest) -> MoveOutcome<Board> {
        apply(position, request)
    }

    fn serialize(&self, position: &Board) -> String {
        position.fen()
    }
}

// =========================================================================
// Tests
// =========================================================================
