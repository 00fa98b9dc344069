//! Move equivalence between an engine's coordinate move and suite notation.
//!
//! Suites give best moves in SAN-ish shorthand (`Qg6`, `Rxb2`, `e8=Q`, `g6`)
//! while engines answer in coordinate form (`g3g6`). Without a board there
//! is no way to resolve SAN exactly, so matching falls back to comparing the
//! destination square.

use serde::Serialize;

/// How far the destination-square fallback is allowed to reach.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum MatchPolicy {
    /// Any expected token of length >= 3 matches on its trailing square
    #[default]
    Lenient,
    /// Only bare destinations and piece+destination tokens match by square
    Strict,
}

const PROMOTION_PIECES: &[char] = &['q', 'r', 'b', 'n'];

/// Strip check/mate/annotation suffixes and lowercase. A coordinate
/// promotion written with `=` (`e7e8=Q`) folds to engine form (`e7e8q`).
pub fn normalize_move(mv: &str) -> String {
    let mut normalized = mv
        .trim()
        .trim_end_matches(['+', '#', '!', '?'])
        .to_lowercase();

    let chars: Vec<char> = normalized.chars().collect();
    let coordinate_promotion = chars.len() == 6
        && is_file(chars[0])
        && is_rank(chars[1])
        && is_file(chars[2])
        && is_rank(chars[3])
        && chars[4] == '='
        && PROMOTION_PIECES.contains(&chars[5]);
    if coordinate_promotion {
        normalized.remove(4);
    }
    normalized
}

fn is_file(c: char) -> bool {
    ('a'..='h').contains(&c)
}

fn is_rank(c: char) -> bool {
    ('1'..='8').contains(&c)
}

/// A normalized engine move in `e7e8q` form.
struct CoordinateMove<'a> {
    from: &'a str,
    to: &'a str,
    promotion: Option<char>,
}

fn parse_coordinate(mv: &str) -> Option<CoordinateMove<'_>> {
    let chars: Vec<char> = mv.chars().collect();
    let squares_ok = chars.len() >= 4
        && is_file(chars[0])
        && is_rank(chars[1])
        && is_file(chars[2])
        && is_rank(chars[3]);
    if !squares_ok {
        return None;
    }

    let promotion = match chars.len() {
        4 => None,
        5 if PROMOTION_PIECES.contains(&chars[4]) => Some(chars[4]),
        _ => return None,
    };

    // All five chars are ASCII here, so byte slicing is safe
    Some(CoordinateMove {
        from: &mv[0..2],
        to: &mv[2..4],
        promotion,
    })
}

/// Split a promotion suffix (`=q`, or a piece letter right after the rank)
/// off an expected token.
fn split_promotion(expected: &str) -> (&str, Option<char>) {
    let chars: Vec<char> = expected.chars().collect();
    let n = chars.len();

    if n >= 4 && chars[n - 2] == '=' && PROMOTION_PIECES.contains(&chars[n - 1]) {
        return (&expected[..n - 2], Some(chars[n - 1]));
    }
    if n >= 3 && is_rank(chars[n - 2]) && PROMOTION_PIECES.contains(&chars[n - 1]) {
        return (&expected[..n - 1], Some(chars[n - 1]));
    }
    (expected, None)
}

fn castling_matches(engine: &CoordinateMove<'_>, expected: &str) -> bool {
    let side = expected.replace('0', "o");
    let king_from = engine.from == "e1" || engine.from == "e8";
    let back_rank = engine.from[1..] == engine.to[1..];
    if !king_from || !back_rank || engine.promotion.is_some() {
        return false;
    }
    match side.as_str() {
        "o-o" => engine.to.starts_with('g'),
        "o-o-o" => engine.to.starts_with('c'),
        _ => false,
    }
}

fn destination_matches(engine: &CoordinateMove<'_>, expected: &str, policy: MatchPolicy) -> bool {
    if !expected.is_ascii() {
        return false;
    }
    if castling_matches(engine, expected) {
        return true;
    }

    let (body, promotion) = split_promotion(expected);
    if promotion.is_some() && promotion != engine.promotion {
        return false;
    }

    match body.len() {
        // Bare landing square: "g6"
        2 => body == engine.to,
        // Piece letter + landing square: "qg6"
        3 => &body[1..] == engine.to,
        // Captures and disambiguation: "rxb2", "nbd7", "qxh7"
        n if n > 3 && policy == MatchPolicy::Lenient => &body[n - 2..] == engine.to,
        _ => false,
    }
}

/// Check whether the engine's move matches any of the expected moves.
pub fn moves_match(engine_move: &str, expected_moves: &[String], policy: MatchPolicy) -> bool {
    let engine = normalize_move(engine_move);
    if engine.is_empty() {
        return false;
    }
    let coordinate = parse_coordinate(&engine);

    expected_moves.iter().any(|expected| {
        let expected = normalize_move(expected);
        if expected.is_empty() {
            return false;
        }
        if engine == expected {
            return true;
        }
        coordinate
            .as_ref()
            .is_some_and(|c| destination_matches(c, &expected, policy))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expected(moves: &[&str]) -> Vec<String> {
        moves.iter().map(|m| m.to_string()).collect()
    }

    fn lenient(engine: &str, moves: &[&str]) -> bool {
        moves_match(engine, &expected(moves), MatchPolicy::Lenient)
    }

    fn strict(engine: &str, moves: &[&str]) -> bool {
        moves_match(engine, &expected(moves), MatchPolicy::Strict)
    }

    #[test]
    fn test_normalize_move() {
        assert_eq!(normalize_move("Qxh7+"), "qxh7");
        assert_eq!(normalize_move("Rxb2#"), "rxb2");
        assert_eq!(normalize_move(" Nf3!? "), "nf3");
        assert_eq!(normalize_move("e7e8Q"), "e7e8q");
        assert_eq!(normalize_move("e8=Q+"), "e8=q");
        assert_eq!(normalize_move("e7e8=Q"), "e7e8q");
        assert_eq!(normalize_move("dxc8=N"), "dxc8=n");
    }

    #[test]
    fn test_coordinate_promotion_with_marker() {
        assert!(strict("e7e8q", &["e7e8=Q"]));
        assert!(lenient("e7e8q", &["e7e8=Q+"]));
        assert!(!strict("e7e8r", &["e7e8=Q"]));
    }

    #[test]
    fn test_normalized_token_matches_itself() {
        for m in ["Qg6", "Rxb2", "e8=Q", "g6", "e7e8q", "O-O", "Nbd7+", "g5g6"] {
            assert!(lenient(&normalize_move(m), &[m]), "{m}");
            assert!(strict(&normalize_move(m), &[m]), "{m}");
        }
    }

    #[test]
    fn test_empty_engine_move_never_matches() {
        assert!(!lenient("", &["e4"]));
        assert!(!lenient("   ", &["e4"]));
    }

    #[test]
    fn test_coordinate_exact() {
        assert!(lenient("g5g6", &["g5g6"]));
        assert!(!lenient("g1f3", &["e4e5"]));
    }

    #[test]
    fn test_destination_only() {
        assert!(lenient("g5g6", &["g6"]));
        assert!(!lenient("g5g6", &["g7"]));
    }

    #[test]
    fn test_piece_plus_destination() {
        assert!(lenient("g3g6", &["Qg6"]));
        assert!(strict("g3g6", &["Qg6"]));
        assert!(lenient("g1h1", &["Kh1", "Qf5"]));
    }

    #[test]
    fn test_trailing_square_fallback_is_lenient_only() {
        assert!(lenient("b3b2", &["Rxb2"]));
        assert!(!strict("b3b2", &["Rxb2"]));
        assert!(lenient("h6h7", &["Qxh7+"]));
    }

    #[test]
    fn test_promotion() {
        assert!(lenient("e7e8q", &["e8"]));
        assert!(lenient("e7e8q", &["e8=Q"]));
        assert!(lenient("e7e8q", &["e8Q"]));
        assert!(lenient("d7c8q", &["dxc8=Q+"]));
        assert!(strict("e7e8q", &["e8=Q"]));
        assert!(!lenient("e7e8n", &["e8=Q"]));
        assert!(!lenient("e7e8", &["e8=Q"]));
    }

    #[test]
    fn test_castling() {
        assert!(lenient("e1g1", &["O-O"]));
        assert!(lenient("e8c8", &["O-O-O"]));
        assert!(lenient("e1g1", &["0-0"]));
        assert!(!lenient("e1c1", &["O-O"]));
        assert!(!lenient("g2g1", &["O-O"]));
    }

    #[test]
    fn test_no_match_among_several() {
        assert!(!lenient("a2a3", &["Qg6", "Rxb2", "e8=Q"]));
    }

    #[test]
    fn test_non_coordinate_engine_move_needs_exact_match() {
        assert!(!lenient("0000", &["e4"]));
        assert!(lenient("(none)", &["(none)"]));
    }
}
