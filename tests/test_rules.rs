use forkparse::grammar::*;
use forkparse::{parse_bytes, parse_owned};
use forkparse::stream::{ByteSource, Cursor, InMemoryByteSource};
use proptest::prelude::*;
use rstest::rstest;
use std::io;

fn expect_ok(rule: &Rule, input: &str) -> usize {
    parse_bytes(rule, input).unwrap_or_else(|e| panic!("{input:?} should parse: {e}"))
}

fn expect_err(rule: &Rule, input: &str) -> String {
    parse_bytes(rule, input).unwrap_err().to_string()
}

// --- TESTS SINGLE RULES ---
#[rstest]
#[case("hello", None)]
#[case("hell", Some("error at offset 4 in rule 'hello'. EOF"))]
#[case("helso", Some("error at offset 3 in rule 'hello'. expected 'l' found 's'"))]
#[case("", Some("error at offset 0 in rule 'hello'. EOF"))]
fn test_literal(#[case] input: &str, #[case] expected: Option<&str>) {
    let rule = literal("hello");
    match expected {
        None => assert_eq!(expect_ok(&rule, input), 5),
        Some(message) => assert_eq!(expect_err(&rule, input), message),
    }
}

#[rstest]
#[case("hellogoodbye", None)]
#[case("hellgoodbye", Some("error at offset 4 in rule Sequence>'hello'. expected 'o' found 'g'"))]
#[case("hellogodbye", Some("error at offset 7 in rule Sequence>'goodbye'. expected 'o' found 'd'"))]
fn test_sequence(#[case] input: &str, #[case] expected: Option<&str>) {
    let rule = sequence([literal("hello"), literal("goodbye")]).unwrap();
    match expected {
        None => assert_eq!(expect_ok(&rule, input), 12),
        Some(message) => assert_eq!(expect_err(&rule, input), message),
    }
}

#[test]
fn test_sequence_error_fields() {
    let rule = sequence([literal("hello"), literal("goodbye")]).unwrap();
    let failure = parse_bytes(&rule, "hellgoodbye").unwrap_err();
    let err = failure.as_mismatch().unwrap();
    assert_eq!(err.offset(), 4);
    assert_eq!(err.rule_path(), ["Sequence", "'hello'"]);
    assert_eq!(err.message(), "expected 'o' found 'g'");
}

#[rstest]
#[case("hello", 5)]
#[case("goodbye", 7)]
fn test_choice_accepts_each_alternative(#[case] input: &str, #[case] consumed: usize) {
    let rule = choice([literal("hello"), literal("goodbye")]).unwrap();
    assert_eq!(expect_ok(&rule, input), consumed);
}

#[test]
fn test_choice_reports_deepest_failure() {
    let rule = choice([literal("hello"), literal("goodbye")]).unwrap();
    assert_eq!(expect_err(&rule, "hell"), "error at offset 4 in rule Choice>'hello'. EOF");
    assert_eq!(
        expect_err(&rule, "goodbad"),
        "error at offset 5 in rule Choice>'goodbye'. expected 'y' found 'a'"
    );
}

#[test]
fn test_choice_then_sequence_backs_up() {
    let rule = sequence([choice([literal("abx"), literal("a")]).unwrap(), literal("bc")]).unwrap();
    assert_eq!(expect_ok(&rule, "abc"), 3);
    assert_eq!(expect_ok(&rule, "abxbc"), 5);
    assert_eq!(
        expect_err(&rule, "aby"),
        "error at offset 2 in rule Sequence>'bc'. expected 'c' found 'y'"
    );
}

#[rstest]
#[case("abcabcabc", None)]
#[case("abcabcX", Some("error at offset 6 in rule AtLeast>'abc'. expected 'a' found 'X'"))]
#[case("abcaXcabc", Some("error at offset 4 in rule AtLeast>'abc'. expected 'b' found 'X'"))]
fn test_at_least(#[case] input: &str, #[case] expected: Option<&str>) {
    let rule = at_least(literal("abc"), 3);
    match expected {
        None => assert_eq!(expect_ok(&rule, input), 9),
        Some(message) => assert_eq!(expect_err(&rule, input), message),
    }
}

#[rstest]
#[case("!", 1)]
#[case("abc!", 4)]
#[case("abcabc!", 7)]
#[case("abcabcabc!", 10)]
fn test_as_many_as(#[case] input: &str, #[case] consumed: usize) {
    let rule = sequence([as_many_as(literal("abc"), 3), literal("!")]).unwrap();
    assert_eq!(expect_ok(&rule, input), consumed);
}

#[test]
fn test_as_many_as_stops_at_max() {
    let rule = sequence([as_many_as(literal("abc"), 3), literal("!")]).unwrap();
    assert_eq!(
        expect_err(&rule, "abcabcabcabc!"),
        "error at offset 9 in rule Sequence>'!'. expected '!' found 'a'"
    );
}

#[rstest]
#[case("", 0)]
#[case("abc", 3)]
#[case("abcabc", 6)]
#[case("abcabcab", 6)]
fn test_zero_or_more(#[case] input: &str, #[case] consumed: usize) {
    assert_eq!(expect_ok(&zero_or_more(literal("abc")), input), consumed);
}

#[test]
fn test_one_or_more() {
    let rule = one_or_more(literal("abc"));
    assert_eq!(expect_ok(&rule, "abc"), 3);
    assert_eq!(expect_ok(&rule, "abcabcabc"), 9);
    assert_eq!(expect_err(&rule, ""), "error at offset 0 in rule OneOrMore>'abc'. EOF");
}

#[test]
fn test_zero_or_one() {
    let rule = zero_or_one(literal("abc"));
    assert_eq!(expect_ok(&rule, ""), 0);
    assert_eq!(expect_ok(&rule, "abcabc"), 3);
}

#[test]
fn test_repeat_with_range() {
    let rule = repeat(literal("ab"), 2, Some(3)).unwrap();
    assert_eq!(expect_err(&rule, "abx"), "error at offset 2 in rule Repeat>'ab'. expected 'a' found 'x'");
    assert_eq!(expect_ok(&rule, "abab"), 4);
    assert_eq!(expect_ok(&rule, "abababab"), 6);
}

#[test]
fn test_owned_buffer_parses_like_slice() {
    let rule = sequence([literal("key"), literal("="), one_or_more(one_of_bytes(b"0123456789").unwrap())])
        .unwrap();
    let input = b"key=4711;".to_vec();
    assert_eq!(parse_bytes(&rule, &input).unwrap(), 8);
    assert_eq!(parse_owned(&rule, input).unwrap(), 8);
    assert_eq!(
        parse_owned(&rule, b"key:1".to_vec()).unwrap_err().to_string(),
        "error at offset 3 in rule Sequence>'='. expected '=' found ':'"
    );
}

#[test]
fn test_renaming() {
    let number = one_or_more(one_of_bytes(b"0123456789").unwrap()).rename("Number");
    let product = sequence([number.clone(), literal("*"), number]).unwrap().rename("Product");
    let sum = sequence([product.clone(), literal("+"), product]).unwrap().rename("Sum");

    assert_eq!(expect_ok(&sum, "33*44+1*3"), 9);
    assert_eq!(
        expect_err(&sum, "3*4+*35"),
        "error at offset 4 in rule Sum>Product>Number>{0|1|2|3|4|5|6|7|8|9}>'0'. expected '0' found '*'"
    );
}

// --- TESTS FAILURE PROPAGATION ---
/// Source that hands out `ok` bytes of 'a' and then fails.
struct BrokenSource {
    ok: usize,
}

impl ByteSource for BrokenSource {
    fn fill(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.ok == 0 {
            return Err(io::Error::new(io::ErrorKind::ConnectionReset, "peer went away"));
        }
        let n = self.ok.min(buf.len());
        buf[..n].fill(b'a');
        self.ok -= n;
        Ok(n)
    }
}

#[test]
fn test_source_failure_aborts_choice() {
    // The first alternative hits the broken source; the second would match
    // from the buffered bytes but must not be tried.
    let rule = choice([literal("aaaa"), literal("a")]).unwrap();
    let mut cursor = Cursor::open(BrokenSource { ok: 2 });
    let failure = rule.parse(&mut cursor).unwrap_err();
    assert!(matches!(failure, ParseFailure::Source(_)));
}

/// Source that hands out a single 'x' and then fails.
struct XThenFail {
    served: bool,
}

impl ByteSource for XThenFail {
    fn fill(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.served {
            return Err(io::Error::other("boom"));
        }
        self.served = true;
        buf[0] = b'x';
        Ok(1)
    }
}

#[test]
fn test_mismatch_before_source_failure_lets_choice_continue() {
    let rule = choice([literal("abc"), literal("x")]).unwrap();
    let mut cursor = Cursor::open(XThenFail { served: false });
    rule.parse(&mut cursor).unwrap();
    assert_eq!(cursor.offset().unwrap(), 1);
}

#[test]
fn test_literal_reports_mismatch_in_bytes_before_source_failure() {
    let rule = literal("xyz");
    let mut cursor = Cursor::open(XThenFail { served: false });
    let failure = rule.parse(&mut cursor).unwrap_err();
    assert!(matches!(failure, ParseFailure::Source(_)));

    let rule = literal("ab");
    let mut cursor = Cursor::open(XThenFail { served: false });
    assert_eq!(
        rule.parse(&mut cursor).unwrap_err().to_string(),
        "error at offset 0 in rule 'ab'. expected 'a' found 'x'"
    );
}

#[test]
fn test_source_failure_passes_through_repetition() {
    let rule = sequence([literal("a"), zero_or_more(literal("a"))]).unwrap();
    let mut cursor = Cursor::open(BrokenSource { ok: 3 });
    let failure = rule.parse(&mut cursor).unwrap_err();
    assert!(failure.as_mismatch().is_none());
    assert_eq!(failure.to_string(), "byte source failed: peer went away");
}

// --- PROPERTIES ---
fn shown(byte: u8) -> String {
    if byte.is_ascii_graphic() || byte == b' ' {
        (byte as char).to_string()
    } else {
        byte.escape_ascii().to_string()
    }
}

proptest! {
    #[test]
    fn literal_matches_itself(s in proptest::collection::vec(any::<u8>(), 1..24), tail in proptest::collection::vec(any::<u8>(), 0..4)) {
        let rule = literal(&s);
        let mut input = s.clone();
        input.extend_from_slice(&tail);
        prop_assert_eq!(parse_bytes(&rule, &input).unwrap(), s.len());
    }

    #[test]
    fn literal_prefix_fails_with_eof(s in proptest::collection::vec(any::<u8>(), 1..24), cut in any::<prop::sample::Index>()) {
        let len = cut.index(s.len());
        let rule = literal(&s);
        let failure = parse_bytes(&rule, &s[..len]).unwrap_err();
        let err = failure.as_mismatch().unwrap();
        prop_assert_eq!(err.offset(), len);
        prop_assert_eq!(err.message(), "EOF");
    }

    #[test]
    fn literal_alteration_fails_at_altered_byte(s in proptest::collection::vec(any::<u8>(), 1..24), at in any::<prop::sample::Index>(), delta in 1u8..=255) {
        let i = at.index(s.len());
        let mut input = s.clone();
        input[i] = input[i].wrapping_add(delta);
        let failure = parse_bytes(&literal(&s), &input).unwrap_err();
        let err = failure.as_mismatch().unwrap();
        prop_assert_eq!(err.offset(), i);
        let expected = format!("expected '{}' found '{}'", shown(s[i]), shown(input[i]));
        prop_assert_eq!(err.message(), expected.as_str());
    }

    #[test]
    fn sequence_is_associative(input in "[abc]{0,8}") {
        let (a, b, c) = (literal("a"), literal("b"), choice([literal("c"), literal("ab")]).unwrap());
        let nested = sequence([sequence([a.clone(), b.clone()]).unwrap(), c.clone()]).unwrap();
        let flat = sequence([a, b, c]).unwrap();
        prop_assert_eq!(parse_bytes(&nested, &input).ok(), parse_bytes(&flat, &input).ok());
    }

    #[test]
    fn choice_reports_max_offset(needles in proptest::collection::vec("[ab]{1,5}", 1..5), input in "[ab]{0,5}") {
        let alternatives: Vec<Rule> = needles.iter().map(literal).collect();
        let rule = choice(alternatives.clone()).unwrap();
        match parse_bytes(&rule, &input) {
            Ok(consumed) => {
                let first = needles.iter().find(|n| input.starts_with(n.as_str())).unwrap();
                prop_assert_eq!(consumed, first.len());
            }
            Err(failure) => {
                let err = failure.as_mismatch().unwrap();
                let offsets: Vec<usize> = alternatives
                    .iter()
                    .map(|r| parse_bytes(r, &input).unwrap_err().as_mismatch().unwrap().offset())
                    .collect();
                let deepest = *offsets.iter().max().unwrap();
                let first = offsets.iter().position(|&o| o == deepest).unwrap();
                prop_assert_eq!(err.offset(), deepest);
                prop_assert_eq!(&err.rule_path()[1], &alternatives[first].name());
            }
        }
    }

    #[test]
    fn bounded_repeat_is_maximal(k in 0usize..8, max in 0usize..8) {
        let input = format!("{}x", "ab".repeat(k));
        let rule = as_many_as(literal("ab"), max);
        prop_assert_eq!(parse_bytes(&rule, &input).unwrap(), 2 * k.min(max));
    }

    #[test]
    fn at_least_fails_iff_too_few(k in 0usize..6, min in 0usize..6) {
        let input = format!("{}x", "ab".repeat(k));
        let rule = at_least(literal("ab"), min);
        match parse_bytes(&rule, &input) {
            Ok(consumed) => {
                prop_assert!(k >= min);
                prop_assert_eq!(consumed, 2 * min);
            }
            Err(failure) => {
                prop_assert!(k < min);
                prop_assert_eq!(failure.as_mismatch().unwrap().offset(), 2 * k);
            }
        }
    }
}

#[test]
fn test_parse_on_shared_cursor_keeps_window_small() {
    let rule = zero_or_more(choice([literal("ab"), literal("a")]).unwrap());
    let mut cursor = Cursor::open(InMemoryByteSource::from_vec(b"ab".repeat(500)));
    rule.parse(&mut cursor).unwrap();
    assert_eq!(cursor.offset().unwrap(), 1000);
    let stats = cursor.manager().stats();
    assert_eq!(stats.live_cursors, 1);
    assert_eq!(stats.buffered, 0);
}
