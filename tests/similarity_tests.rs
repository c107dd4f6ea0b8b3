use rehearse::similarity::{
    meets_main_threshold, meets_variation_threshold, normalize, similarity, MAIN_THRESHOLD,
};

#[test]
fn test_normalize_strips_parentheticals_and_symbols() {
    assert_eq!(normalize("안녕(웃음) 하세요!!"), "안녕 하세요");
    assert_eq!(normalize("  hello,   world?  "), "hello world");
    assert_eq!(normalize("(전부 지문)"), "");
}

#[test]
fn test_normalize_is_idempotent() {
    let inputs = [
        "안녕(웃음) 하세요!!",
        "  spaced   out  text ",
        "(only parens)",
        "철수 말했다: 가자...",
        "",
    ];
    for input in inputs {
        let once = normalize(input);
        assert_eq!(normalize(&once), once, "normalize not idempotent for '{input}'");
    }
}

#[test]
fn test_similarity_bounds() {
    assert_eq!(similarity("안녕하세요 반갑습니다", "안녕하세요 반갑습니다"), 1.0);
    assert_eq!(similarity("", ""), 1.0);
    assert_eq!(similarity("", "안녕하세요"), 0.0);
    assert_eq!(similarity("안녕하세요", ""), 0.0);
}

#[test]
fn test_similarity_symmetric_for_equal_lengths() {
    let a = "가나다라마바사";
    let b = "가나다라마바자";
    assert!((similarity(a, b) - similarity(b, a)).abs() < f32::EPSILON);
}

#[test]
fn test_front_bias_tolerates_trailing_divergence() {
    // Recognized text matches the first 70% of the line exactly, then
    // diverges completely.
    let expected = "abcdefghij";
    let recognized = "abcdefgzzz";
    let score = similarity(recognized, expected);
    assert!(
        score >= MAIN_THRESHOLD,
        "front-biased score {score} should pass the main threshold"
    );
}

#[test]
fn test_short_guess_is_not_rewarded() {
    let expected = "오늘은 날씨가 정말 좋네요 우리 같이 산책이나 할까요";
    let recognized = "오늘은";
    let score = similarity(recognized, expected);
    assert!(score < MAIN_THRESHOLD, "short guess scored {score}");
}

#[test]
fn test_confused_pair_gets_reduced_penalty() {
    // '어' vs '소' is in the confusion table: substitution costs 0.3.
    let score = similarity("어", "소");
    assert!((score - 0.7).abs() < 1e-6, "got {score}");

    // An unrelated pair costs the full 1.0.
    assert_eq!(similarity("가", "소"), 0.0);
}

#[test]
fn test_thresholds() {
    assert!(meets_main_threshold(0.78));
    assert!(!meets_main_threshold(0.7799));
    assert!(meets_variation_threshold(0.60));
    assert!(!meets_variation_threshold(0.5999));
}

#[test]
fn test_whitespace_differences_are_forgiven() {
    let score = similarity("안녕하세요반갑습니다", "안녕하세요 반갑습니다");
    assert!(score > 0.85, "got {score}");
}
