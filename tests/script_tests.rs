use rehearse::script::parser::parse_script;
use rehearse::script::{opponent_line_number, Cue};

#[test]
fn test_parse_basic_line() {
    let script = parse_script("철수 : 안녕(웃음)");
    assert_eq!(script.len(), 1);
    assert_eq!(script[0].role, "철수");
    assert_eq!(script[0].text, "안녕(웃음)");
    assert!(!script[0].skip_recording);
}

#[test]
fn test_parse_stage_direction_only_line() {
    let script = parse_script("철수 : (웃음)");
    assert_eq!(script.len(), 1);
    assert!(script[0].skip_recording);
}

#[test]
fn test_first_colon_is_the_separator() {
    let script = parse_script("영희 : 말했잖아: 오늘은 안 돼");
    assert_eq!(script.len(), 1);
    assert_eq!(script[0].role, "영희");
    assert_eq!(script[0].text, "말했잖아: 오늘은 안 돼");
}

#[test]
fn test_malformed_lines_are_skipped() {
    let text = "\
철수 : 첫번째 대사

이 줄에는 구분자가 없다
 : 역할 없음
영희 :
영희 : 두번째 대사
";
    let script = parse_script(text);
    assert_eq!(script.len(), 2);
    assert_eq!(script[0].role, "철수");
    assert_eq!(script[1].role, "영희");
}

#[test]
fn test_punctuation_only_dialogue_skips_recording() {
    let script = parse_script("철수 : ...!");
    assert_eq!(script.len(), 1);
    assert!(script[0].skip_recording);

    let script = parse_script("철수 : ...a!");
    assert!(!script[0].skip_recording);
}

#[test]
fn test_opponent_line_number_skips_user_and_silent_cues() {
    let mut script = vec![
        Cue::new("A", "첫 대사"),
        Cue::new("B", "사용자 대사"),
        Cue::new("A", "(한숨)"),
        Cue::new("A", "둘째 대사"),
        Cue::new("B", "사용자 대사 둘"),
    ];
    script[2].skip_recording = true;

    // Numbering counts only A's spoken lines, in order.
    assert_eq!(opponent_line_number(&script, "B", 0), 1);
    assert_eq!(opponent_line_number(&script, "B", 1), 1);
    assert_eq!(opponent_line_number(&script, "B", 2), 1);
    assert_eq!(opponent_line_number(&script, "B", 3), 2);
    assert_eq!(opponent_line_number(&script, "B", 4), 2);
}

#[test]
fn test_cue_serde_shape() {
    // The ad-lib service speaks camelCase JSON.
    let json = r#"{"role":"철수","text":"안녕","skipRecording":true}"#;
    let cue: Cue = serde_json::from_str(json).unwrap();
    assert_eq!(cue.role, "철수");
    assert!(cue.skip_recording);
    assert!(cue.audio_url.is_none());

    let out = serde_json::to_string(&Cue::new("A", "hi")).unwrap();
    assert!(out.contains("\"skipRecording\":false"));
    assert!(!out.contains("audioUrl"));
}
