use tb_reminders::tags::{decode_tags_from_notes, encode_tags_in_notes, TAGS_DELIMITER};

#[test]
fn tags_round_trip_through_the_notes_delimiter() {
    let encoded = encode_tags_in_notes(
        Some("Call ahead first."),
        &["#work".to_string(), "errands".to_string()],
    );
    assert!(encoded.starts_with("Call ahead first."));
    assert!(encoded.contains(TAGS_DELIMITER));

    let (notes, tags) = decode_tags_from_notes(Some(&encoded));
    assert_eq!(notes.as_deref(), Some("Call ahead first."));
    assert_eq!(tags, vec!["#work".to_string(), "#errands".to_string()]);
}

#[test]
fn user_notes_without_tags_pass_through_untouched() {
    let (notes, tags) = decode_tags_from_notes(Some("Just notes."));
    assert_eq!(notes.as_deref(), Some("Just notes."));
    assert!(tags.is_empty());

    assert_eq!(encode_tags_in_notes(Some("Just notes."), &[]), "Just notes.");
}

#[test]
fn re_encoding_replaces_the_old_tag_block() {
    let first = encode_tags_in_notes(Some("Remember the milk."), &["#a".to_string()]);
    let second = encode_tags_in_notes(Some(&first), &["#b".to_string()]);
    let (notes, tags) = decode_tags_from_notes(Some(&second));
    assert_eq!(notes.as_deref(), Some("Remember the milk."));
    assert_eq!(tags, vec!["#b".to_string()]);
}

#[test]
fn tags_without_user_notes_still_use_the_delimiter() {
    let encoded = encode_tags_in_notes(None, &["#solo".to_string()]);
    assert!(encoded.starts_with(TAGS_DELIMITER));
    let (notes, tags) = decode_tags_from_notes(Some(&encoded));
    assert_eq!(notes, None);
    assert_eq!(tags, vec!["#solo".to_string()]);
}

#[test]
fn empty_notes_decode_to_nothing() {
    let (notes, tags) = decode_tags_from_notes(None);
    assert_eq!(notes, None);
    assert!(tags.is_empty());
}
