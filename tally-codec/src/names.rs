//! File-name validation for names that become repository paths.

use crate::error::CodecError;

/// Characters rejected in task names and fragment ids.
pub const FORBIDDEN_CHARS: [char; 9] = ['\\', '/', ':', '*', '?', '"', '<', '>', '|'];

/// Reject `name` if it contains any of [`FORBIDDEN_CHARS`].
pub fn validate_name(name: &str) -> Result<(), CodecError> {
    match name.chars().find(|c| FORBIDDEN_CHARS.contains(c)) {
        Some(character) => Err(CodecError::InvalidName {
            name: name.to_owned(),
            character,
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("Send invoice")]
    #[case("Callout__12")]
    #[case("résumé (draft) #2")]
    fn accepts_ordinary_names(#[case] name: &str) {
        assert!(validate_name(name).is_ok());
    }

    #[rstest]
    #[case("a/b", '/')]
    #[case("a\\b", '\\')]
    #[case("C:drive", ':')]
    #[case("glob*", '*')]
    #[case("what?", '?')]
    #[case("say \"hi\"", '"')]
    #[case("<tag>", '<')]
    #[case("pipe|line", '|')]
    fn rejects_forbidden_characters(#[case] name: &str, #[case] expected: char) {
        match validate_name(name) {
            Err(CodecError::InvalidName { character, .. }) => assert_eq!(character, expected),
            other => panic!("expected InvalidName, got {other:?}"),
        }
    }
}
