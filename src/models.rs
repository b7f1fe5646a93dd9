use crate::errors::{CommonError, Fields};

pub mod note;
pub mod user;

/// Pushes a length error for `value` when it falls outside `min..=max` characters.
pub(crate) fn check_length(
    value: &str,
    min: usize,
    max: usize,
    field: fn(CommonError) -> Fields,
    errors: &mut Vec<Fields>,
) {
    let len = value.chars().count();
    if len < min {
        errors.push(field(CommonError::TooShort));
    } else if len > max {
        errors.push(field(CommonError::TooLong));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn length_counts_characters_not_bytes() {
        let mut errors = vec![];
        check_length("ééé", 1, 3, Fields::Title, &mut errors);
        assert!(errors.is_empty());

        check_length("", 1, 3, Fields::Title, &mut errors);
        check_length("abcd", 1, 3, Fields::Content, &mut errors);
        assert_eq!(
            errors,
            vec![
                Fields::Title(CommonError::TooShort),
                Fields::Content(CommonError::TooLong)
            ]
        );
    }
}
