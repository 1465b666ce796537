use crate::auth::secrets::OTP_LENGTH;

/// Six single-digit slots plus the index of the slot that holds focus.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OtpForm {
    digits: [Option<char>; OTP_LENGTH],
    focus: usize,
}

impl OtpForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn focus(&self) -> usize {
        self.focus
    }

    pub fn slot(&self, index: usize) -> Option<char> {
        self.digits.get(index).copied().flatten()
    }

    /// Handles a change event on slot `index`. Only the first character of
    /// `value` is considered and anything but an ASCII digit leaves the form
    /// untouched. An empty value clears the slot.
    pub fn input(&mut self, index: usize, value: &str) {
        if index >= OTP_LENGTH {
            return;
        }
        match value.chars().next() {
            None => self.digits[index] = None,
            Some(c) if c.is_ascii_digit() => {
                self.digits[index] = Some(c);
                self.focus = (index + 1).min(OTP_LENGTH - 1);
            }
            Some(_) => {}
        }
    }

    /// Backspace on an empty slot moves focus to the previous one.
    pub fn backspace(&mut self, index: usize) {
        if index > 0 && index < OTP_LENGTH && self.digits[index].is_none() {
            self.focus = index - 1;
        }
    }

    pub fn paste(&mut self, text: &str) {
        let pasted: Vec<char> = text.chars().take(OTP_LENGTH).collect();
        if pasted.is_empty() || !pasted.iter().all(char::is_ascii_digit) {
            return;
        }
        for (slot, c) in self.digits.iter_mut().zip(pasted) {
            *slot = Some(c);
        }
    }

    pub fn can_submit(&self) -> bool {
        self.digits.iter().all(Option::is_some)
    }

    pub fn code(&self) -> String {
        self.digits.iter().flatten().collect()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digits_advance_focus() {
        let mut form = OtpForm::new();
        form.input(0, "4");
        assert_eq!(form.focus(), 1);
        form.input(1, "27");
        assert_eq!(form.slot(1), Some('2'));
        assert_eq!(form.focus(), 2);

        form.input(5, "9");
        assert_eq!(form.focus(), 5);
    }

    #[test]
    fn last_slot_keeps_focus_on_itself() {
        let mut form = OtpForm::new();
        form.input(5, "3");
        assert_eq!(form.focus(), 5);
        form.input(4, "2");
        assert_eq!(form.focus(), 5);
    }

    #[test]
    fn non_digits_are_ignored() {
        let mut form = OtpForm::new();
        form.input(0, "a");
        form.input(1, " 1");
        assert_eq!(form, OtpForm::new());
    }

    #[test]
    fn empty_input_clears_without_moving() {
        let mut form = OtpForm::new();
        form.input(0, "1");
        form.input(0, "");
        assert_eq!(form.slot(0), None);
        assert_eq!(form.focus(), 1);
    }

    #[test]
    fn backspace_retreats_only_from_empty_slot() {
        let mut form = OtpForm::new();
        form.input(0, "1");
        form.input(1, "2");
        form.backspace(2);
        assert_eq!(form.focus(), 1);

        form.backspace(1);
        assert_eq!(form.focus(), 1);

        form.backspace(0);
        assert_eq!(form.focus(), 1);
    }

    #[test]
    fn paste_fills_leading_slots() {
        let mut form = OtpForm::new();
        form.paste("4829137");
        assert!(form.can_submit());
        assert_eq!(form.code(), "482913");

        let mut partial = OtpForm::new();
        partial.input(5, "0");
        partial.paste("123");
        assert_eq!(partial.code(), "1230");
        assert!(!partial.can_submit());
    }

    #[test]
    fn paste_with_non_digits_is_rejected() {
        let mut form = OtpForm::new();
        form.paste("12a456");
        form.paste("");
        assert_eq!(form.code(), "");
    }

    #[test]
    fn clear_resets_everything() {
        let mut form = OtpForm::new();
        form.paste("123456");
        form.clear();
        assert!(!form.can_submit());
        assert_eq!(form.focus(), 0);
    }
}
