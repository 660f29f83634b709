//! Reply and inline keyboards for the dialog flows.

use teloxide::types::{
    InlineKeyboardButton, InlineKeyboardMarkup, KeyboardButton, KeyboardMarkup,
};

use crate::dialog::RULE_LABELS;

pub const BTN_ADD: &str = "Add reminder";
pub const BTN_LIST: &str = "List reminders";
pub const BTN_SAVE: &str = "Save";
pub const BTN_DELETE: &str = "Delete";
pub const BTN_CANCEL: &str = "Cancel";

pub const FIELD_TEXT: &str = "Text";
pub const FIELD_DATE: &str = "Date";
pub const FIELD_RULE: &str = "Cadence";
pub const FIELD_DESTINATION: &str = "Destination";

/// Callback payload on the "Edit" button under a reminder list.
pub const CB_EDIT: &str = "edit_reminders";

pub fn main_keyboard() -> KeyboardMarkup {
    KeyboardMarkup::new([
        vec![KeyboardButton::new(BTN_ADD)],
        vec![KeyboardButton::new(BTN_LIST)],
    ])
    .resize_keyboard()
}

/// One cadence per row, in menu order.
pub fn rule_keyboard() -> KeyboardMarkup {
    KeyboardMarkup::new(
        RULE_LABELS
            .iter()
            .map(|(_, label)| vec![KeyboardButton::new(*label)]),
    )
    .resize_keyboard()
    .one_time_keyboard()
}

pub fn edit_field_keyboard() -> KeyboardMarkup {
    KeyboardMarkup::new([
        vec![KeyboardButton::new(FIELD_TEXT)],
        vec![KeyboardButton::new(FIELD_DATE)],
        vec![KeyboardButton::new(FIELD_RULE)],
        vec![KeyboardButton::new(FIELD_DESTINATION)],
        vec![KeyboardButton::new(BTN_DELETE)],
    ])
    .resize_keyboard()
    .one_time_keyboard()
}

pub fn confirm_keyboard() -> KeyboardMarkup {
    KeyboardMarkup::new([vec![
        KeyboardButton::new(BTN_SAVE),
        KeyboardButton::new(BTN_DELETE),
        KeyboardButton::new(BTN_CANCEL),
    ]])
    .resize_keyboard()
    .one_time_keyboard()
}

pub fn edit_inline_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new([[InlineKeyboardButton::callback("Edit", CB_EDIT)]])
}
