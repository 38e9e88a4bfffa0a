//! Element ids and selectors of the Piazza pages.

use crate::browser::Locator;

pub const EMAIL_FIELD: &str = "email_field";
pub const PASSWORD_FIELD: &str = "password_field";
pub const LOGIN_ERROR: &str = "modal_error_text";

pub const CLASS_DROPDOWN: &str = "classDropdownMenuId";
pub const INACTIVE_TOGGLE: &str = "toggleInactiveNetworksId";
pub const CLASS_ENTRIES: &str = "#my_classes a[data-pats='classes_dropdown_item']";
pub const CLASS_NAME: &str = ".course_number";
/// Class entry ids look like `network_<class id>`.
pub const CLASS_ID_PREFIX: &str = "network_";

pub const RESOURCES_TAB: &str = "resources_link";
pub const RESOURCES: &str = "resources";

pub fn section_name(index: usize) -> Locator {
    Locator::Css(format!("#{} [id=\"section_name_idx{}\"]", RESOURCES, index))
}

pub fn resource_link(section: usize, index: usize) -> Locator {
    Locator::id(format!("resourceLink_idx{}_{}", section, index))
}

pub fn class_name_within(entry_id: &str) -> Locator {
    Locator::Css(format!("{} {}", Locator::id(entry_id).to_css(), CLASS_NAME))
}
