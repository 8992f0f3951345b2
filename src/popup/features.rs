use crate::handler::{PopupFeatures, WindowFeatures};

/// Converts engine window features into the form handed to life-span
/// handlers. Coordinates are truncated to whole pixels.
pub fn translate_popup_features(features: &WindowFeatures) -> PopupFeatures {
    let additional_features = if features.additional_features.is_empty() {
        None
    } else {
        Some(features.additional_features.clone())
    };

    PopupFeatures {
        x: features.x as i32,
        x_set: features.x_set,
        y: features.y as i32,
        y_set: features.y_set,
        width: features.width as i32,
        width_set: features.width_set,
        height: features.height as i32,
        height_set: features.height_set,
        menu_bar_visible: features.menu_bar_visible,
        status_bar_visible: features.status_bar_visible,
        tool_bar_visible: features.tool_bar_visible,
        location_bar_visible: features.location_bar_visible,
        scrollbars_visible: features.scrollbars_visible,
        resizable: features.resizable,
        fullscreen: features.fullscreen,
        dialog: features.dialog,
        additional_features,
    }
}
