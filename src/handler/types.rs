use serde::{Deserialize, Serialize};
use url::Url;

pub const MAIN_FRAME_ID: i64 = -1;
pub const FOCUSED_FRAME_ID: i64 = -2;
pub const UNSPECIFIED_FRAME_ID: i64 = -3;
pub const INVALID_FRAME_ID: i64 = -4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum WindowOpenDisposition {
    #[default]
    Unknown,
    CurrentTab,
    SingletonTab,
    NewForegroundTab,
    NewBackgroundTab,
    NewPopup,
    NewWindow,
    SaveToDisk,
    OffTheRecord,
    IgnoreAction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum PageTransition {
    #[default]
    Link,
    Typed,
    AutoBookmark,
    AutoSubframe,
    ManualSubframe,
    FormSubmit,
    Reload,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum SettingState {
    #[default]
    Default,
    Enabled,
    Disabled,
}

/// Per-browser settings. A popup starts from its opener's settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserSettings {
    pub javascript: SettingState,
    pub javascript_open_windows: SettingState,
    pub javascript_access_clipboard: SettingState,
    pub plugins: SettingState,
    pub web_security: SettingState,
    pub image_loading: SettingState,
    pub local_storage: SettingState,
    pub databases: SettingState,
    pub default_encoding: Option<String>,
    pub background_color: u32,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            javascript: SettingState::Default,
            javascript_open_windows: SettingState::Default,
            javascript_access_clipboard: SettingState::Default,
            plugins: SettingState::Default,
            web_security: SettingState::Default,
            image_loading: SettingState::Default,
            local_storage: SettingState::Default,
            databases: SettingState::Default,
            default_encoding: None,
            background_color: 0xFFFF_FFFF,
        }
    }
}

/// Placement of a new top-level window. `None` leaves the choice to the
/// platform.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WindowInfo {
    pub x: Option<i32>,
    pub y: Option<i32>,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub window_name: String,
    pub as_popup: bool,
    pub parent_window: Option<u64>,
}

impl WindowInfo {
    pub fn popup(window_name: impl Into<String>) -> Self {
        Self {
            window_name: window_name.into(),
            as_popup: true,
            ..Default::default()
        }
    }
}

/// Window features as reported by the engine for a `window.open` call.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WindowFeatures {
    pub x: f32,
    pub x_set: bool,
    pub y: f32,
    pub y_set: bool,
    pub width: f32,
    pub width_set: bool,
    pub height: f32,
    pub height_set: bool,
    pub menu_bar_visible: bool,
    pub status_bar_visible: bool,
    pub tool_bar_visible: bool,
    pub location_bar_visible: bool,
    pub scrollbars_visible: bool,
    pub resizable: bool,
    pub fullscreen: bool,
    pub dialog: bool,
    pub additional_features: Vec<String>,
}

/// Window features as presented to a [`super::LifeSpanHandler`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PopupFeatures {
    pub x: i32,
    pub x_set: bool,
    pub y: i32,
    pub y_set: bool,
    pub width: i32,
    pub width_set: bool,
    pub height: i32,
    pub height_set: bool,
    pub menu_bar_visible: bool,
    pub status_bar_visible: bool,
    pub tool_bar_visible: bool,
    pub location_bar_visible: bool,
    pub scrollbars_visible: bool,
    pub resizable: bool,
    pub fullscreen: bool,
    pub dialog: bool,
    pub additional_features: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub id: i64,
    pub is_main: bool,
    pub name: String,
    pub url: Option<Url>,
    pub parent_id: Option<i64>,
}

impl Frame {
    /// Placeholder for a subframe the engine has not created yet.
    pub fn temporary(parent_id: i64) -> Self {
        Self {
            id: INVALID_FRAME_ID,
            is_main: false,
            name: String::new(),
            url: None,
            parent_id: Some(parent_id),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.id >= 0 || self.id == MAIN_FRAME_ID
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenUrlParams {
    pub url: Url,
    pub referrer: Option<Url>,
    pub disposition: WindowOpenDisposition,
    pub transition: PageTransition,
    pub is_renderer_initiated: bool,
    pub user_gesture: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceType {
    MainFrame,
    SubFrame,
    Stylesheet,
    Script,
    Image,
    FontResource,
    SubResource,
    Object,
    Media,
    Worker,
    SharedWorker,
    Prefetch,
    Favicon,
    Xhr,
    Ping,
    ServiceWorker,
    CspReport,
    PluginResource,
}

/// Certificate error codes, using the engine's numeric values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CertError {
    CommonNameInvalid,
    DateInvalid,
    AuthorityInvalid,
    NoRevocationMechanism,
    UnableToCheckRevocation,
    Revoked,
    Invalid,
    WeakSignatureAlgorithm,
    NonUniqueName,
    WeakKey,
    NameConstraintViolation,
    ValidityTooLong,
    Other(i32),
}

impl CertError {
    pub fn from_code(code: i32) -> Self {
        match code {
            -200 => CertError::CommonNameInvalid,
            -201 => CertError::DateInvalid,
            -202 => CertError::AuthorityInvalid,
            -204 => CertError::NoRevocationMechanism,
            -205 => CertError::UnableToCheckRevocation,
            -206 => CertError::Revoked,
            -207 => CertError::Invalid,
            -208 => CertError::WeakSignatureAlgorithm,
            -210 => CertError::NonUniqueName,
            -211 => CertError::WeakKey,
            -212 => CertError::NameConstraintViolation,
            -213 => CertError::ValidityTooLong,
            other => CertError::Other(other),
        }
    }

    pub fn code(&self) -> i32 {
        match self {
            CertError::CommonNameInvalid => -200,
            CertError::DateInvalid => -201,
            CertError::AuthorityInvalid => -202,
            CertError::NoRevocationMechanism => -204,
            CertError::UnableToCheckRevocation => -205,
            CertError::Revoked => -206,
            CertError::Invalid => -207,
            CertError::WeakSignatureAlgorithm => -208,
            CertError::NonUniqueName => -210,
            CertError::WeakKey => -211,
            CertError::NameConstraintViolation => -212,
            CertError::ValidityTooLong => -213,
            CertError::Other(code) => *code,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SslInfo {
    pub cert_status: u32,
    pub subject_name: String,
    pub issuer_name: String,
    pub serial_number: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientCertificate {
    pub subject_name: String,
    pub issuer_name: String,
    pub der: Vec<u8>,
}
