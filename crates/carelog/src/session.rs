//! Session flags for the recorder.

use serde::{Deserialize, Serialize};

/// Admin and auto-save flags for one recording session.
///
/// Built once (normally from [`crate::Config`]) and handed to the
/// [`crate::Recorder`] at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionContext {
    /// Admin mode is switched on.
    pub admin_mode: bool,
    /// The admin has authenticated.
    pub authenticated: bool,
    /// Records are saved automatically.
    pub auto_save_enabled: bool,
}

impl Default for SessionContext {
    fn default() -> Self {
        Self {
            admin_mode: false,
            authenticated: false,
            auto_save_enabled: true,
        }
    }
}

impl SessionContext {
    /// Session of an authenticated admin.
    #[must_use]
    pub fn admin() -> Self {
        Self {
            admin_mode: true,
            authenticated: true,
            auto_save_enabled: true,
        }
    }

    /// Value of `admin_created` on records written in this session.
    #[must_use]
    pub fn admin_created(&self) -> bool {
        self.admin_mode && self.authenticated
    }

    /// Value of `auto_saved` on records written in this session.
    #[must_use]
    pub fn auto_saved(&self) -> bool {
        self.auto_save_enabled && !self.admin_mode
    }

    /// Whether staff should be warned that auto-save is off.
    #[must_use]
    pub fn show_admin_warning(&self) -> bool {
        !self.auto_save_enabled && !self.admin_mode
    }

    /// Whether admin-only features (log viewer, category editor, name edits) are shown.
    #[must_use]
    pub fn admin_features(&self) -> bool {
        self.admin_mode
    }
}
