use std::sync::{Mutex, MutexGuard};

use super::{Lifecycle, ViewContext};
use crate::api::models::{ProfileUpdate, Upload, User};
use crate::error::{ClientError, ClientResult};

pub const UPDATE_SUCCEEDED: &str = "Profile updated successfully!";
pub const UPDATE_FAILED: &str = "Failed to update profile";

/// Editable copy of the viewer's profile.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileForm {
    pub username: String,
    pub email: String,
    pub bio: String,
    pub location: String,
    pub phone: String,
    pub website: String,
    pub gender: String,
    pub birthdate: String,
    pub profile_picture: Option<Upload>,
    pub cover_photo: Option<Upload>,
}

impl ProfileForm {
    pub fn from_user(user: &User) -> Self {
        let field = |value: &Option<String>| value.clone().unwrap_or_default();
        Self {
            username: user.username.clone(),
            email: field(&user.email),
            bio: field(&user.bio),
            location: field(&user.location),
            phone: field(&user.phone),
            website: field(&user.website),
            gender: field(&user.gender),
            birthdate: field(&user.birthdate),
            profile_picture: None,
            cover_photo: None,
        }
    }

    /// Every text field is sent, blank or not; images only when chosen.
    pub fn to_update(&self) -> ProfileUpdate {
        ProfileUpdate {
            username: Some(self.username.clone()),
            email: Some(self.email.clone()),
            bio: Some(self.bio.clone()),
            location: Some(self.location.clone()),
            phone: Some(self.phone.clone()),
            website: Some(self.website.clone()),
            gender: Some(self.gender.clone()),
            birthdate: Some(self.birthdate.clone()),
            profile_picture: self.profile_picture.clone(),
            cover_photo: self.cover_photo.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Feedback {
    Success(String),
    Error(String),
}

impl Feedback {
    pub fn message(&self) -> &str {
        match self {
            Feedback::Success(msg) | Feedback::Error(msg) => msg,
        }
    }
}

struct SettingsState {
    form: ProfileForm,
    feedback: Option<Feedback>,
    saving: bool,
}

/// Profile settings form backed by the session user.
pub struct SettingsView {
    ctx: ViewContext,
    lifecycle: Lifecycle,
    state: Mutex<SettingsState>,
}

impl SettingsView {
    /// Seed the form from the signed-in user, or blank when signed out.
    pub fn new(ctx: ViewContext) -> Self {
        let form = ctx
            .session()
            .current_user()
            .map(|u| ProfileForm::from_user(&u))
            .unwrap_or_default();
        Self {
            ctx,
            lifecycle: Lifecycle::new(),
            state: Mutex::new(SettingsState {
                form,
                feedback: None,
                saving: false,
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, SettingsState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn form(&self) -> ProfileForm {
        self.state().form.clone()
    }

    pub fn edit(&self, apply: impl FnOnce(&mut ProfileForm)) {
        apply(&mut self.state().form);
    }

    pub fn feedback(&self) -> Option<Feedback> {
        self.state().feedback.clone()
    }

    pub fn is_saving(&self) -> bool {
        self.state().saving
    }

    pub async fn save(&self) -> ClientResult<User> {
        let update = {
            let mut state = self.state();
            if state.saving {
                return Err(ClientError::Validation("Already saving".to_string()));
            }
            state.saving = true;
            state.form.to_update()
        };

        let result = self.ctx.sessions().update_profile(update).await;

        if self.lifecycle.is_disposed() {
            return result;
        }

        let mut state = self.state();
        state.saving = false;
        match &result {
            Ok(user) => {
                state.form = ProfileForm::from_user(user);
                state.feedback = Some(Feedback::Success(UPDATE_SUCCEEDED.to_string()));
            }
            Err(e) => {
                tracing::error!("Profile update failed: {}", e);
                state.feedback = Some(Feedback::Error(UPDATE_FAILED.to_string()));
            }
        }
        result
    }

    pub fn dispose(&self) {
        self.lifecycle.dispose();
    }
}
