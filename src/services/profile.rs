//! Member profiles: the companion record written at sign-up.
//!
//! DESIGN
//! ======
//! Profiles are keyed by the auth uid but stored under generated record ids,
//! so lookups filter the collection on `uid` oldest-first and the first match
//! wins. A
//! profile that failed to write at sign-up is created on the member's next
//! settings save.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use futures::TryStreamExt;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::format::iso_timestamp;
use super::{ServiceError, display_name_of};
use crate::session::{CompanionProfiles, Identity};
use crate::store::{Document, DocumentStore, FieldDelta, Fields, Order, collect_ordered};

pub const PROFILES: &str = "profiles";

const MAX_DISPLAY_NAME_CHARS: usize = 80;
const MAX_BIO_CHARS: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Member,
}

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Member => "member",
        }
    }

    fn parse(raw: Option<&str>) -> Option<Self> {
        match raw {
            Some("admin") => Some(Self::Admin),
            Some("member") => Some(Self::Member),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Profile {
    pub id: String,
    pub uid: String,
    pub display_name: String,
    pub email: String,
    pub role: Role,
    pub bio: String,
    pub member_since: String,
}

impl Profile {
    fn from_document(doc: &Document) -> Option<Self> {
        Some(Self {
            id: doc.id.clone(),
            uid: doc.str_field("uid")?.to_owned(),
            display_name: doc.str_field("display_name").unwrap_or_default().to_owned(),
            email: doc.str_field("email").unwrap_or_default().to_owned(),
            role: Role::parse(doc.str_field("role")).unwrap_or(Role::Member),
            bio: doc.str_field("bio").unwrap_or_default().to_owned(),
            member_since: iso_timestamp(doc.created_at),
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SettingsUpdate {
    pub display_name: Option<String>,
    pub bio: Option<String>,
}

#[derive(Clone)]
pub struct ProfileService {
    store: Arc<dyn DocumentStore>,
    admin_emails: Arc<HashSet<String>>,
}

impl ProfileService {
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>, admin_emails: HashSet<String>) -> Self {
        Self { store, admin_emails: Arc::new(admin_emails) }
    }

    #[must_use]
    pub fn role_for_email(&self, email: &str) -> Role {
        if self.admin_emails.contains(&email.trim().to_ascii_lowercase()) {
            Role::Admin
        } else {
            Role::Member
        }
    }

    pub async fn create(&self, identity: &Identity, display_name: &str) -> Result<String, ServiceError> {
        let mut fields = Fields::new();
        fields.insert("uid".into(), json!(identity.uid));
        fields.insert("display_name".into(), json!(display_name));
        fields.insert("email".into(), json!(identity.email));
        fields.insert("role".into(), json!(self.role_for_email(&identity.email).as_str()));
        fields.insert("bio".into(), json!(""));
        Ok(self.store.create_record(PROFILES, fields).await?)
    }

    pub async fn all(&self) -> Result<Vec<Profile>, ServiceError> {
        let docs = collect_ordered(self.store.as_ref(), PROFILES, &Order::oldest_first()).await?;
        let mut seen = HashSet::new();
        Ok(docs
            .iter()
            .filter_map(Profile::from_document)
            .filter(|profile| seen.insert(profile.uid.clone()))
            .collect())
    }

    /// Oldest profile recorded for `uid`.
    pub async fn find_by_uid(&self, uid: &str) -> Result<Option<Profile>, ServiceError> {
        let mut matches = self
            .store
            .query_where(PROFILES, "uid", &json!(uid), &Order::oldest_first())
            .await?;
        while let Some(doc) = matches.try_next().await? {
            if let Some(profile) = Profile::from_document(&doc) {
                return Ok(Some(profile));
            }
        }
        Ok(None)
    }

    pub async fn require(&self, uid: &str) -> Result<Profile, ServiceError> {
        self.find_by_uid(uid).await?.ok_or(ServiceError::NotFound("profile"))
    }

    /// Role recorded on the member's profile, or the configured default when
    /// no profile exists yet.
    pub async fn role_of(&self, identity: &Identity) -> Result<Role, ServiceError> {
        Ok(self
            .find_by_uid(&identity.uid)
            .await?
            .map_or_else(|| self.role_for_email(&identity.email), |p| p.role))
    }

    /// uid to display name, for resolving message participants.
    pub async fn display_names(&self) -> Result<HashMap<String, String>, ServiceError> {
        Ok(self
            .all()
            .await?
            .into_iter()
            .map(|p| (p.uid, p.display_name))
            .collect())
    }

    /// Apply a settings change, creating the profile first when it is missing.
    pub async fn update_settings(&self, identity: &Identity, update: SettingsUpdate) -> Result<Profile, ServiceError> {
        let display_name = update
            .display_name
            .map(|name| bounded("display name", &name, MAX_DISPLAY_NAME_CHARS, false))
            .transpose()?;
        let bio = update
            .bio
            .map(|bio| bounded("bio", &bio, MAX_BIO_CHARS, true))
            .transpose()?;

        let profile = match self.find_by_uid(&identity.uid).await? {
            Some(profile) => profile,
            None => {
                tracing::info!(uid = %identity.uid, "creating missing profile from settings");
                let name = display_name.clone().unwrap_or_else(|| display_name_of(identity));
                self.create(identity, &name).await?;
                self.require(&identity.uid).await?
            }
        };

        if let Some(name) = display_name {
            self.store
                .update_field(PROFILES, &profile.id, "display_name", FieldDelta::Set(json!(name)))
                .await?;
        }
        if let Some(bio) = bio {
            self.store
                .update_field(PROFILES, &profile.id, "bio", FieldDelta::Set(json!(bio)))
                .await?;
        }
        self.require(&identity.uid).await
    }

    pub async fn count(&self) -> Result<usize, ServiceError> {
        Ok(self.all().await?.len())
    }
}

fn bounded(label: &str, raw: &str, max: usize, allow_empty: bool) -> Result<String, ServiceError> {
    let value = raw.trim();
    if !allow_empty && value.is_empty() {
        return Err(ServiceError::Invalid(format!("{label} must not be empty")));
    }
    if value.chars().count() > max {
        return Err(ServiceError::Invalid(format!("{label} exceeds {max} characters")));
    }
    Ok(value.to_owned())
}

#[async_trait::async_trait]
impl CompanionProfiles for ProfileService {
    async fn create_companion_profile(&self, identity: &Identity, display_name: &str) -> Result<(), ServiceError> {
        let id = self.create(identity, display_name).await?;
        tracing::info!(uid = %identity.uid, profile_id = %id, "companion profile created");
        Ok(())
    }
}

#[cfg(test)]
#[path = "profile_test.rs"]
mod tests;
