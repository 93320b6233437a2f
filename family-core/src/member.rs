//! Member records and the payloads used to create and edit them.

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

/// Identifier of a member within a store.
///
/// Serialized as a plain integer. Deserialization also accepts numeric
/// strings, since JSON object keys and older saves carry ids as text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct MemberId(u64);

impl MemberId {
    /// Wrap a raw id value.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw id value.
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for MemberId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

impl From<u64> for MemberId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

struct MemberIdVisitor;

impl Visitor<'_> for MemberIdVisitor {
    type Value = MemberId;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a non-negative integer id or a numeric string")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<MemberId, E> {
        Ok(MemberId(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<MemberId, E> {
        u64::try_from(v)
            .map(MemberId)
            .map_err(|_| E::custom(format!("negative member id {v}")))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<MemberId, E> {
        if v.fract() == 0.0 && v >= 0.0 && v < u64::MAX as f64 {
            Ok(MemberId(v as u64))
        } else {
            Err(E::custom(format!("member id {v} is not a whole number")))
        }
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<MemberId, E> {
        v.parse()
            .map_err(|_| E::custom(format!("member id {v:?} is not numeric")))
    }
}

impl<'de> Deserialize<'de> for MemberId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(MemberIdVisitor)
    }
}

/// Gender of a member. Only used for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum Gender {
    Male,
    Female,
    #[default]
    Other,
}

impl Gender {
    /// Get the display name for this gender.
    pub fn name(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Other => "other",
        }
    }

    /// Single-character marker used by text renderers.
    pub fn symbol(&self) -> char {
        match self {
            Gender::Male => '♂',
            Gender::Female => '♀',
            Gender::Other => '⚥',
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error for a gender string that is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown gender {0:?} (expected male, female or other)")]
pub struct ParseGenderError(pub String);

impl FromStr for Gender {
    type Err = ParseGenderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "male" | "m" => Ok(Gender::Male),
            "female" | "f" => Ok(Gender::Female),
            "other" | "o" => Ok(Gender::Other),
            _ => Err(ParseGenderError(s.to_string())),
        }
    }
}

// Saved data is lenient: anything unrecognised reads as `Other`.
impl From<String> for Gender {
    fn from(s: String) -> Self {
        s.parse().unwrap_or_default()
    }
}

/// One person in the family graph.
///
/// Relationship fields (`spouse_id`, `parents`, `children`) are owned by
/// [`FamilyStore`](crate::store::FamilyStore); the store only ever hands out
/// shared references, so they change exclusively through its mutation
/// methods.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    /// Unique identifier, assigned by the store.
    pub id: MemberId,
    /// Display name.
    pub name: String,
    #[serde(default)]
    pub gender: Gender,
    /// The member's spouse, if any. Always mirrored on the spouse's record.
    #[serde(default)]
    pub spouse_id: Option<MemberId>,
    /// Zero, one or two parents.
    #[serde(default)]
    pub parents: Vec<MemberId>,
    /// Inverse of `parents` across the store.
    #[serde(default)]
    pub children: Vec<MemberId>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub social_media: Option<String>,
    #[serde(default)]
    pub description: String,
    /// Date of birth, kept as entered.
    #[serde(default)]
    pub dob: Option<String>,
    /// Date of death, kept as entered.
    #[serde(default)]
    pub dod: Option<String>,
}

impl Member {
    pub(crate) fn from_new(id: MemberId, new: NewMember) -> Self {
        Self {
            id,
            name: new.name,
            gender: new.gender,
            spouse_id: None,
            parents: Vec::new(),
            children: Vec::new(),
            image_url: new.image_url,
            social_media: new.social_media,
            description: new.description,
            dob: new.dob,
            dod: new.dod,
        }
    }

    /// Check whether this member has any recorded parents.
    pub fn has_parents(&self) -> bool {
        !self.parents.is_empty()
    }

    /// Check if a query partially matches the name (case-insensitive).
    pub fn matches_partial(&self, query: &str) -> bool {
        self.name.to_lowercase().contains(&query.to_lowercase())
    }

    /// Remove every reference to `id` from this member's relationship fields.
    pub(crate) fn unlink(&mut self, id: MemberId) {
        if self.spouse_id == Some(id) {
            self.spouse_id = None;
        }
        self.parents.retain(|p| *p != id);
        self.children.retain(|c| *c != id);
    }
}

/// Payload for creating a member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMember {
    pub name: String,
    pub gender: Gender,
    pub image_url: Option<String>,
    pub social_media: Option<String>,
    pub description: String,
    pub dob: Option<String>,
    pub dod: Option<String>,
}

impl NewMember {
    /// Create a payload with the required fields and empty optionals.
    pub fn new(name: impl Into<String>, gender: Gender) -> Self {
        Self {
            name: name.into(),
            gender,
            image_url: None,
            social_media: None,
            description: String::new(),
            dob: None,
            dod: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_dob(mut self, dob: impl Into<String>) -> Self {
        self.dob = Some(dob.into());
        self
    }

    pub fn with_dod(mut self, dod: impl Into<String>) -> Self {
        self.dod = Some(dod.into());
        self
    }

    pub fn with_image_url(mut self, url: impl Into<String>) -> Self {
        self.image_url = Some(url.into());
        self
    }

    pub fn with_social_media(mut self, url: impl Into<String>) -> Self {
        self.social_media = Some(url.into());
        self
    }
}

/// A shallow, field-level edit of a member.
///
/// Only descriptive fields can be patched. `None` leaves a field as it is;
/// for nullable fields `Some(None)` clears the value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemberPatch {
    pub name: Option<String>,
    pub gender: Option<Gender>,
    pub image_url: Option<Option<String>>,
    pub social_media: Option<Option<String>>,
    pub description: Option<String>,
    pub dob: Option<Option<String>>,
    pub dod: Option<Option<String>>,
}

impl MemberPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn gender(mut self, gender: Gender) -> Self {
        self.gender = Some(gender);
        self
    }

    pub fn image_url(mut self, url: Option<String>) -> Self {
        self.image_url = Some(url);
        self
    }

    pub fn social_media(mut self, url: Option<String>) -> Self {
        self.social_media = Some(url);
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn dob(mut self, dob: Option<String>) -> Self {
        self.dob = Some(dob);
        self
    }

    pub fn dod(mut self, dod: Option<String>) -> Self {
        self.dod = Some(dod);
        self
    }

    /// True when the patch would not change anything.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Overwrite the fields present in this patch.
    pub(crate) fn apply(self, member: &mut Member) {
        if let Some(name) = self.name {
            member.name = name;
        }
        if let Some(gender) = self.gender {
            member.gender = gender;
        }
        if let Some(url) = self.image_url {
            member.image_url = url;
        }
        if let Some(url) = self.social_media {
            member.social_media = url;
        }
        if let Some(description) = self.description {
            member.description = description;
        }
        if let Some(dob) = self.dob {
            member.dob = dob;
        }
        if let Some(dod) = self.dod {
            member.dod = dod;
        }
    }
}

/// Relationship to establish when a member is added.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Attachment {
    /// No link; the member starts a new branch.
    #[default]
    Root,
    /// Marry the new member to an existing one.
    Spouse(MemberId),
    /// Make the new member a child of an existing one (and of their spouse).
    Child(MemberId),
}

impl Attachment {
    /// The existing member this attachment refers to, if any.
    pub fn target(&self) -> Option<MemberId> {
        match self {
            Attachment::Root => None,
            Attachment::Spouse(id) | Attachment::Child(id) => Some(*id),
        }
    }
}
