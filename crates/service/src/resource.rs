//! The `user_profiles` resource: maps stored profiles to and from their wire
//! form and keeps the image attachment in step with the record.

use chrono::NaiveDate;
use profile_database::basic_db::SafeDatabase;
use profile_database::file_storage::FileStorage;
use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::error::{Result, ServiceError};
use crate::field::{EncodedImageField, HydratedImage, InMemoryUpload};
use crate::parser::profile::{normalize_phone_number, owns_upload, upload_to, Gender, UserProfile};

pub const RESOURCE_NAME: &str = "user_profiles";
const TABLE: &str = "user_profiles";
const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Clone, Debug)]
pub struct ResourceSettings {
    pub api_prefix: String,
    pub default_limit: usize,
    pub max_limit: usize,
    pub inline_encoding: bool,
}

impl Default for ResourceSettings {
    fn default() -> Self {
        Self {
            api_prefix: "/api/v1".to_string(),
            default_limit: 20,
            max_limit: 1000,
            inline_encoding: false,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PageMeta {
    pub limit: usize,
    pub offset: usize,
    pub total_count: usize,
    pub next: Option<String>,
    pub previous: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct Page {
    pub meta: PageMeta,
    pub objects: Vec<Value>,
}

#[derive(Clone)]
pub struct ProfileResource<D, S> {
    db: D,
    storage: S,
    image: EncodedImageField,
    settings: ResourceSettings,
}

impl<D: SafeDatabase, S: FileStorage> ProfileResource<D, S> {
    pub fn new(db: D, storage: S, settings: ResourceSettings) -> Self {
        let image = EncodedImageField::new("image").inline_encoding(settings.inline_encoding);
        Self { db, storage, image, settings }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn settings(&self) -> &ResourceSettings {
        &self.settings
    }

    pub fn list_uri(&self) -> String {
        format!("{}/{}/", self.settings.api_prefix, RESOURCE_NAME)
    }

    pub fn detail_uri(&self, id: u64) -> String {
        format!("{}{}/", self.list_uri(), id)
    }

    pub fn get(&self, id: u64) -> Result<UserProfile> {
        self.load(id)?.ok_or(ServiceError::NotFound(id))
    }

    /// Finds the profile owned by `id` by scanning records rather than by key,
    /// so a store whose keys drifted from the owner field shows up as ambiguous.
    pub fn lookup(&self, id: u64) -> Result<UserProfile> {
        let mut matches: Vec<UserProfile> = self
            .all()?
            .into_iter()
            .filter(|profile| profile.user == id)
            .collect();

        match matches.len() {
            0 => Err(ServiceError::NotFound(id)),
            1 => Ok(matches.remove(0)),
            n => Err(ServiceError::AmbiguousMatch { id, matches: n }),
        }
    }

    pub fn list(&self, limit: Option<usize>, offset: usize) -> Result<Page> {
        let limit = match limit {
            None => self.settings.default_limit,
            Some(0) => self.settings.max_limit,
            Some(limit) => limit.min(self.settings.max_limit),
        };

        let profiles = self.all()?;
        let total_count = profiles.len();

        let objects = profiles
            .iter()
            .skip(offset)
            .take(limit)
            .map(|profile| self.dehydrate(profile, None))
            .collect::<Result<Vec<_>>>()?;

        let next_offset = offset.saturating_add(limit);
        let next = (next_offset < total_count)
            .then(|| format!("{}?limit={}&offset={}", self.list_uri(), limit, next_offset));
        let previous = (offset > 0).then(|| {
            format!("{}?limit={}&offset={}", self.list_uri(), limit, offset.saturating_sub(limit))
        });

        Ok(Page {
            meta: PageMeta { limit, offset, total_count, next, previous },
            objects,
        })
    }

    pub fn create(&self, payload: &Value) -> Result<UserProfile> {
        let fields = as_object(payload)?;

        let user = match fields.get("user") {
            Some(value) => value
                .as_u64()
                .filter(|user| *user > 0)
                .ok_or_else(|| ServiceError::validation("user", "must be a positive integer"))?,
            None => return Err(ServiceError::validation("user", "this field is required")),
        };

        if self.load(user)?.is_some() {
            return Err(ServiceError::AlreadyExists(user));
        }

        let (profile, image) = self.hydrate(UserProfile::new(user), fields, false)?;
        let profile = self.commit(profile, None, image)?;

        tracing::info!(user, "created user profile");
        Ok(profile)
    }

    /// PUT when `partial` is false (creating the record if needed), PATCH
    /// otherwise. Returns the stored profile and whether it was created.
    pub fn update(&self, id: u64, payload: &Value, partial: bool) -> Result<(UserProfile, bool)> {
        let fields = as_object(payload)?;

        if let Some(user) = fields.get("user") {
            if user.as_u64() != Some(id) {
                return Err(ServiceError::validation("user", "does not match the profile being updated"));
            }
        }

        let existing = self.load(id)?;
        if partial && existing.is_none() {
            return Err(ServiceError::NotFound(id));
        }

        let created = existing.is_none();
        let previous = existing.as_ref().and_then(|profile| profile.image.clone());
        let base = existing.unwrap_or_else(|| UserProfile::new(id));

        let (profile, image) = self.hydrate(base, fields, partial)?;
        let profile = self.commit(profile, previous, image)?;

        tracing::info!(user = id, created, partial, "updated user profile");
        Ok((profile, created))
    }

    pub fn delete(&self, id: u64) -> Result<()> {
        let profile = self.get(id)?;
        self.db.delete(&id.to_string(), TABLE)?;

        if let Some(name) = profile.image.filter(|name| owns_upload(id, name)) {
            if let Err(e) = self.storage.delete(&name) {
                tracing::warn!(user = id, name = %name, error = %e, "could not delete image of removed profile");
            }
        }

        tracing::info!(user = id, "deleted user profile");
        Ok(())
    }

    /// Swaps the profile's image for `upload` and returns the new image URL.
    pub fn replace_image(&self, id: u64, upload: InMemoryUpload) -> Result<(UserProfile, String)> {
        let profile = self.lookup(id)?;
        let previous = profile.image.clone();

        let profile = self.commit(profile, previous, HydratedImage::Upload(upload))?;
        let name = profile.image.as_deref().unwrap_or_default();
        let url = self.storage.url(name)?;

        tracing::info!(user = id, name, "replaced profile image");
        Ok((profile, url))
    }

    /// Wire form of a profile. `seed` is the request payload, if any; an
    /// inline image the caller already sent is echoed instead of re-read.
    pub fn dehydrate(&self, profile: &UserProfile, seed: Option<&Value>) -> Result<Value> {
        let attribute = self.image.attribute();
        let mut bundle = Map::new();
        if let Some(supplied) = seed.and_then(|seed| seed.get(attribute)).filter(|value| value.is_object()) {
            bundle.insert(attribute.to_string(), supplied.clone());
        }

        let image = self.image.dehydrate(&self.storage, profile.image.as_deref(), &bundle)?;

        Ok(json!({
            "user": profile.user,
            "date_of_birth": profile.date_of_birth.map(|date| date.format(DATE_FORMAT).to_string()),
            "phone_number": profile.phone_number,
            "gender": profile.gender.code(),
            "image": image,
            "resource_uri": self.detail_uri(profile.user),
        }))
    }

    pub fn schema(&self) -> Value {
        let choices: Vec<[&str; 2]> = Gender::ALL
            .iter()
            .map(|gender| [gender.code(), gender.label()])
            .collect();

        let image_type = if self.image.is_inline() { "object" } else { "string" };

        json!({
            "allowed_list_http_methods": ["get", "post"],
            "allowed_detail_http_methods": ["get", "put", "patch", "delete"],
            "default_format": "application/json",
            "default_limit": self.settings.default_limit,
            "fields": {
                "user": {
                    "type": "integer", "nullable": false, "readonly": false, "unique": true,
                    "help_text": "Id of the owning user account, also the profile id."
                },
                "date_of_birth": {
                    "type": "date", "nullable": true, "readonly": false, "default": null,
                    "help_text": "A date as YYYY-MM-DD."
                },
                "phone_number": {
                    "type": "string", "nullable": false, "blank": true, "readonly": false, "default": "",
                    "help_text": "International phone number, e.g. +15550109999."
                },
                "gender": {
                    "type": "string", "nullable": false, "readonly": false,
                    "default": Gender::default().code(), "choices": choices
                },
                "image": {
                    "type": image_type, "nullable": true, "readonly": false, "default": null,
                    "help_text": "Image URL, or {name, file, content-type} with base64 file content."
                },
                "resource_uri": { "type": "string", "nullable": false, "readonly": true }
            }
        })
    }

    fn hydrate(
        &self,
        mut profile: UserProfile,
        fields: &Map<String, Value>,
        partial: bool,
    ) -> Result<(UserProfile, HydratedImage)> {
        match fields.get("date_of_birth") {
            Some(Value::Null) => profile.date_of_birth = None,
            Some(Value::String(raw)) if raw.trim().is_empty() => profile.date_of_birth = None,
            Some(Value::String(raw)) => {
                let date = NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT)
                    .map_err(|_| ServiceError::validation("date_of_birth", format!("{raw:?} is not a YYYY-MM-DD date")))?;
                profile.date_of_birth = Some(date);
            }
            Some(_) => return Err(ServiceError::validation("date_of_birth", "must be a date string")),
            None if !partial => profile.date_of_birth = None,
            None => {}
        }

        match fields.get("phone_number") {
            Some(Value::Null) => profile.phone_number.clear(),
            Some(Value::String(raw)) => {
                profile.phone_number = normalize_phone_number(raw)
                    .ok_or_else(|| ServiceError::validation("phone_number", format!("{raw:?} is not a valid phone number")))?;
            }
            Some(_) => return Err(ServiceError::validation("phone_number", "must be a string")),
            None if !partial => profile.phone_number.clear(),
            None => {}
        }

        match fields.get("gender") {
            Some(Value::String(code)) => {
                profile.gender = Gender::from_code(code)
                    .ok_or_else(|| ServiceError::validation("gender", format!("{code:?} is not one of U, M, F")))?;
            }
            Some(_) => return Err(ServiceError::validation("gender", "must be one of U, M, F")),
            None if !partial => profile.gender = Gender::default(),
            None => {}
        }

        let image = self
            .image
            .hydrate(&self.storage, profile.image.as_deref(), fields.get(self.image.attribute()))?;

        Ok((profile, image))
    }

    /// Persists `profile` with its new image. A new file is written before the
    /// record and the file it replaces is removed only after the record landed,
    /// and only when it sits in this profile's own upload directory.
    fn commit(
        &self,
        mut profile: UserProfile,
        previous: Option<String>,
        image: HydratedImage,
    ) -> Result<UserProfile> {
        let mut staged = None;

        match image {
            HydratedImage::Absent | HydratedImage::Unchanged(_) => {}
            HydratedImage::Clear => profile.image = None,
            HydratedImage::Raw(name) => profile.image = (!name.is_empty()).then_some(name),
            HydratedImage::Upload(upload) => {
                let name = self.storage.save(&upload_to(profile.user, &upload.name), &upload.data)?;
                staged = Some(name.clone());
                profile.image = Some(name);
            }
        }

        if let Err(e) = self.store(&profile) {
            if let Some(name) = staged {
                if let Err(cleanup) = self.storage.delete(&name) {
                    tracing::warn!(name = %name, error = %cleanup, "could not remove staged image");
                }
            }
            return Err(e);
        }

        let replaced = previous
            .filter(|old| profile.image.as_ref() != Some(old))
            .filter(|old| owns_upload(profile.user, old));
        if let Some(old) = replaced {
            if let Err(e) = self.storage.delete(&old) {
                tracing::warn!(user = profile.user, name = %old, error = %e, "could not delete replaced image");
            }
        }

        Ok(profile)
    }

    fn load(&self, id: u64) -> Result<Option<UserProfile>> {
        match self.db.read(&id.to_string(), TABLE)? {
            Some(data) => Ok(Some(serde_json::from_slice(&data)?)),
            None => Ok(None),
        }
    }

    fn store(&self, profile: &UserProfile) -> Result<()> {
        let profile_json = serde_json::to_string(profile)?;
        self.db.write(&profile.user.to_string(), &profile_json, TABLE)?;
        Ok(())
    }

    fn all(&self) -> Result<Vec<UserProfile>> {
        let mut profiles = self
            .db
            .read_all(TABLE)?
            .into_values()
            .map(|data| serde_json::from_slice::<UserProfile>(&data))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        profiles.sort_by_key(|profile| profile.user);
        Ok(profiles)
    }
}

fn as_object(payload: &Value) -> Result<&Map<String, Value>> {
    payload
        .as_object()
        .ok_or_else(|| ServiceError::validation("body", "must be a JSON object"))
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldError;
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use profile_database::basic_db::InnerDatabase;
    use profile_database::file_storage::LocalFileStorage;
    use tempfile::{tempdir, TempDir};

    const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\x00\x00\x00\rIHDR first";
    const PNG_2: &[u8] = b"\x89PNG\r\n\x1a\n\x00\x00\x00\rIHDR second";

    struct Fixture {
        _temp_dir: TempDir,
        resource: ProfileResource<InnerDatabase, LocalFileStorage>,
        db: InnerDatabase,
    }

    fn fixture(inline_encoding: bool) -> Fixture {
        let temp_dir = tempdir().expect("temp dir");
        let db = InnerDatabase::open(temp_dir.path().join("test_db")).expect("database");
        let storage = LocalFileStorage::new(temp_dir.path().join("media"), "http://testserver/media/");
        let settings = ResourceSettings { inline_encoding, default_limit: 2, ..Default::default() };

        Fixture {
            resource: ProfileResource::new(db.clone(), storage, settings),
            db,
            _temp_dir: temp_dir,
        }
    }

    fn png_payload(name: &str, data: &[u8]) -> Value {
        json!({"name": name, "file": STANDARD.encode(data), "content-type": "image/png"})
    }

    #[test]
    fn test_create_defaults_gender_to_unknown() -> Result<()> {
        let f = fixture(false);

        let profile = f.resource.create(&json!({"user": 1}))?;
        assert_eq!(profile.gender, Gender::Unknown);

        let wire = f.resource.dehydrate(&f.resource.get(1)?, None)?;
        assert_eq!(wire["gender"], "U");
        assert_eq!(wire["image"], Value::Null);
        assert_eq!(wire["resource_uri"], "/api/v1/user_profiles/1/");
        Ok(())
    }

    #[test]
    fn test_create_validates_fields() {
        let f = fixture(false);

        let cases = [
            (json!({}), "user"),
            (json!({"user": "seven"}), "user"),
            (json!({"user": 0}), "user"),
            (json!({"user": 1, "phone_number": "12"}), "phone_number"),
            (json!({"user": 1, "gender": "X"}), "gender"),
            (json!({"user": 1, "date_of_birth": "31/12/1990"}), "date_of_birth"),
            (json!([1, 2]), "body"),
        ];

        for (payload, expected) in cases {
            match f.resource.create(&payload) {
                Err(ServiceError::Validation { field, .. }) => assert_eq!(field, expected, "{payload}"),
                other => panic!("{payload}: expected a validation error, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_create_twice_conflicts() -> Result<()> {
        let f = fixture(false);
        f.resource.create(&json!({"user": 5}))?;

        assert!(matches!(f.resource.create(&json!({"user": 5})), Err(ServiceError::AlreadyExists(5))));
        Ok(())
    }

    #[test]
    fn test_create_with_inline_image_round_trips() -> Result<()> {
        let f = fixture(true);
        let payload = json!({
            "user": 3,
            "date_of_birth": "1990-04-01",
            "phone_number": "+44 20 7946 0958",
            "gender": "F",
            "image": png_payload("face.png", PNG),
        });

        let profile = f.resource.create(&payload)?;
        assert_eq!(profile.image.as_deref(), Some("profiles/3/face.png"));
        assert_eq!(profile.phone_number, "+442079460958");

        let wire = f.resource.dehydrate(&f.resource.get(3)?, None)?;
        assert_eq!(wire["image"], png_payload("face.png", PNG));
        assert_eq!(wire["date_of_birth"], "1990-04-01");
        Ok(())
    }

    #[test]
    fn test_dehydrate_echoes_seeded_image() -> Result<()> {
        let f = fixture(true);
        let profile = UserProfile { image: Some("profiles/9/never-written.png".to_string()), ..UserProfile::new(9) };
        let seed = json!({"image": png_payload("never-written.png", PNG)});

        let wire = f.resource.dehydrate(&profile, Some(&seed))?;
        assert_eq!(wire["image"], seed["image"]);

        assert!(matches!(
            f.resource.dehydrate(&profile, None),
            Err(ServiceError::Field(FieldError::Io { .. }))
        ));
        Ok(())
    }

    #[test]
    fn test_echoing_url_keeps_attachment() -> Result<()> {
        let f = fixture(false);
        f.resource.create(&json!({"user": 1, "image": png_payload("face.png", PNG)}))?;
        let before = f.resource.get(1)?;
        let wire = f.resource.dehydrate(&before, None)?;

        let (after, created) = f.resource.update(1, &wire, false)?;

        assert!(!created);
        assert_eq!(after.image, before.image);
        assert!(f.resource.storage().exists("profiles/1/face.png"));
        Ok(())
    }

    #[test]
    fn test_null_image_clears_and_absent_keeps() -> Result<()> {
        let f = fixture(false);
        f.resource.create(&json!({"user": 1, "image": png_payload("face.png", PNG)}))?;

        let (profile, _) = f.resource.update(1, &json!({"gender": "M"}), false)?;
        assert_eq!(profile.image.as_deref(), Some("profiles/1/face.png"));

        let (profile, _) = f.resource.update(1, &json!({"image": null}), true)?;
        assert_eq!(profile.image, None);
        assert!(!f.resource.storage().exists("profiles/1/face.png"));
        Ok(())
    }

    #[test]
    fn test_raw_string_is_stored_as_name() -> Result<()> {
        let f = fixture(false);
        f.resource.storage().save("profiles/shared/default.png", PNG)?;
        f.resource.create(&json!({"user": 1}))?;

        let (profile, _) = f.resource.update(1, &json!({"image": "profiles/shared/default.png"}), true)?;
        assert_eq!(profile.image.as_deref(), Some("profiles/shared/default.png"));

        let (profile, _) = f.resource.update(1, &json!({"image": ""}), true)?;
        assert_eq!(profile.image, None);
        assert!(f.resource.storage().exists("profiles/shared/default.png"));
        Ok(())
    }

    #[test]
    fn test_clearing_borrowed_image_keeps_owner_file() -> Result<()> {
        let f = fixture(true);
        f.resource.create(&json!({"user": 1, "image": png_payload("face.png", PNG)}))?;
        f.resource.create(&json!({"user": 2}))?;

        f.resource.update(2, &json!({"image": "profiles/1/face.png"}), true)?;
        let (profile, _) = f.resource.update(2, &json!({"image": null}), true)?;
        assert_eq!(profile.image, None);

        f.resource.update(2, &json!({"image": "profiles/1/face.png"}), true)?;
        f.resource.delete(2)?;

        assert!(f.resource.storage().exists("profiles/1/face.png"));
        let wire = f.resource.dehydrate(&f.resource.get(1)?, None)?;
        assert_eq!(wire["image"], png_payload("face.png", PNG));
        Ok(())
    }

    #[test]
    fn test_putting_inline_body_back_keeps_file() -> Result<()> {
        let f = fixture(true);
        f.resource.create(&json!({"user": 1, "image": png_payload("face.png", PNG)}))?;
        let wire = f.resource.dehydrate(&f.resource.get(1)?, None)?;

        let (profile, _) = f.resource.update(1, &wire, false)?;

        assert_eq!(profile.image.as_deref(), Some("profiles/1/face.png"));
        assert_eq!(f.resource.dehydrate(&f.resource.get(1)?, None)?, wire);
        Ok(())
    }

    #[test]
    fn test_put_creates_and_resets_fields() -> Result<()> {
        let f = fixture(false);

        let (_, created) = f.resource.update(4, &json!({"gender": "F", "phone_number": "5550109999"}), false)?;
        assert!(created);

        let (profile, created) = f.resource.update(4, &json!({"date_of_birth": "2001-02-03"}), false)?;
        assert!(!created);
        assert_eq!(profile.gender, Gender::Unknown);
        assert_eq!(profile.phone_number, "");
        assert_eq!(profile.date_of_birth, NaiveDate::from_ymd_opt(2001, 2, 3));
        Ok(())
    }

    #[test]
    fn test_patch_only_touches_present_fields() -> Result<()> {
        let f = fixture(false);
        f.resource.create(&json!({"user": 4, "gender": "F", "phone_number": "5550109999"}))?;

        let (profile, _) = f.resource.update(4, &json!({"date_of_birth": "2001-02-03"}), true)?;
        assert_eq!(profile.gender, Gender::Female);
        assert_eq!(profile.phone_number, "5550109999");

        assert!(matches!(f.resource.update(99, &json!({}), true), Err(ServiceError::NotFound(99))));
        Ok(())
    }

    #[test]
    fn test_update_rejects_other_owner() {
        let f = fixture(false);

        let result = f.resource.update(4, &json!({"user": 5}), false);
        assert!(matches!(result, Err(ServiceError::Validation { field: "user", .. })));
    }

    #[test]
    fn test_replace_image_swaps_files() -> Result<()> {
        let f = fixture(false);
        f.resource.create(&json!({"user": 2, "image": png_payload("old.png", PNG)}))?;

        let upload = InMemoryUpload {
            name: "new.png".to_string(),
            content_type: "image/png".to_string(),
            data: PNG_2.to_vec(),
        };
        let (profile, url) = f.resource.replace_image(2, upload)?;

        assert_eq!(url, "http://testserver/media/profiles/2/new.png");
        assert_eq!(f.resource.get(2)?, profile);
        assert_eq!(f.resource.storage().open("profiles/2/new.png").ok().as_deref(), Some(PNG_2));
        assert!(!f.resource.storage().exists("profiles/2/old.png"));
        Ok(())
    }

    #[test]
    fn test_replace_image_same_name_keeps_new_file() -> Result<()> {
        let f = fixture(false);
        f.resource.create(&json!({"user": 2, "image": png_payload("face.png", PNG)}))?;

        let upload = InMemoryUpload {
            name: "face.png".to_string(),
            content_type: "image/png".to_string(),
            data: PNG_2.to_vec(),
        };
        let (profile, _) = f.resource.replace_image(2, upload)?;

        let name = profile.image.unwrap_or_default();
        assert_ne!(name, "profiles/2/face.png");
        assert_eq!(f.resource.storage().open(&name).ok().as_deref(), Some(PNG_2));
        assert!(!f.resource.storage().exists("profiles/2/face.png"));
        Ok(())
    }

    #[test]
    fn test_lookup_missing_and_ambiguous() -> Result<()> {
        let f = fixture(false);
        assert!(matches!(f.resource.lookup(8), Err(ServiceError::NotFound(8))));

        let record = serde_json::to_string(&UserProfile::new(8))?;
        f.db.batch_write(&[("8", record.as_str()), ("stale-8", record.as_str())], TABLE)?;

        assert!(matches!(
            f.resource.lookup(8),
            Err(ServiceError::AmbiguousMatch { id: 8, matches: 2 })
        ));
        Ok(())
    }

    #[test]
    fn test_list_paginates() -> Result<()> {
        let f = fixture(false);
        for user in [3, 1, 2] {
            f.resource.create(&json!({"user": user}))?;
        }

        let page = f.resource.list(None, 0)?;
        assert_eq!(page.meta.total_count, 3);
        assert_eq!(page.meta.limit, 2);
        assert_eq!(page.objects.len(), 2);
        assert_eq!(page.objects[0]["user"], 1);
        assert_eq!(page.meta.next.as_deref(), Some("/api/v1/user_profiles/?limit=2&offset=2"));
        assert_eq!(page.meta.previous, None);

        let page = f.resource.list(Some(2), 2)?;
        assert_eq!(page.objects.len(), 1);
        assert_eq!(page.objects[0]["user"], 3);
        assert_eq!(page.meta.next, None);
        assert_eq!(page.meta.previous.as_deref(), Some("/api/v1/user_profiles/?limit=2&offset=0"));
        Ok(())
    }

    #[test]
    fn test_list_offset_past_the_end() -> Result<()> {
        let f = fixture(false);
        f.resource.create(&json!({"user": 1}))?;

        let page = f.resource.list(None, usize::MAX)?;
        assert!(page.objects.is_empty());
        assert_eq!(page.meta.total_count, 1);
        assert_eq!(page.meta.next, None);
        assert!(page.meta.previous.is_some());
        Ok(())
    }

    #[test]
    fn test_delete_removes_record_and_file() -> Result<()> {
        let f = fixture(false);
        f.resource.create(&json!({"user": 6, "image": png_payload("face.png", PNG)}))?;

        f.resource.delete(6)?;

        assert!(matches!(f.resource.get(6), Err(ServiceError::NotFound(6))));
        assert!(!f.resource.storage().exists("profiles/6/face.png"));
        assert!(matches!(f.resource.delete(6), Err(ServiceError::NotFound(6))));
        Ok(())
    }

    #[test]
    fn test_schema_lists_gender_choices() {
        let f = fixture(false);
        let schema = f.resource.schema();

        assert_eq!(schema["fields"]["gender"]["default"], "U");
        assert_eq!(schema["fields"]["gender"]["choices"][1], json!(["M", "male"]));
        assert_eq!(schema["fields"]["image"]["type"], "string");
    }
}
