// SPDX-License-Identifier: GPL-3.0-or-later
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;
use uuid::Uuid;

// ============================================================================
// Value Objects & IDs
// ============================================================================

macro_rules! uuid_id {
    ($($name:ident),+ $(,)?) => {
        $(
            #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
            pub struct $name(pub Uuid);

            impl $name {
                pub fn new() -> Self {
                    Self(Uuid::new_v4())
                }

                pub fn from_uuid(uuid: Uuid) -> Self {
                    Self(uuid)
                }

                pub fn parse(value: &str) -> Result<Self, uuid::Error> {
                    Uuid::parse_str(value).map(Self)
                }
            }

            impl Default for $name {
                fn default() -> Self {
                    Self::new()
                }
            }

            impl std::fmt::Display for $name {
                fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                    write!(f, "{}", self.0)
                }
            }
        )+
    };
}

uuid_id!(
    MovieId,
    MovieMetadataId,
    MovieFileId,
    CollectionId,
    StudioId,
    TagId,
    ProfileId,
    ProviderId,
    CommandId,
    ExclusionId,
);

// ============================================================================
// Enums
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    Movie,
    Scene,
}

impl ItemType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Movie => "movie",
            Self::Scene => "scene",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "movie" => Some(Self::Movie),
            "scene" => Some(Self::Scene),
            _ => None,
        }
    }
}

impl std::fmt::Display for ItemType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetadataSource {
    Tmdb,
    Stash,
}

impl MetadataSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tmdb => "tmdb",
            Self::Stash => "stash",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "tmdb" => Some(Self::Tmdb),
            "stash" => Some(Self::Stash),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MovieStatus {
    Deleted,
    Tba,
    Announced,
    InCinemas,
    Released,
}

impl MovieStatus {
    /// Release progression; `Deleted` sits below everything else.
    pub fn rank(&self) -> i8 {
        match self {
            Self::Deleted => -1,
            Self::Tba => 0,
            Self::Announced => 1,
            Self::InCinemas => 2,
            Self::Released => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Deleted => "deleted",
            Self::Tba => "tba",
            Self::Announced => "announced",
            Self::InCinemas => "inCinemas",
            Self::Released => "released",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "deleted" => Some(Self::Deleted),
            "tba" => Some(Self::Tba),
            "announced" => Some(Self::Announced),
            "inCinemas" => Some(Self::InCinemas),
            "released" => Some(Self::Released),
            _ => None,
        }
    }
}

impl std::fmt::Display for MovieStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MinimumAvailability {
    Announced,
    InCinemas,
    Released,
}

impl MinimumAvailability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Announced => "announced",
            Self::InCinemas => "inCinemas",
            Self::Released => "released",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "announced" => Some(Self::Announced),
            "inCinemas" => Some(Self::InCinemas),
            "released" => Some(Self::Released),
            _ => None,
        }
    }

    fn required_status(&self) -> MovieStatus {
        match self {
            Self::Announced => MovieStatus::Announced,
            Self::InCinemas => MovieStatus::InCinemas,
            Self::Released => MovieStatus::Released,
        }
    }
}

impl Default for MinimumAvailability {
    fn default() -> Self {
        Self::Released
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ColonReplacement {
    Delete,
    Dash,
    SpaceDash,
    SpaceDashSpace,
    Smart,
}

impl ColonReplacement {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Delete => "delete",
            Self::Dash => "dash",
            Self::SpaceDash => "spaceDash",
            Self::SpaceDashSpace => "spaceDashSpace",
            Self::Smart => "smart",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "delete" => Some(Self::Delete),
            "dash" => Some(Self::Dash),
            "spaceDash" => Some(Self::SpaceDash),
            "spaceDashSpace" => Some(Self::SpaceDashSpace),
            "smart" => Some(Self::Smart),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackupType {
    Scheduled,
    Manual,
    Update,
}

impl BackupType {
    pub const ALL: [BackupType; 3] = [Self::Scheduled, Self::Manual, Self::Update];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Manual => "manual",
            Self::Update => "update",
        }
    }
}

impl std::fmt::Display for BackupType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Language {
    pub id: i32,
    pub name: String,
}

impl Language {
    const KNOWN: [(i32, &'static str, &'static str); 7] = [
        (0, "Unknown", ""),
        (1, "English", "en"),
        (2, "French", "fr"),
        (3, "Spanish", "es"),
        (4, "German", "de"),
        (5, "Italian", "it"),
        (8, "Japanese", "ja"),
    ];

    pub fn unknown() -> Self {
        Self::from_id(0)
    }

    pub fn english() -> Self {
        Self::from_id(1)
    }

    pub fn from_id(id: i32) -> Self {
        let name = Self::KNOWN
            .iter()
            .find(|(known, _, _)| *known == id)
            .map(|(_, name, _)| *name)
            .unwrap_or("Unknown");
        Self {
            id,
            name: name.to_string(),
        }
    }

    pub fn from_iso_code(code: &str) -> Self {
        Self::KNOWN
            .iter()
            .find(|(_, _, iso)| !iso.is_empty() && iso.eq_ignore_ascii_case(code))
            .map(|(id, _, _)| Self::from_id(*id))
            .unwrap_or_else(Self::unknown)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatingChild {
    pub votes: i64,
    pub value: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ratings {
    pub tmdb: Option<RatingChild>,
    pub imdb: Option<RatingChild>,
    pub rotten_tomatoes: Option<RatingChild>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaCover {
    pub cover_type: String,
    pub url: Option<String>,
    pub remote_url: Option<String>,
}

// ============================================================================
// Entities
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovieMetadata {
    pub id: MovieMetadataId,
    pub foreign_id: String,
    pub metadata_source: MetadataSource,
    pub imdb_id: Option<String>,
    pub tmdb_id: Option<i32>,
    pub stash_id: Option<String>,
    pub images: Vec<MediaCover>,
    pub genres: Vec<String>,
    pub title: String,
    pub sort_title: Option<String>,
    pub clean_title: Option<String>,
    pub original_title: Option<String>,
    pub clean_original_title: Option<String>,
    pub original_language: Language,
    pub status: MovieStatus,
    pub last_info_sync: Option<DateTime<Utc>>,
    pub runtime: i32,
    pub release_date: Option<DateTime<Utc>>,
    pub in_cinemas: Option<DateTime<Utc>>,
    pub physical_release: Option<DateTime<Utc>>,
    pub digital_release: Option<DateTime<Utc>>,
    pub year: Option<i32>,
    pub secondary_year: Option<i32>,
    pub ratings: Ratings,
    pub recommendations: Vec<i32>,
    pub certification: Option<String>,
    pub youtube_trailer_id: Option<String>,
    pub overview: Option<String>,
    pub website: Option<String>,
    pub popularity: Option<f32>,
    pub studio_title: Option<String>,
    pub studio_foreign_id: Option<String>,
    pub collection_tmdb_id: Option<i32>,
    pub collection_title: Option<String>,
    pub item_type: ItemType,
}

impl MovieMetadata {
    pub fn new(
        foreign_id: impl Into<String>,
        title: impl Into<String>,
        item_type: ItemType,
    ) -> Self {
        let title = title.into();
        Self {
            id: MovieMetadataId::new(),
            foreign_id: foreign_id.into(),
            metadata_source: match item_type {
                ItemType::Movie => MetadataSource::Tmdb,
                ItemType::Scene => MetadataSource::Stash,
            },
            imdb_id: None,
            tmdb_id: None,
            stash_id: None,
            images: Vec::new(),
            genres: Vec::new(),
            sort_title: Some(sort_title(&title)),
            clean_title: Some(clean_title(&title)),
            title,
            original_title: None,
            clean_original_title: None,
            original_language: Language::english(),
            status: MovieStatus::Tba,
            last_info_sync: None,
            runtime: 0,
            release_date: None,
            in_cinemas: None,
            physical_release: None,
            digital_release: None,
            year: None,
            secondary_year: None,
            ratings: Ratings::default(),
            recommendations: Vec::new(),
            certification: None,
            youtube_trailer_id: None,
            overview: None,
            website: None,
            popularity: None,
            studio_title: None,
            studio_foreign_id: None,
            collection_tmdb_id: None,
            collection_title: None,
            item_type,
        }
    }

    /// Recompute the derived title columns after `title` or `original_title` changed.
    pub fn refresh_derived_titles(&mut self) {
        self.sort_title = Some(sort_title(&self.title));
        self.clean_title = Some(clean_title(&self.title));
        self.clean_original_title = self.original_title.as_deref().map(clean_title);
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovieFile {
    pub id: MovieFileId,
    pub movie_id: MovieId,
    pub relative_path: String,
    pub size: i64,
    pub quality: String,
    pub release_group: Option<String>,
    pub added: DateTime<Utc>,
}

impl MovieFile {
    pub fn new(movie_id: MovieId, relative_path: impl Into<String>, size: i64) -> Self {
        Self {
            id: MovieFileId::new(),
            movie_id,
            relative_path: relative_path.into(),
            size,
            quality: "Unknown".to_string(),
            release_group: None,
            added: Utc::now(),
        }
    }

    pub fn extension(&self) -> Option<&str> {
        std::path::Path::new(&self.relative_path)
            .extension()
            .and_then(|ext| ext.to_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Movie {
    pub id: MovieId,
    pub movie_metadata_id: MovieMetadataId,
    pub monitored: bool,
    pub quality_profile_id: Option<ProfileId>,
    pub path: Option<String>,
    pub root_folder_path: Option<String>,
    pub minimum_availability: MinimumAvailability,
    pub tags: Vec<TagId>,
    pub added: DateTime<Utc>,
    pub movie_file: Option<MovieFile>,
    pub metadata: MovieMetadata,
}

impl Movie {
    pub fn new(metadata: MovieMetadata) -> Self {
        Self {
            id: MovieId::new(),
            movie_metadata_id: metadata.id,
            monitored: true,
            quality_profile_id: None,
            path: None,
            root_folder_path: None,
            minimum_availability: MinimumAvailability::default(),
            tags: Vec::new(),
            added: Utc::now(),
            movie_file: None,
            metadata,
        }
    }

    pub fn has_file(&self) -> bool {
        self.movie_file.is_some()
    }

    pub fn size_on_disk(&self) -> i64 {
        self.movie_file.as_ref().map(|f| f.size).unwrap_or(0)
    }

    /// Whether the movie should be considered obtainable at `now`.
    pub fn is_available(&self, now: DateTime<Utc>) -> bool {
        let metadata = &self.metadata;

        if metadata.item_type == ItemType::Scene {
            return metadata.release_date.map(|d| d <= now).unwrap_or(true);
        }

        if metadata.status.rank() >= self.minimum_availability.required_status().rank() {
            return true;
        }

        let released = [metadata.physical_release, metadata.digital_release]
            .into_iter()
            .flatten()
            .any(|date| date <= now);
        if released {
            return true;
        }

        // No home release announced: assume one ninety days after cinemas.
        if metadata.physical_release.is_none() && metadata.digital_release.is_none() {
            if let Some(in_cinemas) = metadata.in_cinemas {
                return in_cinemas + Duration::days(90) <= now;
            }
        }

        false
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovieCollection {
    pub id: CollectionId,
    pub tmdb_id: i32,
    pub title: String,
    pub clean_title: String,
    pub sort_title: String,
    pub overview: Option<String>,
    pub monitored: bool,
    pub quality_profile_id: Option<ProfileId>,
    pub root_folder_path: Option<String>,
    pub search_on_add: bool,
    pub minimum_availability: MinimumAvailability,
    pub tags: Vec<TagId>,
    pub images: Vec<MediaCover>,
    pub added: DateTime<Utc>,
    pub last_info_sync: Option<DateTime<Utc>>,
}

impl MovieCollection {
    pub fn new(tmdb_id: i32, title: impl Into<String>) -> Self {
        let title = title.into();
        Self {
            id: CollectionId::new(),
            tmdb_id,
            clean_title: clean_title(&title),
            sort_title: sort_title(&title),
            title,
            overview: None,
            monitored: false,
            quality_profile_id: None,
            root_folder_path: None,
            search_on_add: false,
            minimum_availability: MinimumAvailability::default(),
            tags: Vec::new(),
            images: Vec::new(),
            added: Utc::now(),
            last_info_sync: None,
        }
    }

    pub fn rename(&mut self, title: impl Into<String>) {
        self.title = title.into();
        self.clean_title = clean_title(&self.title);
        self.sort_title = sort_title(&self.title);
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Studio {
    pub id: StudioId,
    pub foreign_id: String,
    pub title: String,
    pub sort_title: String,
    pub clean_title: String,
    pub website: Option<String>,
    pub network: Option<String>,
    pub monitored: bool,
    pub quality_profile_id: Option<ProfileId>,
    pub root_folder_path: Option<String>,
    pub tags: Vec<TagId>,
    pub added: DateTime<Utc>,
}

impl Studio {
    pub fn new(foreign_id: impl Into<String>, title: impl Into<String>) -> Self {
        let title = title.into();
        Self {
            id: StudioId::new(),
            foreign_id: foreign_id.into(),
            sort_title: sort_title(&title),
            clean_title: clean_title(&title),
            title,
            website: None,
            network: None,
            monitored: false,
            quality_profile_id: None,
            root_folder_path: None,
            tags: Vec::new(),
            added: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: TagId,
    pub label: String,
}

impl Tag {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            id: TagId::new(),
            label: label.into().trim().to_lowercase(),
        }
    }
}

/// A TMDB id that list imports must never add back to the library.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportExclusion {
    pub id: ExclusionId,
    pub tmdb_id: i32,
    pub title: String,
    pub year: Option<i32>,
}

impl ImportExclusion {
    pub fn new(tmdb_id: i32, title: impl Into<String>, year: Option<i32>) -> Self {
        Self {
            id: ExclusionId::new(),
            tmdb_id,
            title: title.into(),
            year,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityProfile {
    pub id: ProfileId,
    pub name: String,
    /// Ordered from lowest to highest.
    pub allowed_qualities: Vec<String>,
    pub upgrade_allowed: bool,
    pub cutoff_quality: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl QualityProfile {
    pub fn new(name: impl Into<String>, allowed_qualities: Vec<String>) -> Self {
        let now = Utc::now();
        Self {
            id: ProfileId::new(),
            name: name.into(),
            allowed_qualities,
            upgrade_allowed: true,
            cutoff_quality: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn quality_index(&self, quality: &str) -> Option<usize> {
        self.allowed_qualities
            .iter()
            .position(|q| q.eq_ignore_ascii_case(quality))
    }

    /// True when `quality` reaches the cutoff. Without a cutoff the highest allowed quality counts.
    pub fn cutoff_met(&self, quality: &str) -> bool {
        let cutoff = match &self.cutoff_quality {
            Some(cutoff) => self.quality_index(cutoff),
            None => self.allowed_qualities.len().checked_sub(1),
        };
        match (self.quality_index(quality), cutoff) {
            (Some(current), Some(cutoff)) => current >= cutoff,
            (None, Some(_)) => false,
            (_, None) => true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamingConfig {
    pub rename_movies: bool,
    pub replace_illegal_characters: bool,
    pub colon_replacement: ColonReplacement,
    pub standard_movie_format: String,
    pub movie_folder_format: String,
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self {
            rename_movies: false,
            replace_illegal_characters: true,
            colon_replacement: ColonReplacement::Delete,
            standard_movie_format: "{Movie Title} ({Release Year}) {Quality Title}".to_string(),
            movie_folder_format: "{Movie Title} ({Release Year})".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Backup {
    pub name: String,
    pub path: String,
    pub backup_type: BackupType,
    pub size: u64,
    pub time: DateTime<Utc>,
}

// ============================================================================
// Title helpers
// ============================================================================

const ARTICLES: [&str; 3] = ["the ", "a ", "an "];

fn strip_article(lowered: &str) -> &str {
    ARTICLES
        .iter()
        .find_map(|article| lowered.strip_prefix(article))
        .unwrap_or(lowered)
}

/// Lower-cased, diacritic-free, alphanumeric-only title used for lookups.
pub fn clean_title(title: &str) -> String {
    let folded: String = title
        .nfd()
        .filter(|c| !unicode_normalization::char::is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase();
    strip_article(folded.trim())
        .chars()
        .filter(|c| c.is_alphanumeric())
        .collect()
}

/// Title used for alphabetical ordering: lower-cased with any leading article dropped.
pub fn sort_title(title: &str) -> String {
    let lowered = title.trim().to_lowercase();
    strip_article(&lowered).trim().to_string()
}

// ============================================================================
// Domain Validation
// ============================================================================

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

pub trait Validate {
    fn validate(&self) -> Result<(), Vec<ValidationError>>;
}

fn finish(errors: Vec<ValidationError>) -> Result<(), Vec<ValidationError>> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn blank_when_present(
    errors: &mut Vec<ValidationError>,
    field: &'static str,
    value: &Option<String>,
) {
    if let Some(value) = value {
        if value.trim().is_empty() {
            errors.push(ValidationError {
                field,
                message: format!("{field} cannot be empty when provided"),
            });
        }
    }
}

impl Validate for Movie {
    fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();
        if self.metadata.title.trim().is_empty() {
            errors.push(ValidationError {
                field: "title",
                message: "title cannot be empty".into(),
            });
        }
        if self.metadata.foreign_id.trim().is_empty() {
            errors.push(ValidationError {
                field: "foreign_id",
                message: "foreign id cannot be empty".into(),
            });
        }
        if self.movie_metadata_id != self.metadata.id {
            errors.push(ValidationError {
                field: "movie_metadata_id",
                message: "movie must reference its own metadata row".into(),
            });
        }
        blank_when_present(&mut errors, "path", &self.path);
        finish(errors)
    }
}

impl Validate for MovieCollection {
    fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();
        if self.title.trim().is_empty() {
            errors.push(ValidationError {
                field: "title",
                message: "title cannot be empty".into(),
            });
        }
        if self.tmdb_id <= 0 {
            errors.push(ValidationError {
                field: "tmdb_id",
                message: "tmdb id must be positive".into(),
            });
        }
        blank_when_present(&mut errors, "root_folder_path", &self.root_folder_path);
        finish(errors)
    }
}

impl Validate for Studio {
    fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();
        if self.title.trim().is_empty() {
            errors.push(ValidationError {
                field: "title",
                message: "title cannot be empty".into(),
            });
        }
        if self.foreign_id.trim().is_empty() {
            errors.push(ValidationError {
                field: "foreign_id",
                message: "foreign id cannot be empty".into(),
            });
        }
        blank_when_present(&mut errors, "root_folder_path", &self.root_folder_path);
        finish(errors)
    }
}

impl Validate for Tag {
    fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();
        if self.label.is_empty() {
            errors.push(ValidationError {
                field: "label",
                message: "label cannot be empty".into(),
            });
        }
        if self.label.chars().any(|c| !(c.is_alphanumeric() || c == '-' || c == '_')) {
            errors.push(ValidationError {
                field: "label",
                message: "label may only contain letters, digits, '-' and '_'".into(),
            });
        }
        finish(errors)
    }
}

impl Validate for ImportExclusion {
    fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();
        if self.tmdb_id <= 0 {
            errors.push(ValidationError {
                field: "tmdb_id",
                message: "tmdb id must be positive".into(),
            });
        }
        if self.title.trim().is_empty() {
            errors.push(ValidationError {
                field: "title",
                message: "title cannot be empty".into(),
            });
        }
        finish(errors)
    }
}

impl Validate for QualityProfile {
    fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();
        if self.name.trim().is_empty() {
            errors.push(ValidationError {
                field: "name",
                message: "name cannot be empty".into(),
            });
        }
        if self.allowed_qualities.is_empty() {
            errors.push(ValidationError {
                field: "allowed_qualities",
                message: "at least one quality must be allowed".into(),
            });
        }
        if let Some(cutoff) = &self.cutoff_quality {
            if self.quality_index(cutoff).is_none() {
                errors.push(ValidationError {
                    field: "cutoff_quality",
                    message: "cutoff must be one of allowed_qualities".into(),
                });
            }
        }
        finish(errors)
    }
}

impl Validate for NamingConfig {
    fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();
        if self.movie_folder_format.trim().is_empty() {
            errors.push(ValidationError {
                field: "movie_folder_format",
                message: "folder format cannot be empty".into(),
            });
        }
        if self.rename_movies && !self.standard_movie_format.to_lowercase().contains("{movie") {
            errors.push(ValidationError {
                field: "standard_movie_format",
                message: "file format must contain a movie title token".into(),
            });
        }
        finish(errors)
    }
}

// ============================================================================
// Domain Events
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainEvent<TPayload> {
    pub name: &'static str,
    pub occurred_at: DateTime<Utc>,
    pub payload: TPayload,
}

impl<TPayload> DomainEvent<TPayload> {
    pub fn new(name: &'static str, payload: TPayload) -> Self {
        Self {
            name,
            occurred_at: Utc::now(),
            payload,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionPayload {
    pub collection: MovieCollection,
}

pub type CollectionAdded = DomainEvent<CollectionPayload>;
pub type CollectionEdited = DomainEvent<CollectionPayload>;
pub type CollectionDeleted = DomainEvent<CollectionPayload>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovieUpdatedPayload {
    pub movie_id: MovieId,
    pub title: String,
    pub monitored: bool,
}

pub type MovieUpdated = DomainEvent<MovieUpdatedPayload>;
pub type MovieAdded = DomainEvent<MovieUpdatedPayload>;
pub type MovieDeleted = DomainEvent<MovieUpdatedPayload>;

#[cfg(test)]
mod tests {
    use super::*;

    fn movie_with(status: MovieStatus, minimum: MinimumAvailability) -> Movie {
        let mut metadata = MovieMetadata::new("tmdb:603", "The Matrix", ItemType::Movie);
        metadata.status = status;
        let mut movie = Movie::new(metadata);
        movie.minimum_availability = minimum;
        movie
    }

    #[test]
    fn clean_title_strips_articles_diacritics_and_punctuation() {
        assert_eq!(clean_title("The Matrix: Reloaded"), "matrixreloaded");
        assert_eq!(clean_title("Amélie"), "amelie");
        assert_eq!(clean_title("A Quiet Place, Part II"), "quietplacepartii");
        assert_eq!(clean_title("Theater"), "theater");
    }

    #[test]
    fn sort_title_keeps_words_but_drops_leading_article() {
        assert_eq!(sort_title("The Lord of the Rings"), "lord of the rings");
        assert_eq!(sort_title("  An Education "), "education");
        assert_eq!(sort_title("Alien"), "alien");
    }

    #[test]
    fn new_metadata_derives_titles_and_source() {
        let scene = MovieMetadata::new("stash:abc", "The Scene", ItemType::Scene);
        assert_eq!(scene.metadata_source, MetadataSource::Stash);
        assert_eq!(scene.clean_title.as_deref(), Some("scene"));
        assert_eq!(scene.sort_title.as_deref(), Some("scene"));
    }

    #[test]
    fn availability_follows_minimum_availability() {
        let now = Utc::now();
        assert!(movie_with(MovieStatus::Announced, MinimumAvailability::Announced).is_available(now));
        assert!(!movie_with(MovieStatus::Announced, MinimumAvailability::Released).is_available(now));
        assert!(movie_with(MovieStatus::Released, MinimumAvailability::InCinemas).is_available(now));
    }

    #[test]
    fn availability_falls_back_to_release_dates() {
        let now = Utc::now();
        let mut movie = movie_with(MovieStatus::InCinemas, MinimumAvailability::Released);
        movie.metadata.in_cinemas = Some(now - Duration::days(120));
        assert!(movie.is_available(now));

        movie.metadata.in_cinemas = Some(now - Duration::days(10));
        assert!(!movie.is_available(now));

        movie.metadata.digital_release = Some(now - Duration::days(1));
        assert!(movie.is_available(now));
    }

    #[test]
    fn scenes_are_available_once_released() {
        let now = Utc::now();
        let mut movie = Movie::new(MovieMetadata::new("stash:1", "Scene", ItemType::Scene));
        movie.metadata.release_date = Some(now + Duration::days(3));
        assert!(!movie.is_available(now));
        movie.metadata.release_date = Some(now - Duration::days(3));
        assert!(movie.is_available(now));
    }

    #[test]
    fn cutoff_uses_profile_order() {
        let mut profile = QualityProfile::new(
            "HD",
            vec!["SDTV".into(), "HDTV-720p".into(), "Bluray-1080p".into()],
        );
        profile.cutoff_quality = Some("HDTV-720p".into());
        assert!(!profile.cutoff_met("SDTV"));
        assert!(profile.cutoff_met("hdtv-720p"));
        assert!(profile.cutoff_met("Bluray-1080p"));
        assert!(!profile.cutoff_met("Remux-2160p"));

        profile.cutoff_quality = None;
        assert!(!profile.cutoff_met("HDTV-720p"));
        assert!(profile.cutoff_met("Bluray-1080p"));
    }

    #[test]
    fn quality_profile_validation_cutoff_must_be_allowed() {
        let mut qp = QualityProfile::new("Default", vec!["Bluray-1080p".into()]);
        qp.cutoff_quality = Some("DVD".into());
        let errs = qp.validate().unwrap_err();
        assert!(errs.iter().any(|e| e.field == "cutoff_quality"));
    }

    #[test]
    fn collection_root_folder_is_optional_but_not_blank() {
        let mut collection = MovieCollection::new(10, "The Matrix Collection");
        collection.monitored = true;
        assert!(collection.validate().is_ok());

        collection.root_folder_path = Some("  ".into());
        let errs = collection.validate().unwrap_err();
        assert!(errs.iter().any(|e| e.field == "root_folder_path"));

        collection.root_folder_path = Some("/movies".into());
        assert!(collection.validate().is_ok());
    }

    #[test]
    fn tag_labels_are_normalized_and_validated() {
        let tag = Tag::new("  Favourites ");
        assert_eq!(tag.label, "favourites");
        assert!(tag.validate().is_ok());
        assert!(Tag::new("no spaces").validate().is_err());
    }

    #[test]
    fn language_lookup_by_iso_code() {
        assert_eq!(Language::from_iso_code("DE").name, "German");
        assert_eq!(Language::from_iso_code("xx"), Language::unknown());
    }

    #[test]
    fn enum_string_forms_round_trip() {
        for status in [
            MovieStatus::Deleted,
            MovieStatus::Tba,
            MovieStatus::Announced,
            MovieStatus::InCinemas,
            MovieStatus::Released,
        ] {
            assert_eq!(MovieStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(ItemType::parse(" Scene "), Some(ItemType::Scene));
        assert_eq!(ColonReplacement::parse("spaceDash"), Some(ColonReplacement::SpaceDash));
    }

    #[test]
    fn import_exclusion_requires_tmdb_id_and_title() {
        assert!(ImportExclusion::new(603, "The Matrix", Some(1999)).validate().is_ok());
        let errors = ImportExclusion::new(0, " ", None).validate().unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert_eq!(fields, vec!["tmdb_id", "title"]);
    }

    #[test]
    fn collection_edited_event() {
        let collection = MovieCollection::new(131296, "Indiana Jones Collection");
        let event: CollectionEdited =
            DomainEvent::new("collection.edited", CollectionPayload { collection });
        assert_eq!(event.name, "collection.edited");
        assert_eq!(event.payload.collection.tmdb_id, 131296);
    }
}
