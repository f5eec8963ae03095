// SPDX-License-Identifier: GPL-3.0-or-later
//! Folder and file names built from the naming formats, plus rename previews
//! and the on-disk rename that follows them.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use lazy_static::lazy_static;
use marquee_domain::{
    ColonReplacement, Movie, MovieFile, MovieFileId, MovieId, NamingConfig, StudioId,
};
use marquee_infrastructure::repositories::{
    MovieFileRepository, MovieRepository, NamingConfigRepository, Repository, StudioRepository,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

lazy_static! {
    static ref TOKEN_REGEX: Regex = Regex::new(r"\{([^{}]+)\}").expect("valid token regex");
    static ref EMPTY_GROUP_REGEX: Regex =
        Regex::new(r"\(\s*\)|\[\s*\]|\{\s*\}").expect("valid empty group regex");
    static ref DASH_RUN_REGEX: Regex =
        Regex::new(r"\s*-(?:\s*-)+\s*").expect("valid dash run regex");
    static ref SPACE_RUN_REGEX: Regex = Regex::new(r"\s{2,}").expect("valid space run regex");
}

const ILLEGAL_CHARACTERS: [char; 8] = ['\\', '/', '<', '>', '?', '*', '|', '"'];
const TRIM_CHARACTERS: [char; 4] = [' ', '-', '.', '_'];

#[derive(Debug, Error)]
pub enum NamingError {
    #[error("naming format is empty")]
    EmptyFormat,
    #[error("format produced an empty name for {0}")]
    EmptyName(String),
    #[error("movie {0} has no path")]
    MissingMoviePath(MovieId),
    #[error("movie {0} not found")]
    MovieNotFound(MovieId),
    #[error("studio {0} not found")]
    StudioNotFound(StudioId),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Repository(#[from] anyhow::Error),
}

/// Renders naming formats for one naming configuration.
#[derive(Debug, Clone)]
pub struct FileNameBuilder {
    config: NamingConfig,
}

fn token_key(token: &str) -> String {
    token
        .chars()
        .filter(|c| !matches!(c, ' ' | '.' | '_' | '-'))
        .flat_map(char::to_lowercase)
        .collect()
}

/// "The Matrix" -> "Matrix, The"
fn title_the(title: &str) -> String {
    for article in ["The", "A", "An"] {
        if let Some(rest) = title.strip_prefix(article).and_then(|r| r.strip_prefix(' ')) {
            return format!("{}, {article}", rest.trim());
        }
    }
    title.to_string()
}

fn clean_title_token(title: &str) -> String {
    let replaced = title.replace('&', "and");
    let kept: String = replaced
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace() || *c == '-')
        .collect();
    kept.split_whitespace().collect::<Vec<_>>().join(" ")
}

impl FileNameBuilder {
    pub fn new(config: NamingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &NamingConfig {
        &self.config
    }

    fn replace_colons(&self, value: &str) -> String {
        match self.config.colon_replacement {
            ColonReplacement::Delete => value.replace(':', ""),
            ColonReplacement::Dash => value.replace(':', "-"),
            ColonReplacement::SpaceDash => value.replace(':', " -"),
            ColonReplacement::SpaceDashSpace => value.replace(':', " - "),
            ColonReplacement::Smart => value.replace(": ", " - ").replace(':', "-"),
        }
    }

    /// Illegal path characters get a readable substitute when replacement is
    /// enabled, otherwise they are dropped.
    fn replace_illegal(&self, value: &str) -> String {
        value
            .chars()
            .filter_map(|c| {
                if !ILLEGAL_CHARACTERS.contains(&c) {
                    return Some(c);
                }
                if !self.config.replace_illegal_characters {
                    return None;
                }
                match c {
                    '"' => Some('\''),
                    '/' | '\\' => Some('+'),
                    '|' => Some('-'),
                    _ => None,
                }
            })
            .collect()
    }

    fn token_value(&self, key: &str, movie: &Movie, file: Option<&MovieFile>) -> Option<String> {
        let metadata = &movie.metadata;
        let value = match key {
            "movietitle" => Some(metadata.title.clone()),
            "movietitlethe" => Some(title_the(&metadata.title)),
            "moviecleantitle" => Some(clean_title_token(&metadata.title)),
            "movieoriginaltitle" => Some(
                metadata
                    .original_title
                    .clone()
                    .unwrap_or_else(|| metadata.title.clone()),
            ),
            "releaseyear" => metadata.year.map(|y| y.to_string()),
            "releasedate" => metadata
                .release_date
                .or(metadata.in_cinemas)
                .map(|d| d.format("%Y-%m-%d").to_string()),
            "studio" => metadata.studio_title.clone(),
            "tmdbid" => metadata.tmdb_id.map(|id| id.to_string()),
            "imdbid" => metadata.imdb_id.clone(),
            "qualitytitle" => file.map(|f| f.quality.clone()),
            "releasegroup" => file.and_then(|f| f.release_group.clone()),
            _ => None,
        }?;
        Some(self.replace_illegal(&self.replace_colons(&value)))
    }

    fn render(&self, format: &str, movie: &Movie, file: Option<&MovieFile>) -> Result<String, NamingError> {
        if format.trim().is_empty() {
            return Err(NamingError::EmptyFormat);
        }
        let rendered = TOKEN_REGEX.replace_all(format, |caps: &regex::Captures<'_>| {
            let key = token_key(&caps[1]);
            self.token_value(&key, movie, file).unwrap_or_default()
        });

        let mut name = rendered.into_owned();
        // Nested groups can empty out their parent, so repeat until stable.
        loop {
            let next = EMPTY_GROUP_REGEX.replace_all(&name, "").into_owned();
            if next == name {
                break;
            }
            name = next;
        }
        let name = DASH_RUN_REGEX.replace_all(&name, " - ");
        let name = SPACE_RUN_REGEX.replace_all(&name, " ");
        let name = name.trim_matches(|c| TRIM_CHARACTERS.contains(&c)).to_string();

        if name.is_empty() {
            return Err(NamingError::EmptyName(movie.metadata.title.clone()));
        }
        Ok(name)
    }

    pub fn build_movie_folder(&self, movie: &Movie) -> Result<String, NamingError> {
        self.render(&self.config.movie_folder_format, movie, None)
    }

    /// File name including the extension. Without renaming enabled the
    /// current name is kept.
    pub fn build_file_name(&self, movie: &Movie, file: &MovieFile) -> Result<String, NamingError> {
        let current = Path::new(&file.relative_path);
        if !self.config.rename_movies {
            return Ok(current
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| file.relative_path.clone()));
        }
        let stem = self.render(&self.config.standard_movie_format, movie, Some(file))?;
        Ok(match file.extension() {
            Some(ext) => format!("{stem}.{ext}"),
            None => stem,
        })
    }

    /// Relative path the file should have inside its movie folder.
    pub fn build_relative_path(&self, movie: &Movie, file: &MovieFile) -> Result<String, NamingError> {
        let name = self.build_file_name(movie, file)?;
        let parent = Path::new(&file.relative_path)
            .parent()
            .filter(|p| !p.as_os_str().is_empty());
        Ok(match parent {
            Some(parent) => format!("{}/{name}", parent.to_string_lossy().replace('\\', "/")),
            None => name,
        })
    }

    /// Folder a movie lives in: its own path, or the built folder under its root.
    pub fn movie_path(&self, movie: &Movie) -> Result<Option<PathBuf>, NamingError> {
        if let Some(path) = movie.path.as_deref().filter(|p| !p.trim().is_empty()) {
            return Ok(Some(PathBuf::from(path)));
        }
        match movie.root_folder_path.as_deref().filter(|p| !p.trim().is_empty()) {
            Some(root) => Ok(Some(Path::new(root).join(self.build_movie_folder(movie)?))),
            None => Ok(None),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenamePreview {
    pub movie_id: MovieId,
    pub movie_file_id: MovieFileId,
    pub existing_path: String,
    pub new_path: String,
}

#[derive(Clone)]
pub struct RenameService {
    movies: Arc<dyn MovieRepository>,
    files: Arc<dyn MovieFileRepository>,
    studios: Arc<dyn StudioRepository>,
    naming: Arc<dyn NamingConfigRepository>,
}

impl RenameService {
    pub fn new(
        movies: Arc<dyn MovieRepository>,
        files: Arc<dyn MovieFileRepository>,
        studios: Arc<dyn StudioRepository>,
        naming: Arc<dyn NamingConfigRepository>,
    ) -> Self {
        Self {
            movies,
            files,
            studios,
            naming,
        }
    }

    pub async fn builder(&self) -> Result<FileNameBuilder, NamingError> {
        Ok(FileNameBuilder::new(self.naming.get().await?))
    }

    async fn previews_for(&self, movies: Vec<Movie>) -> Result<Vec<RenamePreview>, NamingError> {
        let builder = self.builder().await?;
        let mut previews = Vec::new();
        for movie in movies {
            for file in self.files.get_by_movie(movie.id).await? {
                let new_path = builder.build_relative_path(&movie, &file)?;
                if new_path != file.relative_path {
                    previews.push(RenamePreview {
                        movie_id: movie.id,
                        movie_file_id: file.id,
                        existing_path: file.relative_path.clone(),
                        new_path,
                    });
                }
            }
        }
        Ok(previews)
    }

    pub async fn get_rename_previews(&self, movie_ids: &[MovieId]) -> Result<Vec<RenamePreview>, NamingError> {
        let movies = self.movies.get_many(movie_ids).await?;
        self.previews_for(movies).await
    }

    /// Previews for every scene of a studio, optionally limited to one release year.
    pub async fn get_rename_previews_for_studio(
        &self,
        studio_id: StudioId,
        year: Option<i32>,
    ) -> Result<Vec<RenamePreview>, NamingError> {
        let studio = self
            .studios
            .get_by_id(studio_id)
            .await?
            .ok_or(NamingError::StudioNotFound(studio_id))?;
        let movies = self
            .movies
            .get_by_studio_foreign_id(&studio.foreign_id)
            .await?
            .into_iter()
            .filter(|m| year.map_or(true, |y| m.metadata.year == Some(y)))
            .collect();
        self.previews_for(movies).await
    }

    /// Move the given files of a movie to their built names and store the new paths.
    pub async fn rename_files(
        &self,
        movie_id: MovieId,
        file_ids: &[MovieFileId],
    ) -> Result<Vec<MovieFile>, NamingError> {
        let movie = self
            .movies
            .get_by_id(movie_id)
            .await?
            .ok_or(NamingError::MovieNotFound(movie_id))?;
        let builder = self.builder().await?;
        let movie_path = builder
            .movie_path(&movie)?
            .ok_or(NamingError::MissingMoviePath(movie_id))?;

        let mut renamed = Vec::new();
        let mut claimed = HashSet::new();
        for mut file in self.files.get_by_movie(movie_id).await? {
            if !file_ids.is_empty() && !file_ids.contains(&file.id) {
                continue;
            }
            let new_path = builder.build_relative_path(&movie, &file)?;
            if new_path == file.relative_path {
                continue;
            }

            let source = movie_path.join(&file.relative_path);
            let destination = movie_path.join(&new_path);
            if !tokio::fs::try_exists(&source).await? {
                warn!(target: "application", path = %source.display(), "movie file missing on disk, skipping rename");
                continue;
            }
            if claimed.contains(&destination) || tokio::fs::try_exists(&destination).await? {
                warn!(
                    target: "application",
                    from = %source.display(),
                    to = %destination.display(),
                    "rename destination already taken, skipping"
                );
                continue;
            }
            claimed.insert(destination.clone());
            if let Some(parent) = destination.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::rename(&source, &destination).await?;
            debug!(target: "application", from = %source.display(), to = %destination.display(), "renamed movie file");

            file.relative_path = new_path;
            renamed.push(self.files.update(file).await?);
        }

        info!(target: "application", %movie_id, count = renamed.len(), "renamed movie files");
        Ok(renamed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::setup_pool;
    use chrono::{TimeZone, Utc};
    use marquee_domain::{ItemType, MovieMetadata, Studio};
    use marquee_infrastructure::sqlite_adapters::{
        SqliteMovieFileRepository, SqliteMovieRepository, SqliteNamingConfigRepository,
        SqliteStudioRepository,
    };

    fn movie(title: &str, year: Option<i32>) -> Movie {
        let mut metadata = MovieMetadata::new("tmdb:1", title, ItemType::Movie);
        metadata.year = year;
        metadata.tmdb_id = Some(603);
        Movie::new(metadata)
    }

    fn config(standard: &str, folder: &str) -> NamingConfig {
        NamingConfig {
            rename_movies: true,
            standard_movie_format: standard.to_string(),
            movie_folder_format: folder.to_string(),
            ..NamingConfig::default()
        }
    }

    #[test]
    fn builds_folder_with_case_insensitive_tokens() {
        let builder = FileNameBuilder::new(config("{Movie Title}", "{movie title} ({RELEASE YEAR}) {tmdb id}"));
        let folder = builder.build_movie_folder(&movie("The Matrix", Some(1999))).unwrap();
        assert_eq!(folder, "The Matrix (1999) 603");
    }

    #[test]
    fn missing_values_collapse_groups_and_separators() {
        let builder = FileNameBuilder::new(config(
            "{Movie Title} - {Release Group} - [{Quality Title}] ({Release Year}) {Bogus Token}",
            "{Movie Title}",
        ));
        let m = movie("Heat", None);
        let mut file = MovieFile::new(m.id, "heat.mkv", 1);
        file.quality = String::new();
        assert_eq!(builder.build_file_name(&m, &file).unwrap(), "Heat.mkv");

        file.release_group = Some("GRP".into());
        file.quality = "Bluray-1080p".into();
        assert_eq!(
            builder.build_file_name(&m, &file).unwrap(),
            "Heat - GRP - [Bluray-1080p].mkv"
        );
    }

    #[test]
    fn colon_replacement_modes() {
        let m = movie("Mission: Impossible", None);
        let mut naming = config("{Movie Title}", "{Movie Title}");

        for (mode, expected) in [
            (ColonReplacement::Delete, "Mission Impossible"),
            (ColonReplacement::Dash, "Mission- Impossible"),
            (ColonReplacement::SpaceDash, "Mission - Impossible"),
            (ColonReplacement::SpaceDashSpace, "Mission - Impossible"),
            (ColonReplacement::Smart, "Mission - Impossible"),
        ] {
            naming.colon_replacement = mode;
            let builder = FileNameBuilder::new(naming.clone());
            assert_eq!(builder.build_movie_folder(&m).unwrap(), expected, "{mode:?}");
        }
    }

    #[test]
    fn illegal_characters_replaced_or_removed() {
        let m = movie("AC/DC: \"Live\" <1991>?", None);
        let mut naming = config("{Movie Title}", "{Movie Title}");
        naming.colon_replacement = ColonReplacement::Dash;

        let builder = FileNameBuilder::new(naming.clone());
        assert_eq!(builder.build_movie_folder(&m).unwrap(), "AC+DC- 'Live' 1991");

        naming.replace_illegal_characters = false;
        let builder = FileNameBuilder::new(naming);
        assert_eq!(builder.build_movie_folder(&m).unwrap(), "ACDC- Live 1991");
    }

    #[test]
    fn title_the_and_release_date_tokens() {
        let mut m = movie("The Big Lebowski", Some(1998));
        m.metadata.release_date = Some(Utc.with_ymd_and_hms(1998, 3, 6, 0, 0, 0).unwrap());
        let builder = FileNameBuilder::new(config("{Movie TitleThe} {Release Date}", "{Movie CleanTitle}"));
        let file = MovieFile::new(m.id, "x.mp4", 1);
        assert_eq!(
            builder.build_file_name(&m, &file).unwrap(),
            "Big Lebowski, The 1998-03-06.mp4"
        );
        assert_eq!(builder.build_movie_folder(&m).unwrap(), "The Big Lebowski");
    }

    #[test]
    fn rename_disabled_keeps_current_name() {
        let mut naming = config("{Movie Title}", "{Movie Title}");
        naming.rename_movies = false;
        let builder = FileNameBuilder::new(naming);
        let m = movie("Heat", None);
        let file = MovieFile::new(m.id, "sub/heat.1995.mkv", 1);
        assert_eq!(builder.build_relative_path(&m, &file).unwrap(), "sub/heat.1995.mkv");
    }

    #[test]
    fn empty_result_is_an_error() {
        let builder = FileNameBuilder::new(config("{Release Group}", "{Studio}"));
        assert!(matches!(
            builder.build_movie_folder(&movie("Heat", None)),
            Err(NamingError::EmptyName(_))
        ));
    }

    struct Fixture {
        movies: Arc<SqliteMovieRepository>,
        files: Arc<SqliteMovieFileRepository>,
        studios: Arc<SqliteStudioRepository>,
        naming: Arc<SqliteNamingConfigRepository>,
        service: RenameService,
    }

    async fn fixture() -> Fixture {
        let pool = setup_pool().await;
        let movies = Arc::new(SqliteMovieRepository::new(pool.clone()));
        let files = Arc::new(SqliteMovieFileRepository::new(pool.clone()));
        let studios = Arc::new(SqliteStudioRepository::new(pool.clone()));
        let naming = Arc::new(SqliteNamingConfigRepository::new(pool));
        let service = RenameService::new(movies.clone(), files.clone(), studios.clone(), naming.clone());
        Fixture {
            movies,
            files,
            studios,
            naming,
            service,
        }
    }

    #[tokio::test]
    async fn previews_and_rename_on_disk() {
        let f = fixture().await;
        f.naming
            .save(config("{Movie Title} ({Release Year})", "{Movie Title}"))
            .await
            .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let mut m = movie("Heat", Some(1995));
        m.path = Some(dir.path().to_string_lossy().into_owned());
        let m = f.movies.create(m).await.unwrap();
        let file = f
            .files
            .create(MovieFile::new(m.id, "heat.1995.1080p.mkv", 42))
            .await
            .unwrap();
        std::fs::write(dir.path().join("heat.1995.1080p.mkv"), b"data").unwrap();

        let previews = f.service.get_rename_previews(&[m.id]).await.unwrap();
        assert_eq!(
            previews,
            vec![RenamePreview {
                movie_id: m.id,
                movie_file_id: file.id,
                existing_path: "heat.1995.1080p.mkv".into(),
                new_path: "Heat (1995).mkv".into(),
            }]
        );

        let renamed = f.service.rename_files(m.id, &[file.id]).await.unwrap();
        assert_eq!(renamed[0].relative_path, "Heat (1995).mkv");
        assert!(dir.path().join("Heat (1995).mkv").exists());
        assert!(!dir.path().join("heat.1995.1080p.mkv").exists());
        assert!(f.service.get_rename_previews(&[m.id]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn rename_never_overwrites_an_existing_file() {
        let f = fixture().await;
        f.naming.save(config("{Movie Title}", "{Movie Title}")).await.unwrap();

        let dir = tempfile::tempdir().unwrap();
        let mut m = movie("Heat", Some(1995));
        m.path = Some(dir.path().to_string_lossy().into_owned());
        let m = f.movies.create(m).await.unwrap();
        for name in ["a.mkv", "b.mkv"] {
            f.files.create(MovieFile::new(m.id, name, 1)).await.unwrap();
            std::fs::write(dir.path().join(name), name.as_bytes()).unwrap();
        }

        let renamed = f.service.rename_files(m.id, &[]).await.unwrap();
        assert_eq!(renamed.len(), 1);
        assert_eq!(renamed[0].relative_path, "Heat.mkv");

        let mut on_disk: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        on_disk.sort();
        assert_eq!(on_disk.len(), 2);
        assert!(on_disk.contains(&"Heat.mkv".to_string()));

        let mut stored: Vec<String> = f
            .files
            .get_by_movie(m.id)
            .await
            .unwrap()
            .into_iter()
            .map(|file| file.relative_path)
            .collect();
        stored.sort();
        assert_eq!(stored, on_disk);
    }

    #[tokio::test]
    async fn rename_skips_a_destination_already_on_disk() {
        let f = fixture().await;
        f.naming.save(config("{Movie Title}", "{Movie Title}")).await.unwrap();

        let dir = tempfile::tempdir().unwrap();
        let mut m = movie("Heat", Some(1995));
        m.path = Some(dir.path().to_string_lossy().into_owned());
        let m = f.movies.create(m).await.unwrap();
        f.files.create(MovieFile::new(m.id, "a.mkv", 1)).await.unwrap();
        std::fs::write(dir.path().join("a.mkv"), b"ours").unwrap();
        std::fs::write(dir.path().join("Heat.mkv"), b"someone else").unwrap();

        let renamed = f.service.rename_files(m.id, &[]).await.unwrap();
        assert!(renamed.is_empty());
        assert_eq!(std::fs::read(dir.path().join("a.mkv")).unwrap(), b"ours");
        assert_eq!(std::fs::read(dir.path().join("Heat.mkv")).unwrap(), b"someone else");
    }

    #[tokio::test]
    async fn studio_previews_filter_by_year() {
        let f = fixture().await;
        f.naming
            .save(config("{Studio} - {Movie Title}", "{Movie Title}"))
            .await
            .unwrap();
        let studio = f.studios.create(Studio::new("stash:acme", "Acme")).await.unwrap();

        for (foreign_id, title, year) in [("stash:1", "One", 2020), ("stash:2", "Two", 2021)] {
            let mut metadata = MovieMetadata::new(foreign_id, title, ItemType::Scene);
            metadata.studio_foreign_id = Some("stash:acme".into());
            metadata.studio_title = Some("Acme".into());
            metadata.year = Some(year);
            let scene = f.movies.create(Movie::new(metadata)).await.unwrap();
            f.files
                .create(MovieFile::new(scene.id, format!("{title}.mp4"), 1))
                .await
                .unwrap();
        }

        let all = f.service.get_rename_previews_for_studio(studio.id, None).await.unwrap();
        assert_eq!(all.len(), 2);
        let only_2021 = f
            .service
            .get_rename_previews_for_studio(studio.id, Some(2021))
            .await
            .unwrap();
        assert_eq!(only_2021.len(), 1);
        assert_eq!(only_2021[0].new_path, "Acme - Two.mp4");
    }
}
